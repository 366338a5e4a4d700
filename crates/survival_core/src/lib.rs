//! # survival_core - Survival: Extra Life tournament engine
//!
//! Tracks a small group's decks and runs a winner-stays-on elimination
//! tournament where every deck starts with two lives.
//!
//! ## Features
//! - Deterministic pairing: same snapshot, same next fight
//! - Match resolution as write intents, no I/O in the engine
//! - Legacy store documents normalized once at the registry boundary
//! - JSON API for the UI host

#![allow(clippy::field_reassign_with_default)]

pub mod api;
pub mod config;
pub mod error;
pub mod registry;
pub mod sim;
pub mod snapshot;
pub mod store;
pub mod tournament;

pub use api::{
    compute_next_pairing_json, compute_standings_json, reconcile_json, reset_tournament_json,
    resolve_match_json, ApiError, ApiResponse,
};
pub use config::{ConfigError, TournamentConfig, DEFAULT_CONFIG};
pub use error::{EngineError, EngineResult};
pub use registry::{Deck, DeckId, DeckRecord, DeckRegistry, Player, PlayerId, Rank, RankTier};
pub use sim::{simulate_tournament, SimulationReport};
pub use snapshot::Snapshot;
pub use store::{commit, load_snapshot, DeckStore, MemoryStore, StoreError};
pub use tournament::{
    compute_next_pairing, compute_standings, disqualify_deck, reconcile, reset_tournament,
    resolve_match, start_duel_timer, stop_duel_timer, Intent, MatchReport, NextPairing, Pairing,
    PairingRule, StandingsSummary, TournamentState, WriteEffect,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
