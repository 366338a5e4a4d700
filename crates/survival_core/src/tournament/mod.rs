//! Survival: Extra Life tournament engine
//!
//! - `standings`: alive counts, advantage, strength order, canonical champion
//! - `pairing`: next fight selection
//! - `resolution`: match results, reset, disqualification, duel timer, deck edits
//! - `reconcile`: corrective writes for inconsistent stored state
//! - `effects`: the write descriptions all of the above produce

pub mod effects;
pub mod pairing;
pub mod reconcile;
pub mod resolution;
pub mod standings;
pub mod state;

pub use effects::{DeckPatch, FieldUpdate, Intent, IntentKind, TournamentPatch, WriteEffect};
pub use pairing::{
    compute_next_pairing, pairing_state, previous_opponent, NextPairing, Pairing, PairingRule,
    PairingState,
};
pub use reconcile::{detect_anomalies, reconcile, Anomaly};
pub use resolution::{
    disqualify_deck, edit_deck, new_deck, reset_tournament, resolve_match, start_duel_timer,
    stop_duel_timer, DeckEdit, MatchReport,
};
pub use standings::{compute_standings, Standings, StandingsSummary, StrengthOrder};
pub use state::{format_countdown, TournamentState, TOURNAMENT_DOC_ID};
