//! Store seam: the document store behind the engine.
//!
//! The engine only computes intents; this module reads snapshots from a
//! [`DeckStore`] and commits intents back to it.

pub mod commit;
pub mod error;
pub mod memory;

pub use commit::{commit, load_snapshot, CommitReport};
pub use error::StoreError;
pub use memory::MemoryStore;

use serde_json::Value;

use crate::registry::{Deck, DeckId, DeckRecord, PlayerId};
use crate::tournament::{DeckPatch, TournamentPatch};

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Document store operations the engine needs.
///
/// Merges are field-level and last-write-wins. `increment_lives` must be
/// atomic on the store side.
pub trait DeckStore: Send + Sync {
    /// Raw deck documents, optionally only one owner's
    fn load_decks(&self, owner: Option<&PlayerId>) -> StoreResult<Vec<DeckRecord>>;

    /// Raw tournament document; `Value::Null` when it was never written
    fn load_tournament(&self) -> StoreResult<Value>;

    fn create_deck(&self, deck: &Deck) -> StoreResult<()>;

    fn merge_deck(&self, id: &DeckId, patch: &DeckPatch) -> StoreResult<()>;

    fn merge_tournament(&self, patch: &TournamentPatch) -> StoreResult<()>;

    fn increment_lives(&self, id: &DeckId, delta: i32) -> StoreResult<()>;
}
