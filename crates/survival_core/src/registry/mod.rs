// Deck registry: typed deck records and their store-facing normalization

pub mod deck_registry;
pub mod record;
pub mod types;

pub use deck_registry::DeckRegistry;
pub use record::{parse_timestamp, DeckRecord, DEFAULT_DECK_NAME};
pub use types::{Deck, DeckId, Player, PlayerId, Rank, RankTier};
