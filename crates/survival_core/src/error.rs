use thiserror::Error;

use crate::registry::DeckId;
use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown deck: {0}")]
    UnknownDeck(DeckId),

    #[error("A deck cannot fight itself: {0}")]
    SameDeck(DeckId),

    #[error("Deck {deck} has no lives left to lose")]
    NoLivesLeft { deck: DeckId },

    #[error("Deck {deck} is eliminated and cannot win a match")]
    EliminatedWinner { deck: DeckId },

    #[error("Stale match report: expected round {expected}, found {found}")]
    StaleRound { expected: u32, found: u32 },

    #[error("Deck {deck} is not part of this pairing")]
    NotInPairing { deck: DeckId },

    #[error("Malformed deck record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },

    #[error("Store unavailable: {0}")]
    Unavailable(#[from] StoreError),

    #[error("Store failed after {applied} of {total} writes: {source}")]
    PartialCommit {
        applied: usize,
        total: usize,
        #[source]
        source: StoreError,
    },
}

impl EngineError {
    /// Store failures can be retried; input errors never can.
    pub fn is_retryable(&self) -> bool {
        match self {
            EngineError::Unavailable(_) => true,
            EngineError::PartialCommit { .. } => true,
            _ => false,
        }
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::UnknownDeck(_) => "UNKNOWN_DECK",
            EngineError::SameDeck(_) => "SAME_DECK",
            EngineError::NoLivesLeft { .. } => "NO_LIVES_LEFT",
            EngineError::EliminatedWinner { .. } => "ELIMINATED_WINNER",
            EngineError::StaleRound { .. } => "STALE_ROUND",
            EngineError::NotInPairing { .. } => "NOT_IN_PAIRING",
            EngineError::MalformedRecord { .. } => "MALFORMED_RECORD",
            EngineError::Unavailable(_) => "UNAVAILABLE",
            EngineError::PartialCommit { .. } => "PARTIAL_COMMIT",
        }
    }
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
