use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::registry::DeckRegistry;
use crate::tournament::{Intent, TournamentState, WriteEffect};

/// Everything the engine reads: the deck pool plus the tournament singleton
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub decks: DeckRegistry,
    pub tournament: TournamentState,
}

impl Snapshot {
    pub fn new(decks: DeckRegistry, tournament: TournamentState) -> Self {
        Self { decks, tournament }
    }

    /// Apply effects in memory, the way a store would.
    ///
    /// Stops at the first effect that names an unknown deck; earlier
    /// effects stay applied.
    pub fn apply(&mut self, effects: &[WriteEffect]) -> EngineResult<()> {
        for effect in effects {
            match effect {
                WriteEffect::IncrementLives { deck_id, delta } => {
                    let deck = self
                        .decks
                        .by_id_mut(deck_id)
                        .ok_or_else(|| EngineError::UnknownDeck(deck_id.clone()))?;
                    deck.lives = deck.lives.saturating_add(*delta);
                }
                WriteEffect::PatchDeck { deck_id, patch } => {
                    let deck = self
                        .decks
                        .by_id_mut(deck_id)
                        .ok_or_else(|| EngineError::UnknownDeck(deck_id.clone()))?;
                    patch.apply(deck);
                }
                WriteEffect::PatchTournament { patch } => patch.apply(&mut self.tournament),
                WriteEffect::CreateDeck { deck } => {
                    self.decks.insert(deck.clone());
                }
            }
        }
        Ok(())
    }

    pub fn apply_intent(&mut self, intent: &Intent) -> EngineResult<()> {
        self.apply(&intent.effects)
    }
}
