use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

use super::record::DeckRecord;
use super::types::{Deck, DeckId, PlayerId};

/// In-memory projection of the non-deleted decks of the latest snapshot.
///
/// Iteration is ordered by deck id. That order is stable, but it carries no
/// meaning; callers that need strength order go through `Standings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeckRegistry {
    decks: BTreeMap<DeckId, Deck>,
}

impl DeckRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_decks(decks: impl IntoIterator<Item = Deck>) -> Self {
        Self { decks: decks.into_iter().map(|d| (d.id.clone(), d)).collect() }
    }

    /// Build from raw store documents. Records that cannot be normalized
    /// (no id, no owner) are logged and left out; the rest still load.
    pub fn from_records(records: &[DeckRecord], starting_lives: i32) -> Self {
        Self::from_decks(normalize_all(records, starting_lives))
    }

    /// Replace every deck of `owner` with a fresh per-owner snapshot.
    ///
    /// Decks in `records` that belong to someone else are ignored.
    pub fn replace_owner_snapshot(
        &mut self,
        owner: &PlayerId,
        records: &[DeckRecord],
        starting_lives: i32,
    ) -> usize {
        let fresh = normalize_all(records, starting_lives);

        self.decks.retain(|_, deck| deck.owner != *owner);

        let mut count = 0;
        for deck in fresh.into_iter().filter(|d| d.owner == *owner) {
            self.decks.insert(deck.id.clone(), deck);
            count += 1;
        }
        count
    }

    pub fn all_decks(&self) -> impl Iterator<Item = &Deck> {
        self.decks.values()
    }

    pub fn decks_of(&self, owner: &PlayerId) -> impl Iterator<Item = &Deck> + '_ {
        let owner = owner.clone();
        self.decks.values().filter(move |deck| deck.owner == owner)
    }

    pub fn by_id(&self, id: &DeckId) -> Option<&Deck> {
        self.decks.get(id)
    }

    pub(crate) fn by_id_mut(&mut self, id: &DeckId) -> Option<&mut Deck> {
        self.decks.get_mut(id)
    }

    pub fn insert(&mut self, deck: Deck) -> Option<Deck> {
        self.decks.insert(deck.id.clone(), deck)
    }

    /// Owner deleted the deck
    pub fn remove(&mut self, id: &DeckId) -> Option<Deck> {
        self.decks.remove(id)
    }

    pub fn len(&self) -> usize {
        self.decks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decks.is_empty()
    }
}

fn normalize_all(records: &[DeckRecord], starting_lives: i32) -> Vec<Deck> {
    records
        .iter()
        .filter_map(|record| match record.normalize(starting_lives) {
            Ok(deck) => Some(deck),
            Err(e) => {
                warn!("Skipping deck record: {}", e);
                None
            }
        })
        .collect()
}
