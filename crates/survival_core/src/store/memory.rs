use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use super::{DeckStore, StoreError, StoreResult};
use crate::registry::{Deck, DeckId, DeckRecord, PlayerId, Rank};
use crate::snapshot::Snapshot;
use crate::tournament::{DeckPatch, FieldUpdate, TournamentPatch, TournamentState};

const DECKS: &str = "decks";

#[derive(Debug, Default)]
struct FaultPlan {
    /// Successful writes allowed before every further write fails
    writes_left: Option<usize>,
    offline: bool,
    writes: usize,
}

/// In-process document store with store-shaped documents.
///
/// Documents are kept raw, so legacy field names survive until a merge
/// rewrites them.
#[derive(Debug)]
pub struct MemoryStore {
    decks: RwLock<BTreeMap<String, DeckRecord>>,
    tournament: RwLock<Value>,
    faults: Mutex<FaultPlan>,
    starting_lives: i32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_starting_lives(2)
    }

    /// `starting_lives` is what an increment assumes for a document without `lives`
    pub fn with_starting_lives(starting_lives: i32) -> Self {
        Self {
            decks: RwLock::new(BTreeMap::new()),
            tournament: RwLock::new(Value::Null),
            faults: Mutex::new(FaultPlan::default()),
            starting_lives,
        }
    }

    pub fn from_snapshot(snapshot: &Snapshot) -> StoreResult<Self> {
        let store = Self::new();
        for deck in snapshot.decks.all_decks() {
            store.create_deck(deck)?;
        }
        let body = serde_json::to_value(&snapshot.tournament)
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        *store.tournament.write().map_err(|_| StoreError::Poisoned)? = body;
        store.reset_write_count()?;
        Ok(store)
    }

    /// Put a raw document in place, bypassing fault injection
    pub fn seed_deck(&self, id: &str, body: Value) -> StoreResult<()> {
        let record =
            DeckRecord::from_document(id, body).map_err(|e| StoreError::Rejected(e.to_string()))?;
        self.decks.write().map_err(|_| StoreError::Poisoned)?.insert(id.to_string(), record);
        Ok(())
    }

    pub fn seed_tournament(&self, body: Value) -> StoreResult<()> {
        *self.tournament.write().map_err(|_| StoreError::Poisoned)? = body;
        Ok(())
    }

    /// Owner deleted a deck
    pub fn delete_deck(&self, id: &DeckId) -> StoreResult<bool> {
        self.check_write()?;
        Ok(self.decks.write().map_err(|_| StoreError::Poisoned)?.remove(id.as_str()).is_some())
    }

    /// Let `n` more writes through, then fail every write
    pub fn fail_after(&self, n: usize) -> StoreResult<()> {
        self.faults.lock().map_err(|_| StoreError::Poisoned)?.writes_left = Some(n);
        Ok(())
    }

    pub fn set_offline(&self, offline: bool) -> StoreResult<()> {
        self.faults.lock().map_err(|_| StoreError::Poisoned)?.offline = offline;
        Ok(())
    }

    /// Clear every injected fault
    pub fn heal(&self) -> StoreResult<()> {
        let mut faults = self.faults.lock().map_err(|_| StoreError::Poisoned)?;
        faults.writes_left = None;
        faults.offline = false;
        Ok(())
    }

    pub fn write_count(&self) -> StoreResult<usize> {
        Ok(self.faults.lock().map_err(|_| StoreError::Poisoned)?.writes)
    }

    fn reset_write_count(&self) -> StoreResult<()> {
        self.faults.lock().map_err(|_| StoreError::Poisoned)?.writes = 0;
        Ok(())
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.faults.lock().map_err(|_| StoreError::Poisoned)?.offline {
            return Err(StoreError::Unreachable("store is offline".to_string()));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        let mut faults = self.faults.lock().map_err(|_| StoreError::Poisoned)?;
        if faults.offline {
            return Err(StoreError::Unreachable("store is offline".to_string()));
        }
        let writes = faults.writes;
        if let Some(left) = faults.writes_left.as_mut() {
            if *left == 0 {
                return Err(StoreError::Unreachable(format!(
                    "injected failure after {} writes",
                    writes
                )));
            }
            *left -= 1;
        }
        faults.writes += 1;
        Ok(())
    }

    fn with_deck<F>(&self, id: &DeckId, f: F) -> StoreResult<()>
    where
        F: FnOnce(&mut DeckRecord),
    {
        self.check_write()?;
        let mut decks = self.decks.write().map_err(|_| StoreError::Poisoned)?;
        let record = decks.get_mut(id.as_str()).ok_or_else(|| StoreError::NotFound {
            collection: DECKS.to_string(),
            id: id.to_string(),
        })?;
        f(record);
        Ok(())
    }
}

fn merge_into_record(record: &mut DeckRecord, patch: &DeckPatch) {
    if let Some(name) = &patch.name {
        record.name = Some(Value::from(name.as_str()));
    }
    match &patch.power {
        Some(FieldUpdate::Set(power)) => record.power = Some(Value::from(*power)),
        Some(FieldUpdate::Clear) => {
            record.power = None;
            record.fuerza = None;
        }
        None => {}
    }
    match &patch.rank {
        Some(FieldUpdate::Set(Rank::Tier(tier))) => {
            record.rango = Some(Value::from(tier.key()));
            record.rango_label = Some(Value::from(tier.label()));
            record.rango_color = Some(Value::from(tier.color()));
        }
        Some(FieldUpdate::Set(Rank::Custom { key, label, color })) => {
            record.rango = Some(Value::from(key.as_str()));
            record.rango_label = Some(Value::from(label.as_str()));
            record.rango_color = Some(Value::from(color.as_str()));
        }
        Some(FieldUpdate::Clear) => {
            record.rango = None;
            record.rango_label = None;
            record.rango_color = None;
        }
        None => {}
    }
    if let Some(lives) = patch.lives {
        record.lives = Some(Value::from(lives));
    }
    if let Some(eliminated) = patch.eliminated {
        record.eliminated = Some(Value::Bool(eliminated));
    }
    if let Some(champion) = patch.is_current_champion {
        record.is_current_champion = Some(Value::Bool(champion));
    }
    if let Some(updated_at) = patch.updated_at {
        record.updated_at = Some(Value::from(updated_at.timestamp_millis()));
    }
}

impl DeckStore for MemoryStore {
    fn load_decks(&self, owner: Option<&PlayerId>) -> StoreResult<Vec<DeckRecord>> {
        self.check_read()?;
        let decks = self.decks.read().map_err(|_| StoreError::Poisoned)?;
        Ok(decks
            .values()
            .filter(|record| match owner {
                Some(owner) => record.owner().as_deref() == Some(owner.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }

    fn load_tournament(&self) -> StoreResult<Value> {
        self.check_read()?;
        Ok(self.tournament.read().map_err(|_| StoreError::Poisoned)?.clone())
    }

    fn create_deck(&self, deck: &Deck) -> StoreResult<()> {
        self.check_write()?;
        let mut decks = self.decks.write().map_err(|_| StoreError::Poisoned)?;
        if decks.contains_key(deck.id.as_str()) {
            return Err(StoreError::Rejected(format!("deck {} already exists", deck.id)));
        }
        decks.insert(deck.id.0.clone(), DeckRecord::from_deck(deck));
        log::debug!("Created deck {}", deck.id);
        Ok(())
    }

    fn merge_deck(&self, id: &DeckId, patch: &DeckPatch) -> StoreResult<()> {
        self.with_deck(id, |record| merge_into_record(record, patch))
    }

    fn merge_tournament(&self, patch: &TournamentPatch) -> StoreResult<()> {
        self.check_write()?;
        let mut body = self.tournament.write().map_err(|_| StoreError::Poisoned)?;
        let mut state = TournamentState::from_document(&body)
            .map_err(|e| StoreError::Rejected(e.to_string()))?;
        patch.apply(&mut state);
        *body = serde_json::to_value(&state).map_err(|e| StoreError::Rejected(e.to_string()))?;
        Ok(())
    }

    fn increment_lives(&self, id: &DeckId, delta: i32) -> StoreResult<()> {
        let starting_lives = self.starting_lives;
        self.with_deck(id, |record| {
            let current = record
                .lives
                .as_ref()
                .and_then(Value::as_i64)
                .unwrap_or(starting_lives as i64);
            record.lives = Some(Value::from(current + delta as i64));
        })
    }
}
