use super::{DeckStore, StoreError};
use crate::config::TournamentConfig;
use crate::error::{EngineError, EngineResult};
use crate::registry::{DeckRegistry, PlayerId};
use crate::snapshot::Snapshot;
use crate::tournament::{Intent, IntentKind, TournamentState, WriteEffect};

/// What a successful commit wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommitReport {
    pub kind: IntentKind,
    pub applied: usize,
    /// Effects aimed at decks deleted since the snapshot was read
    pub skipped: usize,
}

/// Write an intent effect by effect, in order.
///
/// Stops at the first store failure with [`EngineError::PartialCommit`];
/// its `applied` count is the exact prefix that landed, so the caller
/// retries `intent.remaining_after(applied)` and never replays a landed
/// life decrement.
pub fn commit<S: DeckStore + ?Sized>(store: &S, intent: &Intent) -> EngineResult<CommitReport> {
    let total = intent.len();
    let mut skipped = 0;

    for (index, effect) in intent.effects.iter().enumerate() {
        let result = match effect {
            WriteEffect::IncrementLives { deck_id, delta } => store.increment_lives(deck_id, *delta),
            WriteEffect::PatchDeck { deck_id, patch } => store.merge_deck(deck_id, patch),
            WriteEffect::PatchTournament { patch } => store.merge_tournament(patch),
            WriteEffect::CreateDeck { deck } => store.create_deck(deck),
        };

        match result {
            Ok(()) => {}
            Err(StoreError::NotFound { collection, id }) if effect.deck_id().is_some() => {
                log::warn!("Skipping write to deleted document {}/{}", collection, id);
                skipped += 1;
            }
            Err(source) => {
                log::error!(
                    "{:?} commit failed after {} of {} writes: {}",
                    intent.kind,
                    index,
                    total,
                    source
                );
                return Err(EngineError::PartialCommit { applied: index, total, source });
            }
        }
    }

    log::info!("{:?} committed ({} writes, {} skipped)", intent.kind, total, skipped);
    Ok(CommitReport { kind: intent.kind, applied: total, skipped })
}

/// Read every deck and the tournament record into one snapshot
pub fn load_snapshot<S: DeckStore + ?Sized>(
    store: &S,
    config: &TournamentConfig,
) -> EngineResult<Snapshot> {
    let records = store.load_decks(None)?;
    let decks = DeckRegistry::from_records(&records, config.starting_lives);
    let tournament = TournamentState::from_document(&store.load_tournament()?)?;

    log::debug!("Loaded snapshot: {} decks, round {}", decks.len(), tournament.rounds_played);
    Ok(Snapshot::new(decks, tournament))
}

/// Re-read one owner's decks, as a per-owner subscription update would
pub fn refresh_owner<S: DeckStore + ?Sized>(
    store: &S,
    snapshot: &mut Snapshot,
    owner: &PlayerId,
    config: &TournamentConfig,
) -> EngineResult<usize> {
    let records = store.load_decks(Some(owner))?;
    let count = snapshot.decks.replace_owner_snapshot(owner, &records, config.starting_lives);
    log::debug!("Refreshed {} decks of {}", count, owner);
    Ok(count)
}
