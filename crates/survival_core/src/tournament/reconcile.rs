use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::effects::{DeckPatch, Intent, IntentKind, WriteEffect};
use super::standings::Standings;
use crate::config::TournamentConfig;
use crate::registry::DeckId;
use crate::snapshot::Snapshot;

/// Stored state the engine reads around but should not keep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Anomaly {
    /// `lives <= 0` while `eliminated` is still false
    UneliminatedAtZero { deck: DeckId, lives: i32 },
    LivesOutOfRange { deck: DeckId, lives: i32 },
    /// Flag on a deck that is not the canonical champion
    StaleChampionFlag { deck: DeckId },
    EliminatedChampion { deck: DeckId },
}

pub fn detect_anomalies(snapshot: &Snapshot, config: &TournamentConfig) -> Vec<Anomaly> {
    let standings = Standings::new(&snapshot.decks, config);
    let canonical = standings.champion().map(|deck| deck.id.clone());
    let mut anomalies = Vec::new();

    for deck in snapshot.decks.all_decks() {
        if deck.lives <= 0 && !deck.eliminated {
            anomalies.push(Anomaly::UneliminatedAtZero { deck: deck.id.clone(), lives: deck.lives });
        }
        if !(0..=config.starting_lives).contains(&deck.lives) {
            anomalies.push(Anomaly::LivesOutOfRange { deck: deck.id.clone(), lives: deck.lives });
        }
        if deck.is_current_champion {
            if !deck.is_alive() {
                anomalies.push(Anomaly::EliminatedChampion { deck: deck.id.clone() });
            } else if canonical.as_ref() != Some(&deck.id) {
                anomalies.push(Anomaly::StaleChampionFlag { deck: deck.id.clone() });
            }
        }
    }

    anomalies
}

/// Corrective writes, one patch per affected deck.
///
/// `eliminated` with lives left is a disqualification and stays as is.
/// `updatedAt` is not touched so champion recency is preserved.
pub fn reconcile(snapshot: &Snapshot, config: &TournamentConfig) -> Intent {
    let standings = Standings::new(&snapshot.decks, config);
    let canonical = standings.champion().map(|deck| deck.id.clone());

    let effects: Vec<WriteEffect> = snapshot
        .decks
        .all_decks()
        .filter_map(|deck| {
            let clamped = deck.lives.clamp(0, config.starting_lives);
            let patch = DeckPatch {
                lives: (clamped != deck.lives).then_some(clamped),
                eliminated: (deck.lives <= 0 && !deck.eliminated).then_some(true),
                is_current_champion: (deck.is_current_champion
                    && canonical.as_ref() != Some(&deck.id))
                .then_some(false),
                ..Default::default()
            };
            (!patch.is_empty()).then(|| WriteEffect::PatchDeck { deck_id: deck.id.clone(), patch })
        })
        .collect();

    if effects.is_empty() {
        info!("Reconcile: snapshot is consistent");
    } else {
        warn!("Reconcile: {} decks need corrective writes", effects.len());
    }

    Intent::new(IntentKind::Reconcile, effects)
}
