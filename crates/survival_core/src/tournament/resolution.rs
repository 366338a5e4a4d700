//! Match resolution and the other mutating actions.
//!
//! Every function here is pure: it validates against a snapshot and returns
//! an [`Intent`] for the caller to commit.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::effects::{DeckPatch, FieldUpdate, Intent, IntentKind, TournamentPatch, WriteEffect};
use crate::config::TournamentConfig;
use crate::error::{EngineError, EngineResult};
use crate::registry::{Deck, DeckId, DeckRegistry, PlayerId, Rank, DEFAULT_DECK_NAME};
use crate::snapshot::Snapshot;

/// Confirmed outcome of one fight
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct MatchReport {
    pub winner: DeckId,
    pub loser: DeckId,
    /// Must be `roundsPlayed + 1`; anything else is a replay or stale report
    pub round: u32,
}

pub fn resolve_match(
    snapshot: &Snapshot,
    report: &MatchReport,
    now: DateTime<Utc>,
) -> EngineResult<Intent> {
    if report.winner == report.loser {
        return Err(EngineError::SameDeck(report.winner.clone()));
    }

    let winner = lookup(&snapshot.decks, &report.winner)?;
    let loser = lookup(&snapshot.decks, &report.loser)?;

    if !loser.is_alive() {
        warn!("Rejected resolution: loser {} has no lives left ({})", loser.id, loser.lives);
        return Err(EngineError::NoLivesLeft { deck: loser.id.clone() });
    }
    if !winner.is_alive() {
        return Err(EngineError::EliminatedWinner { deck: winner.id.clone() });
    }

    let expected = snapshot.tournament.next_round();
    if report.round != expected {
        warn!("Rejected resolution for round {}, expected {}", report.round, expected);
        return Err(EngineError::StaleRound { expected, found: report.round });
    }

    let mut effects = vec![
        WriteEffect::IncrementLives { deck_id: loser.id.clone(), delta: -1 },
        WriteEffect::PatchDeck {
            deck_id: loser.id.clone(),
            patch: DeckPatch {
                eliminated: (loser.lives == 1).then_some(true),
                is_current_champion: Some(false),
                updated_at: Some(now),
                ..Default::default()
            },
        },
        WriteEffect::PatchDeck {
            deck_id: winner.id.clone(),
            patch: DeckPatch {
                is_current_champion: Some(true),
                updated_at: Some(now),
                ..Default::default()
            },
        },
    ];

    effects.extend(
        snapshot
            .decks
            .all_decks()
            .filter(|deck| deck.is_current_champion && deck.id != winner.id && deck.id != loser.id)
            .map(|deck| WriteEffect::PatchDeck {
                deck_id: deck.id.clone(),
                patch: DeckPatch { is_current_champion: Some(false), ..Default::default() },
            }),
    );

    effects.push(WriteEffect::PatchTournament {
        patch: TournamentPatch {
            last_champion_id: Some(FieldUpdate::Set(winner.id.clone())),
            last_opponent_id: Some(FieldUpdate::Set(loser.id.clone())),
            last_champion_owner: Some(FieldUpdate::Set(winner.owner.clone())),
            last_opponent_owner: Some(FieldUpdate::Set(loser.owner.clone())),
            rounds_played: Some(report.round),
            ..Default::default()
        },
    });

    info!(
        "Round {}: {} beats {} ({} -> {} lives)",
        report.round,
        winner.id,
        loser.id,
        loser.lives,
        loser.lives - 1
    );

    Ok(Intent::new(IntentKind::ResolveMatch, effects))
}

/// Fresh cycle: full lives, no eliminations, no champion, no history
pub fn reset_tournament(
    decks: &DeckRegistry,
    config: &TournamentConfig,
    now: DateTime<Utc>,
) -> Intent {
    let mut effects: Vec<WriteEffect> = decks
        .all_decks()
        .map(|deck| WriteEffect::PatchDeck {
            deck_id: deck.id.clone(),
            patch: DeckPatch {
                lives: Some(config.starting_lives),
                eliminated: Some(false),
                is_current_champion: Some(false),
                updated_at: Some(now),
                ..Default::default()
            },
        })
        .collect();

    effects.push(WriteEffect::PatchTournament {
        patch: TournamentPatch {
            last_champion_id: Some(FieldUpdate::Clear),
            last_opponent_id: Some(FieldUpdate::Clear),
            last_champion_owner: Some(FieldUpdate::Clear),
            last_opponent_owner: Some(FieldUpdate::Clear),
            rounds_played: Some(0),
            deadline_at: Some(FieldUpdate::Clear),
        },
    });

    info!("Tournament reset: {} decks back to {} lives", decks.len(), config.starting_lives);
    Intent::new(IntentKind::ResetTournament, effects)
}

/// Take a deck out of the cycle without touching its lives
pub fn disqualify_deck(
    snapshot: &Snapshot,
    deck_id: &DeckId,
    now: DateTime<Utc>,
) -> EngineResult<Intent> {
    let deck = lookup(&snapshot.decks, deck_id)?;
    info!("Disqualifying deck {} ({})", deck.id, deck.name);

    Ok(Intent::new(
        IntentKind::Disqualify,
        vec![WriteEffect::PatchDeck {
            deck_id: deck.id.clone(),
            patch: DeckPatch {
                eliminated: Some(true),
                is_current_champion: Some(false),
                updated_at: Some(now),
                ..Default::default()
            },
        }],
    ))
}

/// Start, or restart, the countdown to the next duel
pub fn start_duel_timer(now: DateTime<Utc>, config: &TournamentConfig) -> Intent {
    let deadline = now + config.duel_window();
    debug!("Duel timer set to {}", deadline);
    Intent::new(
        IntentKind::StartDuelTimer,
        vec![WriteEffect::PatchTournament {
            patch: TournamentPatch {
                deadline_at: Some(FieldUpdate::Set(deadline)),
                ..Default::default()
            },
        }],
    )
}

pub fn stop_duel_timer() -> Intent {
    Intent::new(
        IntentKind::StopDuelTimer,
        vec![WriteEffect::PatchTournament {
            patch: TournamentPatch { deadline_at: Some(FieldUpdate::Clear), ..Default::default() },
        }],
    )
}

/// Owner-editable deck fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct DeckEdit {
    pub name: Option<String>,
    pub power: Option<FieldUpdate<f64>>,
    pub rank: Option<FieldUpdate<Rank>>,
}

pub fn edit_deck(
    snapshot: &Snapshot,
    deck_id: &DeckId,
    edit: DeckEdit,
    now: DateTime<Utc>,
) -> EngineResult<Intent> {
    let deck = lookup(&snapshot.decks, deck_id)?;

    let power = match edit.power {
        Some(FieldUpdate::Set(p)) if !p.is_finite() => Some(FieldUpdate::Clear),
        other => other,
    };
    let patch = DeckPatch {
        name: edit.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
        power,
        rank: edit.rank,
        updated_at: Some(now),
        ..Default::default()
    };

    Ok(Intent::new(
        IntentKind::EditDeck,
        vec![WriteEffect::PatchDeck { deck_id: deck.id.clone(), patch }],
    ))
}

/// Register a new deck with a fresh id and full lives
pub fn new_deck(
    owner: PlayerId,
    name: &str,
    power: Option<f64>,
    rank: Option<Rank>,
    now: DateTime<Utc>,
    config: &TournamentConfig,
) -> Intent {
    let name = match name.trim() {
        "" => DEFAULT_DECK_NAME,
        trimmed => trimmed,
    };
    let mut deck = Deck::create(owner, name, config.starting_lives, now);
    if let Some(power) = power {
        deck = deck.with_power(power);
    }
    deck.rank = rank;

    debug!("New deck {} for {}", deck.id, deck.owner);
    Intent::new(IntentKind::NewDeck, vec![WriteEffect::CreateDeck { deck }])
}

fn lookup<'a>(decks: &'a DeckRegistry, id: &DeckId) -> EngineResult<&'a Deck> {
    decks.by_id(id).ok_or_else(|| EngineError::UnknownDeck(id.clone()))
}
