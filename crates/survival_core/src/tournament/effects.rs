//! Write effects: the description of store writes an action produces.
//!
//! Engine operations never touch the store. They return an [`Intent`], an
//! ordered list of [`WriteEffect`]s, and the caller commits it (see
//! `store::commit`). Dropping an intent before commit is a no-op.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::state::TournamentState;
use crate::registry::{Deck, DeckId, PlayerId, Rank};

/// Merge-style update of an optional field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldUpdate<T> {
    Set(T),
    Clear,
}

impl<T: Clone> FieldUpdate<T> {
    fn apply_to(&self, field: &mut Option<T>) {
        *field = match self {
            FieldUpdate::Set(value) => Some(value.clone()),
            FieldUpdate::Clear => None,
        };
    }
}

/// Partial deck update; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<FieldUpdate<f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<FieldUpdate<Rank>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lives: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eliminated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_current_champion: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl DeckPatch {
    pub fn is_empty(&self) -> bool {
        *self == DeckPatch::default()
    }

    pub fn apply(&self, deck: &mut Deck) {
        if let Some(name) = &self.name {
            deck.name = name.clone();
        }
        if let Some(power) = &self.power {
            power.apply_to(&mut deck.power);
            deck.power = deck.power.filter(|p| p.is_finite());
        }
        if let Some(rank) = &self.rank {
            rank.apply_to(&mut deck.rank);
        }
        if let Some(lives) = self.lives {
            deck.lives = lives;
        }
        if let Some(eliminated) = self.eliminated {
            deck.eliminated = eliminated;
        }
        if let Some(champion) = self.is_current_champion {
            deck.is_current_champion = champion;
        }
        if let Some(updated_at) = self.updated_at {
            deck.updated_at = Some(updated_at);
        }
    }
}

/// Partial tournament update
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TournamentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_champion_id: Option<FieldUpdate<DeckId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opponent_id: Option<FieldUpdate<DeckId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_champion_owner: Option<FieldUpdate<PlayerId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_opponent_owner: Option<FieldUpdate<PlayerId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds_played: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_at: Option<FieldUpdate<DateTime<Utc>>>,
}

impl TournamentPatch {
    pub fn apply(&self, state: &mut TournamentState) {
        if let Some(update) = &self.last_champion_id {
            update.apply_to(&mut state.last_champion_id);
        }
        if let Some(update) = &self.last_opponent_id {
            update.apply_to(&mut state.last_opponent_id);
        }
        if let Some(update) = &self.last_champion_owner {
            update.apply_to(&mut state.last_champion_owner);
        }
        if let Some(update) = &self.last_opponent_owner {
            update.apply_to(&mut state.last_opponent_owner);
        }
        if let Some(rounds) = self.rounds_played {
            state.rounds_played = rounds;
        }
        if let Some(update) = &self.deadline_at {
            update.apply_to(&mut state.deadline_at);
        }
    }
}

/// One store write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WriteEffect {
    /// Atomic server-side increment of `lives`
    IncrementLives { deck_id: DeckId, delta: i32 },
    PatchDeck { deck_id: DeckId, patch: DeckPatch },
    PatchTournament { patch: TournamentPatch },
    CreateDeck { deck: Deck },
}

impl WriteEffect {
    /// Safe to replay with the same arguments
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, WriteEffect::IncrementLives { .. })
    }

    pub fn deck_id(&self) -> Option<&DeckId> {
        match self {
            WriteEffect::IncrementLives { deck_id, .. } | WriteEffect::PatchDeck { deck_id, .. } => {
                Some(deck_id)
            }
            WriteEffect::CreateDeck { deck } => Some(&deck.id),
            WriteEffect::PatchTournament { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    ResolveMatch,
    ResetTournament,
    Disqualify,
    StartDuelTimer,
    StopDuelTimer,
    Reconcile,
    EditDeck,
    NewDeck,
}

/// Ordered writes produced by one engine action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Intent {
    pub kind: IntentKind,
    pub effects: Vec<WriteEffect>,
}

impl Intent {
    pub fn new(kind: IntentKind, effects: Vec<WriteEffect>) -> Self {
        Self { kind, effects }
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    /// The part still to write after `applied` effects have landed.
    ///
    /// Retrying with this instead of the whole intent is what keeps a
    /// landed life decrement from being applied twice.
    pub fn remaining_after(&self, applied: usize) -> Intent {
        Intent {
            kind: self.kind,
            effects: self.effects.iter().skip(applied).cloned().collect(),
        }
    }

    pub fn is_idempotent(&self) -> bool {
        self.effects.iter().all(WriteEffect::is_idempotent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::RankTier;
    use serde_json::json;

    fn deck() -> Deck {
        Deck::with_id(DeckId::from("d1"), PlayerId::from("aure"), "Burn", 2, None).with_power(3.0)
    }

    #[test]
    fn test_deck_patch_only_touches_set_fields() {
        let mut d = deck();
        let now = Utc::now();
        DeckPatch { is_current_champion: Some(true), updated_at: Some(now), ..Default::default() }
            .apply(&mut d);

        assert!(d.is_current_champion);
        assert_eq!(d.updated_at, Some(now));
        assert_eq!(d.lives, 2);
        assert_eq!(d.power, Some(3.0));
        assert_eq!(d.name, "Burn");
    }

    #[test]
    fn test_field_update_set_and_clear() {
        let mut d = deck();
        DeckPatch {
            power: Some(FieldUpdate::Clear),
            rank: Some(FieldUpdate::Set(Rank::Tier(RankTier::Meta))),
            ..Default::default()
        }
        .apply(&mut d);
        assert_eq!(d.power, None);
        assert_eq!(d.rank, Some(Rank::Tier(RankTier::Meta)));
    }

    #[test]
    fn test_patch_is_idempotent() {
        let patch = DeckPatch { lives: Some(2), eliminated: Some(false), ..Default::default() };
        let mut once = deck();
        patch.apply(&mut once);
        let mut twice = once.clone();
        patch.apply(&mut twice);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_tournament_patch_clears() {
        let mut state = TournamentState {
            last_champion_owner: Some(PlayerId::from("benja")),
            rounds_played: 3,
            ..Default::default()
        };
        TournamentPatch {
            last_champion_owner: Some(FieldUpdate::Clear),
            rounds_played: Some(0),
            ..Default::default()
        }
        .apply(&mut state);
        assert_eq!(state, TournamentState::default());
    }

    #[test]
    fn test_remaining_after_skips_landed_effects() {
        let intent = Intent::new(
            IntentKind::ResolveMatch,
            vec![
                WriteEffect::IncrementLives { deck_id: DeckId::from("b"), delta: -1 },
                WriteEffect::PatchDeck { deck_id: DeckId::from("b"), patch: DeckPatch::default() },
                WriteEffect::PatchTournament { patch: TournamentPatch::default() },
            ],
        );
        assert!(!intent.is_idempotent());

        let rest = intent.remaining_after(1);
        assert_eq!(rest.len(), 2);
        assert!(rest.is_idempotent());
        assert!(intent.remaining_after(10).is_empty());
    }

    #[test]
    fn test_effect_wire_shape() {
        let effect = WriteEffect::IncrementLives { deck_id: DeckId::from("b"), delta: -1 };
        let value = serde_json::to_value(&effect).unwrap();
        assert_eq!(value, json!({ "op": "increment_lives", "deck_id": "b", "delta": -1 }));

        let patch = DeckPatch { eliminated: Some(true), ..Default::default() };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "eliminated": true }));
    }
}
