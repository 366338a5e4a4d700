use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::config::TournamentConfig;
use crate::registry::{Deck, DeckId, DeckRegistry, Player, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum StrengthOrder {
    Ascending,
    Descending,
}

/// Read-only view of a deck pool under a roster.
///
/// Decks whose owner is not on the roster are invisible here.
#[derive(Debug, Clone, Copy)]
pub struct Standings<'a> {
    decks: &'a DeckRegistry,
    config: &'a TournamentConfig,
}

impl<'a> Standings<'a> {
    pub fn new(decks: &'a DeckRegistry, config: &'a TournamentConfig) -> Self {
        Self { decks, config }
    }

    pub fn config(&self) -> &'a TournamentConfig {
        self.config
    }

    fn roster_decks(&self) -> impl Iterator<Item = &'a Deck> + 'a {
        let config = self.config;
        self.decks.all_decks().filter(move |deck| config.is_roster_player(&deck.owner))
    }

    pub fn alive_decks(&self) -> Vec<&'a Deck> {
        self.roster_decks().filter(|deck| deck.is_alive()).collect()
    }

    /// Every roster player, zero included
    pub fn alive_count_by_player(&self) -> BTreeMap<PlayerId, usize> {
        let mut counts: BTreeMap<PlayerId, usize> =
            self.config.players.iter().map(|p| (p.id.clone(), 0)).collect();
        for deck in self.alive_decks() {
            if let Some(count) = counts.get_mut(&deck.owner) {
                *count += 1;
            }
        }
        counts
    }

    /// Sole leader by alive decks; any tie at the top (all-zero too) is `None`
    pub fn advantage(&self) -> Option<PlayerId> {
        let counts = self.alive_count_by_player();
        let max = counts.values().copied().max()?;
        let mut leaders = counts.iter().filter(|(_, count)| **count == max);
        match (leaders.next(), leaders.next()) {
            (Some((player, _)), None) if max > 0 => Some(player.clone()),
            _ => None,
        }
    }

    /// All of the player's decks, unranked last in both directions
    pub fn ordered_by_strength(&self, player: &PlayerId, order: StrengthOrder) -> Vec<&'a Deck> {
        let mut decks: Vec<&Deck> = self.decks.decks_of(player).collect();
        decks.sort_by(|a, b| compare_strength(a, b, order));
        decks
    }

    /// Next challenger from the player's pool
    pub fn weakest_alive(&self, player: &PlayerId) -> Option<&'a Deck> {
        let prefer_wounded = self.config.prefer_wounded;
        self.decks.decks_of(player).filter(|deck| deck.is_alive()).min_by(|a, b| {
            let wounded = if prefer_wounded { a.lives.cmp(&b.lives) } else { Ordering::Equal };
            wounded.then_with(|| compare_strength(a, b, StrengthOrder::Ascending))
        })
    }

    /// Roster players with at least one alive deck, in roster order
    pub fn alive_players(&self) -> Vec<&'a Player> {
        self.config
            .players
            .iter()
            .filter(|player| self.decks.decks_of(&player.id).any(Deck::is_alive))
            .collect()
    }

    /// Alive flagged deck with the latest `updatedAt`; ties go to the lowest id
    pub fn champion(&self) -> Option<&'a Deck> {
        self.roster_decks().filter(|deck| deck.is_flagged_champion()).max_by(|a, b| {
            a.updated_at.cmp(&b.updated_at).then_with(|| b.id.cmp(&a.id))
        })
    }

    pub fn summary(&self) -> StandingsSummary {
        StandingsSummary {
            alive_count_by_player: self.alive_count_by_player(),
            advantage: self.advantage(),
            champion: self.champion().map(|deck| deck.id.clone()),
            alive_players: self.alive_players().into_iter().map(|p| p.id.clone()).collect(),
            alive_decks: self.alive_decks().len(),
        }
    }
}

/// Power ascending/descending, then name, then id
pub fn compare_strength(a: &Deck, b: &Deck, order: StrengthOrder) -> Ordering {
    let power = match (a.power, b.power) {
        (Some(x), Some(y)) => match order {
            StrengthOrder::Ascending => x.total_cmp(&y),
            StrengthOrder::Descending => y.total_cmp(&x),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    power.then_with(|| a.name.cmp(&b.name)).then_with(|| a.id.cmp(&b.id))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct StandingsSummary {
    pub alive_count_by_player: BTreeMap<PlayerId, usize>,
    pub advantage: Option<PlayerId>,
    pub champion: Option<DeckId>,
    pub alive_players: Vec<PlayerId>,
    pub alive_decks: usize,
}

pub fn compute_standings(decks: &DeckRegistry, config: &TournamentConfig) -> StandingsSummary {
    Standings::new(decks, config).summary()
}
