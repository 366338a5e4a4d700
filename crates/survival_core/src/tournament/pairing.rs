//! Pairing engine: who fights next.
//!
//! Winner stays on. Without a champion the configured opening pair sends
//! out their weakest decks; with one, the champion faces the weakest alive
//! deck of a challenger, rotating away from the last opponent once enough
//! players are still alive.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resolution::MatchReport;
use super::standings::Standings;
use crate::config::TournamentConfig;
use crate::error::{EngineError, EngineResult};
use crate::registry::{Deck, DeckId, PlayerId};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PairingState {
    NoChampion,
    ChampionActive,
    /// Fewer than two players have an alive deck
    Unresolvable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PairingRule {
    Opening,
    OpeningFallback,
    Rotation,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pairing {
    /// Champion side when there is a champion
    pub first: Deck,
    pub second: Deck,
    pub rule: PairingRule,
    pub note: String,
    /// Round a report for this fight must carry
    pub round: u32,
}

impl Pairing {
    /// Build the report for a declared winner of this fight
    pub fn report(&self, winner: &DeckId) -> EngineResult<MatchReport> {
        let loser = if *winner == self.first.id {
            &self.second.id
        } else if *winner == self.second.id {
            &self.first.id
        } else {
            return Err(EngineError::NotInPairing { deck: winner.clone() });
        };

        Ok(MatchReport { winner: winner.clone(), loser: loser.clone(), round: self.round })
    }

    pub fn involves(&self, deck: &DeckId) -> bool {
        self.first.id == *deck || self.second.id == *deck
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NextPairing {
    Fight(Pairing),
    NotEnoughDecks,
}

impl NextPairing {
    pub fn pairing(&self) -> Option<&Pairing> {
        match self {
            NextPairing::Fight(pairing) => Some(pairing),
            NextPairing::NotEnoughDecks => None,
        }
    }
}

pub fn pairing_state(standings: &Standings) -> PairingState {
    if standings.alive_players().len() < 2 {
        PairingState::Unresolvable
    } else if standings.champion().is_some() {
        PairingState::ChampionActive
    } else {
        PairingState::NoChampion
    }
}

/// Owner the champion just beat, from the tournament record or else from
/// the most recently touched deck of another roster player.
///
/// The record's owner fields win; without them the owners of the stored
/// deck ids are looked up, which only works while those decks exist.
pub fn previous_opponent(
    snapshot: &Snapshot,
    standings: &Standings,
    champion: &Deck,
) -> Option<PlayerId> {
    let tournament = &snapshot.tournament;
    let owner_of = |owner: &Option<PlayerId>, deck: &Option<DeckId>| {
        owner.clone().or_else(|| {
            let id = deck.as_ref()?;
            snapshot.decks.by_id(id).map(|d| d.owner.clone())
        })
    };
    let last_champion = owner_of(&tournament.last_champion_owner, &tournament.last_champion_id);
    let last_opponent = owner_of(&tournament.last_opponent_owner, &tournament.last_opponent_id);

    if last_champion.as_ref() == Some(&champion.owner) {
        if let Some(opponent) = last_opponent {
            if opponent != champion.owner {
                return Some(opponent);
            }
        }
    }

    let config = standings.config();
    snapshot
        .decks
        .all_decks()
        .filter(|deck| deck.owner != champion.owner && config.is_roster_player(&deck.owner))
        .filter_map(|deck| deck.updated_at.map(|at| (at, deck)))
        .max_by(|(ta, a), (tb, b)| ta.cmp(tb).then_with(|| b.id.cmp(&a.id)))
        .map(|(_, deck)| deck.owner.clone())
}

pub fn compute_next_pairing(snapshot: &Snapshot, config: &TournamentConfig) -> NextPairing {
    let standings = Standings::new(&snapshot.decks, config);
    let round = snapshot.tournament.next_round();

    let next = match pairing_state(&standings) {
        PairingState::Unresolvable => None,
        PairingState::NoChampion => opening_pairing(&standings, round),
        PairingState::ChampionActive => champion_pairing(snapshot, &standings, round),
    };

    match next {
        Some(pairing) => {
            debug!(
                "Next pairing ({:?}, round {}): {} vs {}",
                pairing.rule, pairing.round, pairing.first.id, pairing.second.id
            );
            NextPairing::Fight(pairing)
        }
        None => {
            debug!("No pairing available: fewer than two players with alive decks");
            NextPairing::NotEnoughDecks
        }
    }
}

fn opening_pairing(standings: &Standings, round: u32) -> Option<Pairing> {
    let config = standings.config();
    let opening = &config.opening_pair;

    if let (Some(first), Some(second)) =
        (standings.weakest_alive(&opening.first), standings.weakest_alive(&opening.second))
    {
        return Some(Pairing {
            first: first.clone(),
            second: second.clone(),
            rule: PairingRule::Opening,
            note: format!(
                "Inicio: {} vs {}",
                config.player_name(&opening.first),
                config.player_name(&opening.second)
            ),
            round,
        });
    }

    let players = standings.alive_players();
    let (p1, p2) = (players.first()?, players.get(1)?);
    let first = standings.weakest_alive(&p1.id)?;
    let second = standings.weakest_alive(&p2.id)?;

    Some(Pairing {
        first: first.clone(),
        second: second.clone(),
        rule: PairingRule::OpeningFallback,
        note: "Inicio".to_string(),
        round,
    })
}

fn champion_pairing(snapshot: &Snapshot, standings: &Standings, round: u32) -> Option<Pairing> {
    let config = standings.config();
    let champion = standings.champion()?;
    let alive_players = standings.alive_players();
    let challengers: Vec<_> =
        alive_players.iter().filter(|player| player.id != champion.owner).collect();

    let rotated = if alive_players.len() >= config.rotation_min_players {
        previous_opponent(snapshot, standings, champion)
            .and_then(|prev| challengers.iter().find(|player| player.id != prev))
    } else {
        None
    };

    let (challenger, rule) = match rotated {
        Some(player) => (player, PairingRule::Rotation),
        None => (challengers.first()?, PairingRule::Fallback),
    };
    let opponent = standings.weakest_alive(&challenger.id)?;

    Some(Pairing {
        first: champion.clone(),
        second: opponent.clone(),
        rule,
        note: format!(
            "Ganador sigue: {} vs {}",
            config.player_name(&champion.owner),
            challenger.name
        ),
        round,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::DeckRegistry;
    use crate::tournament::TournamentState;
    use chrono::{Duration, TimeZone, Utc};

    fn deck(id: &str, owner: &str, power: f64) -> Deck {
        Deck::with_id(DeckId::from(id), PlayerId::from(owner), id, 2, None).with_power(power)
    }

    fn opening_pool() -> Vec<Deck> {
        let mut decks = Vec::new();
        for owner in ["benja", "aure", "rami"] {
            for power in [5.0, 3.0, 8.0] {
                decks.push(deck(&format!("{}-{}", owner, power), owner, power));
            }
        }
        decks
    }

    fn snapshot(decks: Vec<Deck>, tournament: TournamentState) -> Snapshot {
        Snapshot::new(DeckRegistry::from_decks(decks), tournament)
    }

    fn crown(decks: &mut [Deck], id: &str) {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();
        for d in decks.iter_mut().filter(|d| d.id.as_str() == id) {
            d.is_current_champion = true;
            d.updated_at = Some(t);
        }
    }

    #[test]
    fn test_opening_pairs_weakest_of_opening_players() {
        let config = TournamentConfig::default();
        let snap = snapshot(opening_pool(), TournamentState::default());

        let next = compute_next_pairing(&snap, &config);
        let pairing = next.pairing().unwrap();
        assert_eq!(pairing.first.id.as_str(), "benja-3");
        assert_eq!(pairing.second.id.as_str(), "aure-3");
        assert_eq!(pairing.rule, PairingRule::Opening);
        assert_eq!(pairing.note, "Inicio: Benja vs Aure");
        assert_eq!(pairing.round, 1);

        assert_eq!(compute_next_pairing(&snap, &config), next);
    }

    #[test]
    fn test_opening_falls_back_to_first_two_alive_players() {
        let config = TournamentConfig::default();
        let decks = vec![deck("b1", "benja", 4.0), deck("r1", "rami", 2.0), deck("r2", "rami", 1.0)];
        let snap = snapshot(decks, TournamentState::default());

        let next = compute_next_pairing(&snap, &config);
        let pairing = next.pairing().unwrap();
        assert_eq!(pairing.rule, PairingRule::OpeningFallback);
        assert_eq!(pairing.first.id.as_str(), "b1");
        assert_eq!(pairing.second.id.as_str(), "r2");
        assert_eq!(pairing.note, "Inicio");
    }

    #[test]
    fn test_not_enough_decks() {
        let config = TournamentConfig::default();
        let empty = snapshot(vec![], TournamentState::default());
        assert_eq!(compute_next_pairing(&empty, &config), NextPairing::NotEnoughDecks);

        let one_player = snapshot(
            vec![deck("b1", "benja", 1.0), deck("b2", "benja", 2.0)],
            TournamentState::default(),
        );
        assert_eq!(compute_next_pairing(&one_player, &config), NextPairing::NotEnoughDecks);
    }

    #[test]
    fn test_rotation_avoids_immediate_rematch() {
        let config = TournamentConfig::default();
        let mut decks = opening_pool();
        crown(&mut decks, "benja-3");
        let tournament = TournamentState {
            last_champion_owner: Some(PlayerId::from("benja")),
            last_opponent_owner: Some(PlayerId::from("aure")),
            rounds_played: 1,
            ..Default::default()
        };
        let snap = snapshot(decks, tournament);

        let next = compute_next_pairing(&snap, &config);
        let pairing = next.pairing().unwrap();
        assert_eq!(pairing.first.id.as_str(), "benja-3");
        assert_eq!(pairing.second.owner, PlayerId::from("rami"));
        assert_eq!(pairing.second.id.as_str(), "rami-3");
        assert_eq!(pairing.rule, PairingRule::Rotation);
        assert_eq!(pairing.note, "Ganador sigue: Benja vs Rami");
        assert_eq!(pairing.round, 2);
    }

    #[test]
    fn test_rotation_from_deck_ids_only() {
        let config = TournamentConfig::default();
        let mut decks = opening_pool();
        crown(&mut decks, "benja-3");
        let tournament = TournamentState::from_document(&serde_json::json!({
            "lastChampionId": "benja-3",
            "lastOpponentId": "aure-3",
            "roundsPlayed": 1,
        }))
        .unwrap();
        let snap = snapshot(decks, tournament);
        let standings = Standings::new(&snap.decks, &config);

        assert_eq!(
            previous_opponent(&snap, &standings, standings.champion().unwrap()),
            Some(PlayerId::from("aure"))
        );
        let next = compute_next_pairing(&snap, &config);
        let pairing = next.pairing().unwrap();
        assert_eq!(pairing.rule, PairingRule::Rotation);
        assert_eq!(pairing.second.owner, PlayerId::from("rami"));
    }

    #[test]
    fn test_owner_fields_win_over_deck_ids() {
        let config = TournamentConfig::default();
        let mut decks = opening_pool();
        crown(&mut decks, "benja-3");
        let tournament = TournamentState {
            last_champion_id: Some(DeckId::from("benja-3")),
            last_opponent_id: Some(DeckId::from("aure-3")),
            last_champion_owner: Some(PlayerId::from("benja")),
            last_opponent_owner: Some(PlayerId::from("rami")),
            rounds_played: 1,
            ..Default::default()
        };
        let snap = snapshot(decks, tournament);

        let next = compute_next_pairing(&snap, &config);
        assert_eq!(next.pairing().unwrap().second.owner, PlayerId::from("aure"));
    }

    #[test]
    fn test_previous_opponent_inferred_from_recent_updates() {
        let config = TournamentConfig::default();
        let mut decks = opening_pool();
        crown(&mut decks, "aure-5");
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 20, 0, 0).unwrap();
        for d in decks.iter_mut() {
            if d.id.as_str() == "benja-3" {
                d.updated_at = Some(t);
            }
            if d.id.as_str() == "rami-8" {
                d.updated_at = Some(t - Duration::days(2));
            }
        }
        let snap = snapshot(decks, TournamentState::default());
        let standings = Standings::new(&snap.decks, &config);
        let champion = standings.champion().unwrap();

        assert_eq!(previous_opponent(&snap, &standings, champion), Some(PlayerId::from("benja")));
        let pairing = compute_next_pairing(&snap, &config);
        assert_eq!(pairing.pairing().unwrap().second.owner, PlayerId::from("rami"));
    }

    #[test]
    fn test_two_players_left_uses_fallback() {
        let config = TournamentConfig::default();
        let mut decks = vec![deck("b1", "benja", 4.0), deck("a1", "aure", 6.0), deck("a2", "aure", 2.0)];
        crown(&mut decks, "b1");
        let tournament = TournamentState {
            last_champion_owner: Some(PlayerId::from("benja")),
            last_opponent_owner: Some(PlayerId::from("aure")),
            ..Default::default()
        };
        let snap = snapshot(decks, tournament);

        let pairing = compute_next_pairing(&snap, &config);
        let pairing = pairing.pairing().unwrap();
        assert_eq!(pairing.rule, PairingRule::Fallback);
        assert_eq!(pairing.second.id.as_str(), "a2");
    }

    #[test]
    fn test_eliminated_champion_flag_means_no_champion() {
        let config = TournamentConfig::default();
        let mut decks = opening_pool();
        crown(&mut decks, "rami-8");
        for d in decks.iter_mut().filter(|d| d.id.as_str() == "rami-8") {
            d.lives = 0;
            d.eliminated = true;
        }
        let snap = snapshot(decks, TournamentState::default());

        let standings = Standings::new(&snap.decks, &config);
        assert_eq!(pairing_state(&standings), PairingState::NoChampion);
        assert_eq!(compute_next_pairing(&snap, &config).pairing().unwrap().rule, PairingRule::Opening);
    }

    #[test]
    fn test_report_from_pairing() {
        let config = TournamentConfig::default();
        let snap = snapshot(opening_pool(), TournamentState::default());
        let next = compute_next_pairing(&snap, &config);
        let pairing = next.pairing().unwrap();

        let report = pairing.report(&DeckId::from("aure-3")).unwrap();
        assert_eq!(report.loser, DeckId::from("benja-3"));
        assert_eq!(report.round, 1);
        assert!(matches!(
            pairing.report(&DeckId::from("rami-3")),
            Err(EngineError::NotInPairing { .. })
        ));
    }
}
