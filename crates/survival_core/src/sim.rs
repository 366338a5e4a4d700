//! Seeded dry run of a whole tournament.
//!
//! Pairings and resolutions come from the engine; only the winner of each
//! fight is drawn from the RNG. Same snapshot and seed, same tournament.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::TournamentConfig;
use crate::error::EngineResult;
use crate::registry::{DeckId, PlayerId};
use crate::snapshot::Snapshot;
use crate::tournament::{
    compute_next_pairing, compute_standings, detect_anomalies, resolve_match, Anomaly,
    PairingRule, StandingsSummary,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatedMatch {
    pub round: u32,
    pub winner: DeckId,
    pub loser: DeckId,
    pub rule: PairingRule,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationReport {
    pub seed: u64,
    pub matches: Vec<SimulatedMatch>,
    /// Anomalies seen after any match; empty on a healthy run
    pub anomalies: Vec<Anomaly>,
    pub standings: StandingsSummary,
    pub final_snapshot: Snapshot,
}

impl SimulationReport {
    /// Last player standing, if the run went to completion
    pub fn survivor(&self) -> Option<&PlayerId> {
        match self.standings.alive_players.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }
}

pub fn simulate_tournament(
    mut snapshot: Snapshot,
    config: &TournamentConfig,
    seed: u64,
    start: DateTime<Utc>,
) -> EngineResult<SimulationReport> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut matches = Vec::new();
    let mut anomalies = Vec::new();

    // Every match removes one life, so the pool's lives bound the run
    let max_rounds: i64 = snapshot.decks.all_decks().map(|d| d.lives.max(0) as i64).sum();

    while let Some(pairing) = compute_next_pairing(&snapshot, config).pairing().cloned() {
        if matches.len() as i64 >= max_rounds {
            warn!("Simulation stopped after {} rounds without finishing", matches.len());
            break;
        }

        let winner = if rng.gen_bool(0.5) { &pairing.first.id } else { &pairing.second.id };
        let report = pairing.report(winner)?;
        let now = start + Duration::minutes(pairing.round as i64);

        let intent = resolve_match(&snapshot, &report, now)?;
        snapshot.apply_intent(&intent)?;

        debug!("Simulated round {}: {} beats {}", report.round, report.winner, report.loser);
        anomalies.extend(detect_anomalies(&snapshot, config));
        matches.push(SimulatedMatch {
            round: report.round,
            winner: report.winner,
            loser: report.loser,
            rule: pairing.rule,
        });
    }

    let standings = compute_standings(&snapshot.decks, config);
    info!(
        "Simulation (seed {}) finished after {} matches, {} players standing",
        seed,
        matches.len(),
        standings.alive_players.len()
    );

    Ok(SimulationReport { seed, matches, anomalies, standings, final_snapshot: snapshot })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Deck, DeckRegistry};
    use crate::tournament::TournamentState;
    use chrono::TimeZone;

    fn pool() -> Snapshot {
        let mut decks = Vec::new();
        for owner in ["benja", "aure", "rami"] {
            for (i, power) in [5.0, 3.0, 8.0].into_iter().enumerate() {
                let id = format!("{}-{}", owner, i);
                decks.push(
                    Deck::with_id(DeckId::new(id.clone()), PlayerId::from(owner), &id, 2, None)
                        .with_power(power),
                );
            }
        }
        Snapshot::new(DeckRegistry::from_decks(decks), TournamentState::default())
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_simulation_runs_to_a_single_survivor() {
        let config = TournamentConfig::default();
        let report = simulate_tournament(pool(), &config, 42, start()).unwrap();

        assert!(report.anomalies.is_empty(), "anomalies: {:?}", report.anomalies);
        assert!(report.survivor().is_some());
        assert_eq!(report.final_snapshot.tournament.rounds_played as usize, report.matches.len());

        for deck in report.final_snapshot.decks.all_decks() {
            assert!((0..=2).contains(&deck.lives));
            if deck.lives == 0 {
                assert!(deck.eliminated);
            }
        }
    }

    #[test]
    fn test_simulation_is_deterministic_per_seed() {
        let config = TournamentConfig::default();
        let a = simulate_tournament(pool(), &config, 7, start()).unwrap();
        let b = simulate_tournament(pool(), &config, 7, start()).unwrap();
        assert_eq!(a.matches, b.matches);
        assert_eq!(a.final_snapshot, b.final_snapshot);
    }

    #[test]
    fn test_first_match_is_the_opening_pair() {
        let config = TournamentConfig::default();
        let report = simulate_tournament(pool(), &config, 1, start()).unwrap();
        let first = &report.matches[0];
        assert_eq!(first.rule, PairingRule::Opening);
        assert_eq!(first.round, 1);
    }
}
