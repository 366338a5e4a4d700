use chrono::{DateTime, Duration, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::registry::{parse_timestamp, DeckId, PlayerId};

/// Store path of the tournament singleton
pub const TOURNAMENT_DOC_ID: &str = "survival_extra_life";

/// Singleton tournament record
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct TournamentState {
    pub last_champion_id: Option<DeckId>,
    pub last_opponent_id: Option<DeckId>,
    #[serde(alias = "lastChampionUid")]
    pub last_champion_owner: Option<PlayerId>,
    #[serde(alias = "lastOpponentUid")]
    pub last_opponent_owner: Option<PlayerId>,
    /// Resolved matches in the current cycle
    pub rounds_played: u32,
    pub deadline_at: Option<DateTime<Utc>>,
}

impl TournamentState {
    /// Read a stored document. Timestamps may be millis, RFC 3339 or
    /// `{seconds, nanoseconds}`; unknown fields are ignored.
    pub fn from_document(body: &Value) -> EngineResult<Self> {
        let Value::Object(map) = body else {
            if body.is_null() {
                return Ok(Self::default());
            }
            return Err(EngineError::MalformedRecord {
                id: TOURNAMENT_DOC_ID.to_string(),
                reason: "tournament document is not an object".to_string(),
            });
        };

        let id = |keys: &[&str]| {
            keys.iter()
                .filter_map(|k| map.get(*k))
                .find_map(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let rounds_played = map
            .get("roundsPlayed")
            .and_then(Value::as_u64)
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0);

        Ok(Self {
            last_champion_id: id(&["lastChampionId"]).map(DeckId),
            last_opponent_id: id(&["lastOpponentId"]).map(DeckId),
            last_champion_owner: id(&["lastChampionOwner", "lastChampionUid"]).map(PlayerId),
            last_opponent_owner: id(&["lastOpponentOwner", "lastOpponentUid"]).map(PlayerId),
            rounds_played,
            deadline_at: map.get("deadlineAt").and_then(parse_timestamp),
        })
    }

    /// Round number the next resolution must carry
    pub fn next_round(&self) -> u32 {
        self.rounds_played.saturating_add(1)
    }

    /// Time left on the duel timer, floored at zero. `None` when no timer runs.
    pub fn remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.deadline_at.map(|deadline| (deadline - now).max(Duration::zero()))
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.deadline_at.is_some_and(|deadline| deadline <= now)
    }
}

/// `3d 04h 05m 06s`
pub fn format_countdown(remaining: Duration) -> String {
    let total = remaining.num_seconds().max(0);
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let mins = (total % 3_600) / 60;
    let secs = total % 60;
    format!("{}d {:02}h {:02}m {:02}s", days, hours, mins, secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_document_accepts_uid_fields() {
        let state = TournamentState::from_document(&json!({
            "lastChampionUid": "benja",
            "lastOpponentUid": "aure",
            "deadlineAt": 1_700_000_000_000i64,
            "somethingElse": true,
        }))
        .unwrap();

        assert_eq!(state.last_champion_owner, Some(PlayerId::from("benja")));
        assert_eq!(state.last_opponent_owner, Some(PlayerId::from("aure")));
        assert_eq!(state.last_champion_id, None);
        assert_eq!(state.rounds_played, 0);
        assert_eq!(state.deadline_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_missing_document_is_fresh_state() {
        assert_eq!(TournamentState::from_document(&Value::Null).unwrap(), TournamentState::default());
        assert!(TournamentState::from_document(&json!("oops")).is_err());
    }

    #[test]
    fn test_serde_alias_reads_legacy_names() {
        let state: TournamentState =
            serde_json::from_value(json!({ "lastChampionUid": "rami", "roundsPlayed": 4 })).unwrap();
        assert_eq!(state.last_champion_owner, Some(PlayerId::from("rami")));
        assert_eq!(state.next_round(), 5);
    }

    #[test]
    fn test_remaining_is_floored_at_zero() {
        let now = Utc::now();
        let mut state = TournamentState::default();
        assert_eq!(state.remaining(now), None);
        assert!(!state.is_expired(now));

        state.deadline_at = Some(now - Duration::minutes(5));
        assert_eq!(state.remaining(now), Some(Duration::zero()));
        assert!(state.is_expired(now));

        state.deadline_at = Some(now + Duration::hours(2));
        assert_eq!(state.remaining(now), Some(Duration::hours(2)));
    }

    #[test]
    fn test_format_countdown() {
        let d = Duration::days(3) + Duration::hours(4) + Duration::minutes(5) + Duration::seconds(6);
        assert_eq!(format_countdown(d), "3d 04h 05m 06s");
        assert_eq!(format_countdown(Duration::zero()), "0d 00h 00m 00s");
        assert_eq!(format_countdown(Duration::seconds(-30)), "0d 00h 00m 00s");
        assert_eq!(format_countdown(Duration::days(7)), "7d 00h 00m 00s");
    }
}
