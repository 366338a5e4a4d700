//! Raw store documents and their normalization into [`Deck`].
//!
//! Deck documents have accumulated several generations of field names
//! (`name`/`nombre`, `power`/`fuerza`, `ownerUid`/`ownerId`) and loosely
//! typed values. Everything is resolved here, once, so the standings and
//! pairing code only ever sees a canonical [`Deck`]. Text fields are kept as
//! raw JSON and coerced, so a number where a string belongs never fails a
//! whole read.

use chrono::{DateTime, TimeZone, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::types::{Deck, DeckId, PlayerId, Rank, RankTier, CUSTOM_RANK_COLOR, CUSTOM_RANK_LABEL};
use crate::error::{EngineError, EngineResult};

pub const DEFAULT_DECK_NAME: &str = "Deck";

/// Deck document as stored, before normalization
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckRecord {
    pub id: Option<String>,
    pub owner_uid: Option<Value>,
    pub owner_id: Option<Value>,
    pub name: Option<Value>,
    pub nombre: Option<Value>,
    pub power: Option<Value>,
    pub fuerza: Option<Value>,
    pub lives: Option<Value>,
    pub eliminated: Option<Value>,
    pub is_current_champion: Option<Value>,
    pub rango: Option<Value>,
    pub rango_label: Option<Value>,
    pub rango_color: Option<Value>,
    pub updated_at: Option<Value>,
    pub insignia_resolved_url: Option<Value>,
    pub insignia_url: Option<Value>,
}

impl DeckRecord {
    /// Parse a document body whose id lives outside of it
    pub fn from_document(id: &str, body: Value) -> EngineResult<Self> {
        let mut record: DeckRecord = serde_json::from_value(body).map_err(|e| {
            EngineError::MalformedRecord { id: id.to_string(), reason: e.to_string() }
        })?;
        record.id = Some(id.to_string());
        Ok(record)
    }

    /// Canonical fields written back in store shape
    pub fn from_deck(deck: &Deck) -> Self {
        let (rango, rango_label, rango_color) = match &deck.rank {
            Some(Rank::Tier(tier)) => (
                Some(Value::from(tier.key())),
                Some(Value::from(tier.label())),
                Some(Value::from(tier.color())),
            ),
            Some(Rank::Custom { key, label, color }) => (
                Some(Value::from(key.as_str())),
                Some(Value::from(label.as_str())),
                Some(Value::from(color.as_str())),
            ),
            None => (None, None, None),
        };

        Self {
            id: Some(deck.id.0.clone()),
            owner_uid: Some(Value::from(deck.owner.as_str())),
            owner_id: None,
            name: Some(Value::from(deck.name.as_str())),
            nombre: None,
            power: deck.power.map(Value::from),
            fuerza: None,
            lives: Some(Value::from(deck.lives)),
            eliminated: Some(Value::Bool(deck.eliminated)),
            is_current_champion: Some(Value::Bool(deck.is_current_champion)),
            rango,
            rango_label,
            rango_color,
            updated_at: deck.updated_at.map(|t| Value::from(t.timestamp_millis())),
            insignia_resolved_url: deck.image_url.as_deref().map(Value::from),
            insignia_url: None,
        }
    }

    /// `ownerUid`, else `ownerId`, coerced to text
    pub fn owner(&self) -> Option<String> {
        text(self.owner_uid.as_ref()).or_else(|| text(self.owner_id.as_ref()))
    }

    /// Resolve legacy fallbacks into one typed record
    pub fn normalize(&self, starting_lives: i32) -> EngineResult<Deck> {
        let id = self.id.clone().ok_or_else(|| EngineError::MalformedRecord {
            id: "<missing>".to_string(),
            reason: "record has no id".to_string(),
        })?;

        let owner = self.owner().ok_or_else(|| EngineError::MalformedRecord {
            id: id.clone(),
            reason: "record has no owner".to_string(),
        })?;

        let name = text(self.name.as_ref())
            .or_else(|| text(self.nombre.as_ref()))
            .unwrap_or_else(|| DEFAULT_DECK_NAME.to_string());

        let power = self
            .power
            .as_ref()
            .and_then(number)
            .or_else(|| self.fuerza.as_ref().and_then(number));

        let lives = self.lives.as_ref().and_then(integer).unwrap_or(starting_lives);

        Ok(Deck {
            id: DeckId(id),
            owner: PlayerId(owner),
            name,
            power,
            rank: self.rank(),
            lives,
            eliminated: self.eliminated.as_ref().is_some_and(truthy),
            is_current_champion: self.is_current_champion.as_ref().is_some_and(truthy),
            updated_at: self.updated_at.as_ref().and_then(parse_timestamp),
            image_url: text(self.insignia_resolved_url.as_ref())
                .or_else(|| text(self.insignia_url.as_ref())),
        })
    }

    fn rank(&self) -> Option<Rank> {
        let key = text(self.rango.as_ref());
        if let Some(tier) = key.as_deref().and_then(RankTier::from_key) {
            return Some(Rank::Tier(tier));
        }

        let label = text(self.rango_label.as_ref());
        let color = text(self.rango_color.as_ref());
        if label.is_some() || color.is_some() {
            return Some(Rank::Custom {
                key: key.unwrap_or_else(|| "CUSTOM".to_string()),
                label: label.unwrap_or_else(|| CUSTOM_RANK_LABEL.to_string()),
                color: color.unwrap_or_else(|| CUSTOM_RANK_COLOR.to_string()),
            });
        }

        None
    }
}

/// Strings as-is, numbers and booleans by their JSON text. Empty is absent.
fn text(value: Option<&Value>) -> Option<String> {
    let text = match value? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn number(value: &Value) -> Option<f64> {
    value.as_f64().filter(|n| n.is_finite())
}

fn integer(value: &Value) -> Option<i32> {
    let n = value.as_i64().or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))?;
    Some(n.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Accepts epoch milliseconds, RFC 3339 strings and `{seconds, nanoseconds}` objects
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| n.as_f64().map(|f| f as i64))?;
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => DateTime::parse_from_rfc3339(s).ok().map(|t| t.with_timezone(&Utc)),
        Value::Object(map) => {
            let seconds = map.get("seconds").or_else(|| map.get("_seconds"))?.as_i64()?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            Utc.timestamp_opt(seconds, nanos.min(999_999_999) as u32).single()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_legacy_field_fallbacks() {
        let record = DeckRecord::from_document(
            "d1",
            json!({
                "ownerUid": "benja",
                "nombre": "Cementerio de Dragones",
                "fuerza": 7,
                "rango": "META",
            }),
        )
        .unwrap();

        let deck = record.normalize(2).unwrap();
        assert_eq!(deck.id, DeckId::from("d1"));
        assert_eq!(deck.owner, PlayerId::from("benja"));
        assert_eq!(deck.name, "Cementerio de Dragones");
        assert_eq!(deck.power, Some(7.0));
        assert_eq!(deck.rank, Some(Rank::Tier(RankTier::Meta)));
        assert_eq!(deck.lives, 2);
        assert!(!deck.eliminated);
        assert!(!deck.is_current_champion);
    }

    #[test]
    fn test_current_fields_win_over_legacy() {
        let record = DeckRecord::from_document(
            "d1",
            json!({
                "ownerUid": "aure",
                "name": "Burn",
                "nombre": "Quemar",
                "power": 3,
                "fuerza": 9,
            }),
        )
        .unwrap();

        let deck = record.normalize(2).unwrap();
        assert_eq!(deck.name, "Burn");
        assert_eq!(deck.power, Some(3.0));
    }

    #[test]
    fn test_non_numeric_power_is_unranked() {
        let record = DeckRecord::from_document(
            "d1",
            json!({ "ownerUid": "aure", "power": "strong", "fuerza": null }),
        )
        .unwrap();

        let deck = record.normalize(2).unwrap();
        assert_eq!(deck.power, None);
        assert_eq!(deck.name, DEFAULT_DECK_NAME);
    }

    #[test]
    fn test_missing_owner_is_rejected() {
        let record = DeckRecord::from_document("d1", json!({ "name": "Orphan" })).unwrap();
        let err = record.normalize(2).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRecord { ref id, .. } if id == "d1"));
    }

    #[test]
    fn test_custom_rank_from_label_only() {
        let record = DeckRecord::from_document(
            "d1",
            json!({ "ownerUid": "rami", "rango": "LEGACY", "rangoLabel": "Old tier" }),
        )
        .unwrap();

        let deck = record.normalize(2).unwrap();
        assert_eq!(
            deck.rank,
            Some(Rank::Custom {
                key: "LEGACY".to_string(),
                label: "Old tier".to_string(),
                color: CUSTOM_RANK_COLOR.to_string(),
            })
        );
    }

    #[test]
    fn test_truthy_flags_and_timestamps() {
        let record = DeckRecord::from_document(
            "d1",
            json!({
                "ownerUid": "rami",
                "lives": 1,
                "eliminated": 0,
                "isCurrentChampion": "yes",
                "updatedAt": { "seconds": 1_700_000_000, "nanoseconds": 0 },
            }),
        )
        .unwrap();

        let deck = record.normalize(2).unwrap();
        assert_eq!(deck.lives, 1);
        assert!(!deck.eliminated);
        assert!(deck.is_current_champion);
        assert_eq!(deck.updated_at.map(|t| t.timestamp()), Some(1_700_000_000));
    }

    #[test]
    fn test_timestamp_shapes() {
        let millis = parse_timestamp(&json!(1_700_000_000_123i64)).unwrap();
        assert_eq!(millis.timestamp_millis(), 1_700_000_000_123);

        let rfc = parse_timestamp(&json!("2024-03-01T12:00:00Z")).unwrap();
        assert_eq!(rfc.timestamp(), 1_709_294_400);

        assert!(parse_timestamp(&json!(true)).is_none());
        assert!(parse_timestamp(&json!("not a date")).is_none());
    }

    #[test]
    fn test_from_deck_normalizes_back() {
        let deck = Deck::with_id(DeckId::from("d9"), PlayerId::from("benja"), "Spellbook", 1, None)
            .with_power(4.5)
            .with_rank(Rank::Tier(RankTier::Rogue));

        let back = DeckRecord::from_deck(&deck).normalize(2).unwrap();
        assert_eq!(back, deck);
    }

    #[test]
    fn test_loosely_typed_text_fields_are_coerced() {
        let record = DeckRecord::from_document(
            "d1",
            json!({ "ownerUid": 7, "name": 42, "rango": 3, "rangoLabel": true, "insigniaUrl": [] }),
        )
        .unwrap();

        let deck = record.normalize(2).unwrap();
        assert_eq!(deck.owner, PlayerId::from("7"));
        assert_eq!(deck.name, "42");
        assert_eq!(
            deck.rank,
            Some(Rank::Custom {
                key: "3".to_string(),
                label: "true".to_string(),
                color: CUSTOM_RANK_COLOR.to_string(),
            })
        );
        assert_eq!(deck.image_url, None);
    }

    #[test]
    fn test_empty_name_falls_back_to_nombre() {
        let record = DeckRecord::from_document(
            "d1",
            json!({ "ownerId": "aure", "ownerUid": "", "name": "", "nombre": "Quemar" }),
        )
        .unwrap();

        let deck = record.normalize(2).unwrap();
        assert_eq!(deck.owner, PlayerId::from("aure"));
        assert_eq!(deck.name, "Quemar");
    }

    #[test]
    fn test_non_object_document_is_malformed() {
        let err = DeckRecord::from_document("d1", json!(42)).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRecord { ref id, .. } if id == "d1"));
    }
}
