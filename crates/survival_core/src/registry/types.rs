use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Player identity (store uid or configured key)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Deck document id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct DeckId(pub String);

impl DeckId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for a deck created by the engine
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeckId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DeckId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Static roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

impl Player {
    pub fn new(id: &str, name: &str) -> Self {
        Self { id: PlayerId::from(id), name: name.to_string() }
    }
}

/// Six-step deck tier scale, low to high
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RankTier {
    Fun,
    FunElite,
    Rogue,
    RogueElite,
    Meta,
    Dominante,
}

impl RankTier {
    pub const ALL: [RankTier; 6] = [
        RankTier::Fun,
        RankTier::FunElite,
        RankTier::Rogue,
        RankTier::RogueElite,
        RankTier::Meta,
        RankTier::Dominante,
    ];

    /// Store key (`rango` field)
    pub fn key(&self) -> &'static str {
        match self {
            RankTier::Fun => "FUN",
            RankTier::FunElite => "FUN_ELITE",
            RankTier::Rogue => "ROGUE",
            RankTier::RogueElite => "ROGUE_ELITE",
            RankTier::Meta => "META",
            RankTier::Dominante => "DOMINANTE",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RankTier::Fun => "FUN",
            RankTier::FunElite => "FUN ELITE",
            RankTier::Rogue => "ROGUE",
            RankTier::RogueElite => "ROGUE ELITE",
            RankTier::Meta => "META",
            RankTier::Dominante => "DOMINANTE",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            RankTier::Fun => "#FF4D4D",
            RankTier::FunElite => "#FF8A3D",
            RankTier::Rogue => "#FFD166",
            RankTier::RogueElite => "#2ED47A",
            RankTier::Meta => "#2DA8FF",
            RankTier::Dominante => "#8B5CF6",
        }
    }

    /// 0 (FUN) ..= 5 (DOMINANTE)
    pub fn score(&self) -> u8 {
        *self as u8
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.key() == key)
    }
}

pub const CUSTOM_RANK_LABEL: &str = "Rango";
pub const CUSTOM_RANK_COLOR: &str = "#6B7280";

/// Display tier of a deck. Never used for pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Rank {
    Tier(RankTier),
    Custom { key: String, label: String, color: String },
}

impl Rank {
    pub fn label(&self) -> &str {
        match self {
            Rank::Tier(tier) => tier.label(),
            Rank::Custom { label, .. } => label,
        }
    }

    pub fn color(&self) -> &str {
        match self {
            Rank::Tier(tier) => tier.color(),
            Rank::Custom { color, .. } => color,
        }
    }

    pub fn tier(&self) -> Option<RankTier> {
        match self {
            Rank::Tier(tier) => Some(*tier),
            Rank::Custom { .. } => None,
        }
    }
}

/// Canonical deck record, produced by normalization at the registry boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Deck {
    pub id: DeckId,
    pub owner: PlayerId,
    pub name: String,
    /// `None` means unranked; sorts after every rated deck
    pub power: Option<f64>,
    pub rank: Option<Rank>,
    pub lives: i32,
    pub eliminated: bool,
    pub is_current_champion: bool,
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl Deck {
    /// New deck entering the tournament with a fresh id
    pub fn create(owner: PlayerId, name: &str, starting_lives: i32, now: DateTime<Utc>) -> Self {
        Self::with_id(DeckId::generate(), owner, name, starting_lives, Some(now))
    }

    pub fn with_id(
        id: DeckId,
        owner: PlayerId,
        name: &str,
        lives: i32,
        updated_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            owner,
            name: name.to_string(),
            power: None,
            rank: None,
            lives,
            eliminated: false,
            is_current_champion: false,
            updated_at,
            image_url: None,
        }
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = Some(power).filter(|p| p.is_finite());
        self
    }

    pub fn with_rank(mut self, rank: Rank) -> Self {
        self.rank = Some(rank);
        self
    }

    /// `lives <= 0` wins over a stale `eliminated == false`
    pub fn is_alive(&self) -> bool {
        self.lives > 0 && !self.eliminated
    }

    /// Flag is set and the deck can still fight
    pub fn is_flagged_champion(&self) -> bool {
        self.is_current_champion && self.is_alive()
    }
}
