//! # Tournament configuration
//!
//! Roster, opening pair and the rotation threshold are policy, not code.
//! The defaults reproduce the group's current rules:
//!
//! ```rust
//! use survival_core::config::TournamentConfig;
//!
//! let config = TournamentConfig::default();
//! assert_eq!(config.players.len(), 3);
//! assert_eq!(config.starting_lives, 2);
//! ```

use chrono::Duration;
use once_cell::sync::Lazy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::{env, fs};
use thiserror::Error;

use crate::registry::{Player, PlayerId};

pub const CONFIG_PATH_ENV: &str = "SURVIVAL_CONFIG_PATH";

pub static DEFAULT_CONFIG: Lazy<TournamentConfig> = Lazy::new(TournamentConfig::default);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Validation(String),
}

/// The two players whose weakest decks open a cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct OpeningPair {
    pub first: PlayerId,
    pub second: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct TournamentConfig {
    /// Fixed roster; order is the iteration order for every fallback
    pub players: Vec<Player>,
    pub opening_pair: OpeningPair,
    /// Alive players needed before the champion must rotate to a fresh opponent
    pub rotation_min_players: usize,
    pub starting_lives: i32,
    pub duel_window_hours: i64,
    /// Put decks with fewer lives first when picking the weakest challenger
    pub prefer_wounded: bool,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            players: vec![
                Player::new("benja", "Benja"),
                Player::new("aure", "Aure"),
                Player::new("rami", "Rami"),
            ],
            opening_pair: OpeningPair {
                first: PlayerId::from("benja"),
                second: PlayerId::from("aure"),
            },
            rotation_min_players: 3,
            starting_lives: 2,
            duel_window_hours: 7 * 24,
            prefer_wounded: false,
        }
    }
}

impl TournamentConfig {
    /// Power-only challenger order
    pub fn classic() -> Self {
        Self::default()
    }

    /// Wounded decks are sent out first, as the home screen used to do
    pub fn original_app() -> Self {
        Self { prefer_wounded: true, ..Self::default() }
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| p.id == *id)
    }

    pub fn is_roster_player(&self, id: &PlayerId) -> bool {
        self.player(id).is_some()
    }

    /// Display name, falling back to the raw id for unknown players
    pub fn player_name<'a>(&'a self, id: &'a PlayerId) -> &'a str {
        self.player(id).map(|p| p.name.as_str()).unwrap_or(id.as_str())
    }

    pub fn duel_window(&self) -> Duration {
        Duration::hours(self.duel_window_hours)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: TournamentConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        let config: TournamentConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// `.yaml`/`.yml` files are read as YAML, anything else as JSON
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.display().to_string(), source })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&content),
            _ => Self::from_json(&content),
        }
    }

    /// Config named by `SURVIVAL_CONFIG_PATH`, or `None` when unset
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(path) = env::var(CONFIG_PATH_ENV) else {
            return Ok(None);
        };

        let path = path.trim();
        if path.is_empty() {
            return Ok(None);
        }

        Self::from_path(Path::new(path)).map(Some)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.players.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "roster needs at least 2 players, got {}",
                self.players.len()
            )));
        }

        let mut seen = HashSet::new();
        for player in &self.players {
            if !seen.insert(&player.id) {
                return Err(ConfigError::Validation(format!("duplicate player id {}", player.id)));
            }
        }

        let OpeningPair { first, second } = &self.opening_pair;
        if first == second {
            return Err(ConfigError::Validation(format!(
                "opening pair must name two different players, got {} twice",
                first
            )));
        }
        for id in [first, second] {
            if !self.is_roster_player(id) {
                return Err(ConfigError::Validation(format!(
                    "opening player {} is not in the roster",
                    id
                )));
            }
        }

        if self.rotation_min_players < 2 {
            return Err(ConfigError::Validation(format!(
                "rotation_min_players must be >= 2, got {}",
                self.rotation_min_players
            )));
        }
        if self.starting_lives < 1 {
            return Err(ConfigError::Validation(format!(
                "starting_lives must be >= 1, got {}",
                self.starting_lives
            )));
        }
        if self.duel_window_hours <= 0 {
            return Err(ConfigError::Validation(format!(
                "duel_window_hours must be positive, got {}",
                self.duel_window_hours
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = TournamentConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.rotation_min_players, 3);
        assert_eq!(cfg.duel_window(), Duration::days(7));
        assert_eq!(cfg.player_name(&PlayerId::from("aure")), "Aure");
        assert_eq!(cfg.player_name(&PlayerId::from("ghost")), "ghost");
        assert_eq!(*DEFAULT_CONFIG, cfg);
    }

    #[test]
    fn test_presets() {
        assert!(!TournamentConfig::classic().prefer_wounded);
        assert!(TournamentConfig::original_app().prefer_wounded);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = TournamentConfig::from_json(r#"{ "rotation_min_players": 4 }"#).unwrap();
        assert_eq!(cfg.rotation_min_players, 4);
        assert_eq!(cfg.starting_lives, 2);
        assert_eq!(cfg.players.len(), 3);
    }

    #[test]
    fn test_yaml_config() {
        let yaml = r#"
players:
  - { id: p1, name: One }
  - { id: p2, name: Two }
opening_pair: { first: p2, second: p1 }
starting_lives: 3
"#;
        let cfg = TournamentConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.players.len(), 2);
        assert_eq!(cfg.opening_pair.first, PlayerId::from("p2"));
        assert_eq!(cfg.starting_lives, 3);
    }

    #[test]
    fn test_validation_failures() {
        let mut cfg = TournamentConfig::default();
        cfg.opening_pair.second = cfg.opening_pair.first.clone();
        assert!(matches!(cfg.validate(), Err(ConfigError::Validation(_))));

        let mut cfg = TournamentConfig::default();
        cfg.opening_pair.second = PlayerId::from("stranger");
        assert!(cfg.validate().is_err());

        let mut cfg = TournamentConfig::default();
        cfg.players.push(Player::new("benja", "Benja again"));
        assert!(cfg.validate().is_err());

        let mut cfg = TournamentConfig::default();
        cfg.starting_lives = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = TournamentConfig::default();
        cfg.players.truncate(1);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_from_path_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("survival.json");
        let mut f = fs::File::create(&json_path).unwrap();
        write!(f, r#"{{ "prefer_wounded": true }}"#).unwrap();
        assert!(TournamentConfig::from_path(&json_path).unwrap().prefer_wounded);

        let yaml_path = dir.path().join("survival.yaml");
        fs::write(&yaml_path, "duel_window_hours: 48\n").unwrap();
        assert_eq!(TournamentConfig::from_path(&yaml_path).unwrap().duel_window_hours, 48);

        let missing = dir.path().join("missing.json");
        assert!(matches!(TournamentConfig::from_path(&missing), Err(ConfigError::Io { .. })));
    }
}
