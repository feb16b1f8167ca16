//! Scenario loading and configuration.
//!
//! A scenario is a RON file holding the map configuration and optionally a
//! rule set. Rule sets can also be loaded on their own with
//! [`load_rules`].
//!
//! ```ron
//! Scenario(
//!     name: "Crowded duel",
//!     map: MapConfig(
//!         width: 1280,
//!         height: 720,
//!         difficulty: hard,
//!         mode: multiplayer,
//!         seed: 7,
//!     ),
//! )
//! ```

use std::path::Path;

use linkwar_core::error::GameError;
use linkwar_core::map_generation::MapConfig;
use linkwar_core::rules::GameRules;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The rules parsed but are not playable.
    #[error("Invalid rules: {0}")]
    InvalidRules(#[from] GameError),
    /// The map config cannot produce a world.
    #[error("Invalid map: {0}")]
    InvalidMap(GameError),
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    #[serde(default = "default_name")]
    pub name: String,
    /// World to generate.
    #[serde(default)]
    pub map: MapConfig,
    /// Balance constants; defaults when omitted.
    #[serde(default)]
    pub rules: GameRules,
}

fn default_name() -> String {
    "Skirmish".to_string()
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            name: default_name(),
            map: MapConfig::default(),
            rules: GameRules::default(),
        }
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let contents = read_existing(path.as_ref())?;
        Self::from_ron_str(&contents)
    }

    /// Parse a scenario from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = ron::from_str(ron)?;
        scenario.map.validate().map_err(ScenarioError::InvalidMap)?;
        scenario.rules.validate()?;
        Ok(scenario)
    }
}

/// Load a standalone rule set from a RON file.
pub fn load_rules<P: AsRef<Path>>(path: P) -> Result<GameRules, ScenarioError> {
    let contents = read_existing(path.as_ref())?;
    let rules: GameRules = ron::from_str(&contents)?;
    rules.validate()?;
    tracing::info!(path = %path.as_ref().display(), "Loaded rules");
    Ok(rules)
}

fn read_existing(path: &Path) -> Result<String, ScenarioError> {
    if !path.exists() {
        return Err(ScenarioError::FileNotFound(path.display().to_string()));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkwar_core::map_generation::{Difficulty, GameMode};

    #[test]
    fn test_parse_partial_scenario() {
        let scenario = Scenario::from_ron_str(
            r#"(
                name: "Crowded duel",
                map: (width: 1280, height: 720, difficulty: hard, mode: multiplayer, seed: 7),
            )"#,
        )
        .unwrap();
        assert_eq!(scenario.name, "Crowded duel");
        assert_eq!(scenario.map.difficulty, Difficulty::Hard);
        assert_eq!(scenario.map.mode, GameMode::Multiplayer);
        assert_eq!(scenario.rules, GameRules::default());
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let result = Scenario::from_ron_str("(rules: (max_out_degree: 0))");
        assert!(matches!(result, Err(ScenarioError::InvalidRules(_))));
    }

    #[test]
    fn test_oversized_map_rejected() {
        let result = Scenario::from_ron_str("(map: (width: 60000, height: 720, difficulty: easy, mode: singleplayer, seed: 1))");
        assert!(matches!(result, Err(ScenarioError::InvalidMap(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_rules("/definitely/not/here.ron");
        assert!(matches!(result, Err(ScenarioError::FileNotFound(_))));
    }

    #[test]
    fn test_load_rules_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.ron");
        std::fs::write(&path, "(max_out_degree: 3, capture_points: 25)").unwrap();

        let rules = load_rules(&path).unwrap();
        assert_eq!(rules.max_out_degree, 3);
        assert_eq!(rules.capture_points, 25);
        assert_eq!(rules.max_strength, GameRules::default().max_strength);
    }

    #[test]
    fn test_scenario_round_trip_through_ron() {
        let scenario = Scenario::default();
        let text = ron::ser::to_string_pretty(&scenario, ron::ser::PrettyConfig::default()).unwrap();
        assert_eq!(Scenario::from_ron_str(&text).unwrap(), scenario);
    }
}
