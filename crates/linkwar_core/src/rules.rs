//! Tunable game rules.
//!
//! Every balance constant of the simulation lives in [`GameRules`] so that
//! headless runs can swap rule sets from RON files without recompiling.
//! Fixed-point fields use the raw-bit encoding from [`fixed_serde`].
//!
//! # Example RON
//!
//! ```ron
//! GameRules(
//!     max_strength: 85899345920,     // Fixed-point for 20.0
//!     initial_strength: 42949672960, // Fixed-point for 10.0
//!     max_out_degree: 3,
//!     ..
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};
use crate::math::{fixed_serde, Fixed};

/// Simulation ticks per second of game time.
///
/// The engine is stepped once per displayed frame.
pub const TICK_RATE: u32 = 60;

/// Balance constants for one game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameRules {
    /// Strength ceiling of every tower.
    #[serde(with = "fixed_serde")]
    pub max_strength: Fixed,
    /// Strength of freshly generated towers.
    #[serde(with = "fixed_serde")]
    pub initial_strength: Fixed,
    /// Strength a source always keeps back when sending.
    #[serde(with = "fixed_serde")]
    pub reserve_strength: Fixed,
    /// Extra headroom above the reserve required before a unit is sent.
    #[serde(with = "fixed_serde")]
    pub send_margin: Fixed,
    /// Strength deducted from the source for each unit sent.
    #[serde(with = "fixed_serde")]
    pub send_cost: Fixed,
    /// Progress a unit makes along its connection per tick.
    #[serde(with = "fixed_serde")]
    pub unit_speed: Fixed,
    /// Damage dealt by an arriving attack unit.
    #[serde(with = "fixed_serde")]
    pub attack_power: Fixed,
    /// Strength added by an arriving support unit.
    #[serde(with = "fixed_serde")]
    pub support_power: Fixed,
    /// Passive strength regained per tick.
    #[serde(with = "fixed_serde")]
    pub recovery_rate: Fixed,
    /// Recovery multiplier while support is incoming.
    pub support_recovery_multiplier: i32,
    /// Strength a tower is reset to when captured.
    #[serde(with = "fixed_serde")]
    pub capture_strength: Fixed,
    /// Points awarded to a human player per capture.
    pub capture_points: u32,
    /// Maximum outgoing connections per tower.
    pub max_out_degree: usize,
    /// Ticks between AI decisions.
    pub ai_interval_ticks: u64,
    /// AI towers only attack above this fraction of max strength.
    #[serde(with = "fixed_serde")]
    pub ai_strength_fraction: Fixed,
    /// Ticks a removed connection stays restorable.
    pub undo_window_ticks: u64,
    /// Tower hit and placement radius.
    #[serde(with = "fixed_serde")]
    pub tower_radius: Fixed,
    /// Extra clearance between placed towers.
    #[serde(with = "fixed_serde")]
    pub placement_margin: Fixed,
    /// Edge length of the square obstacles.
    #[serde(with = "fixed_serde")]
    pub obstacle_size: Fixed,
    /// Horizontal distance of the starting towers from the canvas edges.
    #[serde(with = "fixed_serde")]
    pub start_edge_offset: Fixed,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_strength: Fixed::from_num(20),
            initial_strength: Fixed::from_num(10),
            reserve_strength: Fixed::from_num(1),
            send_margin: Fixed::from_num(0.5),
            send_cost: Fixed::from_num(0.1),
            unit_speed: Fixed::from_num(0.01),
            attack_power: Fixed::from_num(1),
            support_power: Fixed::from_num(1),
            recovery_rate: Fixed::from_num(0.01),
            support_recovery_multiplier: 2,
            capture_strength: Fixed::from_num(1),
            capture_points: 10,
            max_out_degree: 2,
            ai_interval_ticks: 2 * u64::from(TICK_RATE),
            ai_strength_fraction: Fixed::from_num(0.5),
            undo_window_ticks: 5 * u64::from(TICK_RATE),
            tower_radius: Fixed::from_num(20),
            placement_margin: Fixed::from_num(30),
            obstacle_size: Fixed::from_num(40),
            start_edge_offset: Fixed::from_num(100),
        }
    }
}

impl GameRules {
    /// Parse rules from a RON string and validate them.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let rules: Self = ron::from_str(ron).map_err(|e| GameError::DataParseError {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })?;
        rules.validate()?;
        Ok(rules)
    }

    /// Serialize to a pretty RON string.
    pub fn to_ron_string(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize rules: {e}")))
    }

    /// Minimum strength a source must exceed before it sends a unit.
    #[must_use]
    pub fn send_threshold(&self) -> Fixed {
        self.reserve_strength + self.send_margin
    }

    /// Strength an AI tower must exceed before it picks a target.
    #[must_use]
    pub fn ai_attack_threshold(&self) -> Fixed {
        self.max_strength * self.ai_strength_fraction
    }

    /// Check that the rules describe a playable game.
    pub fn validate(&self) -> Result<()> {
        let reject = |reason: &str| Err(GameError::InvalidRules(reason.to_string()));

        if self.max_strength <= Fixed::ZERO {
            return reject("max_strength must be positive");
        }
        if self.initial_strength <= Fixed::ZERO || self.initial_strength > self.max_strength {
            return reject("initial_strength must be in (0, max_strength]");
        }
        if self.capture_strength <= Fixed::ZERO || self.capture_strength > self.max_strength {
            return reject("capture_strength must be in (0, max_strength]");
        }
        if self.send_cost < Fixed::ZERO || self.send_cost >= self.send_threshold() {
            return reject("send_cost must be non-negative and below the send threshold");
        }
        if self.unit_speed <= Fixed::ZERO {
            return reject("unit_speed must be positive");
        }
        if self.max_out_degree == 0 {
            return reject("max_out_degree must be at least 1");
        }
        if self.ai_interval_ticks == 0 {
            return reject("ai_interval_ticks must be at least 1");
        }
        if self.tower_radius <= Fixed::ZERO || self.obstacle_size <= Fixed::ZERO {
            return reject("tower_radius and obstacle_size must be positive");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_valid() {
        let rules = GameRules::default();
        assert!(rules.validate().is_ok());
        assert_eq!(rules.max_out_degree, 2);
        assert_eq!(rules.ai_interval_ticks, 120);
        assert_eq!(rules.undo_window_ticks, 300);
        assert_eq!(rules.send_threshold(), Fixed::from_num(1.5));
        assert_eq!(rules.ai_attack_threshold(), Fixed::from_num(10));
    }

    #[test]
    fn test_hundred_steps_complete_a_connection() {
        let rules = GameRules::default();
        let mut progress = Fixed::ZERO;
        for _ in 0..99 {
            progress += rules.unit_speed;
        }
        assert!(progress < Fixed::ONE);
        progress += rules.unit_speed;
        assert!(progress >= Fixed::ONE);
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let rules = GameRules::from_ron_str("(max_out_degree: 3, capture_points: 25)").unwrap();
        assert_eq!(rules.max_out_degree, 3);
        assert_eq!(rules.capture_points, 25);
        assert_eq!(rules.max_strength, Fixed::from_num(20));
    }

    #[test]
    fn test_ron_roundtrip_preserves_bits() {
        let rules = GameRules {
            max_out_degree: 3,
            ..GameRules::default()
        };
        let text = rules.to_ron_string().unwrap();
        let restored = GameRules::from_ron_str(&text).unwrap();
        assert_eq!(rules, restored);
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let err = GameRules::from_ron_str("(max_out_degree: 0)").unwrap_err();
        assert!(matches!(err, GameError::InvalidRules(_)));

        let err = GameRules::from_ron_str("(unit_speed: 0)").unwrap_err();
        assert!(matches!(err, GameError::InvalidRules(_)));
    }

    #[test]
    fn test_malformed_ron_is_parse_error() {
        let err = GameRules::from_ron_str("(max_out_degree: \"many\")").unwrap_err();
        assert!(matches!(err, GameError::DataParseError { .. }));
    }
}
