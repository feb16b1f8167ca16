//! Entity definitions: towers, obstacles and units in transit.
//!
//! These are plain data plus the per-tick transition rules that only touch
//! a single entity (recovery, damage, unit movement). Anything that needs
//! more than one entity lives in [`crate::simulation`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::Rect;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::rules::GameRules;

/// Index of a tower in the world's tower list.
///
/// Towers are never destroyed, so indices stay valid for a whole game.
pub type TowerId = usize;

/// Who controls a tower, unit or connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Owner {
    /// First human player (the only human in singleplayer).
    Player1,
    /// Second human player (multiplayer only).
    Player2,
    /// Computer opponent (singleplayer only).
    Ai,
    /// Unclaimed tower.
    Neutral,
}

impl Owner {
    /// All owners in a stable order.
    pub const ALL: [Self; 4] = [Self::Player1, Self::Player2, Self::Ai, Self::Neutral];

    /// Whether this owner is a human player.
    #[must_use]
    pub const fn is_human(self) -> bool {
        matches!(self, Self::Player1 | Self::Player2)
    }

    /// The other human player. Non-human owners map to themselves.
    #[must_use]
    pub const fn other_player(self) -> Self {
        match self {
            Self::Player1 => Self::Player2,
            Self::Player2 => Self::Player1,
            other => other,
        }
    }

    /// Stable lowercase name used in logs and the headless protocol.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Player1 => "player1",
            Self::Player2 => "player2",
            Self::Ai => "ai",
            Self::Neutral => "neutral",
        }
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tower flavour. Purely cosmetic: the simulation treats all kinds alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TowerKind {
    /// Plain tower. Starting towers are always basic.
    #[default]
    Basic,
    /// Archer tower.
    Archer,
    /// Cannon tower.
    Cannon,
    /// Magic tower.
    Magic,
}

impl TowerKind {
    /// Every kind, in the order the world generator draws from.
    pub const ALL: [Self; 4] = [Self::Basic, Self::Archer, Self::Cannon, Self::Magic];
}

/// A stationary, owned node with strength.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tower {
    /// Center of the tower on the canvas.
    pub position: Vec2Fixed,
    /// Current controller.
    pub owner: Owner,
    /// Cosmetic kind.
    pub kind: TowerKind,
    /// Current strength, in `(0, max_strength]` between ticks.
    #[serde(with = "fixed_serde")]
    pub strength: Fixed,
    /// Strength ceiling.
    #[serde(with = "fixed_serde")]
    pub max_strength: Fixed,
    /// Set during a tick when an attack connection targets this tower.
    pub is_under_attack: bool,
    /// Set during a tick when a firing support connection targets this tower.
    pub incoming_support: bool,
}

impl Tower {
    /// Create a tower at its initial strength.
    #[must_use]
    pub fn new(position: Vec2Fixed, owner: Owner, kind: TowerKind, rules: &GameRules) -> Self {
        Self {
            position,
            owner,
            kind,
            strength: rules.initial_strength,
            max_strength: rules.max_strength,
            is_under_attack: false,
            incoming_support: false,
        }
    }

    /// Builder-style strength override, clamped to the ceiling.
    #[must_use]
    pub fn with_strength(mut self, strength: Fixed) -> Self {
        self.strength = strength.min(self.max_strength);
        self
    }

    /// Reset the per-tick flags.
    pub fn clear_flags(&mut self) {
        self.is_under_attack = false;
        self.incoming_support = false;
    }

    /// Whether support can still raise this tower's strength.
    #[must_use]
    pub fn has_spare_capacity(&self) -> bool {
        self.strength < self.max_strength
    }

    /// Subtract damage. Returns `true` when the tower has fallen.
    pub fn apply_damage(&mut self, amount: Fixed) -> bool {
        self.strength -= amount;
        self.strength <= Fixed::ZERO
    }

    /// Add support, never exceeding the ceiling.
    pub fn apply_support(&mut self, amount: Fixed) {
        self.strength = (self.strength + amount).min(self.max_strength);
    }

    /// Hand the tower to a new owner with a fresh garrison.
    pub fn capture(&mut self, new_owner: Owner, strength: Fixed) {
        self.owner = new_owner;
        self.strength = strength;
    }

    /// Passive regeneration for one tick.
    ///
    /// No recovery while under attack; doubled (by default) while support
    /// is incoming.
    pub fn recover(&mut self, rules: &GameRules) {
        if self.is_under_attack || !self.has_spare_capacity() {
            return;
        }

        let mut rate = rules.recovery_rate;
        if self.incoming_support {
            rate *= i64::from(rules.support_recovery_multiplier);
        }
        self.strength = (self.strength + rate).min(self.max_strength);
    }
}

/// A square that blocks placement and line of sight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obstacle {
    /// Footprint on the canvas.
    pub bounds: Rect,
}

impl Obstacle {
    /// Create a square obstacle from its top-left corner.
    #[must_use]
    pub const fn new(origin: Vec2Fixed, size: Fixed) -> Self {
        Self {
            bounds: Rect::square(origin, size),
        }
    }
}

/// A unit travelling along a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Tower the unit left from.
    pub from: TowerId,
    /// Tower the unit is heading to.
    pub to: TowerId,
    /// Owner of the source at launch time.
    pub owner: Owner,
    /// Damage on arrival when `true`, reinforcement otherwise.
    pub is_attack: bool,
    /// Fraction of the path covered, in `[0, 1]` while in flight.
    #[serde(with = "fixed_serde")]
    pub progress: Fixed,
}

impl Unit {
    /// Launch a unit at the start of its path.
    #[must_use]
    pub const fn new(from: TowerId, to: TowerId, owner: Owner, is_attack: bool) -> Self {
        Self {
            from,
            to,
            owner,
            is_attack,
            progress: Fixed::ZERO,
        }
    }

    /// Move one step. Returns `true` once the destination is reached.
    pub fn advance(&mut self, speed: Fixed) -> bool {
        self.progress += speed;
        self.is_at_destination()
    }

    /// Whether the unit has reached its destination.
    #[must_use]
    pub fn is_at_destination(&self) -> bool {
        self.progress >= Fixed::ONE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tower(strength: i32) -> Tower {
        Tower::new(
            Vec2Fixed::ZERO,
            Owner::Neutral,
            TowerKind::Basic,
            &GameRules::default(),
        )
        .with_strength(Fixed::from_num(strength))
    }

    #[test]
    fn test_new_tower_uses_rules() {
        let t = tower(10);
        assert_eq!(t.strength, Fixed::from_num(10));
        assert_eq!(t.max_strength, Fixed::from_num(20));
        assert!(!t.is_under_attack && !t.incoming_support);
    }

    #[test]
    fn test_recover_base_rate() {
        let rules = GameRules::default();
        let mut t = tower(10);
        t.recover(&rules);
        assert_eq!(t.strength, Fixed::from_num(10) + rules.recovery_rate);
    }

    #[test]
    fn test_recover_doubled_with_support() {
        let rules = GameRules::default();
        let mut t = tower(10);
        t.incoming_support = true;
        t.recover(&rules);
        assert_eq!(t.strength, Fixed::from_num(10) + rules.recovery_rate * 2);
    }

    #[test]
    fn test_no_recovery_under_attack() {
        let rules = GameRules::default();
        let mut t = tower(10);
        t.is_under_attack = true;
        t.incoming_support = true;
        t.recover(&rules);
        assert_eq!(t.strength, Fixed::from_num(10));
    }

    #[test]
    fn test_recovery_clamps_to_max() {
        let rules = GameRules::default();
        let mut t = tower(20);
        t.strength -= Fixed::from_num(0.005);
        t.recover(&rules);
        assert_eq!(t.strength, t.max_strength);
    }

    #[test]
    fn test_support_capped() {
        let mut t = tower(20);
        t.apply_support(Fixed::ONE);
        assert_eq!(t.strength, Fixed::from_num(20));

        let mut t = tower(19);
        t.strength += Fixed::from_num(0.5);
        t.apply_support(Fixed::ONE);
        assert_eq!(t.strength, Fixed::from_num(20));
    }

    #[test]
    fn test_damage_reports_fall() {
        let mut t = tower(2);
        assert!(!t.apply_damage(Fixed::ONE));
        assert!(t.apply_damage(Fixed::ONE));
        t.capture(Owner::Player2, Fixed::ONE);
        assert_eq!(t.owner, Owner::Player2);
        assert_eq!(t.strength, Fixed::ONE);
    }

    #[test]
    fn test_unit_arrives_after_hundred_steps() {
        let speed = GameRules::default().unit_speed;
        let mut unit = Unit::new(0, 1, Owner::Ai, true);
        let steps = (1..=200).find(|_| unit.advance(speed));
        assert_eq!(steps, Some(100));
    }

    #[test]
    fn test_owner_helpers() {
        assert_eq!(Owner::Player1.other_player(), Owner::Player2);
        assert_eq!(Owner::Player2.other_player(), Owner::Player1);
        assert_eq!(Owner::Ai.other_player(), Owner::Ai);
        assert!(Owner::Player2.is_human());
        assert!(!Owner::Neutral.is_human());
        assert_eq!(Owner::Ai.to_string(), "ai");
    }
}
