//! Test fixtures and helpers.
//!
//! Hand-built worlds for tests that need exact positions and strengths
//! instead of a generated map.

use fixed::types::I32F32;
use linkwar_core::components::{Obstacle, Owner, Tower, TowerKind};
use linkwar_core::game::Game;
use linkwar_core::map_generation::{GameMode, MapConfig};
use linkwar_core::math::Vec2Fixed;
use linkwar_core::rules::GameRules;
use linkwar_core::simulation::Simulation;

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Builder for small hand-placed worlds.
///
/// ```
/// use linkwar_core::components::Owner;
/// use linkwar_test_utils::fixtures::WorldBuilder;
///
/// let sim = WorldBuilder::singleplayer()
///     .tower(100, 300, Owner::Player1)
///     .tower(700, 300, Owner::Ai)
///     .obstacle(380, 280)
///     .build();
/// assert_eq!(sim.towers().len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct WorldBuilder {
    mode: GameMode,
    rules: GameRules,
    towers: Vec<Tower>,
    obstacles: Vec<Obstacle>,
}

impl WorldBuilder {
    /// Empty singleplayer world with default rules.
    #[must_use]
    pub fn singleplayer() -> Self {
        Self::new(GameMode::Singleplayer)
    }

    /// Empty multiplayer world with default rules.
    #[must_use]
    pub fn multiplayer() -> Self {
        Self::new(GameMode::Multiplayer)
    }

    fn new(mode: GameMode) -> Self {
        Self {
            mode,
            rules: GameRules::default(),
            towers: Vec::new(),
            obstacles: Vec::new(),
        }
    }

    /// Replace the rules. Towers added afterwards use the new ceiling.
    #[must_use]
    pub fn rules(mut self, rules: GameRules) -> Self {
        self.rules = rules;
        self
    }

    /// Add a basic tower at initial strength.
    #[must_use]
    pub fn tower(self, x: i32, y: i32, owner: Owner) -> Self {
        let strength = self.rules.initial_strength;
        self.tower_with_strength(x, y, owner, strength)
    }

    /// Add a basic tower with an explicit strength.
    #[must_use]
    pub fn tower_with_strength(mut self, x: i32, y: i32, owner: Owner, strength: I32F32) -> Self {
        let tower = Tower::new(
            Vec2Fixed::from_ints(x, y),
            owner,
            TowerKind::Basic,
            &self.rules,
        )
        .with_strength(strength);
        self.towers.push(tower);
        self
    }

    /// Add a standard-size obstacle with its top-left corner at `(x, y)`.
    #[must_use]
    pub fn obstacle(mut self, x: i32, y: i32) -> Self {
        self.obstacles.push(Obstacle::new(
            Vec2Fixed::from_ints(x, y),
            self.rules.obstacle_size,
        ));
        self
    }

    /// Finish as a bare simulation.
    #[must_use]
    pub fn build(self) -> Simulation {
        Simulation::from_parts(self.mode, self.rules, self.towers, self.obstacles)
    }

    /// Finish as a game with turns, undo and the scheduler.
    #[must_use]
    pub fn build_game(self) -> Game {
        let config = MapConfig::default().with_mode(self.mode);
        Game::from_simulation(config, self.build())
    }
}

/// Player1 on the left, the opponent on the right, two neutrals between.
///
/// Tower ids: 0 = player1, 1 = opponent, 2 = neutral (top), 3 = neutral (bottom).
#[must_use]
pub fn duel(mode: GameMode) -> WorldBuilder {
    let builder = match mode {
        GameMode::Singleplayer => WorldBuilder::singleplayer(),
        GameMode::Multiplayer => WorldBuilder::multiplayer(),
    };
    builder
        .tower(100, 300, Owner::Player1)
        .tower(700, 300, mode.opponent())
        .tower(400, 100, Owner::Neutral)
        .tower(400, 500, Owner::Neutral)
}

/// A generated medium map with default rules.
///
/// # Panics
/// Never for the default canvas size.
#[must_use]
pub fn generated_game(seed: u64, mode: GameMode) -> Game {
    Game::new(
        MapConfig::default().with_seed(seed).with_mode(mode),
        GameRules::default(),
    )
    .expect("default map config is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_places_towers_in_order() {
        let sim = duel(GameMode::Multiplayer).obstacle(380, 280).build();
        assert_eq!(sim.towers().len(), 4);
        assert_eq!(sim.towers()[1].owner, Owner::Player2);
        assert_eq!(sim.obstacles().len(), 1);
        assert_eq!(sim.mode(), GameMode::Multiplayer);
    }

    #[test]
    fn test_strength_is_clamped() {
        let sim = WorldBuilder::singleplayer()
            .tower_with_strength(0, 0, Owner::Neutral, fixed(50))
            .build();
        assert_eq!(sim.towers()[0].strength, fixed(20));
    }

    #[test]
    fn test_generated_game_uses_seed() {
        let game = generated_game(7, GameMode::Singleplayer);
        assert_eq!(game.config().seed, 7);
        assert_eq!(game.simulation().towers()[0].owner, Owner::Player1);
    }
}
