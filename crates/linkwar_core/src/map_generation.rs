//! Procedural world generation.
//!
//! Places the two starting towers at fixed offsets from the side edges,
//! then rejection-samples neutral towers and obstacles until the
//! difficulty's target counts are met or the attempt budget runs out.
//! Running out of attempts is not an error: the map simply has fewer
//! towers or obstacles than requested.

use serde::{Deserialize, Serialize};

use crate::components::{Obstacle, Owner, Tower, TowerKind};
use crate::error::{GameError, Result};
use crate::geometry::{circle_intersects_rect, rects_overlap, Rect};
use crate::math::{Fixed, Vec2Fixed};
use crate::rules::GameRules;

/// Rejection-sampling budget for each placement phase.
pub const MAX_PLACEMENT_ATTEMPTS: u32 = 100;

/// Largest canvas side. Squared distances across the diagonal must fit
/// the 32 integer bits of [`Fixed`].
pub const MAX_CANVAS_SIDE: u32 = 32_000;

/// Margin kept between neutral towers and the canvas edges.
const NEUTRAL_EDGE_MARGIN: i32 = 100;

/// Difficulty preset; controls how crowded the map is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    /// Fewer neutral towers and obstacles.
    Easy,
    /// Standard density.
    #[default]
    Medium,
    /// Crowded map.
    Hard,
}

impl Difficulty {
    /// Neutral towers the generator aims for.
    #[must_use]
    pub const fn neutral_tower_target(self) -> usize {
        match self {
            Self::Easy => 13,
            Self::Medium => 15,
            Self::Hard => 18,
        }
    }

    /// Obstacles the generator aims for.
    #[must_use]
    pub const fn obstacle_target(self) -> usize {
        match self {
            Self::Easy => 12,
            Self::Medium => 13,
            Self::Hard => 15,
        }
    }
}

/// Who plays against whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// One human (player1) against the AI.
    #[default]
    Singleplayer,
    /// Two humans taking turns.
    Multiplayer,
}

impl GameMode {
    /// Owner of the right-hand starting tower.
    #[must_use]
    pub const fn opponent(self) -> Owner {
        match self {
            Self::Singleplayer => Owner::Ai,
            Self::Multiplayer => Owner::Player2,
        }
    }
}

/// Map configuration for procedural generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Canvas width in world units.
    pub width: u32,
    /// Canvas height in world units.
    pub height: u32,
    /// Density preset.
    pub difficulty: Difficulty,
    /// Decides the owner of the second starting tower.
    pub mode: GameMode,
    /// Random seed for deterministic generation.
    pub seed: u64,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            difficulty: Difficulty::Medium,
            mode: GameMode::Singleplayer,
            seed: 12345,
        }
    }
}

impl MapConfig {
    /// Create a config for a canvas of the given size.
    #[must_use]
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Default::default()
        }
    }

    /// Set the random seed.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the difficulty.
    #[must_use]
    pub const fn with_difficulty(mut self, difficulty: Difficulty) -> Self {
        self.difficulty = difficulty;
        self
    }

    /// Set the game mode.
    #[must_use]
    pub const fn with_mode(mut self, mode: GameMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check that the canvas is non-empty and at most [`MAX_CANVAS_SIDE`]
    /// on each side.
    pub fn validate(&self) -> Result<()> {
        for (name, side) in [("width", self.width), ("height", self.height)] {
            if side == 0 || side > MAX_CANVAS_SIDE {
                return Err(GameError::InvalidConfig(format!(
                    "{name} must be in 1..={MAX_CANVAS_SIDE}, got {side}"
                )));
            }
        }
        Ok(())
    }

    /// Canvas size as signed integers.
    fn size_i32(&self) -> Result<(i32, i32)> {
        let convert = |side: u32| {
            i32::try_from(side).map_err(|_| {
                GameError::InvalidConfig(format!("canvas side {side} does not fit i32"))
            })
        };
        Ok((convert(self.width)?, convert(self.height)?))
    }
}

/// Output of the world generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedMap {
    /// Configuration used.
    pub config: MapConfig,
    /// Starting towers first (player1, then the opponent), then neutrals.
    pub towers: Vec<Tower>,
    /// Obstacles in placement order.
    pub obstacles: Vec<Obstacle>,
}

impl GeneratedMap {
    /// Number of neutral towers that were placed.
    #[must_use]
    pub fn neutral_count(&self) -> usize {
        self.towers
            .iter()
            .filter(|t| t.owner == Owner::Neutral)
            .count()
    }
}

/// Simple deterministic RNG for world generation.
struct MapRng {
    state: u64,
}

impl MapRng {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_add(0x9E37_79B9_7F4A_7C15),
        }
    }

    fn next(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(0x5851_F42D_4C95_7F2D)
            .wrapping_add(0x1405_7B7E_F767_814F);
        // Low LCG bits have short periods; only hand out the high half.
        self.state >> 32
    }

    /// Uniform integer in `[min, max)`; `min` when the range is empty.
    fn next_range(&mut self, min: i32, max: i32) -> i32 {
        if max <= min {
            return min;
        }
        let range = u64::from(max.abs_diff(min));
        min + (self.next() % range) as i32
    }

    fn pick<T: Copy>(&mut self, items: &[T]) -> T {
        let index = (self.next() % items.len() as u64) as usize;
        items[index]
    }
}

/// Generate a world with the given configuration.
///
/// Fails with [`GameError::InvalidConfig`] when the canvas is empty or
/// larger than [`MAX_CANVAS_SIDE`].
pub fn generate_map(config: MapConfig, rules: &GameRules) -> Result<GeneratedMap> {
    config.validate()?;
    let size = config.size_i32()?;
    let mut rng = MapRng::new(config.seed);

    let mut towers = starting_towers(&config, rules);
    let mut obstacles = Vec::new();

    place_neutral_towers(&config, size, rules, &mut rng, &mut towers, &obstacles);
    place_obstacles(&config, size, rules, &mut rng, &towers, &mut obstacles);

    let map = GeneratedMap {
        config,
        towers,
        obstacles,
    };

    tracing::info!(
        seed = map.config.seed,
        difficulty = ?map.config.difficulty,
        neutral_towers = map.neutral_count(),
        obstacles = map.obstacles.len(),
        "Generated map"
    );

    Ok(map)
}

fn starting_towers(config: &MapConfig, rules: &GameRules) -> Vec<Tower> {
    let width = Fixed::from_num(config.width);
    let center_y = Fixed::from_num(config.height) / 2;

    vec![
        Tower::new(
            Vec2Fixed::new(rules.start_edge_offset, center_y),
            Owner::Player1,
            TowerKind::Basic,
            rules,
        ),
        Tower::new(
            Vec2Fixed::new(width - rules.start_edge_offset, center_y),
            config.mode.opponent(),
            TowerKind::Basic,
            rules,
        ),
    ]
}

/// Whether a circle at `center` keeps clear of every tower.
fn clear_of_towers(center: Vec2Fixed, rules: &GameRules, towers: &[Tower]) -> bool {
    let min_distance = rules.tower_radius + rules.placement_margin;
    let min_distance_sq = min_distance * min_distance;
    towers
        .iter()
        .all(|t| center.distance_squared(t.position) >= min_distance_sq)
}

fn place_neutral_towers(
    config: &MapConfig,
    (width, height): (i32, i32),
    rules: &GameRules,
    rng: &mut MapRng,
    towers: &mut Vec<Tower>,
    obstacles: &[Obstacle],
) {
    let target = towers.len() + config.difficulty.neutral_tower_target();

    let mut attempts = 0;
    while towers.len() < target && attempts < MAX_PLACEMENT_ATTEMPTS {
        attempts += 1;

        let x = rng.next_range(NEUTRAL_EDGE_MARGIN, width - NEUTRAL_EDGE_MARGIN);
        let y = rng.next_range(NEUTRAL_EDGE_MARGIN, height - NEUTRAL_EDGE_MARGIN);
        let center = Vec2Fixed::from_ints(x, y);

        let blocked = obstacles
            .iter()
            .any(|o| circle_intersects_rect(center, rules.tower_radius, &o.bounds));

        if clear_of_towers(center, rules, towers) && !blocked {
            let kind = rng.pick(&TowerKind::ALL);
            towers.push(Tower::new(center, Owner::Neutral, kind, rules));
        }
    }

    if towers.len() < target {
        tracing::debug!(
            placed = towers.len(),
            target,
            "Neutral tower placement ran out of attempts"
        );
    }
}

fn place_obstacles(
    config: &MapConfig,
    (width, height): (i32, i32),
    rules: &GameRules,
    rng: &mut MapRng,
    towers: &[Tower],
    obstacles: &mut Vec<Obstacle>,
) {
    let target = config.difficulty.obstacle_target();
    let size = rules.obstacle_size;
    let size_int = size.to_num::<i32>();

    let mut attempts = 0;
    while obstacles.len() < target && attempts < MAX_PLACEMENT_ATTEMPTS {
        attempts += 1;

        let x = rng.next_range(0, width - size_int);
        let y = rng.next_range(0, height - size_int);
        let bounds = Rect::square(Vec2Fixed::from_ints(x, y), size);

        let overlaps_obstacle = obstacles.iter().any(|o| rects_overlap(&bounds, &o.bounds));

        if clear_of_towers(bounds.center(), rules, towers) && !overlaps_obstacle {
            obstacles.push(Obstacle::new(bounds.origin, size));
        }
    }

    if obstacles.len() < target {
        tracing::debug!(
            placed = obstacles.len(),
            target,
            "Obstacle placement ran out of attempts"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate(config: MapConfig) -> GeneratedMap {
        generate_map(config, &GameRules::default()).unwrap()
    }

    #[test]
    fn test_starting_towers_singleplayer() {
        let map = generate(MapConfig::with_size(1000, 600));
        assert_eq!(map.towers[0].owner, Owner::Player1);
        assert_eq!(map.towers[0].position, Vec2Fixed::from_ints(100, 300));
        assert_eq!(map.towers[1].owner, Owner::Ai);
        assert_eq!(map.towers[1].position, Vec2Fixed::from_ints(900, 300));
        assert_eq!(map.towers[0].kind, TowerKind::Basic);
    }

    #[test]
    fn test_starting_towers_multiplayer() {
        let map = generate(MapConfig::default().with_mode(GameMode::Multiplayer));
        assert_eq!(map.towers[1].owner, Owner::Player2);
        assert!(map.towers.iter().all(|t| t.owner != Owner::Ai));
    }

    #[test]
    fn test_counts_never_exceed_targets() {
        for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
            let map = generate(MapConfig::default().with_difficulty(difficulty));
            assert!(map.neutral_count() <= difficulty.neutral_tower_target());
            assert!(map.obstacles.len() <= difficulty.obstacle_target());
            assert!(map.neutral_count() > 0);
        }
    }

    #[test]
    fn test_towers_keep_spacing() {
        let rules = GameRules::default();
        let map = generate(MapConfig::default().with_seed(7));
        let min = rules.tower_radius + rules.placement_margin;
        for (i, a) in map.towers.iter().enumerate() {
            for b in &map.towers[i + 1..] {
                assert!(a.position.distance_squared(b.position) >= min * min);
            }
        }
    }

    #[test]
    fn test_obstacles_clear_of_towers_and_each_other() {
        let rules = GameRules::default();
        let map = generate(MapConfig::default().with_difficulty(Difficulty::Hard));
        for (i, o) in map.obstacles.iter().enumerate() {
            assert!(clear_of_towers(o.bounds.center(), &rules, &map.towers));
            for other in &map.obstacles[i + 1..] {
                assert!(!rects_overlap(&o.bounds, &other.bounds));
            }
        }
    }

    #[test]
    fn test_neutral_towers_inside_margin() {
        let config = MapConfig::with_size(800, 600);
        let map = generate(config);
        for tower in map.towers.iter().filter(|t| t.owner == Owner::Neutral) {
            let (x, y) = tower.position.to_f64();
            assert!((100.0..700.0).contains(&x));
            assert!((100.0..500.0).contains(&y));
        }
    }

    #[test]
    fn test_tiny_canvas_does_not_panic() {
        let map = generate(MapConfig::with_size(150, 120));
        assert!(map.towers.len() >= 2);
        assert!(map.obstacles.len() <= Difficulty::Medium.obstacle_target());
    }

    #[test]
    fn test_oversized_canvas_rejected() {
        let rules = GameRules::default();
        let result = generate_map(MapConfig::with_size(60_000, 720), &rules);
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
        let result = generate_map(MapConfig::with_size(1280, u32::MAX), &rules);
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
        assert!(MapConfig::with_size(0, 720).validate().is_err());
    }

    #[test]
    fn test_largest_canvas_generates() {
        let map = generate(MapConfig::with_size(MAX_CANVAS_SIDE, MAX_CANVAS_SIDE));
        assert_eq!(map.towers[0].owner, Owner::Player1);
        assert!(map.neutral_count() > 0);
    }

    #[test]
    fn test_determinism() {
        let a = generate(MapConfig::default().with_seed(42));
        let b = generate(MapConfig::default().with_seed(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seeds() {
        let a = generate(MapConfig::default().with_seed(1));
        let b = generate(MapConfig::default().with_seed(2));
        assert_ne!(a.towers, b.towers);
    }

    #[test]
    fn test_kinds_are_varied() {
        let map = generate(MapConfig::default().with_difficulty(Difficulty::Hard));
        let first = map.towers[2].kind;
        assert!(map.towers[2..].iter().any(|t| t.kind != first));
    }
}
