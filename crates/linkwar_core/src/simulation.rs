//! Core simulation loop.
//!
//! [`Simulation`] owns the whole [`WorldState`] and advances it one
//! discrete tick at a time. A tick never blocks and never fails.
//!
//! # Tick order
//!
//! 1. Clear the per-tick tower flags
//! 2. Fire connections (spend strength, spawn units, mark targets)
//! 3. Move units, resolving arrivals in reverse index order
//! 4. Convert attack connections into captured towers to support
//! 5. Tower recovery
//! 6. Victory check
//!
//! Capture conversions run as their own pass after every arrival has been
//! resolved, so the order units arrive in cannot leak into connection state.
//!
//! # Example
//!
//! ```
//! use linkwar_core::map_generation::{generate_map, MapConfig};
//! use linkwar_core::rules::GameRules;
//! use linkwar_core::simulation::Simulation;
//!
//! let rules = GameRules::default();
//! let map = generate_map(MapConfig::default().with_seed(7), &rules)?;
//! let mut sim = Simulation::new(map, rules);
//!
//! let _ = sim.propose_connection(0, 1);
//! let events = sim.tick();
//! assert_eq!(sim.get_tick(), 1);
//! assert!(events.victory.is_none());
//! # Ok::<(), linkwar_core::error::GameError>(())
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::components::{Obstacle, Owner, Tower, TowerId, Unit};
use crate::connections::{Connection, ConnectionIndex, ConnectionSet};
use crate::error::{GameError, Rejection, Result};
use crate::map_generation::{GameMode, GeneratedMap};
use crate::math::{Fixed, Vec2Fixed};
use crate::rules::GameRules;

/// Capture scores for the two human players.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerPoints {
    /// Points earned by player1.
    pub player1: u32,
    /// Points earned by player2.
    pub player2: u32,
}

impl PlayerPoints {
    /// Points held by `owner`; always zero for non-human owners.
    #[must_use]
    pub const fn get(&self, owner: Owner) -> u32 {
        match owner {
            Owner::Player1 => self.player1,
            Owner::Player2 => self.player2,
            Owner::Ai | Owner::Neutral => 0,
        }
    }

    /// Credit a capture. Returns the new total, or `None` for owners that
    /// do not score.
    pub fn award(&mut self, owner: Owner, amount: u32) -> Option<u32> {
        let slot = match owner {
            Owner::Player1 => &mut self.player1,
            Owner::Player2 => &mut self.player2,
            Owner::Ai | Owner::Neutral => return None,
        };
        *slot = slot.saturating_add(amount);
        Some(*slot)
    }
}

/// How a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// Singleplayer: every AI tower was taken.
    PlayerWins,
    /// Singleplayer: player1 lost every tower.
    AiWins,
    /// Multiplayer: player2 lost every tower.
    Player1Wins,
    /// Multiplayer: player1 lost every tower.
    Player2Wins,
}

impl Outcome {
    /// Owner that won.
    #[must_use]
    pub const fn winner(self) -> Owner {
        match self {
            Self::PlayerWins | Self::Player1Wins => Owner::Player1,
            Self::AiWins => Owner::Ai,
            Self::Player2Wins => Owner::Player2,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PlayerWins => "You Win!",
            Self::AiWins => "AI Wins!",
            Self::Player1Wins => "Player 1 Wins!",
            Self::Player2Wins => "Player 2 Wins!",
        })
    }
}

/// A tower changed hands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureEvent {
    /// Captured tower.
    pub tower: TowerId,
    /// Owner before the capture.
    pub previous_owner: Owner,
    /// Owner after the capture.
    pub new_owner: Owner,
}

/// Points credited for a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointsAwarded {
    /// Player credited.
    pub player: Owner,
    /// Points added.
    pub amount: u32,
    /// Player's total afterwards.
    pub total: u32,
}

/// Events generated during a simulation tick.
///
/// Presentation layers use these to trigger effects; the headless runner
/// forwards them over its protocol.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickEvents {
    /// Units launched this tick.
    pub units_spawned: usize,
    /// Attack units that reached their target.
    pub attack_arrivals: usize,
    /// Support units that reached their target.
    pub support_arrivals: usize,
    /// Towers that changed hands, in resolution order.
    pub captures: Vec<CaptureEvent>,
    /// Points credited, one entry per scoring capture.
    pub points_awarded: Vec<PointsAwarded>,
    /// Attack connections converted to support after captures.
    pub connections_converted: usize,
    /// Connections the AI opened after this tick. Filled in by
    /// [`Game::advance`](crate::game::Game::advance).
    pub ai_connections: Vec<ConnectionIndex>,
    /// Set on the tick the game is decided.
    pub victory: Option<Outcome>,
}

/// Tower counts and scores, the numbers a HUD shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSummary {
    /// Current tick.
    pub tick: u64,
    /// Towers held by player1.
    pub player1_towers: usize,
    /// Towers held by player2.
    pub player2_towers: usize,
    /// Towers held by the AI.
    pub ai_towers: usize,
    /// Unclaimed towers.
    pub neutral_towers: usize,
    /// Capture points.
    pub points: PlayerPoints,
}

/// Everything that changes while a game runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldState {
    /// Towers, indexed by [`TowerId`].
    pub towers: Vec<Tower>,
    /// Static blockers.
    pub obstacles: Vec<Obstacle>,
    /// Links between towers, in firing order.
    pub connections: ConnectionSet,
    /// Units in flight.
    pub units: Vec<Unit>,
    /// Capture scores.
    pub points: PlayerPoints,
}

impl WorldState {
    /// Number of towers held by `owner`.
    #[must_use]
    pub fn tower_count(&self, owner: Owner) -> usize {
        self.towers.iter().filter(|t| t.owner == owner).count()
    }
}

/// The core game simulation.
///
/// Owns all game state and advances it deterministically. Connection
/// changes go through [`propose_connection`](Self::propose_connection) and
/// friends so the graph invariants hold at all times.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Current simulation tick.
    tick: u64,
    /// Decides the victory condition.
    mode: GameMode,
    /// Balance constants.
    rules: GameRules,
    /// Entities.
    world: WorldState,
    /// Set once the game is decided.
    outcome: Option<Outcome>,
}

impl Simulation {
    /// Start a simulation on a generated map.
    #[must_use]
    pub fn new(map: GeneratedMap, rules: GameRules) -> Self {
        Self::from_parts(map.config.mode, rules, map.towers, map.obstacles)
    }

    /// Start a simulation from hand-placed towers and obstacles.
    #[must_use]
    pub fn from_parts(
        mode: GameMode,
        rules: GameRules,
        towers: Vec<Tower>,
        obstacles: Vec<Obstacle>,
    ) -> Self {
        Self {
            tick: 0,
            mode,
            rules,
            world: WorldState {
                towers,
                obstacles,
                ..WorldState::default()
            },
            outcome: None,
        }
    }

    /// Get the current tick number.
    #[must_use]
    pub const fn get_tick(&self) -> u64 {
        self.tick
    }

    /// Game mode.
    #[must_use]
    pub const fn mode(&self) -> GameMode {
        self.mode
    }

    /// Balance constants.
    #[must_use]
    pub const fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Read-only view of all entities.
    #[must_use]
    pub const fn world(&self) -> &WorldState {
        &self.world
    }

    /// Towers, indexed by [`TowerId`].
    #[must_use]
    pub fn towers(&self) -> &[Tower] {
        &self.world.towers
    }

    /// Tower by id.
    #[must_use]
    pub fn tower(&self, id: TowerId) -> Option<&Tower> {
        self.world.towers.get(id)
    }

    /// Obstacles.
    #[must_use]
    pub fn obstacles(&self) -> &[Obstacle] {
        &self.world.obstacles
    }

    /// Connections in firing order.
    #[must_use]
    pub const fn connections(&self) -> &ConnectionSet {
        &self.world.connections
    }

    /// Units in flight.
    #[must_use]
    pub fn units(&self) -> &[Unit] {
        &self.world.units
    }

    /// Where `unit` currently is, interpolated along its connection.
    #[must_use]
    pub fn unit_position(&self, unit: &Unit) -> Option<Vec2Fixed> {
        let from = self.world.towers.get(unit.from)?.position;
        let to = self.world.towers.get(unit.to)?.position;
        Some(from.lerp(to, unit.progress.min(Fixed::ONE)))
    }

    /// Capture scores.
    #[must_use]
    pub const fn points(&self) -> PlayerPoints {
        self.world.points
    }

    /// Final outcome, once decided.
    #[must_use]
    pub const fn outcome(&self) -> Option<Outcome> {
        self.outcome
    }

    /// Whether the game has been decided.
    #[must_use]
    pub const fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    /// Tower counts and scores.
    #[must_use]
    pub fn summary(&self) -> GameSummary {
        GameSummary {
            tick: self.tick,
            player1_towers: self.world.tower_count(Owner::Player1),
            player2_towers: self.world.tower_count(Owner::Player2),
            ai_towers: self.world.tower_count(Owner::Ai),
            neutral_towers: self.world.tower_count(Owner::Neutral),
            points: self.world.points,
        }
    }

    /// Check whether `from -> to` would be accepted, without adding it.
    pub fn can_connect(&self, from: TowerId, to: TowerId) -> std::result::Result<(), Rejection> {
        self.world.connections.validate(
            &self.world.towers,
            &self.world.obstacles,
            from,
            to,
            self.rules.max_out_degree,
        )
    }

    /// Add a connection from `from` to `to`.
    ///
    /// Ownership is not checked here; that belongs to the command layer.
    pub fn propose_connection(
        &mut self,
        from: TowerId,
        to: TowerId,
    ) -> std::result::Result<ConnectionIndex, Rejection> {
        self.world.connections.propose(
            &self.world.towers,
            &self.world.obstacles,
            from,
            to,
            self.rules.max_out_degree,
        )
    }

    /// Remove the connection at `index`.
    pub fn remove_connection(
        &mut self,
        index: ConnectionIndex,
    ) -> std::result::Result<Connection, Rejection> {
        self.world.connections.remove(index)
    }

    /// Restore a removed connection at its original index.
    pub fn reinsert_connection(
        &mut self,
        index: ConnectionIndex,
        connection: Connection,
    ) -> std::result::Result<ConnectionIndex, Rejection> {
        self.world
            .connections
            .reinsert(index, connection, self.rules.max_out_degree)
    }

    /// Put a unit in flight directly.
    ///
    /// Intended for scripted scenarios; normal play spawns units from
    /// connections.
    pub fn insert_unit(&mut self, unit: Unit) -> std::result::Result<(), Rejection> {
        for id in [unit.from, unit.to] {
            if id >= self.world.towers.len() {
                return Err(Rejection::UnknownTower(id));
            }
        }
        self.world.units.push(unit);
        Ok(())
    }

    /// Advance the simulation by one tick.
    ///
    /// Once the game is decided further ticks are inert and return no events.
    pub fn tick(&mut self) -> TickEvents {
        let mut events = TickEvents::default();
        if self.outcome.is_some() {
            return events;
        }

        // 1. Flags are recomputed from scratch every tick
        for tower in &mut self.world.towers {
            tower.clear_flags();
        }

        // 2. Connections fire
        events.units_spawned = self.run_connection_system();

        // 3. Units move and resolve
        let captured = self.run_unit_system(&mut events);

        // 4. Captured towers convert incoming attacks from their new owner
        events.connections_converted = self.run_conversion_system(&captured);

        // 5. Recovery
        for tower in &mut self.world.towers {
            tower.recover(&self.rules);
        }

        self.tick += 1;

        // 6. Victory
        events.victory = self.check_victory();
        if let Some(outcome) = events.victory {
            self.outcome = Some(outcome);
            tracing::info!(tick = self.tick, %outcome, "Game decided");
        }

        #[cfg(feature = "debug-validation")]
        if let Err(e) = self.validate_invariants() {
            panic!("Invariant violated at tick {}: {e}", self.tick);
        }

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, state_hash = hash, "Simulation state hash");
        }

        events
    }

    /// Fire every connection once. Returns the number of units spawned.
    fn run_connection_system(&mut self) -> usize {
        let threshold = self.rules.send_threshold();
        let towers = &mut self.world.towers;
        let units = &mut self.world.units;
        let mut spawned = 0;

        for connection in self.world.connections.iter() {
            let Some(target) = towers.get(connection.to) else {
                continue;
            };

            // Support stops while the target is full; attack always fires.
            let fires = connection.is_attack || target.has_spare_capacity();
            if !fires {
                continue;
            }

            if let Some(source) = towers.get_mut(connection.from) {
                if source.strength > threshold {
                    source.strength -= self.rules.send_cost;
                    units.push(Unit::new(
                        connection.from,
                        connection.to,
                        source.owner,
                        connection.is_attack,
                    ));
                    spawned += 1;
                }
            }

            if let Some(target) = towers.get_mut(connection.to) {
                if connection.is_attack {
                    target.is_under_attack = true;
                } else {
                    target.incoming_support = true;
                }
            }
        }

        spawned
    }

    /// Move every unit and resolve arrivals. Returns the captured towers.
    fn run_unit_system(&mut self, events: &mut TickEvents) -> Vec<TowerId> {
        let mut captured = Vec::new();

        for index in (0..self.world.units.len()).rev() {
            if !self.world.units[index].advance(self.rules.unit_speed) {
                continue;
            }

            let unit = self.world.units.remove(index);
            let Some(target) = self.world.towers.get_mut(unit.to) else {
                continue;
            };

            if !unit.is_attack {
                target.apply_support(self.rules.support_power);
                events.support_arrivals += 1;
                continue;
            }

            events.attack_arrivals += 1;
            if !target.apply_damage(self.rules.attack_power) {
                continue;
            }

            let previous_owner = target.owner;
            target.capture(unit.owner, self.rules.capture_strength);
            events.captures.push(CaptureEvent {
                tower: unit.to,
                previous_owner,
                new_owner: unit.owner,
            });
            captured.push(unit.to);

            tracing::info!(
                tick = self.tick,
                tower = unit.to,
                from = %previous_owner,
                to = %unit.owner,
                "Tower captured"
            );

            let amount = self.rules.capture_points;
            if let Some(total) = self.world.points.award(unit.owner, amount) {
                events.points_awarded.push(PointsAwarded {
                    player: unit.owner,
                    amount,
                    total,
                });
            }
        }

        captured.sort_unstable();
        captured.dedup();
        captured
    }

    /// Convert attack links into freshly captured towers.
    fn run_conversion_system(&mut self, captured: &[TowerId]) -> usize {
        captured
            .iter()
            .map(|&tower| {
                self.world
                    .connections
                    .convert_to_support(&self.world.towers, tower)
            })
            .sum()
    }

    fn check_victory(&self) -> Option<Outcome> {
        let count = |owner| self.world.tower_count(owner);
        match self.mode {
            GameMode::Singleplayer => {
                if count(Owner::Ai) == 0 {
                    Some(Outcome::PlayerWins)
                } else if count(Owner::Player1) == 0 {
                    Some(Outcome::AiWins)
                } else {
                    None
                }
            }
            GameMode::Multiplayer => {
                if count(Owner::Player2) == 0 {
                    Some(Outcome::Player1Wins)
                } else if count(Owner::Player1) == 0 {
                    Some(Outcome::Player2Wins)
                } else {
                    None
                }
            }
        }
    }

    /// Check the strength and connection-graph invariants.
    pub fn validate_invariants(&self) -> Result<()> {
        for (id, tower) in self.world.towers.iter().enumerate() {
            if tower.strength <= Fixed::ZERO || tower.strength > tower.max_strength {
                return Err(GameError::InvalidState(format!(
                    "tower {id} strength {} outside (0, {}]",
                    tower.strength, tower.max_strength
                )));
            }
        }

        let connections = self.world.connections.as_slice();
        for (index, connection) in connections.iter().enumerate() {
            if connection.from == connection.to {
                return Err(GameError::InvalidState(format!(
                    "connection {index} is a self-link"
                )));
            }
            if connections[..index]
                .iter()
                .any(|c| c.from == connection.from && c.to == connection.to)
            {
                return Err(GameError::InvalidState(format!(
                    "connection {index} duplicates {} -> {}",
                    connection.from, connection.to
                )));
            }
        }

        for id in 0..self.world.towers.len() {
            let degree = self.world.connections.out_degree(id);
            if degree > self.rules.max_out_degree {
                return Err(GameError::InvalidState(format!(
                    "tower {id} has {degree} outgoing connections"
                )));
            }
        }

        Ok(())
    }

    /// Calculate a hash of the current simulation state.
    ///
    /// Two simulations with identical state produce identical hashes.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.outcome.hash(&mut hasher);

        self.world.towers.len().hash(&mut hasher);
        for tower in &self.world.towers {
            tower.position.hash(&mut hasher);
            tower.owner.hash(&mut hasher);
            tower.kind.hash(&mut hasher);
            tower.strength.to_bits().hash(&mut hasher);
            tower.is_under_attack.hash(&mut hasher);
            tower.incoming_support.hash(&mut hasher);
        }

        self.world.connections.as_slice().hash(&mut hasher);

        self.world.units.len().hash(&mut hasher);
        for unit in &self.world.units {
            unit.from.hash(&mut hasher);
            unit.to.hash(&mut hasher);
            unit.owner.hash(&mut hasher);
            unit.is_attack.hash(&mut hasher);
            unit.progress.to_bits().hash(&mut hasher);
        }

        self.world.points.hash(&mut hasher);

        hasher.finish()
    }

    /// Serialize the simulation state for replay or network sync.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize simulation: {e}")))
    }

    /// Deserialize simulation state from bytes.
    pub fn deserialize(data: &[u8]) -> Result<Self> {
        bincode::deserialize(data)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize simulation: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TowerKind;
    use crate::math::{Fixed, Vec2Fixed};

    fn tower_at(x: i32, y: i32, owner: Owner, strength: i32) -> Tower {
        Tower::new(
            Vec2Fixed::from_ints(x, y),
            owner,
            TowerKind::Basic,
            &GameRules::default(),
        )
        .with_strength(Fixed::from_num(strength))
    }

    fn duel(mode: GameMode) -> Simulation {
        Simulation::from_parts(
            mode,
            GameRules::default(),
            vec![
                tower_at(100, 300, Owner::Player1, 10),
                tower_at(700, 300, mode.opponent(), 10),
                tower_at(400, 100, Owner::Neutral, 10),
            ],
            Vec::new(),
        )
    }

    #[test]
    fn test_tick_increments() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.tick();
        sim.tick();
        assert_eq!(sim.get_tick(), 2);
    }

    #[test]
    fn test_attack_connection_spawns_and_marks() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.propose_connection(0, 1).unwrap();

        let events = sim.tick();
        assert_eq!(events.units_spawned, 1);
        assert_eq!(sim.units().len(), 1);
        assert!(sim.tower(1).unwrap().is_under_attack);

        // Source paid the send cost, then recovered once.
        let rules = GameRules::default();
        let expected = Fixed::from_num(10) - rules.send_cost + rules.recovery_rate;
        assert_eq!(sim.tower(0).unwrap().strength, expected);
        // Target does not recover while under attack.
        assert_eq!(sim.tower(1).unwrap().strength, Fixed::from_num(10));
    }

    #[test]
    fn test_source_keeps_reserve() {
        let mut sim = Simulation::from_parts(
            GameMode::Singleplayer,
            GameRules::default(),
            vec![
                tower_at(100, 300, Owner::Player1, 1),
                tower_at(700, 300, Owner::Ai, 10),
            ],
            Vec::new(),
        );
        sim.world.towers[0].strength = Fixed::from_num(1.5);
        sim.propose_connection(0, 1).unwrap();

        let events = sim.tick();
        assert_eq!(events.units_spawned, 0);
        // Still marks the target even without a unit.
        assert!(sim.tower(1).unwrap().is_under_attack);
    }

    #[test]
    fn test_support_to_full_tower_does_not_fire() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.world.towers[2].owner = Owner::Player1;
        sim.world.towers[2].strength = Fixed::from_num(20);
        sim.propose_connection(0, 2).unwrap();

        let events = sim.tick();
        assert_eq!(events.units_spawned, 0);
        assert!(!sim.tower(2).unwrap().incoming_support);
        assert_eq!(sim.connections().len(), 1);
    }

    #[test]
    fn test_support_connection_fires_below_max() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.world.towers[2].owner = Owner::Player1;
        sim.propose_connection(0, 2).unwrap();

        let events = sim.tick();
        assert_eq!(events.units_spawned, 1);
        let rules = GameRules::default();
        let target = sim.tower(2).unwrap();
        assert!(target.incoming_support);
        assert_eq!(
            target.strength,
            Fixed::from_num(10) + rules.recovery_rate * 2
        );
    }

    #[test]
    fn test_unit_resolves_after_hundred_ticks() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.insert_unit(Unit::new(0, 2, Owner::Player1, true)).unwrap();

        for _ in 0..99 {
            let events = sim.tick();
            assert_eq!(events.attack_arrivals, 0);
        }
        let events = sim.tick();
        assert_eq!(events.attack_arrivals, 1);
        assert!(sim.units().is_empty());
    }

    #[test]
    fn test_capture_flips_owner_and_awards_points() {
        let mut sim = duel(GameMode::Multiplayer);
        sim.world.towers[2].strength = Fixed::ONE;
        let mut unit = Unit::new(1, 2, Owner::Player2, true);
        unit.progress = Fixed::ONE - sim.rules.unit_speed;
        sim.insert_unit(unit).unwrap();

        let events = sim.tick();
        let tower = sim.tower(2).unwrap();
        assert_eq!(tower.owner, Owner::Player2);
        assert_eq!(tower.strength, Fixed::ONE + sim.rules.recovery_rate);
        assert_eq!(sim.points().player2, 10);
        assert_eq!(
            events.captures,
            vec![CaptureEvent {
                tower: 2,
                previous_owner: Owner::Neutral,
                new_owner: Owner::Player2,
            }]
        );
        assert_eq!(events.points_awarded.len(), 1);
    }

    #[test]
    fn test_ai_capture_scores_nothing() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.world.towers[2].strength = Fixed::ONE;
        let mut unit = Unit::new(1, 2, Owner::Ai, true);
        unit.progress = Fixed::ONE;
        sim.insert_unit(unit).unwrap();

        let events = sim.tick();
        assert_eq!(events.captures.len(), 1);
        assert!(events.points_awarded.is_empty());
        assert_eq!(sim.points(), PlayerPoints::default());
    }

    #[test]
    fn test_capture_converts_connections_from_new_owner() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.propose_connection(0, 2).unwrap();
        sim.propose_connection(1, 2).unwrap();
        sim.world.towers[2].strength = Fixed::ONE;
        let mut unit = Unit::new(0, 2, Owner::Player1, true);
        unit.progress = Fixed::ONE;
        sim.world.units.push(unit);
        // Fire once so the queued unit arrives on this tick.
        let events = sim.tick();

        assert_eq!(sim.tower(2).unwrap().owner, Owner::Player1);
        assert_eq!(events.connections_converted, 1);
        assert!(!sim.connections().get(0).unwrap().is_attack);
        assert!(sim.connections().get(1).unwrap().is_attack);
    }

    #[test]
    fn test_singleplayer_victory() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.world.towers[1].owner = Owner::Player1;
        let events = sim.tick();
        assert_eq!(events.victory, Some(Outcome::PlayerWins));
        assert!(sim.is_over());

        // Further ticks are inert.
        let tick = sim.get_tick();
        assert_eq!(sim.tick(), TickEvents::default());
        assert_eq!(sim.get_tick(), tick);
    }

    #[test]
    fn test_ai_victory() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.world.towers[0].owner = Owner::Ai;
        assert_eq!(sim.tick().victory, Some(Outcome::AiWins));
    }

    #[test]
    fn test_multiplayer_victory() {
        let mut sim = duel(GameMode::Multiplayer);
        sim.world.towers[1].owner = Owner::Neutral;
        assert_eq!(sim.tick().victory, Some(Outcome::Player1Wins));
        assert_eq!(Outcome::Player1Wins.winner(), Owner::Player1);
    }

    #[test]
    fn test_summary_counts() {
        let sim = duel(GameMode::Singleplayer);
        let summary = sim.summary();
        assert_eq!(summary.player1_towers, 1);
        assert_eq!(summary.ai_towers, 1);
        assert_eq!(summary.neutral_towers, 1);
        assert_eq!(summary.player2_towers, 0);
    }

    #[test]
    fn test_deterministic_hash() {
        let mut a = duel(GameMode::Singleplayer);
        let mut b = duel(GameMode::Singleplayer);
        a.propose_connection(0, 2).unwrap();
        b.propose_connection(0, 2).unwrap();
        for _ in 0..150 {
            a.tick();
            b.tick();
        }
        assert_eq!(a.state_hash(), b.state_hash());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.propose_connection(0, 1).unwrap();
        for _ in 0..30 {
            sim.tick();
        }
        let bytes = sim.serialize().unwrap();
        let restored = Simulation::deserialize(&bytes).unwrap();
        assert_eq!(sim.state_hash(), restored.state_hash());
        assert_eq!(sim.world(), restored.world());
    }

    #[test]
    fn test_invariants_hold_through_long_battle() {
        let mut sim = duel(GameMode::Singleplayer);
        sim.propose_connection(0, 2).unwrap();
        sim.propose_connection(0, 1).unwrap();
        sim.propose_connection(1, 0).unwrap();
        sim.propose_connection(1, 2).unwrap();
        for _ in 0..2000 {
            sim.tick();
            sim.validate_invariants().unwrap();
        }
    }

    #[test]
    fn test_unit_position_interpolates() {
        let sim = duel(GameMode::Singleplayer);
        let mut unit = Unit::new(0, 1, Owner::Player1, true);
        unit.progress = Fixed::from_num(0.5);
        assert_eq!(sim.unit_position(&unit), Some(Vec2Fixed::from_ints(400, 300)));
        unit.to = 9;
        assert_eq!(sim.unit_position(&unit), None);
    }

    #[test]
    fn test_insert_unit_checks_towers() {
        let mut sim = duel(GameMode::Singleplayer);
        assert_eq!(
            sim.insert_unit(Unit::new(0, 7, Owner::Player1, true)),
            Err(Rejection::UnknownTower(7))
        );
    }
}
