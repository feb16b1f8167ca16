//! Directed links between towers.
//!
//! A [`Connection`] is a persistent edge that fires units every tick. The
//! [`ConnectionSet`] keeps the list in insertion order (the tick engine
//! fires connections in that order) and enforces the graph invariants:
//! - no self-links
//! - at most one connection per ordered `(from, to)` pair
//! - at most `max_out_degree` outgoing connections per tower
//! - no connection whose straight line crosses an obstacle

use serde::{Deserialize, Serialize};

use crate::components::{Obstacle, Owner, Tower, TowerId};
use crate::error::Rejection;
use crate::geometry::segment_intersects_rect;
use crate::math::Vec2Fixed;

/// Position of a connection in the set.
pub type ConnectionIndex = usize;

/// A directed edge between two towers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Connection {
    /// Source tower.
    pub from: TowerId,
    /// Destination tower.
    pub to: TowerId,
    /// Attack traffic when `true`, support traffic otherwise.
    pub is_attack: bool,
}

impl Connection {
    /// Create a connection; attack iff the endpoints have different owners.
    #[must_use]
    pub fn between(towers: &[Tower], from: TowerId, to: TowerId) -> Option<Self> {
        let source = towers.get(from)?;
        let target = towers.get(to)?;
        Some(Self {
            from,
            to,
            is_attack: source.owner != target.owner,
        })
    }
}

/// Whether no obstacle blocks the straight line from `a` to `b`.
#[must_use]
pub fn line_of_sight_clear(a: Vec2Fixed, b: Vec2Fixed, obstacles: &[Obstacle]) -> bool {
    !obstacles
        .iter()
        .any(|obstacle| segment_intersects_rect(a, b, &obstacle.bounds))
}

/// Ordered collection of connections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSet {
    connections: Vec<Connection>,
}

impl ConnectionSet {
    /// Create an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Whether there are no connections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Connection at `index`.
    #[must_use]
    pub fn get(&self, index: ConnectionIndex) -> Option<&Connection> {
        self.connections.get(index)
    }

    /// Connections in firing order.
    pub fn iter(&self) -> impl Iterator<Item = &Connection> {
        self.connections.iter()
    }

    /// Connections as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[Connection] {
        &self.connections
    }

    /// Number of connections leaving `tower`.
    #[must_use]
    pub fn out_degree(&self, tower: TowerId) -> usize {
        self.connections.iter().filter(|c| c.from == tower).count()
    }

    /// Whether `from -> to` already exists.
    #[must_use]
    pub fn contains(&self, from: TowerId, to: TowerId) -> bool {
        self.connections
            .iter()
            .any(|c| c.from == from && c.to == to)
    }

    /// Check whether `from -> to` could be added without changing anything.
    pub fn validate(
        &self,
        towers: &[Tower],
        obstacles: &[Obstacle],
        from: TowerId,
        to: TowerId,
        max_out_degree: usize,
    ) -> Result<(), Rejection> {
        if from == to {
            return Err(Rejection::SelfConnection(from));
        }
        let source = towers.get(from).ok_or(Rejection::UnknownTower(from))?;
        let target = towers.get(to).ok_or(Rejection::UnknownTower(to))?;

        if !line_of_sight_clear(source.position, target.position, obstacles) {
            return Err(Rejection::LineOfSightBlocked { from, to });
        }
        if self.contains(from, to) {
            return Err(Rejection::DuplicateConnection { from, to });
        }
        if self.out_degree(from) >= max_out_degree {
            return Err(Rejection::OutDegreeExceeded(from));
        }
        Ok(())
    }

    /// Add `from -> to` if every invariant holds. Returns its index.
    pub fn propose(
        &mut self,
        towers: &[Tower],
        obstacles: &[Obstacle],
        from: TowerId,
        to: TowerId,
        max_out_degree: usize,
    ) -> Result<ConnectionIndex, Rejection> {
        self.validate(towers, obstacles, from, to, max_out_degree)?;
        let connection =
            Connection::between(towers, from, to).ok_or(Rejection::UnknownTower(from))?;
        self.connections.push(connection);
        Ok(self.connections.len() - 1)
    }

    /// Remove the connection at `index`.
    pub fn remove(&mut self, index: ConnectionIndex) -> Result<Connection, Rejection> {
        if index >= self.connections.len() {
            return Err(Rejection::UnknownConnection(index));
        }
        Ok(self.connections.remove(index))
    }

    /// Put a previously removed connection back at `index`.
    ///
    /// The index is clamped to the current length. Invariants are re-checked
    /// except line of sight, which cannot change after world generation.
    pub fn reinsert(
        &mut self,
        index: ConnectionIndex,
        connection: Connection,
        max_out_degree: usize,
    ) -> Result<ConnectionIndex, Rejection> {
        if self.contains(connection.from, connection.to) {
            return Err(Rejection::DuplicateConnection {
                from: connection.from,
                to: connection.to,
            });
        }
        if self.out_degree(connection.from) >= max_out_degree {
            return Err(Rejection::OutDegreeExceeded(connection.from));
        }
        let index = index.min(self.connections.len());
        self.connections.insert(index, connection);
        Ok(index)
    }

    /// Turn attack connections into `tower` into support connections when
    /// their source now shares the tower's owner.
    ///
    /// Returns the number of connections flipped.
    pub fn convert_to_support(&mut self, towers: &[Tower], tower: TowerId) -> usize {
        let Some(owner) = towers.get(tower).map(|t| t.owner) else {
            return 0;
        };

        let mut flipped = 0;
        for connection in self.connections.iter_mut() {
            if connection.to == tower
                && connection.is_attack
                && source_owner(towers, connection.from) == Some(owner)
            {
                connection.is_attack = false;
                flipped += 1;
            }
        }
        flipped
    }
}

fn source_owner(towers: &[Tower], id: TowerId) -> Option<Owner> {
    towers.get(id).map(|t| t.owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TowerKind;
    use crate::math::Fixed;
    use crate::rules::GameRules;

    fn towers() -> Vec<Tower> {
        let rules = GameRules::default();
        vec![
            Tower::new(Vec2Fixed::from_ints(100, 300), Owner::Player1, TowerKind::Basic, &rules),
            Tower::new(Vec2Fixed::from_ints(700, 300), Owner::Ai, TowerKind::Basic, &rules),
            Tower::new(Vec2Fixed::from_ints(400, 100), Owner::Neutral, TowerKind::Magic, &rules),
            Tower::new(Vec2Fixed::from_ints(400, 500), Owner::Player1, TowerKind::Archer, &rules),
        ]
    }

    fn wall() -> Obstacle {
        Obstacle::new(Vec2Fixed::from_ints(380, 280), Fixed::from_num(40))
    }

    #[test]
    fn test_propose_sets_attack_by_owner() {
        let towers = towers();
        let mut set = ConnectionSet::new();
        let attack = set.propose(&towers, &[], 0, 1, 2).unwrap();
        let support = set.propose(&towers, &[], 0, 3, 2).unwrap();
        assert!(set.get(attack).unwrap().is_attack);
        assert!(!set.get(support).unwrap().is_attack);
    }

    #[test]
    fn test_self_connection_rejected() {
        let towers = towers();
        let mut set = ConnectionSet::new();
        assert_eq!(
            set.propose(&towers, &[], 2, 2, 2),
            Err(Rejection::SelfConnection(2))
        );
        assert!(set.is_empty());
    }

    #[test]
    fn test_unknown_tower_rejected() {
        let towers = towers();
        let mut set = ConnectionSet::new();
        assert_eq!(
            set.propose(&towers, &[], 0, 9, 2),
            Err(Rejection::UnknownTower(9))
        );
    }

    #[test]
    fn test_duplicate_rejected() {
        let towers = towers();
        let mut set = ConnectionSet::new();
        set.propose(&towers, &[], 0, 2, 2).unwrap();
        assert_eq!(
            set.propose(&towers, &[], 0, 2, 2),
            Err(Rejection::DuplicateConnection { from: 0, to: 2 })
        );
        // The reverse direction is a different pair.
        assert!(set.propose(&towers, &[], 2, 0, 2).is_ok());
    }

    #[test]
    fn test_out_degree_limit() {
        let towers = towers();
        let mut set = ConnectionSet::new();
        set.propose(&towers, &[], 0, 1, 2).unwrap();
        set.propose(&towers, &[], 0, 2, 2).unwrap();
        assert_eq!(
            set.propose(&towers, &[], 0, 3, 2),
            Err(Rejection::OutDegreeExceeded(0))
        );
        assert_eq!(set.out_degree(0), 2);
        // A saturated source can still be a destination.
        assert!(set.propose(&towers, &[], 1, 0, 2).is_ok());
    }

    #[test]
    fn test_obstacle_blocks_line_of_sight() {
        let towers = towers();
        let mut set = ConnectionSet::new();
        assert_eq!(
            set.propose(&towers, &[wall()], 0, 1, 2),
            Err(Rejection::LineOfSightBlocked { from: 0, to: 1 })
        );
        assert!(set.propose(&towers, &[wall()], 0, 2, 2).is_ok());
    }

    #[test]
    fn test_remove_and_reinsert_restores_order() {
        let towers = towers();
        let mut set = ConnectionSet::new();
        set.propose(&towers, &[], 0, 1, 2).unwrap();
        set.propose(&towers, &[], 2, 1, 2).unwrap();
        set.propose(&towers, &[], 3, 1, 2).unwrap();
        let before = set.clone();

        let removed = set.remove(1).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.reinsert(1, removed, 2), Ok(1));
        assert_eq!(set, before);
    }

    #[test]
    fn test_remove_out_of_range() {
        let mut set = ConnectionSet::new();
        assert_eq!(set.remove(0), Err(Rejection::UnknownConnection(0)));
    }

    #[test]
    fn test_convert_to_support_after_capture() {
        let mut towers = towers();
        let mut set = ConnectionSet::new();
        set.propose(&towers, &[], 0, 2, 2).unwrap();
        set.propose(&towers, &[], 1, 2, 2).unwrap();

        towers[2].owner = Owner::Player1;
        assert_eq!(set.convert_to_support(&towers, 2), 1);
        assert!(!set.get(0).unwrap().is_attack);
        assert!(set.get(1).unwrap().is_attack);
    }
}
