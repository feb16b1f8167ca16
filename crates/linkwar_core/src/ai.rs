//! Computer opponent.
//!
//! The AI is greedy and stateless: every decision looks at the current
//! world only. Each sufficiently strong AI tower targets the human tower
//! with the best strength advantage per unit of distance and proposes an
//! attack connection to it. Whether the connection is accepted is up to
//! the usual connection rules.

use crate::components::{Owner, TowerId};
use crate::connections::{line_of_sight_clear, ConnectionIndex};
use crate::math::Fixed;
use crate::simulation::Simulation;

/// Run one AI decision round. Returns the indices of new connections.
pub fn run_ai_decision(sim: &mut Simulation) -> Vec<ConnectionIndex> {
    let threshold = sim.rules().ai_attack_threshold();
    let attackers: Vec<TowerId> = sim
        .towers()
        .iter()
        .enumerate()
        .filter(|(_, t)| t.owner == Owner::Ai && t.strength > threshold)
        .map(|(id, _)| id)
        .collect();

    let mut created = Vec::new();
    for attacker in attackers {
        let Some(target) = choose_target(sim, attacker) else {
            continue;
        };
        match sim.propose_connection(attacker, target) {
            Ok(index) => {
                tracing::debug!(tick = sim.get_tick(), attacker, target, "AI opened connection");
                created.push(index);
            }
            Err(reason) => {
                tracing::trace!(attacker, target, %reason, "AI proposal rejected");
            }
        }
    }
    created
}

/// Best target for `attacker`, if any is visible.
///
/// Enemy towers are preferred; when none remain every tower the attacker
/// does not own is a candidate. Ties keep the lowest tower id. Works for
/// any owner, so scripted players can reuse it.
#[must_use]
pub fn choose_target(sim: &Simulation, attacker: TowerId) -> Option<TowerId> {
    let towers = sim.towers();
    let source = towers.get(attacker)?;
    let owner = source.owner;

    let is_enemy = |other: Owner| other != owner && other != Owner::Neutral;
    let any_enemy = towers.iter().any(|t| is_enemy(t.owner));
    let is_candidate = |other: Owner| {
        if any_enemy {
            is_enemy(other)
        } else {
            other != owner
        }
    };

    let mut best: Option<(Fixed, TowerId)> = None;
    for (id, target) in towers.iter().enumerate() {
        if id == attacker || !is_candidate(target.owner) {
            continue;
        }
        if !line_of_sight_clear(source.position, target.position, sim.obstacles()) {
            continue;
        }
        let distance = source.position.distance(target.position);
        if distance == Fixed::ZERO {
            continue;
        }

        let score = (source.strength - target.strength) / distance;
        if best.map_or(true, |(best_score, _)| score > best_score) {
            best = Some((score, id));
        }
    }

    best.map(|(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Obstacle, Tower, TowerKind};
    use crate::map_generation::GameMode;
    use crate::math::Vec2Fixed;
    use crate::rules::GameRules;

    fn tower(x: i32, y: i32, owner: Owner, strength: i32) -> Tower {
        Tower::new(
            Vec2Fixed::from_ints(x, y),
            owner,
            TowerKind::Basic,
            &GameRules::default(),
        )
        .with_strength(Fixed::from_num(strength))
    }

    fn sim(towers: Vec<Tower>, obstacles: Vec<Obstacle>) -> Simulation {
        Simulation::from_parts(GameMode::Singleplayer, GameRules::default(), towers, obstacles)
    }

    #[test]
    fn test_picks_best_ratio() {
        let mut sim = sim(
            vec![
                tower(100, 300, Owner::Player1, 10),
                tower(700, 300, Owner::Ai, 15),
                tower(400, 300, Owner::Player1, 2),
                tower(650, 300, Owner::Neutral, 1),
            ],
            Vec::new(),
        );
        assert_eq!(choose_target(&sim, 1), Some(2));

        let created = run_ai_decision(&mut sim);
        assert_eq!(created, vec![0]);
        let connection = sim.connections().get(0).unwrap();
        assert_eq!((connection.from, connection.to), (1, 2));
        assert!(connection.is_attack);
    }

    #[test]
    fn test_weak_towers_stay_idle() {
        let mut sim = sim(
            vec![
                tower(100, 300, Owner::Player1, 10),
                tower(700, 300, Owner::Ai, 10),
            ],
            Vec::new(),
        );
        // Exactly half of max strength is not enough.
        assert!(run_ai_decision(&mut sim).is_empty());
        assert!(sim.connections().is_empty());
    }

    #[test]
    fn test_blocked_targets_skipped() {
        let sim = sim(
            vec![
                tower(100, 300, Owner::Player1, 1),
                tower(700, 300, Owner::Ai, 15),
                tower(700, 600, Owner::Player1, 12),
            ],
            vec![Obstacle::new(Vec2Fixed::from_ints(380, 280), Fixed::from_num(40))],
        );
        assert_eq!(choose_target(&sim, 1), Some(2));
    }

    #[test]
    fn test_falls_back_to_neutrals() {
        let sim = sim(
            vec![
                tower(100, 300, Owner::Neutral, 5),
                tower(700, 300, Owner::Ai, 15),
                tower(600, 300, Owner::Ai, 1),
            ],
            Vec::new(),
        );
        assert_eq!(choose_target(&sim, 1), Some(0));
    }

    #[test]
    fn test_ties_keep_first() {
        let sim = sim(
            vec![
                tower(400, 100, Owner::Player1, 5),
                tower(400, 300, Owner::Ai, 15),
                tower(400, 500, Owner::Player1, 5),
            ],
            Vec::new(),
        );
        assert_eq!(choose_target(&sim, 1), Some(0));
    }

    #[test]
    fn test_repeated_decisions_respect_connection_rules() {
        let mut sim = sim(
            vec![
                tower(100, 300, Owner::Player1, 10),
                tower(700, 300, Owner::Ai, 15),
            ],
            Vec::new(),
        );
        assert_eq!(run_ai_decision(&mut sim).len(), 1);
        // Duplicate proposal is rejected silently.
        assert!(run_ai_decision(&mut sim).is_empty());
        assert_eq!(sim.connections().len(), 1);
    }
}
