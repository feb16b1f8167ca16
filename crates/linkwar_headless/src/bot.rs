//! Scripted player for headless playtesting.
//!
//! The bot plays the human side the same greedy way the built-in AI plays
//! its own: every `interval_ticks` it picks its strongest tower that can
//! still open a connection and aims it at the best target by
//! [`choose_target`]. In multiplayer it plays whichever side has the turn
//! and passes when it has nothing useful to do.

use linkwar_core::ai::choose_target;
use linkwar_core::components::TowerId;
use linkwar_core::game::{Command, CommandOutcome, Game};
use linkwar_core::map_generation::GameMode;

use crate::input::acting_player;

/// Default decision interval: one second of game time.
pub const DEFAULT_BOT_INTERVAL: u64 = 60;

/// Greedy scripted player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GreedyBot {
    interval_ticks: u64,
}

impl Default for GreedyBot {
    fn default() -> Self {
        Self::new(DEFAULT_BOT_INTERVAL)
    }
}

impl GreedyBot {
    /// Bot that decides every `interval_ticks` ticks. Zero is clamped to one.
    #[must_use]
    pub fn new(interval_ticks: u64) -> Self {
        Self {
            interval_ticks: interval_ticks.max(1),
        }
    }

    /// Ticks between decisions.
    #[must_use]
    pub const fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    /// Whether the bot wants to act on the current tick.
    #[must_use]
    pub fn is_due(&self, game: &Game) -> bool {
        game.simulation().get_tick() % self.interval_ticks == 0
    }

    /// The command the bot would issue now, if any.
    #[must_use]
    pub fn decide(&self, game: &Game) -> Option<Command> {
        let sim = game.simulation();
        let actor = acting_player(game);

        let mut sources: Vec<TowerId> = sim
            .towers()
            .iter()
            .enumerate()
            .filter(|(_, tower)| tower.owner == actor)
            .map(|(id, _)| id)
            .collect();
        // Strongest first; stable sort keeps lower ids ahead on ties.
        sources.sort_by(|&a, &b| sim.towers()[b].strength.cmp(&sim.towers()[a].strength));

        let connect = sources.into_iter().find_map(|from| {
            let to = choose_target(sim, from)?;
            sim.can_connect(from, to).ok()?;
            Some(Command::Connect { actor, from, to })
        });

        match (connect, game.mode()) {
            (Some(command), _) => Some(command),
            (None, GameMode::Multiplayer) => Some(Command::PassTurn { actor }),
            (None, GameMode::Singleplayer) => None,
        }
    }

    /// Decide and apply, if due. Returns the command and what became of it.
    pub fn step(&self, game: &mut Game) -> Option<(Command, CommandOutcome)> {
        if !self.is_due(game) || game.is_paused() || game.simulation().is_over() {
            return None;
        }
        let command = self.decide(game)?;
        let outcome = game.apply_command(command);
        tracing::trace!(?command, ?outcome, "Bot acted");
        Some((command, outcome))
    }
}
