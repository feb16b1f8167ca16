//! Turn and command layer.
//!
//! [`Game`] wraps a [`Simulation`] with everything that is about players
//! rather than physics: who may act, the pause flag, the single-slot undo
//! buffer and the scheduler that drives ticks and AI decisions.
//!
//! Invalid commands never fail. They leave the game untouched and come
//! back as [`CommandOutcome::Ignored`] with the reason attached.

use serde::{Deserialize, Serialize};

use crate::ai;
use crate::components::{Owner, TowerId};
use crate::connections::{Connection, ConnectionIndex};
use crate::error::{self, Rejection};
use crate::map_generation::{generate_map, GameMode, MapConfig};
use crate::rules::GameRules;
use crate::simulation::{GameSummary, Simulation, TickEvents};

/// A player action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Link `from` to `to`.
    Connect {
        /// Acting player.
        actor: Owner,
        /// Source tower, owned by the actor.
        from: TowerId,
        /// Destination tower.
        to: TowerId,
    },
    /// Remove the connection at `index`.
    Disconnect {
        /// Acting player.
        actor: Owner,
        /// Connection to remove; its source must be owned by the actor.
        index: ConnectionIndex,
    },
    /// Hand the turn to the other player (multiplayer).
    PassTurn {
        /// Acting player.
        actor: Owner,
    },
    /// Restore the most recently removed connection.
    Undo {
        /// Acting player.
        actor: Owner,
    },
}

impl Command {
    /// Player issuing the command.
    #[must_use]
    pub const fn actor(&self) -> Owner {
        match *self {
            Self::Connect { actor, .. }
            | Self::Disconnect { actor, .. }
            | Self::PassTurn { actor }
            | Self::Undo { actor } => actor,
        }
    }
}

/// Result of applying a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum CommandOutcome {
    /// The command changed the game.
    Applied,
    /// The command was a no-op.
    Ignored(Rejection),
}

impl CommandOutcome {
    /// Whether the command changed the game.
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    /// Why the command was ignored, if it was.
    #[must_use]
    pub const fn rejection(self) -> Option<Rejection> {
        match self {
            Self::Applied => None,
            Self::Ignored(reason) => Some(reason),
        }
    }
}

/// The last connection removal, restorable for a limited time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UndoRecord {
    /// Removed connection.
    pub connection: Connection,
    /// Index it was removed from.
    pub index: ConnectionIndex,
    /// Player that removed it.
    pub actor: Owner,
    /// Turn owner before the removal.
    pub previous_player: Owner,
    /// Scheduler steps left before the record expires.
    pub ticks_remaining: u64,
}

/// A running game: simulation plus players, pause and undo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    config: MapConfig,
    simulation: Simulation,
    current_player: Owner,
    paused: bool,
    undo: Option<UndoRecord>,
}

impl Game {
    /// Generate a world and start a game on it.
    ///
    /// Fails when the rules or the map config are invalid.
    pub fn new(config: MapConfig, rules: GameRules) -> error::Result<Self> {
        rules.validate()?;
        let map = generate_map(config.clone(), &rules)?;
        Ok(Self::from_simulation(config, Simulation::new(map, rules)))
    }

    /// Wrap an existing simulation. `config` is used by [`restart`](Self::restart).
    #[must_use]
    pub const fn from_simulation(config: MapConfig, simulation: Simulation) -> Self {
        Self {
            config,
            simulation,
            current_player: Owner::Player1,
            paused: false,
            undo: None,
        }
    }

    /// Underlying simulation.
    #[must_use]
    pub const fn simulation(&self) -> &Simulation {
        &self.simulation
    }

    /// Map configuration of the current world.
    #[must_use]
    pub const fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Game mode.
    #[must_use]
    pub const fn mode(&self) -> GameMode {
        self.simulation.mode()
    }

    /// Player whose turn it is. Always player1 in singleplayer.
    #[must_use]
    pub const fn current_player(&self) -> Owner {
        self.current_player
    }

    /// Whether the scheduler is suspended.
    #[must_use]
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Pending undo, if one is still live.
    #[must_use]
    pub const fn undo_record(&self) -> Option<&UndoRecord> {
        self.undo.as_ref()
    }

    /// Tower counts and scores.
    #[must_use]
    pub fn summary(&self) -> GameSummary {
        self.simulation.summary()
    }

    /// Suspend ticks, AI decisions and undo expiry.
    pub fn pause(&mut self) {
        if !self.paused {
            tracing::debug!(tick = self.simulation.get_tick(), "Game paused");
        }
        self.paused = true;
    }

    /// Resume after [`pause`](Self::pause).
    pub fn resume(&mut self) {
        if self.paused {
            tracing::debug!(tick = self.simulation.get_tick(), "Game resumed");
        }
        self.paused = false;
    }

    /// Replace the whole game with a fresh world generated from the next seed.
    ///
    /// Rules, size, difficulty and mode carry over. On error the current
    /// game is left untouched.
    pub fn restart(&mut self) -> error::Result<()> {
        let config = self
            .config
            .clone()
            .with_seed(self.config.seed.wrapping_add(1));
        let rules = self.simulation.rules().clone();
        tracing::info!(seed = config.seed, "Restarting game");
        *self = Self::new(config, rules)?;
        Ok(())
    }

    /// One scheduler step.
    ///
    /// Runs one simulation tick, then an AI round every
    /// `ai_interval_ticks` ticks (singleplayer only), then ages the undo
    /// record. Does nothing while paused or after the game is decided.
    pub fn advance(&mut self) -> TickEvents {
        if self.paused || self.simulation.is_over() {
            return TickEvents::default();
        }

        let mut events = self.simulation.tick();

        let interval = self.simulation.rules().ai_interval_ticks;
        if self.mode() == GameMode::Singleplayer
            && !self.simulation.is_over()
            && interval != 0
            && self.simulation.get_tick() % interval == 0
        {
            events.ai_connections = ai::run_ai_decision(&mut self.simulation);
            if !events.ai_connections.is_empty() {
                self.undo = None;
            }
        }

        if let Some(record) = self.undo.as_mut() {
            record.ticks_remaining = record.ticks_remaining.saturating_sub(1);
            if record.ticks_remaining == 0 {
                tracing::debug!("Undo window expired");
                self.undo = None;
            }
        }

        events
    }

    /// Apply a player command.
    pub fn apply_command(&mut self, command: Command) -> CommandOutcome {
        match self.try_apply(command) {
            Ok(()) => {
                tracing::debug!(?command, tick = self.simulation.get_tick(), "Command applied");
                CommandOutcome::Applied
            }
            Err(reason) => {
                tracing::debug!(?command, %reason, "Command ignored");
                CommandOutcome::Ignored(reason)
            }
        }
    }

    fn try_apply(&mut self, command: Command) -> Result<(), Rejection> {
        if self.simulation.is_over() {
            return Err(Rejection::GameOver);
        }
        if self.paused {
            return Err(Rejection::Paused);
        }

        match command {
            Command::Connect { actor, from, to } => {
                self.check_turn(actor)?;
                self.check_owner(actor, from)?;
                self.simulation.propose_connection(from, to)?;
                self.undo = None;
                self.end_turn();
            }
            Command::Disconnect { actor, index } => {
                self.check_turn(actor)?;
                let from = self
                    .simulation
                    .connections()
                    .get(index)
                    .ok_or(Rejection::UnknownConnection(index))?
                    .from;
                self.check_owner(actor, from)?;
                let connection = self.simulation.remove_connection(index)?;
                self.undo = Some(UndoRecord {
                    connection,
                    index,
                    actor,
                    previous_player: self.current_player,
                    ticks_remaining: self.simulation.rules().undo_window_ticks,
                });
                self.end_turn();
            }
            Command::PassTurn { actor } => {
                if self.mode() == GameMode::Singleplayer {
                    return Err(Rejection::WrongMode);
                }
                self.check_turn(actor)?;
                self.end_turn();
            }
            Command::Undo { actor } => {
                let record = self.undo.ok_or(Rejection::NothingToUndo)?;
                if record.actor != actor {
                    return Err(Rejection::NotYourTurn(actor));
                }
                // The record is spent whether or not the connection fits back.
                self.undo = None;
                self.simulation
                    .reinsert_connection(record.index, record.connection)?;
                self.current_player = record.previous_player;
            }
        }
        Ok(())
    }

    fn check_turn(&self, actor: Owner) -> Result<(), Rejection> {
        let allowed = match self.mode() {
            GameMode::Singleplayer => actor == Owner::Player1,
            GameMode::Multiplayer => actor == self.current_player,
        };
        if allowed {
            Ok(())
        } else {
            Err(Rejection::NotYourTurn(actor))
        }
    }

    fn check_owner(&self, actor: Owner, tower: TowerId) -> Result<(), Rejection> {
        let owner = self
            .simulation
            .tower(tower)
            .ok_or(Rejection::UnknownTower(tower))?
            .owner;
        if owner == actor {
            Ok(())
        } else {
            Err(Rejection::NotOwner { actor, tower })
        }
    }

    fn end_turn(&mut self) {
        if self.mode() == GameMode::Multiplayer {
            self.current_player = self.current_player.other_player();
        }
    }
}
