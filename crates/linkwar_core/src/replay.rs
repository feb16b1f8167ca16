//! Replay system for recording and playing back games.
//!
//! A replay stores the world configuration, the rules and every applied
//! command with the tick it was issued on. The world is regenerated from
//! the seed on playback, so a replay is a few hundred bytes no matter how
//! long the game ran.
//!
//! Only applied commands should be recorded. Rejections depend on the pause
//! flag, which playback does not reproduce.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GameError, Result};
use crate::game::{Command, Game};
use crate::map_generation::MapConfig;
use crate::rules::GameRules;

/// A single command record for replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplayCommand {
    /// Simulation tick the command was applied on, before that tick ran.
    pub tick: u64,
    /// The command that was applied.
    pub command: Command,
}

/// Replay file format version for compatibility.
pub const REPLAY_VERSION: u32 = 1;

/// Complete replay data structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replay {
    /// Replay format version.
    pub version: u32,
    /// World configuration, including the seed.
    pub config: MapConfig,
    /// Rules the game ran with.
    pub rules: GameRules,
    /// Stream of commands in tick order.
    pub commands: Vec<ReplayCommand>,
    /// Tick the recording stopped at.
    pub final_tick: u64,
    /// State hash at `final_tick`.
    pub final_hash: u64,
}

impl Replay {
    /// Start a recording for a game about to begin.
    #[must_use]
    pub const fn new(config: MapConfig, rules: GameRules) -> Self {
        Self {
            version: REPLAY_VERSION,
            config,
            rules,
            commands: Vec::new(),
            final_tick: 0,
            final_hash: 0,
        }
    }

    /// Start a recording matching a fresh game.
    #[must_use]
    pub fn for_game(game: &Game) -> Self {
        Self::new(game.config().clone(), game.simulation().rules().clone())
    }

    /// Record an applied command.
    pub fn record(&mut self, tick: u64, command: Command) {
        debug_assert!(
            self.commands.last().map_or(true, |last| last.tick <= tick),
            "commands must be recorded in tick order"
        );
        self.commands.push(ReplayCommand { tick, command });
    }

    /// Finalize the replay with end-game state.
    pub fn finalize(&mut self, game: &Game) {
        self.final_tick = game.simulation().get_tick();
        self.final_hash = game.simulation().state_hash();
    }

    /// Get commands for a specific tick.
    pub fn commands_at_tick(&self, tick: u64) -> impl Iterator<Item = &ReplayCommand> {
        self.commands.iter().filter(move |c| c.tick == tick)
    }

    /// Encode as bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| GameError::InvalidState(format!("Failed to serialize replay: {e}")))
    }

    /// Decode bytes written by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    /// Fails on malformed data or a version mismatch.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let replay: Self = bincode::deserialize(bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to deserialize replay: {e}")))?;

        if replay.version != REPLAY_VERSION {
            return Err(GameError::ReplayVersionMismatch {
                expected: REPLAY_VERSION,
                found: replay.version,
            });
        }
        Ok(replay)
    }

    /// Save the replay to a file.
    ///
    /// # Errors
    /// Returns an error if serialization or file writing fails.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.to_bytes()?;
        std::fs::write(path.as_ref(), bytes)
            .map_err(|e| GameError::InvalidState(format!("Failed to write replay file: {e}")))
    }

    /// Load a replay from a file.
    ///
    /// # Errors
    /// Returns an error if file reading or deserialization fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path.as_ref())
            .map_err(|e| GameError::InvalidState(format!("Failed to read replay file: {e}")))?;
        Self::from_bytes(&bytes)
    }

    /// Get the total duration of the replay in ticks.
    #[must_use]
    pub const fn duration(&self) -> u64 {
        self.final_tick
    }

    /// Get the total number of commands in the replay.
    #[must_use]
    pub fn command_count(&self) -> usize {
        self.commands.len()
    }
}

/// Replay playback controller.
#[derive(Debug)]
pub struct ReplayPlayer {
    replay: Replay,
    game: Game,
    /// Freshly generated world, kept for seeking backwards.
    initial: Game,
    /// Index into the command stream.
    command_index: usize,
    /// Whether playback is paused.
    pub paused: bool,
}

impl ReplayPlayer {
    /// Regenerate the recorded world and apply the tick-0 commands.
    ///
    /// Fails when the recorded config or rules cannot produce a world.
    pub fn new(replay: Replay) -> Result<Self> {
        let initial = Game::new(replay.config.clone(), replay.rules.clone())?;
        let mut player = Self {
            replay,
            game: initial.clone(),
            initial,
            command_index: 0,
            paused: false,
        };
        player.apply_due_commands();
        Ok(player)
    }

    /// Apply every command recorded for the current tick.
    fn apply_due_commands(&mut self) {
        let tick = self.game.simulation().get_tick();
        while let Some(record) = self.replay.commands.get(self.command_index) {
            if record.tick > tick {
                break;
            }
            let outcome = self.game.apply_command(record.command);
            if let Some(reason) = outcome.rejection() {
                tracing::warn!(tick, command = ?record.command, %reason, "Recorded command rejected on playback");
            }
            self.command_index += 1;
        }
    }

    /// Advance the replay by one tick.
    ///
    /// Returns true if there are more ticks to play.
    pub fn advance(&mut self) -> bool {
        if !self.paused && !self.is_finished() {
            self.game.advance();
            self.apply_due_commands();
        }
        !self.is_finished()
    }

    /// Restart playback and run forward to `target_tick`.
    pub fn seek(&mut self, target_tick: u64) {
        let paused = self.paused;
        self.game = self.initial.clone();
        self.command_index = 0;
        self.paused = false;
        self.apply_due_commands();
        while self.current_tick() < target_tick && self.advance() {}
        self.paused = paused;
    }

    /// Get the current tick.
    #[must_use]
    pub const fn current_tick(&self) -> u64 {
        self.game.simulation().get_tick()
    }

    /// Game being played back.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Get the replay being played.
    #[must_use]
    pub const fn replay(&self) -> &Replay {
        &self.replay
    }

    /// Check if the replay has finished.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.current_tick() >= self.replay.final_tick || self.game.simulation().is_over()
    }

    /// Play to the end and compare against the recorded hash.
    ///
    /// # Errors
    /// [`GameError::DesyncDetected`] if the final state differs.
    pub fn verify(&mut self) -> Result<()> {
        self.paused = false;
        while self.advance() {}

        let actual_hash = self.game.simulation().state_hash();
        if actual_hash == self.replay.final_hash && self.current_tick() == self.replay.final_tick {
            Ok(())
        } else {
            Err(GameError::DesyncDetected {
                tick: self.current_tick(),
                expected_hash: self.replay.final_hash,
                actual_hash,
            })
        }
    }

    /// Toggle pause state.
    pub fn toggle_pause(&mut self) {
        self.paused = !self.paused;
    }

    /// Get progress as a percentage (0-100).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_percent(&self) -> f64 {
        if self.replay.final_tick == 0 {
            100.0
        } else {
            (self.current_tick() as f64 / self.replay.final_tick as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Owner;
    use crate::game::CommandOutcome;

    /// Play a short scripted game, recording applied commands.
    fn record_game(ticks: u64) -> (Replay, Game) {
        let mut game = Game::new(MapConfig::default().with_seed(99), GameRules::default()).unwrap();
        let mut replay = Replay::for_game(&game);

        let script = [
            (0, Command::Connect { actor: Owner::Player1, from: 0, to: 2 }),
            (10, Command::Connect { actor: Owner::Player1, from: 0, to: 3 }),
            (40, Command::Disconnect { actor: Owner::Player1, index: 0 }),
            (45, Command::Undo { actor: Owner::Player1 }),
        ];

        for tick in 0..ticks {
            for (_, command) in script.iter().filter(|(t, _)| *t == tick) {
                if game.apply_command(*command) == CommandOutcome::Applied {
                    replay.record(tick, *command);
                }
            }
            game.advance();
        }
        replay.finalize(&game);
        (replay, game)
    }

    #[test]
    fn test_replay_verifies() {
        let (replay, game) = record_game(300);
        assert_eq!(replay.final_tick, game.simulation().get_tick());

        let mut player = ReplayPlayer::new(replay).unwrap();
        assert!(player.verify().is_ok());
        assert_eq!(
            player.game().simulation().state_hash(),
            game.simulation().state_hash()
        );
    }

    #[test]
    fn test_tampered_replay_desyncs() {
        let (mut replay, _) = record_game(200);
        replay.final_hash ^= 1;
        let mut player = ReplayPlayer::new(replay).unwrap();
        assert!(matches!(
            player.verify(),
            Err(GameError::DesyncDetected { tick: 200, .. })
        ));
    }

    #[test]
    fn test_oversized_replay_config_rejected() {
        let replay = Replay::new(MapConfig::with_size(100_000, 720), GameRules::default());
        assert!(matches!(
            ReplayPlayer::new(replay),
            Err(GameError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_commands_at_tick() {
        let mut replay = Replay::new(MapConfig::default(), GameRules::default());
        replay.record(0, Command::PassTurn { actor: Owner::Player1 });
        replay.record(5, Command::Undo { actor: Owner::Player1 });
        replay.record(5, Command::PassTurn { actor: Owner::Player2 });
        assert_eq!(replay.command_count(), 3);
        assert_eq!(replay.commands_at_tick(5).count(), 2);
        assert_eq!(replay.commands_at_tick(7).count(), 0);
    }

    #[test]
    fn test_replay_save_load() {
        let (replay, _) = record_game(60);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("game.replay");

        replay.save(&path).unwrap();
        let loaded = Replay::load(&path).unwrap();
        assert_eq!(loaded, replay);
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut replay = Replay::new(MapConfig::default(), GameRules::default());
        replay.version = REPLAY_VERSION + 1;
        let bytes = replay.to_bytes().unwrap();
        assert!(matches!(
            Replay::from_bytes(&bytes),
            Err(GameError::ReplayVersionMismatch { found, .. }) if found == REPLAY_VERSION + 1
        ));
    }

    #[test]
    fn test_player_seek_and_pause() {
        let (replay, _) = record_game(100);
        let mut player = ReplayPlayer::new(replay).unwrap();

        player.seek(50);
        assert_eq!(player.current_tick(), 50);
        assert!((player.progress_percent() - 50.0).abs() < 0.01);

        player.toggle_pause();
        player.advance();
        assert_eq!(player.current_tick(), 50);
        player.toggle_pause();
        player.advance();
        assert_eq!(player.current_tick(), 51);

        player.seek(10);
        assert_eq!(player.current_tick(), 10);
    }
}
