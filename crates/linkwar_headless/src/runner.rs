//! Headless game runner implementation.
//!
//! A blocking loop: read one JSON command per line, answer with one or more
//! JSON lines. Time only moves on `tick` commands, so a controller sees a
//! fully reproducible game.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use linkwar_core::error::{GameError, Rejection};
use linkwar_core::game::{Command as GameCommand, CommandOutcome, Game};
use linkwar_core::map_generation::{MapConfig, MAX_CANVAS_SIDE};
use linkwar_core::math::{Fixed, Vec2Fixed};
use linkwar_core::replay::Replay;
use thiserror::Error;

use crate::input::{acting_player, PointerAction, PointerTranslator};
use crate::protocol::{Command, Response};

/// How far outside the canvas a pointer may wander before it is refused.
pub const POINTER_MARGIN: f64 = 256.0;

/// Errors that end a headless session.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// Reading commands or writing responses failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// The recorded replay could not be saved.
    #[error("Failed to save replay: {0}")]
    Replay(#[from] GameError),
}

/// Headless runner configuration.
#[derive(Debug, Clone, Default)]
pub struct HeadlessConfig {
    /// Output state after every tick command (vs only on query).
    pub auto_state_output: bool,
    /// Write a replay of the session here on exit.
    pub record_path: Option<PathBuf>,
}

/// Headless runner for externally controlled games.
#[derive(Debug)]
pub struct HeadlessRunner {
    game: Game,
    config: HeadlessConfig,
    input: PointerTranslator,
    recording: Option<Replay>,
    quit: bool,
}

impl HeadlessRunner {
    /// Create a runner around a freshly created game.
    #[must_use]
    pub fn new(game: Game, config: HeadlessConfig) -> Self {
        let recording = config.record_path.as_ref().map(|_| Replay::for_game(&game));
        Self {
            game,
            config,
            input: PointerTranslator::new(),
            recording,
            quit: false,
        }
    }

    /// The game being played.
    #[must_use]
    pub const fn game(&self) -> &Game {
        &self.game
    }

    /// Replay recorded so far, when recording.
    #[must_use]
    pub const fn recording(&self) -> Option<&Replay> {
        self.recording.as_ref()
    }

    /// Whether a `quit` command was received.
    #[must_use]
    pub const fn has_quit(&self) -> bool {
        self.quit
    }

    /// Run the game loop until `quit` or end of input.
    ///
    /// Reads JSON commands from `reader`, writes responses to `writer`.
    pub fn run<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<(), RunnerError> {
        tracing::info!(
            seed = self.game.config().seed,
            mode = ?self.game.mode(),
            "Headless session started"
        );
        let ready = Response::ready(self.game.simulation().get_tick(), self.game.mode());
        writer.write_all(ready.to_json_line().as_bytes())?;
        writer.flush()?;

        for line in reader.lines() {
            let line = line?;
            for response in self.handle_line(&line) {
                writer.write_all(response.to_json_line().as_bytes())?;
            }
            writer.flush()?;
            if self.quit {
                break;
            }
        }

        self.save_recording()?;
        tracing::info!(tick = self.game.simulation().get_tick(), "Headless session ended");
        Ok(())
    }

    /// Parse and handle one input line. Blank lines produce no output.
    pub fn handle_line(&mut self, line: &str) -> Vec<Response> {
        let line = line.trim();
        if line.is_empty() {
            return Vec::new();
        }
        match Command::from_json(line) {
            Ok(command) => self.handle(command),
            Err(e) => {
                tracing::warn!(error = %e, "Unparseable command");
                vec![Response::error(format!("Parse error: {e}"), None)]
            }
        }
    }

    /// Handle one parsed command.
    pub fn handle(&mut self, command: Command) -> Vec<Response> {
        let name = command.name();
        tracing::debug!(cmd = name, "Handling command");

        match command {
            Command::Tick { count } => self.tick(count),
            Command::Query => vec![Response::state(&self.game)],
            Command::Connect { from, to, actor } => {
                let actor = actor.unwrap_or_else(|| acting_player(&self.game));
                vec![self.apply(name, GameCommand::Connect { actor, from, to })]
            }
            Command::Disconnect { index, actor } => {
                let actor = actor.unwrap_or_else(|| acting_player(&self.game));
                vec![self.apply(name, GameCommand::Disconnect { actor, index })]
            }
            Command::Pass { actor } => {
                let actor = actor.unwrap_or_else(|| acting_player(&self.game));
                vec![self.apply(name, GameCommand::PassTurn { actor })]
            }
            Command::Undo { actor } => {
                let actor = actor.unwrap_or_else(|| acting_player(&self.game));
                vec![self.apply(name, GameCommand::Undo { actor })]
            }
            Command::Pause => {
                self.game.pause();
                vec![Response::ack(name)]
            }
            Command::Resume => {
                self.game.resume();
                vec![Response::ack(name)]
            }
            Command::Restart => {
                if let Err(e) = self.game.restart() {
                    return vec![Response::error(e.to_string(), Some(name))];
                }
                self.input.reset();
                if self.recording.is_some() {
                    self.recording = Some(Replay::for_game(&self.game));
                }
                vec![Response::ack(name)]
            }
            Command::PointerDown { x, y } => match to_canvas(self.game.config(), x, y) {
                Some(point) => {
                    let action = self.input.pointer_down(&self.game, point);
                    vec![self.pointer_action(name, action)]
                }
                None => vec![out_of_range(name)],
            },
            Command::PointerUp { x, y } => match to_canvas(self.game.config(), x, y) {
                Some(point) => {
                    let action = self.input.pointer_up(&self.game, point);
                    vec![self.pointer_action(name, action)]
                }
                None => vec![out_of_range(name)],
            },
            Command::PointerMove { x, y } => match to_canvas(self.game.config(), x, y) {
                Some(point) => vec![Response::Hover {
                    tower: self.input.pointer_move(&self.game, point),
                }],
                None => vec![out_of_range(name)],
            },
            Command::Hash => {
                let sim = self.game.simulation();
                vec![Response::StateHash {
                    tick: sim.get_tick(),
                    hash: sim.state_hash(),
                }]
            }
            Command::Quit => {
                self.quit = true;
                vec![Response::Bye]
            }
        }
    }

    fn tick(&mut self, count: u32) -> Vec<Response> {
        if self.game.simulation().is_over() {
            return vec![Response::rejected("tick", Rejection::GameOver)];
        }
        if self.game.is_paused() {
            return vec![Response::rejected("tick", Rejection::Paused)];
        }

        let mut units_spawned = 0;
        let mut captures = Vec::new();
        let mut points = Vec::new();
        let mut victory = None;
        for _ in 0..count {
            let events = self.game.advance();
            units_spawned += events.units_spawned;
            captures.extend(events.captures);
            points.extend(events.points_awarded);
            if events.victory.is_some() {
                victory = events.victory;
                break;
            }
        }

        let tick = self.game.simulation().get_tick();
        let mut responses = vec![Response::Ticked {
            tick,
            units_spawned,
            captures,
            points,
            victory,
        }];
        if self.config.auto_state_output {
            responses.push(Response::state(&self.game));
        }
        if let Some(outcome) = victory {
            tracing::info!(tick, %outcome, "Game over");
            responses.push(Response::game_over(outcome, self.game.summary()));
        }
        responses
    }

    fn apply(&mut self, name: &str, command: GameCommand) -> Response {
        let tick = self.game.simulation().get_tick();
        match self.game.apply_command(command) {
            CommandOutcome::Applied => {
                if let Some(replay) = self.recording.as_mut() {
                    replay.record(tick, command);
                }
                Response::ack(name)
            }
            CommandOutcome::Ignored(reason) => Response::rejected(name, reason),
        }
    }

    fn pointer_action(&mut self, name: &str, action: PointerAction) -> Response {
        match action {
            PointerAction::None => Response::ack(name),
            PointerAction::Selected(tower) => Response::Selected { tower },
            PointerAction::Command(command) => self.apply(name, command),
        }
    }

    fn save_recording(&mut self) -> Result<(), RunnerError> {
        let (Some(replay), Some(path)) = (self.recording.as_mut(), self.config.record_path.as_ref())
        else {
            return Ok(());
        };
        replay.finalize(&self.game);
        replay.save(path)?;
        tracing::info!(
            path = %path.display(),
            commands = replay.command_count(),
            "Replay saved"
        );
        Ok(())
    }
}

/// Convert pointer coordinates, refusing points beyond the canvas margin.
fn to_canvas(config: &MapConfig, x: f64, y: f64) -> Option<Vec2Fixed> {
    let axis = |value: f64, side: u32| {
        let limit = f64::from(side.min(MAX_CANVAS_SIDE)) + POINTER_MARGIN;
        if (-POINTER_MARGIN..=limit).contains(&value) {
            Fixed::checked_from_num(value)
        } else {
            None
        }
    };
    Some(Vec2Fixed::new(axis(x, config.width)?, axis(y, config.height)?))
}

fn out_of_range(name: &str) -> Response {
    Response::error("Coordinates out of range", Some(name))
}
