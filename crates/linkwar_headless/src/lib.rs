//! Headless game runner for scripted play and CI verification.
//!
//! This crate provides a headless game runner that can be controlled via
//! JSON commands on stdin, with game state output on stdout. This enables:
//!
//! - **Scripted play**: A controller can play the game without graphics
//! - **CI verification**: Automated testing of game logic and determinism
//! - **Replay verification**: Check that replays produce identical results
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: Commands from controller (tick, connect, pointer_down, etc.)
//! - **stdout**: State updates and responses (JSON)
//! - **stderr**: Debug logs (human-readable)
//!
//! See [`protocol`] module for the full command/response format.
//!
//! # Example
//!
//! ```bash
//! # Run interactively
//! echo '{"cmd":"tick","count":60}' | cargo run -p linkwar_headless
//!
//! # Run a scenario and record it
//! cargo run -p linkwar_headless -- run --scenario scenarios/duel.ron --record duel.replay
//!
//! # Verify determinism
//! cargo run -p linkwar_headless -- replay --file duel.replay --verify
//! ```

pub mod bot;
pub mod input;
pub mod protocol;
pub mod runner;
pub mod scenario;
pub mod verify;

pub use bot::GreedyBot;
pub use input::{PointerAction, PointerTranslator};
pub use protocol::{Command, Response};
pub use runner::{HeadlessConfig, HeadlessRunner, RunnerError};
pub use scenario::{Scenario, ScenarioError};
pub use verify::{benchmark, play_bot_game, run_batch, verify_determinism, GameReport};
