//! # Linkwar Core
//!
//! Deterministic simulation core for Linkwar, a territory-capture game where
//! towers pour attack and support units into each other along directed links.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO outside replay files
//! - No system randomness
//! - No floating-point math (uses fixed-point)
//!
//! This separation enables:
//! - Headless runners and bots
//! - Replay systems
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`geometry`] - Distance and intersection tests
//! - [`map_generation`] - Seeded world generation
//! - [`components`] - Towers, obstacles and units
//! - [`connections`] - Directed links and their invariants
//! - [`simulation`] - Core tick loop
//! - [`game`] - Commands, turns, pause, undo and the scheduler
//! - [`ai`] - Computer opponent
//! - [`rules`] - Tunable constants
//! - [`replay`] - Command-stream recording and verified playback
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod components;
pub mod connections;
pub mod error;
pub mod game;
pub mod geometry;
pub mod map_generation;
pub mod math;
pub mod replay;
pub mod rules;
pub mod simulation;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::{Obstacle, Owner, Tower, TowerId, TowerKind, Unit};
    pub use crate::connections::{Connection, ConnectionIndex, ConnectionSet};
    pub use crate::error::{GameError, Rejection, Result};
    pub use crate::game::{Command, CommandOutcome, Game};
    pub use crate::map_generation::{generate_map, Difficulty, GameMode, GeneratedMap, MapConfig};
    pub use crate::math::{Fixed, Vec2Fixed};
    pub use crate::replay::{Replay, ReplayPlayer};
    pub use crate::rules::GameRules;
    pub use crate::simulation::{GameSummary, Outcome, Simulation, TickEvents};
}
