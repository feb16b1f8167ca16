//! Error types for the game simulation.
//!
//! Player commands never fail with these errors: an invalid command is a
//! no-op described by [`Rejection`]. [`GameError`] covers the fallible
//! edges of the core (rule parsing, serialization, replays).

use thiserror::Error;

use crate::components::{Owner, TowerId};

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all game simulation errors.
#[derive(Debug, Error)]
pub enum GameError {
    /// Data file parsing error.
    #[error("Failed to parse data file '{path}': {message}")]
    DataParseError {
        /// Path to the file that failed to parse.
        path: String,
        /// Error message.
        message: String,
    },

    /// Rules parsed but describe an unplayable game.
    #[error("Invalid rules: {0}")]
    InvalidRules(String),

    /// Map configuration the generator cannot place a world on.
    #[error("Invalid map config: {0}")]
    InvalidConfig(String),

    /// Invalid game state.
    #[error("Invalid game state: {0}")]
    InvalidState(String),

    /// Replay file written by an incompatible format version.
    #[error("Replay version mismatch: expected {expected}, got {found}")]
    ReplayVersionMismatch {
        /// Version this build reads.
        expected: u32,
        /// Version stored in the file.
        found: u32,
    },

    /// Replay stream diverged from its recording.
    #[error("Desync detected at tick {tick}: expected hash {expected_hash}, got {actual_hash}")]
    DesyncDetected {
        /// Tick where desync occurred.
        tick: u64,
        /// Hash stored in the recording.
        expected_hash: u64,
        /// Hash produced by playback.
        actual_hash: u64,
    },
}

/// Why a command left the game unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    /// A tower cannot link to itself.
    #[error("tower {0} cannot connect to itself")]
    SelfConnection(TowerId),

    /// Tower index out of range.
    #[error("unknown tower {0}")]
    UnknownTower(TowerId),

    /// An obstacle lies on the straight line between the towers.
    #[error("line of sight from {from} to {to} is blocked")]
    LineOfSightBlocked {
        /// Source tower.
        from: TowerId,
        /// Destination tower.
        to: TowerId,
    },

    /// The ordered pair is already linked.
    #[error("tower {from} is already connected to {to}")]
    DuplicateConnection {
        /// Source tower.
        from: TowerId,
        /// Destination tower.
        to: TowerId,
    },

    /// The source has no free outgoing slot.
    #[error("tower {0} has reached its outgoing connection limit")]
    OutDegreeExceeded(TowerId),

    /// Connection index out of range.
    #[error("unknown connection {0}")]
    UnknownConnection(usize),

    /// The actor does not own the tower the action starts from.
    #[error("{actor} does not own tower {tower}")]
    NotOwner {
        /// Player that issued the command.
        actor: Owner,
        /// Tower the command started from.
        tower: TowerId,
    },

    /// The actor may not act right now.
    #[error("it is not {0}'s turn")]
    NotYourTurn(Owner),

    /// No removal is pending or it already expired.
    #[error("nothing to undo")]
    NothingToUndo,

    /// The command is meaningless in the current game mode.
    #[error("command not available in this game mode")]
    WrongMode,

    /// The game is paused.
    #[error("the game is paused")]
    Paused,

    /// The game has already been decided.
    #[error("the game is over")]
    GameOver,
}
