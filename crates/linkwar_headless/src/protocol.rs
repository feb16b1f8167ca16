//! JSON protocol for headless game communication.
//!
//! The headless runner communicates via JSON lines (one JSON object per line):
//!
//! **Input (stdin):** Commands from the controller
//! **Output (stdout):** Game state updates and responses
//!
//! # Protocol Flow
//!
//! 1. Runner starts, outputs `{"type":"ready",...}`
//! 2. Controller sends commands as JSON lines
//! 3. Runner answers every command with exactly one line
//! 4. When a tick decides the game, a `game_over` line follows the `ticked` line
//!
//! # Example Session
//!
//! ```text
//! <- {"type":"ready","version":"1.0","tick":0,"mode":"singleplayer"}
//! -> {"cmd":"connect","from":0,"to":3}
//! <- {"type":"ack","cmd":"connect"}
//! -> {"cmd":"tick","count":60}
//! <- {"type":"ticked","tick":60,"units_spawned":60,"captures":[],"points":[],"victory":null}
//! -> {"cmd":"connect","from":0,"to":0}
//! <- {"type":"rejected","cmd":"connect","reason":"tower 0 cannot connect to itself"}
//! -> {"cmd":"query"}
//! <- {"type":"state","tick":60,...}
//! ```

use linkwar_core::components::{Owner, TowerId, TowerKind};
use linkwar_core::connections::Connection;
use linkwar_core::game::Game;
use linkwar_core::map_generation::GameMode;
use linkwar_core::simulation::{CaptureEvent, GameSummary, Outcome, PointsAwarded};
use serde::{Deserialize, Serialize};

/// Protocol version reported in the `ready` line.
pub const PROTOCOL_VERSION: &str = "1.0";

// ============================================================================
// Input Commands (Controller -> Runner)
// ============================================================================

/// Commands that can be sent to the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum Command {
    /// Advance simulation by N ticks (default: 1).
    Tick {
        #[serde(default = "default_tick_count")]
        count: u32,
    },

    /// Query current game state without advancing time.
    Query,

    /// Link two towers. `actor` defaults to the player whose gestures
    /// would be translated right now.
    Connect {
        from: TowerId,
        to: TowerId,
        #[serde(default)]
        actor: Option<Owner>,
    },

    /// Remove a connection by index.
    Disconnect {
        index: usize,
        #[serde(default)]
        actor: Option<Owner>,
    },

    /// End the current turn without acting (multiplayer).
    Pass {
        #[serde(default)]
        actor: Option<Owner>,
    },

    /// Restore the last removed connection.
    Undo {
        #[serde(default)]
        actor: Option<Owner>,
    },

    /// Freeze the clock.
    Pause,

    /// Unfreeze the clock.
    Resume,

    /// Start a fresh game with the next seed.
    Restart,

    /// Pointer pressed at canvas coordinates.
    PointerDown { x: f64, y: f64 },

    /// Pointer released at canvas coordinates.
    PointerUp { x: f64, y: f64 },

    /// Pointer moved to canvas coordinates.
    PointerMove { x: f64, y: f64 },

    /// Report the current state hash (for determinism verification).
    Hash,

    /// Quit the game.
    Quit,
}

fn default_tick_count() -> u32 {
    1
}

// ============================================================================
// Output Responses (Runner -> Controller)
// ============================================================================

/// Responses sent from the headless runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Runner is ready to accept commands.
    Ready {
        version: String,
        tick: u64,
        mode: GameMode,
    },

    /// Command applied.
    Ack { cmd: String },

    /// Command understood but refused by the game rules.
    Rejected { cmd: String, reason: String },

    /// Error processing a command.
    Error {
        message: String,
        cmd: Option<String>,
    },

    /// Current game state.
    State(Box<StateSnapshot>),

    /// Result of a `tick` command.
    Ticked {
        tick: u64,
        units_spawned: usize,
        captures: Vec<CaptureEvent>,
        points: Vec<PointsAwarded>,
        victory: Option<Outcome>,
    },

    /// Tower under the pointer after a move.
    Hover { tower: Option<TowerId> },

    /// A tower was picked as a drag source.
    Selected { tower: TowerId },

    /// Game has ended.
    GameOver {
        outcome: Outcome,
        message: String,
        tick: u64,
        summary: GameSummary,
    },

    /// State hash for determinism verification.
    StateHash { tick: u64, hash: u64 },

    /// Goodbye message before shutdown.
    Bye,
}

// ============================================================================
// State Types
// ============================================================================

/// Full observable state of a game.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub tick: u64,
    pub paused: bool,
    pub current_player: Owner,
    pub towers: Vec<TowerState>,
    pub obstacles: Vec<ObstacleState>,
    pub connections: Vec<Connection>,
    pub units: Vec<UnitState>,
    pub summary: GameSummary,
    pub outcome: Option<Outcome>,
    pub hash: u64,
}

/// State of a single tower.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TowerState {
    pub id: TowerId,
    pub x: f64,
    pub y: f64,
    pub owner: Owner,
    pub kind: TowerKind,
    pub strength: f64,
    pub is_under_attack: bool,
    pub incoming_support: bool,
}

/// A square obstacle by its top-left corner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObstacleState {
    pub x: f64,
    pub y: f64,
    pub size: f64,
}

/// A unit in flight with its interpolated position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitState {
    pub from: TowerId,
    pub to: TowerId,
    pub owner: Owner,
    pub is_attack: bool,
    pub progress: f64,
    pub x: f64,
    pub y: f64,
}

impl StateSnapshot {
    /// Capture the observable state of `game`.
    #[must_use]
    pub fn capture(game: &Game) -> Self {
        let sim = game.simulation();

        let towers = sim
            .towers()
            .iter()
            .enumerate()
            .map(|(id, tower)| {
                let (x, y) = tower.position.to_f64();
                TowerState {
                    id,
                    x,
                    y,
                    owner: tower.owner,
                    kind: tower.kind,
                    strength: tower.strength.to_num(),
                    is_under_attack: tower.is_under_attack,
                    incoming_support: tower.incoming_support,
                }
            })
            .collect();

        let obstacles = sim
            .obstacles()
            .iter()
            .map(|obstacle| {
                let (x, y) = obstacle.bounds.origin.to_f64();
                ObstacleState {
                    x,
                    y,
                    size: obstacle.bounds.width.to_num(),
                }
            })
            .collect();

        let units = sim
            .units()
            .iter()
            .filter_map(|unit| {
                let (x, y) = sim.unit_position(unit)?.to_f64();
                Some(UnitState {
                    from: unit.from,
                    to: unit.to,
                    owner: unit.owner,
                    is_attack: unit.is_attack,
                    progress: unit.progress.to_num(),
                    x,
                    y,
                })
            })
            .collect();

        Self {
            tick: sim.get_tick(),
            paused: game.is_paused(),
            current_player: game.current_player(),
            towers,
            obstacles,
            connections: sim.connections().as_slice().to_vec(),
            units,
            summary: sim.summary(),
            outcome: sim.outcome(),
            hash: sim.state_hash(),
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

impl Response {
    /// Create a ready response.
    pub fn ready(tick: u64, mode: GameMode) -> Self {
        Self::Ready {
            version: PROTOCOL_VERSION.to_string(),
            tick,
            mode,
        }
    }

    /// Create an acknowledgment.
    pub fn ack(cmd: &str) -> Self {
        Self::Ack {
            cmd: cmd.to_string(),
        }
    }

    /// Create a rejection carrying the rule that refused the command.
    pub fn rejected(cmd: &str, reason: impl ToString) -> Self {
        Self::Rejected {
            cmd: cmd.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an error response.
    pub fn error(message: impl Into<String>, cmd: Option<&str>) -> Self {
        Self::Error {
            message: message.into(),
            cmd: cmd.map(String::from),
        }
    }

    /// Create a state response.
    pub fn state(game: &Game) -> Self {
        Self::State(Box::new(StateSnapshot::capture(game)))
    }

    /// Create a game over response.
    pub fn game_over(outcome: Outcome, summary: GameSummary) -> Self {
        Self::GameOver {
            outcome,
            message: outcome.to_string(),
            tick: summary.tick,
            summary,
        }
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","message":"Serialization failed: {}"}}"#,
                e
            )
        });
        json.push('\n');
        json
    }
}

impl Command {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Get command name for acknowledgment.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tick { .. } => "tick",
            Self::Query => "query",
            Self::Connect { .. } => "connect",
            Self::Disconnect { .. } => "disconnect",
            Self::Pass { .. } => "pass",
            Self::Undo { .. } => "undo",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Restart => "restart",
            Self::PointerDown { .. } => "pointer_down",
            Self::PointerUp { .. } => "pointer_up",
            Self::PointerMove { .. } => "pointer_move",
            Self::Hash => "hash",
            Self::Quit => "quit",
        }
    }
}
