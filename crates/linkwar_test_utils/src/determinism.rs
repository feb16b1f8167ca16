//! Determinism testing utilities.
//!
//! Provides a harness for verifying that the simulation
//! produces identical results given identical inputs.
//!
//! # Testing Strategy
//!
//! Replays and the `verify` runner only work if a seed plus a command
//! stream pins down the whole game. Sources of non-determinism include:
//!
//! - **Floating-point math**: We use fixed-point arithmetic via
//!   [`linkwar_core::math::Fixed`] throughout.
//!
//! - **HashMap iteration order**: The core keeps every entity in a `Vec`
//!   and hashes state in index order.
//!
//! - **System randomness**: World generation uses a seeded PRNG only.
//!
//! # Test Levels
//!
//! 1. **Unit tests**: Individual rules (firing, arrival, recovery)
//! 2. **Property tests**: Random seeds and command scripts still replay exactly
//! 3. **Parallel tests**: Running N games on N threads all match

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use linkwar_core::game::{Command, Game};
use linkwar_core::simulation::Simulation;

/// Result of a determinism test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeterminismResult {
    /// Whether all runs produced identical results.
    pub is_deterministic: bool,
    /// Hashes from each run.
    pub hashes: Vec<u64>,
    /// Number of ticks simulated.
    pub ticks: u64,
}

impl DeterminismResult {
    /// Get all unique hashes (should be 1 for deterministic simulation).
    #[must_use]
    pub fn unique_hashes(&self) -> Vec<u64> {
        let mut unique: Vec<u64> = self.hashes.clone();
        unique.sort_unstable();
        unique.dedup();
        unique
    }

    /// Assert that the simulation was deterministic, with a detailed error message.
    ///
    /// # Panics
    ///
    /// Panics if the simulation produced different hashes across runs.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic {
            let unique = self.unique_hashes();
            panic!(
                "Simulation is non-deterministic!\n\
                 Runs: {}\n\
                 Ticks: {}\n\
                 Unique hashes: {} (expected 1)\n\
                 All hashes: {:?}",
                self.hashes.len(),
                self.ticks,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// A command to apply just before the scheduler step for `tick`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptedCommand {
    /// Tick the command is applied on.
    pub tick: u64,
    /// The command.
    pub command: Command,
}

/// Drive `game` for `ticks` scheduler steps, applying `script` on the way.
///
/// The script must be sorted by tick. Returns the commands that were
/// applied, in the shape a replay records them.
pub fn run_script(game: &mut Game, script: &[ScriptedCommand], ticks: u64) -> Vec<ScriptedCommand> {
    let mut applied = Vec::new();
    let mut pending = script.iter().peekable();

    for _ in 0..ticks {
        let now = game.simulation().get_tick();
        while let Some(entry) = pending.next_if(|entry| entry.tick <= now) {
            if game.apply_command(entry.command).is_applied() {
                applied.push(ScriptedCommand {
                    tick: now,
                    command: entry.command,
                });
            }
        }
        game.advance();
    }
    applied
}

/// Run a simulation multiple times and verify determinism.
///
/// # Arguments
///
/// * `runs` - Number of times to run the simulation
/// * `ticks` - Number of ticks to simulate per run
/// * `setup` - Function to create initial simulation state
/// * `step` - Function to advance simulation by one tick
/// * `hash` - Function to compute state hash
///
/// # Example
///
/// ```
/// use linkwar_core::map_generation::GameMode;
/// use linkwar_test_utils::determinism::verify_determinism;
/// use linkwar_test_utils::fixtures::generated_game;
///
/// let result = verify_determinism(
///     3,
///     100,
///     || generated_game(1, GameMode::Singleplayer),
///     |game| {
///         game.advance();
///     },
///     |game| game.simulation().state_hash(),
/// );
/// result.assert_deterministic();
/// ```
pub fn verify_determinism<S, Setup, Step, HashFn>(
    runs: usize,
    ticks: u64,
    setup: Setup,
    step: Step,
    hash: HashFn,
) -> DeterminismResult
where
    Setup: Fn() -> S,
    Step: Fn(&mut S),
    HashFn: Fn(&S) -> u64,
{
    let mut hashes = Vec::with_capacity(runs);

    for _ in 0..runs {
        let mut state = setup();

        for _ in 0..ticks {
            step(&mut state);
        }

        hashes.push(hash(&state));
    }

    let is_deterministic = hashes.windows(2).all(|w| w[0] == w[1]);
    if !is_deterministic {
        tracing::warn!(ticks, ?hashes, "Runs diverged");
    }

    DeterminismResult {
        is_deterministic,
        hashes,
        ticks,
    }
}

/// Run the same game and script `runs` times and compare final hashes.
pub fn verify_game_determinism<F>(
    setup_fn: F,
    script: &[ScriptedCommand],
    runs: usize,
    ticks: u64,
) -> DeterminismResult
where
    F: Fn() -> Game,
{
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        let mut game = setup_fn();
        run_script(&mut game, script, ticks);
        hashes.push(game.simulation().state_hash());
    }

    DeterminismResult {
        is_deterministic: hashes.windows(2).all(|w| w[0] == w[1]),
        hashes,
        ticks,
    }
}

/// Result of parallel simulation runs.
#[derive(Debug, Clone)]
pub struct ParallelSimResult {
    /// Final state hash from each simulation.
    pub hashes: Vec<u64>,
    /// Number of ticks each simulation ran.
    pub ticks: u64,
    /// Number of simulations run.
    pub num_sims: usize,
}

impl ParallelSimResult {
    /// Check if all simulations produced identical results.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Run N games on scoped threads and collect final hashes.
///
/// Catches non-determinism that only shows up under different thread
/// scheduling or memory layout.
pub fn run_parallel_games<F>(setup_fn: F, num_sims: usize, num_ticks: u64) -> ParallelSimResult
where
    F: Fn() -> Game + Sync,
{
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_sims)
            .map(|_| {
                s.spawn(|| {
                    let mut game = setup_fn();
                    for _ in 0..num_ticks {
                        game.advance();
                    }
                    game.simulation().state_hash()
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|e| std::panic::resume_unwind(e)))
            .collect()
    });

    ParallelSimResult {
        hashes,
        ticks: num_ticks,
        num_sims,
    }
}

/// Compare two game runs tick-by-tick, finding first divergence.
///
/// # Returns
///
/// `None` if the runs match, `Some(tick)` for the first tick whose state
/// hash differs.
pub fn find_first_divergence<F>(setup_fn: F, script: &[ScriptedCommand], num_ticks: u64) -> Option<u64>
where
    F: Fn() -> Game,
{
    let mut game1 = setup_fn();
    let mut game2 = setup_fn();

    if game1.simulation().state_hash() != game2.simulation().state_hash() {
        return Some(0);
    }

    for tick in 0..num_ticks {
        let due: Vec<&ScriptedCommand> = script.iter().filter(|c| c.tick == tick).collect();
        for entry in due {
            let _ = game1.apply_command(entry.command);
            let _ = game2.apply_command(entry.command);
        }
        game1.advance();
        game2.advance();

        if game1.simulation().state_hash() != game2.simulation().state_hash() {
            tracing::warn!(tick = tick + 1, "First divergence");
            return Some(tick + 1);
        }
    }

    None
}

/// Verify that serialization round-trip preserves simulation state exactly.
pub fn verify_serialization_determinism<F>(setup_fn: F, num_ticks: u64) -> bool
where
    F: Fn() -> Simulation,
{
    let mut sim = setup_fn();

    for _ in 0..num_ticks {
        sim.tick();
    }

    let hash_before = sim.state_hash();

    let Ok(bytes) = sim.serialize() else {
        return false;
    };
    let Ok(mut restored) = Simulation::deserialize(&bytes) else {
        return false;
    };

    if restored.state_hash() != hash_before {
        return false;
    }

    // The copy must also evolve identically.
    for _ in 0..num_ticks {
        sim.tick();
        restored.tick();
    }
    sim.state_hash() == restored.state_hash()
}

/// Compute a simple hash for any hashable value.
pub fn compute_hash<T: Hash>(value: &T) -> u64 {
    let mut hasher = DefaultHasher::new();
    value.hash(&mut hasher);
    hasher.finish()
}

/// Proptest strategies for determinism testing.
///
/// These strategies generate random but reproducible inputs for
/// property-based testing of simulation determinism.
pub mod strategies {
    use proptest::prelude::*;

    use super::ScriptedCommand;
    use linkwar_core::components::Owner;
    use linkwar_core::game::Command;
    use linkwar_core::map_generation::{Difficulty, GameMode, MapConfig};

    /// Any map seed.
    pub fn arb_seed() -> impl Strategy<Value = u64> {
        any::<u64>()
    }

    /// Any difficulty.
    pub fn arb_difficulty() -> impl Strategy<Value = Difficulty> {
        prop_oneof![
            Just(Difficulty::Easy),
            Just(Difficulty::Medium),
            Just(Difficulty::Hard),
        ]
    }

    /// Either game mode.
    pub fn arb_mode() -> impl Strategy<Value = GameMode> {
        prop_oneof![Just(GameMode::Singleplayer), Just(GameMode::Multiplayer)]
    }

    /// Map configs on canvases from tiny to large.
    pub fn arb_map_config() -> impl Strategy<Value = MapConfig> {
        (200u32..1600, 200u32..1000, arb_difficulty(), arb_mode(), arb_seed()).prop_map(
            |(width, height, difficulty, mode, seed)| {
                MapConfig::with_size(width, height)
                    .with_difficulty(difficulty)
                    .with_mode(mode)
                    .with_seed(seed)
            },
        )
    }

    /// Any owner, so scripts include commands that must be rejected.
    pub fn arb_actor() -> impl Strategy<Value = Owner> {
        prop_oneof![
            4 => Just(Owner::Player1),
            3 => Just(Owner::Player2),
            1 => Just(Owner::Ai),
            1 => Just(Owner::Neutral),
        ]
    }

    /// A command over towers `0..tower_count`; indices may be out of range.
    pub fn arb_command(tower_count: usize) -> impl Strategy<Value = Command> {
        let towers = 0..tower_count + 2;
        prop_oneof![
            6 => (arb_actor(), towers.clone(), towers)
                .prop_map(|(actor, from, to)| Command::Connect { actor, from, to }),
            2 => (arb_actor(), 0usize..12)
                .prop_map(|(actor, index)| Command::Disconnect { actor, index }),
            1 => arb_actor().prop_map(|actor| Command::PassTurn { actor }),
            1 => arb_actor().prop_map(|actor| Command::Undo { actor }),
        ]
    }

    /// A tick-sorted script of up to `max_len` commands within `max_tick`.
    pub fn arb_script(
        tower_count: usize,
        max_len: usize,
        max_tick: u64,
    ) -> impl Strategy<Value = Vec<ScriptedCommand>> {
        proptest::collection::vec((0..max_tick, arb_command(tower_count)), 0..max_len).prop_map(
            |mut entries| {
                entries.sort_by_key(|(tick, _)| *tick);
                entries
                    .into_iter()
                    .map(|(tick, command)| ScriptedCommand { tick, command })
                    .collect()
            },
        )
    }
}
