//! Batch game runner for determinism checks and benchmarks.
//!
//! Runs bot-driven games in parallel using rayon. Each game is fully
//! determined by its map config and rules, so running the same config
//! several times must produce identical hashes.

use std::time::{Duration, Instant};

use linkwar_core::error::Result;
use linkwar_core::game::Game;
use linkwar_core::map_generation::MapConfig;
use linkwar_core::rules::GameRules;
use linkwar_core::simulation::{GameSummary, Outcome};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::bot::GreedyBot;

/// Result of one bot game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameReport {
    /// Seed the map was generated from.
    pub seed: u64,
    /// Ticks actually simulated.
    pub ticks: u64,
    /// How the game ended, if it did.
    pub outcome: Option<Outcome>,
    /// Final tower counts and scores.
    pub summary: GameSummary,
    /// Commands the bot got accepted.
    pub commands_applied: u32,
    /// State hash after the last tick.
    pub final_hash: u64,
}

/// Play one game with a [`GreedyBot`] on the human side(s).
///
/// Stops at `max_ticks` or when the game is decided. Fails only when the
/// config or rules cannot produce a world.
pub fn play_bot_game(config: MapConfig, rules: GameRules, max_ticks: u64) -> Result<GameReport> {
    let seed = config.seed;
    let mut game = Game::new(config, rules)?;
    let bot = GreedyBot::default();
    let mut commands_applied = 0;

    while game.simulation().get_tick() < max_ticks && !game.simulation().is_over() {
        if let Some((_, outcome)) = bot.step(&mut game) {
            if outcome.is_applied() {
                commands_applied += 1;
            }
        }
        game.advance();
    }

    let sim = game.simulation();
    Ok(GameReport {
        seed,
        ticks: sim.get_tick(),
        outcome: sim.outcome(),
        summary: sim.summary(),
        commands_applied,
        final_hash: sim.state_hash(),
    })
}

/// Outcome of a determinism check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyResults {
    /// One report per run, in run order.
    pub reports: Vec<GameReport>,
    /// Wall time for all runs.
    pub duration_seconds: f64,
}

impl VerifyResults {
    /// Whether every run ended in the same state.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.reports.windows(2).all(|pair| pair[0] == pair[1])
    }

    /// Index of the first run that differs from run 0.
    #[must_use]
    pub fn first_mismatch(&self) -> Option<usize> {
        let first = self.reports.first()?;
        self.reports.iter().position(|report| report != first)
    }
}

/// Run the same game `runs` times in parallel and compare the results.
pub fn verify_determinism(
    config: &MapConfig,
    rules: &GameRules,
    runs: u32,
    max_ticks: u64,
) -> Result<VerifyResults> {
    let start = Instant::now();
    info!(runs, max_ticks, seed = config.seed, "Starting determinism check");

    let reports = (0..runs)
        .into_par_iter()
        .map(|_| play_bot_game(config.clone(), rules.clone(), max_ticks))
        .collect::<Result<Vec<GameReport>>>()?;

    let results = VerifyResults {
        reports,
        duration_seconds: start.elapsed().as_secs_f64(),
    };
    if let Some(run) = results.first_mismatch() {
        warn!(run, "Run diverged from run 0");
    } else {
        info!(
            "Determinism check passed: {} runs in {:.2}s",
            runs, results.duration_seconds
        );
    }
    Ok(results)
}

/// Play one bot game per seed in `seeds`, in parallel.
pub fn run_batch(
    base: &MapConfig,
    rules: &GameRules,
    seeds: std::ops::Range<u64>,
    max_ticks: u64,
) -> Result<Vec<GameReport>> {
    seeds
        .into_par_iter()
        .map(|seed| play_bot_game(base.clone().with_seed(seed), rules.clone(), max_ticks))
        .collect()
}

/// Timing of a single-threaded run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkResult {
    /// Ticks simulated.
    pub ticks: u64,
    /// Wall time.
    pub elapsed: Duration,
}

impl BenchmarkResult {
    /// Throughput.
    #[must_use]
    pub fn ticks_per_second(&self) -> f64 {
        self.ticks as f64 / self.elapsed.as_secs_f64().max(f64::EPSILON)
    }

    /// Average time per tick in microseconds.
    #[must_use]
    pub fn micros_per_tick(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1_000_000.0 / self.ticks.max(1) as f64
    }
}

/// Time `ticks` scheduler steps of a bot game.
///
/// Keeps ticking after the game is decided so the tick count is exact.
pub fn benchmark(config: MapConfig, rules: GameRules, ticks: u64) -> Result<BenchmarkResult> {
    let mut game = Game::new(config, rules)?;
    let bot = GreedyBot::default();
    let start = Instant::now();
    for _ in 0..ticks {
        let _ = bot.step(&mut game);
        game.advance();
    }
    Ok(BenchmarkResult {
        ticks,
        elapsed: start.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use linkwar_core::map_generation::GameMode;

    #[test]
    fn test_bot_game_stops_at_limit() {
        let report = play_bot_game(MapConfig::default().with_seed(5), GameRules::default(), 300).unwrap();
        assert!(report.ticks <= 300);
        if report.outcome.is_none() {
            assert_eq!(report.ticks, 300);
        }
    }

    #[test]
    fn test_parallel_runs_agree() {
        let config = MapConfig::default().with_seed(42);
        let results = verify_determinism(&config, &GameRules::default(), 4, 600).unwrap();
        assert_eq!(results.reports.len(), 4);
        assert!(results.is_deterministic());
        assert_eq!(results.first_mismatch(), None);
    }

    #[test]
    fn test_multiplayer_runs_agree() {
        let config = MapConfig::default().with_seed(9).with_mode(GameMode::Multiplayer);
        assert!(verify_determinism(&config, &GameRules::default(), 3, 600)
            .unwrap()
            .is_deterministic());
    }

    #[test]
    fn test_batch_keeps_seed_order() {
        let reports = run_batch(&MapConfig::default(), &GameRules::default(), 10..14, 120).unwrap();
        let seeds: Vec<u64> = reports.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_benchmark_counts_ticks() {
        let result = benchmark(MapConfig::default(), GameRules::default(), 100).unwrap();
        assert_eq!(result.ticks, 100);
        assert!(result.ticks_per_second() > 0.0);
    }

    #[test]
    fn test_batch_rejects_oversized_canvas() {
        let config = MapConfig::with_size(50_000, 720);
        assert!(run_batch(&config, &GameRules::default(), 0..3, 60).is_err());
    }

    #[test]
    fn test_mismatch_detected() {
        let base = play_bot_game(MapConfig::default(), GameRules::default(), 60).unwrap();
        let mut other = base.clone();
        other.final_hash ^= 1;
        let results = VerifyResults {
            reports: vec![base.clone(), base, other],
            duration_seconds: 0.0,
        };
        assert!(!results.is_deterministic());
        assert_eq!(results.first_mismatch(), Some(2));
    }
}
