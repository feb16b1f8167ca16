//! Headless Linkwar runner.
//!
//! This binary runs the game without graphics, controlled via JSON on stdin/stdout.
//! Designed for bots, CI testing, and replay verification.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p linkwar_headless
//!
//! # Run a single game from a scenario, recording a replay
//! cargo run -p linkwar_headless -- run --scenario duel.ron --record duel.replay
//!
//! # Check determinism with bot-driven games
//! cargo run -p linkwar_headless -- verify --seed 7 --runs 8
//!
//! # Play bot games over a seed range and print the reports
//! cargo run -p linkwar_headless -- batch --count 100 > reports.json
//! ```
//!
//! # Protocol
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information
//!
//! See the protocol module for command/response format.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkwar_core::game::Game;
use linkwar_core::map_generation::{Difficulty, GameMode, MapConfig};
use linkwar_core::replay::{Replay, ReplayPlayer};
use linkwar_core::rules::GameRules;
use linkwar_headless::{
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::{load_rules, Scenario},
    verify,
};

#[derive(Parser)]
#[command(name = "linkwar_headless")]
#[command(about = "Headless Linkwar runner for bots and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single interactive game
    Run {
        #[command(flatten)]
        game: GameArgs,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,

        /// Write a replay of the session to this file on exit
        #[arg(long)]
        record: Option<PathBuf>,
    },

    /// Verify determinism by running the same bot game multiple times
    Verify {
        #[command(flatten)]
        game: GameArgs,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Ticks per run
        #[arg(short, long, default_value = "3600")]
        ticks: u64,
    },

    /// Play bot games over consecutive seeds and print JSON reports
    Batch {
        #[command(flatten)]
        game: GameArgs,

        /// Number of games; seeds start at --seed
        #[arg(short, long, default_value = "100")]
        count: u64,

        /// Maximum ticks per game
        #[arg(short, long, default_value = "36000")]
        ticks: u64,
    },

    /// Replay a recorded game
    Replay {
        /// Replay file path
        #[arg(short, long)]
        file: PathBuf,

        /// Verify replay produces identical hash
        #[arg(long)]
        verify: bool,
    },

    /// Run N ticks for benchmarking
    Benchmark {
        #[command(flatten)]
        game: GameArgs,

        /// Number of ticks to run
        #[arg(short, long, default_value = "36000")]
        ticks: u64,
    },
}

/// World selection shared by the game-creating subcommands.
#[derive(Args, Clone, Default)]
struct GameArgs {
    /// Scenario file (RON) with map config and optional rules
    #[arg(short, long)]
    scenario: Option<PathBuf>,

    /// Rules file (RON); overrides the scenario's rules
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Random seed; overrides the scenario's seed
    #[arg(long)]
    seed: Option<u64>,

    /// Map density; overrides the scenario's difficulty
    #[arg(long, value_enum)]
    difficulty: Option<DifficultyArg>,

    /// Opponent; overrides the scenario's mode
    #[arg(long, value_enum)]
    mode: Option<ModeArg>,

    /// Canvas width, at most 32000
    #[arg(long)]
    width: Option<u32>,

    /// Canvas height, at most 32000
    #[arg(long)]
    height: Option<u32>,
}

#[derive(Clone, Copy, ValueEnum)]
enum DifficultyArg {
    Easy,
    Medium,
    Hard,
}

impl From<DifficultyArg> for Difficulty {
    fn from(arg: DifficultyArg) -> Self {
        match arg {
            DifficultyArg::Easy => Self::Easy,
            DifficultyArg::Medium => Self::Medium,
            DifficultyArg::Hard => Self::Hard,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Singleplayer,
    Multiplayer,
}

impl From<ModeArg> for GameMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Singleplayer => Self::Singleplayer,
            ModeArg::Multiplayer => Self::Multiplayer,
        }
    }
}

impl GameArgs {
    /// Resolve the map config and rules, exiting on bad input files.
    fn resolve(&self) -> (MapConfig, GameRules) {
        let scenario = match &self.scenario {
            Some(path) => match Scenario::load(path) {
                Ok(scenario) => {
                    tracing::info!(name = %scenario.name, "Loaded scenario");
                    scenario
                }
                Err(e) => {
                    eprintln!("Failed to load scenario: {}", e);
                    std::process::exit(1);
                }
            },
            None => Scenario::default(),
        };

        let rules = match &self.rules {
            Some(path) => match load_rules(path) {
                Ok(rules) => rules,
                Err(e) => {
                    eprintln!("Failed to load rules: {}", e);
                    std::process::exit(1);
                }
            },
            None => scenario.rules,
        };

        let mut config = scenario.map;
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(difficulty) = self.difficulty {
            config.difficulty = difficulty.into();
        }
        if let Some(mode) = self.mode {
            config.mode = mode.into();
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Err(e) = config.validate() {
            eprintln!("Invalid map config: {}", e);
            std::process::exit(1);
        }
        (config, rules)
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Some(Commands::Run {
            game,
            auto_state,
            record,
        }) => cmd_run(&game, auto_state, record),
        Some(Commands::Verify { game, runs, ticks }) => cmd_verify(&game, runs, ticks),
        Some(Commands::Batch { game, count, ticks }) => cmd_batch(&game, count, ticks),
        Some(Commands::Replay { file, verify }) => cmd_replay(file, verify),
        Some(Commands::Benchmark { game, ticks }) => cmd_benchmark(&game, ticks),
        None => cmd_run(&GameArgs::default(), false, None),
    }
}

/// Run an interactive session on stdin/stdout
fn cmd_run(args: &GameArgs, auto_state: bool, record: Option<PathBuf>) {
    let (config, rules) = args.resolve();
    tracing::info!("Starting interactive session");

    let game = match Game::new(config, rules) {
        Ok(game) => game,
        Err(e) => {
            eprintln!("Failed to create game: {}", e);
            std::process::exit(1);
        }
    };
    let mut runner = HeadlessRunner::new(
        game,
        HeadlessConfig {
            auto_state_output: auto_state,
            record_path: record,
        },
    );

    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    if let Err(e) = runner.run(stdin.lock(), stdout.lock()) {
        tracing::error!(error = %e, "Session failed");
        eprintln!("FATAL: {}", e);
        std::process::exit(1);
    }
}

/// Verify determinism
fn cmd_verify(args: &GameArgs, runs: u32, ticks: u64) {
    let (config, rules) = args.resolve();
    tracing::info!(
        "Verifying determinism: seed {} ({} runs, {} ticks)",
        config.seed,
        runs,
        ticks
    );

    let results = match verify::verify_determinism(&config, &rules, runs, ticks) {
        Ok(results) => results,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    match results.first_mismatch() {
        None => {
            eprintln!("PASS: All {} runs produced identical results", runs);
            if let Some(report) = results.reports.first() {
                eprintln!("  Ticks: {}", report.ticks);
                eprintln!("  Final hash: {:016x}", report.final_hash);
            }
        }
        Some(run) => {
            eprintln!("FAIL: Non-determinism detected in run {}!", run);
            std::process::exit(1);
        }
    }
}

/// Play a batch of bot games
fn cmd_batch(args: &GameArgs, count: u64, ticks: u64) {
    let (config, rules) = args.resolve();
    let first = config.seed;
    tracing::info!("Starting batch run: {} games from seed {}", count, first);

    let reports = match verify::run_batch(&config, &rules, first..first.saturating_add(count), ticks) {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };
    let decided = reports.iter().filter(|r| r.outcome.is_some()).count();

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("FATAL: Failed to serialize reports: {}", e);
            std::process::exit(1);
        }
    }

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", reports.len());
    eprintln!("Games decided: {}", decided);
    for owner in ["player1", "player2", "ai"] {
        let wins = reports
            .iter()
            .filter(|r| r.outcome.is_some_and(|o| o.winner().as_str() == owner))
            .count();
        if wins > 0 {
            eprintln!("  {}: {} wins", owner, wins);
        }
    }
}

/// Replay a recorded game
fn cmd_replay(file: PathBuf, verify: bool) {
    if verify {
        tracing::info!("Verifying replay: {}", file.display());
    } else {
        tracing::info!("Playing replay: {}", file.display());
    }

    // Load the replay
    let replay = match Replay::load(&file) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to load replay: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("Loaded replay:");
    eprintln!("  Seed: {}", replay.config.seed);
    eprintln!("  Mode: {:?}", replay.config.mode);
    eprintln!("  Commands: {}", replay.command_count());
    eprintln!("  Duration: {} ticks", replay.duration());

    let mut player = match ReplayPlayer::new(replay) {
        Ok(player) => player,
        Err(e) => {
            eprintln!("Failed to start replay: {}", e);
            std::process::exit(1);
        }
    };

    if verify {
        // Verify mode: play to end and check hash
        eprintln!("Verifying replay...");
        match player.verify() {
            Ok(()) => {
                eprintln!("PASS: Replay verification successful");
                eprintln!("  Hash: {:016x}", player.replay().final_hash);
            }
            Err(e) => {
                eprintln!("FAIL: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        // Play mode: run replay and show progress
        let mut last_decile = 0;
        while player.advance() {
            let decile = (player.progress_percent() / 10.0) as u32;
            if decile > last_decile {
                eprintln!("Progress: {}%", decile * 10);
                last_decile = decile;
            }
        }

        let sim = player.game().simulation();
        let summary = sim.summary();
        eprintln!("Replay complete at tick {}", player.current_tick());
        eprintln!("Final state hash: {:016x}", sim.state_hash());
        eprintln!("\nFinal State:");
        eprintln!(
            "  Towers: player1 {}, player2 {}, ai {}, neutral {}",
            summary.player1_towers, summary.player2_towers, summary.ai_towers, summary.neutral_towers
        );
        eprintln!(
            "  Points: player1 {}, player2 {}",
            summary.points.player1, summary.points.player2
        );
        if let Some(outcome) = sim.outcome() {
            eprintln!("  Outcome: {}", outcome);
        }
    }
}

/// Run benchmark
fn cmd_benchmark(args: &GameArgs, ticks: u64) {
    let (config, rules) = args.resolve();
    tracing::info!("Running {} tick benchmark", ticks);

    // Warmup
    let _ = verify::benchmark(config.clone(), rules.clone(), 100);

    let result = match verify::benchmark(config, rules, ticks) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            std::process::exit(1);
        }
    };

    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BENCHMARK RESULTS");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Ticks: {}", result.ticks);
    eprintln!("Duration: {:.3}s", result.elapsed.as_secs_f64());
    eprintln!("Ticks/second: {:.1}", result.ticks_per_second());
    eprintln!("us/tick: {:.2}", result.micros_per_tick());
}
