//! Simulation benchmarks for linkwar_core.
//!
//! Run with: `cargo bench -p linkwar_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use linkwar_core::game::{Command, Game};
use linkwar_core::map_generation::{generate_map, Difficulty, MapConfig};
use linkwar_core::prelude::Owner;
use linkwar_core::rules::GameRules;

/// A medium map with player1 linking its starting tower to every tower it can.
fn busy_game(seed: u64) -> Game {
    let mut game = Game::new(MapConfig::default().with_seed(seed), GameRules::default())
        .expect("default config is valid");
    let towers = game.simulation().towers().len();
    for to in 1..towers {
        let _ = game.apply_command(Command::Connect {
            actor: Owner::Player1,
            from: 0,
            to,
        });
    }
    game
}

pub fn map_generation_benchmark(c: &mut Criterion) {
    let rules = GameRules::default();
    let mut group = c.benchmark_group("generate_map");
    for difficulty in [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{difficulty:?}")),
            &difficulty,
            |b, &difficulty| {
                b.iter(|| {
                    let config = MapConfig::default().with_difficulty(difficulty);
                    black_box(generate_map(black_box(config), &rules))
                });
            },
        );
    }
    group.finish();
}

pub fn simulation_benchmark(c: &mut Criterion) {
    c.bench_function("advance_600_ticks", |b| {
        b.iter_batched(
            || busy_game(12345),
            |mut game| {
                for _ in 0..600 {
                    black_box(game.advance());
                }
                game
            },
            criterion::BatchSize::SmallInput,
        );
    });

    let mut game = busy_game(12345);
    for _ in 0..300 {
        game.advance();
    }
    c.bench_function("state_hash", |b| {
        b.iter(|| black_box(game.simulation().state_hash()));
    });
}

criterion_group!(benches, map_generation_benchmark, simulation_benchmark);
criterion_main!(benches);
