//! Simulation benchmarks for skirmish_core.
//!
//! Run with: `cargo bench -p skirmish_core`

// Benchmark binaries don't need docs on macro-generated functions
#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use skirmish_core::prelude::*;

/// Full standard games at each difficulty, in simulation mode.
pub fn simulation_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("standard_game");
    for difficulty in [1u32, 3, 5] {
        let setup = GameSetup::new(difficulty, Allocation::new(20, 20, 10));
        group.bench_with_input(
            BenchmarkId::from_parameter(difficulty),
            &setup,
            |b, setup| {
                let mut seed = 0u64;
                b.iter(|| {
                    seed += 1;
                    black_box(play(setup, seed))
                });
            },
        );
    }
    group.finish();
}

/// A verbose run records every debug event.
pub fn verbose_benchmark(c: &mut Criterion) {
    let setup = GameSetup::default();
    c.bench_function("standard_game_verbose", |b| {
        b.iter(|| {
            let config = EngineConfig {
                simulation_mode: false,
                ..setup.engine_config(7).expect("valid difficulty")
            };
            let mut engine = setup.build(config).expect("valid setup");
            black_box(engine.run())
        });
    });
}

criterion_group!(benches, simulation_benchmark, verbose_benchmark);
criterion_main!(benches);
