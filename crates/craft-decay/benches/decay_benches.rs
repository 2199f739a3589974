//! Criterion benchmarks for craft-decay.
//!
//! Covers: table generation, decayed value lookup, and the sqrt price ratio.

use alloy_primitives::U256;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

use craft_core::types::DecayCheckpoint;
use craft_decay::engine::DecayEngine;
use craft_decay::price::sqrt_ratio_x96;
use craft_decay::table::decay_factors_x96;

const THIRTY_DAYS: u64 = 30 * 86_400;

fn bench_table_generation(c: &mut Criterion) {
    c.bench_function("decay_factors_x96_32", |b| {
        b.iter(|| decay_factors_x96(black_box(THIRTY_DAYS), black_box(32)))
    });
}

fn bench_decayed_value(c: &mut Criterion) {
    let engine = DecayEngine::new(THIRTY_DAYS).expect("table");
    let checkpoint =
        DecayCheckpoint::new(U256::from(10u64).pow(U256::from(24u64)), 0, THIRTY_DAYS).expect("checkpoint");
    // Remainder with many set bits exercises the full composition.
    let at = 3 * THIRTY_DAYS + (1 << 21) - 1;

    c.bench_function("decayed_value", |b| {
        b.iter(|| engine.decayed_value(black_box(&checkpoint), black_box(at)))
    });
}

fn bench_sqrt_ratio(c: &mut Criterion) {
    let token0 = U256::from(1_000_000u64);
    let token1 = U256::from(3u64);

    c.bench_function("sqrt_ratio_x96", |b| {
        b.iter(|| sqrt_ratio_x96(black_box(token0), black_box(token1)))
    });
}

criterion_group!(benches, bench_table_generation, bench_decayed_value, bench_sqrt_ratio);
criterion_main!(benches);
