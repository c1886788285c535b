//! Criterion benchmarks for ScalpLab hot paths.
//!
//! Benchmarks:
//! 1. Full backtest over a random-walk series
//! 2. Indicator precompute for the scalp strategy

use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use scalplab_core::domain::Bar;
use scalplab_core::engine::{run_backtest, EngineConfig};
use scalplab_core::strategy::{ScalpStrategy, Strategy, StrategyConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let mut close = 100.0;
    (0..n)
        .map(|i| {
            let open = close;
            close = 100.0 + (i as f64 * 0.05).sin() * 10.0 + (i as f64 * 0.31).cos();
            Bar {
                time: start + Duration::minutes(i as i64),
                open,
                high: open.max(close) + 0.5,
                low: open.min(close) - 0.5,
                close,
                volume: 1_000.0,
            }
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");
    let strategy = ScalpStrategy::new(StrategyConfig::default());
    let config = EngineConfig::default();
    for n in [1_000, 10_000, 50_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::from_parameter(n), &bars, |b, bars| {
            b.iter(|| run_backtest(black_box(bars), &strategy, &config))
        });
    }
    group.finish();
}

fn bench_prepare(c: &mut Criterion) {
    let strategy = ScalpStrategy::new(StrategyConfig::default());
    let bars = make_bars(10_000);
    c.bench_function("prepare_10k", |b| b.iter(|| strategy.prepare(black_box(&bars))));
}

criterion_group!(benches, bench_backtest, bench_prepare);
criterion_main!(benches);
