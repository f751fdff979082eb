//! Retry engine benchmarks
//!
//! Backoff computation with each jitter source, and the blocking executor on
//! its success and exhaustion paths (sleeps recorded, not waited).
//!
//! Run with: `cargo bench --bench retry_bench -p polytx-common --features
//! runtime`

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use polytx_common::resilience::{backoff, policies, Jitter, RetryExecutor, RetryOptions};
use polytx_common::testing::RecordingSleeper;

fn options(jitter: Jitter) -> RetryOptions {
    RetryOptions::builder()
        .max_attempts(10)
        .base_delay(Duration::from_millis(10))
        .max_delay(Duration::from_secs(10))
        .jitter(jitter)
        .sleeper(Arc::new(RecordingSleeper::new()))
        .build()
        .expect("valid retry options for benchmarks")
}

fn bench_backoff_delay(c: &mut Criterion) {
    let mut group = c.benchmark_group("backoff_delay");

    let cases = [
        ("none", Jitter::None),
        ("random", Jitter::Random),
        ("custom", Jitter::custom(|_| 0.5)),
    ];

    for (name, jitter) in cases {
        let options = options(jitter);
        group.bench_with_input(BenchmarkId::new("jitter", name), &options, |b, options| {
            b.iter(|| {
                for attempt in 1..=10 {
                    black_box(backoff::delay(black_box(attempt), options));
                }
            });
        });
    }

    group.bench_function("exponential_saturating", |b| {
        b.iter(|| {
            black_box(backoff::exponential_delay(
                black_box(u32::MAX),
                Duration::from_secs(1),
                Duration::from_secs(60),
            ))
        });
    });

    group.finish();
}

fn bench_executor_paths(c: &mut Criterion) {
    let mut group = c.benchmark_group("executor_paths");

    group.bench_function("success_first_attempt", |b| {
        let executor = RetryExecutor::new(options(Jitter::None), policies::AlwaysTransient);
        b.iter(|| {
            let result: Result<u32, &str> = executor.run(|| Ok(black_box(1)));
            black_box(result)
        });
    });

    group.bench_function("exhaust_ten_attempts", |b| {
        b.iter(|| {
            let executor = RetryExecutor::new(options(Jitter::None), policies::AlwaysTransient);
            let result: Result<(), &str> = executor.run(|| Err("busy"));
            black_box(result)
        });
    });

    group.finish();
}

criterion_group!(retry, bench_backoff_delay, bench_executor_paths);
criterion_main!(retry);
