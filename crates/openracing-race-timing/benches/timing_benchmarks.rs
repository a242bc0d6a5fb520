//! Timing Benchmarks
//!
//! Criterion benchmarks for the per-tick cost of the timing primitives.

use criterion::{Criterion, criterion_group, criterion_main};
use openracing_race_timing::prelude::*;

fn bench_session_clock(c: &mut Criterion) {
    let mut clock = SessionClock::default();
    let mut now = 0.0;

    c.bench_function("session_clock_tick", |b| {
        b.iter(|| {
            now += 0.01;
            clock.tick(std::hint::black_box(now))
        })
    });
}

fn bench_edge_timer(c: &mut Criterion) {
    let mut timer = EdgeTimer::new(EdgeTimerConfig {
        grace: 2.0,
        max_duration: 999.99,
    });
    let mut now = 0.0;
    let mut tick = 0u32;

    c.bench_function("edge_timer_update", |b| {
        b.iter(|| {
            now += 0.01;
            tick = tick.wrapping_add(1);
            timer.update(std::hint::black_box(tick % 500 < 250), std::hint::black_box(now))
        })
    });
}

fn bench_warning_flash(c: &mut Criterion) {
    let mut flash = WarningFlash::default();
    let mut now = 0.0;

    c.bench_function("warning_flash_state", |b| {
        b.iter(|| {
            now += 0.01;
            flash.state(std::hint::black_box(now), std::hint::black_box(true))
        })
    });
}

criterion_group!(
    benches,
    bench_session_clock,
    bench_edge_timer,
    bench_warning_flash
);
criterion_main!(benches);
