//! Session Clock, Edge Timers and Warning Flash for OpenRacing
//!
//! This crate provides the timing primitives the race estimators are built
//! on. Game clocks are not clean monotonic streams: the session can be
//! paused, rewound by a replay, or restarted. Every type here is driven by an
//! explicit `now` value supplied by the caller and stays well-defined when
//! that value stalls, jumps backwards or skips forwards.
//!
//! # Overview
//!
//! - **Clock**: [`SessionClock`] classifies each raw elapsed-time reading
//!   (advanced, stalled, rewound, skipped) and keeps a monotonic accumulator
//! - **Edge Timer**: [`EdgeTimer`] measures time since a condition's rising
//!   edge with a grace period after the falling edge
//! - **Timer Variants**: pit, blue flag, traffic gap, green flag countdown
//!   and differential locking trackers built on [`EdgeTimer`]
//! - **Flash**: [`WarningFlash`] blinks an indicator a bounded number of
//!   times and then holds it solid
//!
//! # Tick Safety
//!
//! - No heap allocations in `update`/`tick`/`state`
//! - O(1) time complexity, no I/O, no internal threads
//! - Non-finite input is a no-op for the tick, never a panic
//!
//! # Example
//!
//! ```
//! use openracing_race_timing::prelude::*;
//!
//! let mut clock = SessionClock::default();
//! let mut pit = PitTimer::new(PitTimerConfig::default());
//!
//! let tick = clock.tick(120.0);
//! assert_eq!(pit.update(true, tick.now), TimerReading::Running(0.0));
//!
//! let tick = clock.tick(121.5);
//! assert_eq!(pit.update(true, tick.now), TimerReading::Running(1.5));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod clock;
pub mod edge_timer;
pub mod flash;
pub mod prelude;
pub mod variants;

pub use clock::{ClockConfig, ClockEvent, ClockTick, SessionClock};
pub use edge_timer::{EdgeTimer, EdgeTimerConfig, TIMER_INACTIVE, TimerReading};
pub use flash::{FlashConfig, WarningFlash};
pub use variants::{
    BlueFlagTimer, DiffLockConfig, DiffLockSide, DiffLockTracker, GreenFlagConfig,
    GreenFlagCountdown, PitTimer, PitTimerConfig, TrafficGapConfig, TrafficGapTimer,
};

/// Clamp a caller-supplied value to a finite number no lower than `min`.
///
/// Non-finite input falls back to `fallback`, which is itself raised to `min`.
#[inline]
pub fn clamp_finite(value: f64, min: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.max(min)
    } else {
        fallback.max(min)
    }
}
