//! Session Clock Adapter
//!
//! Wraps the raw elapsed-time reading of the telemetry source and classifies
//! every tick. The adapter never hides a rewind from its consumers: it
//! reports the new time together with [`ClockEvent::Rewound`] so each
//! estimator can apply its own reset rule.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::clamp_finite;

/// How a tick relates to the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockEvent {
    /// First valid reading since construction or reset.
    Started,
    /// Time moved forward within the skip tolerance.
    Advanced,
    /// Time did not move (paused), moved back within the rewind tolerance,
    /// or the reading was not finite.
    Stalled,
    /// Time moved backwards by more than the rewind tolerance.
    Rewound,
    /// Time moved forwards by more than the skip tolerance.
    Skipped,
}

/// Result of feeding one raw reading into [`SessionClock::tick`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockTick {
    /// Normalized session time in seconds.
    pub now: f64,
    /// Seconds added to the monotonic accumulator by this tick.
    pub delta: f64,
    /// Tick classification.
    pub event: ClockEvent,
}

impl ClockTick {
    /// True for ticks that break continuity (rewind or skip).
    pub fn is_discontinuity(&self) -> bool {
        matches!(self.event, ClockEvent::Rewound | ClockEvent::Skipped)
    }
}

/// Forward steps longer than this are skips. Ticks arrive every 10 to
/// 400 ms, so a few seconds without data means the session moved on.
const DEFAULT_SKIP_TOLERANCE: f64 = 5.0;

/// Tolerances for clock classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Backward movement up to this many seconds is treated as jitter.
    pub rewind_tolerance: f64,
    /// Forward movement beyond this many seconds is treated as a skip.
    pub skip_tolerance: f64,
}

impl ClockConfig {
    /// Return a copy with every value clamped to its safe range.
    pub fn sanitized(self) -> Self {
        Self {
            rewind_tolerance: clamp_finite(self.rewind_tolerance, 0.0, 0.5),
            skip_tolerance: clamp_finite(self.skip_tolerance, 1.0, DEFAULT_SKIP_TOLERANCE),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            rewind_tolerance: 0.5,
            skip_tolerance: DEFAULT_SKIP_TOLERANCE,
        }
    }
}

/// Normalizes a non-monotonic session clock.
#[derive(Debug, Clone)]
pub struct SessionClock {
    config: ClockConfig,
    last: Option<f64>,
    monotonic: f64,
}

impl Default for SessionClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl SessionClock {
    /// Create a clock adapter; the configuration is sanitized first.
    pub fn new(config: ClockConfig) -> Self {
        Self {
            config: config.sanitized(),
            last: None,
            monotonic: 0.0,
        }
    }

    /// Feed one raw elapsed-time reading.
    ///
    /// Small backward jitter and non-finite readings hold the previous time
    /// instead of propagating it, so consumers see a stalled clock.
    pub fn tick(&mut self, raw: f64) -> ClockTick {
        let Some(prev) = self.last else {
            if !raw.is_finite() {
                return ClockTick {
                    now: 0.0,
                    delta: 0.0,
                    event: ClockEvent::Stalled,
                };
            }
            self.last = Some(raw);
            trace!(now = raw, "session clock started");
            return ClockTick {
                now: raw,
                delta: 0.0,
                event: ClockEvent::Started,
            };
        };

        if !raw.is_finite() {
            return self.stalled(prev);
        }

        let step = raw - prev;
        if step < -self.config.rewind_tolerance {
            debug!(from = prev, to = raw, "session clock rewound");
            self.last = Some(raw);
            ClockTick {
                now: raw,
                delta: 0.0,
                event: ClockEvent::Rewound,
            }
        } else if step > self.config.skip_tolerance {
            debug!(from = prev, to = raw, "session clock skipped forward");
            self.last = Some(raw);
            ClockTick {
                now: raw,
                delta: 0.0,
                event: ClockEvent::Skipped,
            }
        } else if step > 0.0 {
            self.last = Some(raw);
            self.monotonic += step;
            ClockTick {
                now: raw,
                delta: step,
                event: ClockEvent::Advanced,
            }
        } else {
            self.stalled(prev)
        }
    }

    fn stalled(&self, prev: f64) -> ClockTick {
        ClockTick {
            now: prev,
            delta: 0.0,
            event: ClockEvent::Stalled,
        }
    }

    /// Last accepted session time, if any.
    pub fn now(&self) -> Option<f64> {
        self.last
    }

    /// Sum of all forward steps; never decreases.
    pub fn monotonic(&self) -> f64 {
        self.monotonic
    }

    /// Forget history; the next tick reports [`ClockEvent::Started`].
    pub fn reset(&mut self) {
        self.last = None;
        self.monotonic = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_tick_started() {
        let mut clock = SessionClock::default();
        let tick = clock.tick(42.0);
        assert_eq!(tick.event, ClockEvent::Started);
        assert!((tick.now - 42.0).abs() < 1e-9);
        assert!(tick.delta.abs() < 1e-9);
    }

    #[test]
    fn test_advance_accumulates_monotonic() {
        let mut clock = SessionClock::default();
        clock.tick(10.0);
        let tick = clock.tick(10.25);
        assert_eq!(tick.event, ClockEvent::Advanced);
        assert!((tick.delta - 0.25).abs() < 1e-9);
        clock.tick(11.0);
        assert!((clock.monotonic() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_small_jitter_stalls() {
        let mut clock = SessionClock::default();
        clock.tick(10.0);
        let tick = clock.tick(9.8);
        assert_eq!(tick.event, ClockEvent::Stalled);
        assert!((tick.now - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_rewind_reports_new_time() {
        let mut clock = SessionClock::default();
        clock.tick(100.0);
        let tick = clock.tick(20.0);
        assert_eq!(tick.event, ClockEvent::Rewound);
        assert!(tick.is_discontinuity());
        assert!((tick.now - 20.0).abs() < 1e-9);
        assert!((clock.monotonic()).abs() < 1e-9);
    }

    #[test]
    fn test_skip_forward() {
        let mut clock = SessionClock::default();
        clock.tick(100.0);
        let tick = clock.tick(500.0);
        assert_eq!(tick.event, ClockEvent::Skipped);
        assert!(clock.monotonic().abs() < 1e-9);
    }

    #[test]
    fn test_short_forward_jump_is_skip() {
        let mut clock = SessionClock::default();
        clock.tick(100.0);
        assert_eq!(clock.tick(104.0).event, ClockEvent::Advanced);
        let tick = clock.tick(114.0);
        assert_eq!(tick.event, ClockEvent::Skipped);
        assert!(tick.is_discontinuity());
        assert!((clock.monotonic() - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_non_finite_is_stall() {
        let mut clock = SessionClock::default();
        assert_eq!(clock.tick(f64::NAN).event, ClockEvent::Stalled);
        assert_eq!(clock.now(), None);
        clock.tick(5.0);
        let tick = clock.tick(f64::INFINITY);
        assert_eq!(tick.event, ClockEvent::Stalled);
        assert!((tick.now - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_reset() {
        let mut clock = SessionClock::default();
        clock.tick(1.0);
        clock.tick(2.0);
        clock.reset();
        assert_eq!(clock.tick(3.0).event, ClockEvent::Started);
        assert!(clock.monotonic().abs() < 1e-9);
    }

    #[test]
    fn test_config_sanitized() {
        let config = ClockConfig {
            rewind_tolerance: -4.0,
            skip_tolerance: f64::NAN,
        }
        .sanitized();
        assert!(config.rewind_tolerance.abs() < 1e-9);
        assert!((config.skip_tolerance - DEFAULT_SKIP_TOLERANCE).abs() < 1e-9);
    }
}
