//! Edge Timer Variants
//!
//! Each variant wraps an [`EdgeTimer`] and differs only in what counts as
//! "true", how long its grace period lasts, and what value it reports while
//! active.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::clamp_finite;
use crate::edge_timer::{EdgeTimer, EdgeTimerConfig, TimerReading};

/// Pit timer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PitTimerConfig {
    /// Seconds the final pit duration stays visible after leaving the pits.
    pub highlight_duration: f64,
    /// Longest duration the timer reports.
    pub max_duration: f64,
}

impl Default for PitTimerConfig {
    fn default() -> Self {
        Self {
            highlight_duration: 5.0,
            max_duration: 999.99,
        }
    }
}

/// Time spent in the pit lane, with a running total across visits.
#[derive(Debug, Clone)]
pub struct PitTimer {
    timer: EdgeTimer,
    total_pit_time: f64,
    visits: u32,
}

impl PitTimer {
    /// Create a pit timer.
    pub fn new(config: PitTimerConfig) -> Self {
        Self {
            timer: EdgeTimer::new(EdgeTimerConfig {
                grace: config.highlight_duration,
                max_duration: config.max_duration,
            }),
            total_pit_time: 0.0,
            visits: 0,
        }
    }

    /// Feed the in-pits flag.
    pub fn update(&mut self, in_pits: bool, now: f64) -> TimerReading {
        let previous = self.timer.reading();
        let reading = self.timer.update(in_pits, now);
        match (previous, reading) {
            (TimerReading::Running(_), TimerReading::Running(_)) => {}
            (TimerReading::Running(duration), _) => {
                self.total_pit_time += duration;
                debug!(duration, total = self.total_pit_time, "pit visit finished");
            }
            (_, TimerReading::Running(_)) => {
                self.visits = self.visits.saturating_add(1);
            }
            _ => {}
        }
        reading
    }

    /// Sum of completed pit visit durations.
    pub fn total_pit_time(&self) -> f64 {
        self.total_pit_time
    }

    /// Number of pit lane entries observed.
    pub fn visits(&self) -> u32 {
        self.visits
    }

    /// Clear the current timer and the accumulated totals.
    pub fn reset(&mut self) {
        self.timer.reset();
        self.total_pit_time = 0.0;
        self.visits = 0;
    }
}

/// How long the blue flag has been shown.
#[derive(Debug, Clone)]
pub struct BlueFlagTimer {
    timer: EdgeTimer,
}

impl BlueFlagTimer {
    /// Create a blue flag timer; `cooldown` is the grace period after the
    /// flag is withdrawn.
    pub fn new(cooldown: f64) -> Self {
        Self {
            timer: EdgeTimer::new(EdgeTimerConfig {
                grace: cooldown,
                ..EdgeTimerConfig::default()
            }),
        }
    }

    /// Feed the blue flag state.
    pub fn update(&mut self, blue_flag: bool, now: f64) -> TimerReading {
        self.timer.update(blue_flag, now)
    }

    /// Clear state.
    pub fn reset(&mut self) {
        self.timer.reset();
    }
}

/// Traffic gap timer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrafficGapConfig {
    /// Gap in seconds at or below which traffic counts as close.
    pub threshold: f64,
    /// Grace period after traffic drops back.
    pub cooldown: f64,
}

impl Default for TrafficGapConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            cooldown: 2.0,
        }
    }
}

/// How long a following car has stayed within the gap threshold.
#[derive(Debug, Clone)]
pub struct TrafficGapTimer {
    threshold: f64,
    timer: EdgeTimer,
}

impl TrafficGapTimer {
    /// Create a traffic timer; the threshold is clamped to at least 0.1 s.
    pub fn new(config: TrafficGapConfig) -> Self {
        Self {
            threshold: clamp_finite(config.threshold, 0.1, 1.0),
            timer: EdgeTimer::new(EdgeTimerConfig {
                grace: config.cooldown,
                ..EdgeTimerConfig::default()
            }),
        }
    }

    /// Feed the gap to the car behind in seconds. Non-positive or
    /// non-finite gaps mean no car is being tracked.
    pub fn update(&mut self, gap_behind: f64, now: f64) -> TimerReading {
        let close = gap_behind.is_finite() && gap_behind > 0.0 && gap_behind <= self.threshold;
        self.timer.update(close, now)
    }

    /// Effective threshold after clamping.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Clear state.
    pub fn reset(&mut self) {
        self.timer.reset();
    }
}

/// Green flag countdown tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreenFlagConfig {
    /// Expected length of the start lights sequence in seconds.
    pub lights_duration: f64,
    /// Seconds the elapsed lights time stays visible after green.
    pub grace: f64,
}

impl Default for GreenFlagConfig {
    fn default() -> Self {
        Self {
            lights_duration: 5.0,
            grace: 3.0,
        }
    }
}

/// Countdown to the green flag while the start lights sequence runs.
///
/// While the lights phase is active the reading carries the seconds left
/// until the expected green; after green the reading carries the full
/// lights time as [`TimerReading::Finished`].
#[derive(Debug, Clone)]
pub struct GreenFlagCountdown {
    lights_duration: f64,
    timer: EdgeTimer,
}

impl GreenFlagCountdown {
    /// Create a countdown.
    pub fn new(config: GreenFlagConfig) -> Self {
        Self {
            lights_duration: clamp_finite(config.lights_duration, 1.0, 5.0),
            timer: EdgeTimer::new(EdgeTimerConfig {
                grace: config.grace,
                ..EdgeTimerConfig::default()
            }),
        }
    }

    /// Feed the start lights phase flag.
    pub fn update(&mut self, lights_active: bool, now: f64) -> TimerReading {
        match self.timer.update(lights_active, now) {
            TimerReading::Running(elapsed) => {
                TimerReading::Running((self.lights_duration - elapsed).max(0.0))
            }
            other => other,
        }
    }

    /// Clear state.
    pub fn reset(&mut self) {
        self.timer.reset();
    }
}

/// Which side of the differential a [`DiffLockTracker`] watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiffLockSide {
    /// On throttle: active while throttle is above the threshold.
    Power,
    /// Off throttle: active while throttle is at or below the threshold.
    Coast,
}

/// Differential locking tracker tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffLockConfig {
    /// Side being watched.
    pub side: DiffLockSide,
    /// Throttle fraction separating power from coast.
    pub throttle_threshold: f64,
    /// Seconds the last minimum stays readable after the side goes inactive.
    pub grace: f64,
}

impl Default for DiffLockConfig {
    fn default() -> Self {
        Self {
            side: DiffLockSide::Power,
            throttle_threshold: 0.02,
            grace: 1.0,
        }
    }
}

/// Minimum differential locking observed during the current activation.
///
/// The reading payload is a locking percentage, not a duration.
#[derive(Debug, Clone)]
pub struct DiffLockTracker {
    side: DiffLockSide,
    throttle_threshold: f64,
    timer: EdgeTimer,
    minimum: Option<f64>,
    active_time: f64,
    last_now: Option<f64>,
}

impl DiffLockTracker {
    /// Create a tracker; the throttle threshold is clamped into `[0, 1]`.
    pub fn new(config: DiffLockConfig) -> Self {
        let threshold = if config.throttle_threshold.is_finite() {
            config.throttle_threshold.clamp(0.0, 1.0)
        } else {
            0.02
        };
        Self {
            side: config.side,
            throttle_threshold: threshold,
            timer: EdgeTimer::new(EdgeTimerConfig {
                grace: config.grace,
                ..EdgeTimerConfig::default()
            }),
            minimum: None,
            active_time: 0.0,
            last_now: None,
        }
    }

    /// Feed throttle position and the current locking percentage.
    pub fn update(&mut self, throttle: f64, locking: f64, now: f64) -> TimerReading {
        let active = match self.side {
            DiffLockSide::Power => throttle > self.throttle_threshold,
            DiffLockSide::Coast => throttle <= self.throttle_threshold,
        };
        let was_running = self.timer.reading().is_running();
        let reading = self.timer.update(active, now);

        match reading {
            TimerReading::Running(_) => {
                if !was_running {
                    self.minimum = None;
                } else if let Some(last) = self.last_now {
                    if now > last {
                        self.active_time += now - last;
                    }
                }
                if locking.is_finite() {
                    self.minimum = Some(self.minimum.map_or(locking, |min| min.min(locking)));
                }
            }
            TimerReading::Finished(_) => {}
            TimerReading::Inactive => self.minimum = None,
        }
        if now.is_finite() {
            self.last_now = Some(now);
        }

        match (reading, self.minimum) {
            (TimerReading::Running(_), Some(min)) => TimerReading::Running(min),
            (TimerReading::Finished(_), Some(min)) => TimerReading::Finished(min),
            _ => TimerReading::Inactive,
        }
    }

    /// Minimum locking of the current or most recent activation.
    pub fn minimum(&self) -> Option<f64> {
        self.minimum
    }

    /// Cumulative seconds the watched side has been active.
    pub fn active_time(&self) -> f64 {
        self.active_time
    }

    /// Clear state.
    pub fn reset(&mut self) {
        self.timer.reset();
        self.minimum = None;
        self.active_time = 0.0;
        self.last_now = None;
    }
}
