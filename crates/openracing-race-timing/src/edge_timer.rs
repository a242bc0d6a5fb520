//! Edge Timer
//!
//! Measures elapsed seconds since a boolean condition's most recent rising
//! edge. After the falling edge the final duration stays readable for a grace
//! period so a highlight can finish, then the timer deactivates.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::clamp_finite;

/// Signed encoding of [`TimerReading::Inactive`].
pub const TIMER_INACTIVE: f64 = -99999.0;

/// Output of an edge timer for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TimerReading {
    /// Condition false and no grace period pending.
    Inactive,
    /// Condition true; seconds since the rising edge.
    Running(f64),
    /// Condition recently cleared; final duration held during grace.
    Finished(f64),
}

impl TimerReading {
    /// Encode as a single float: positive while running, negated final
    /// duration during grace, [`TIMER_INACTIVE`] otherwise.
    pub fn as_signed(self) -> f64 {
        match self {
            Self::Inactive => TIMER_INACTIVE,
            Self::Running(seconds) => seconds,
            Self::Finished(seconds) => -seconds,
        }
    }

    /// Seconds carried by the reading, if any.
    pub fn seconds(self) -> Option<f64> {
        match self {
            Self::Inactive => None,
            Self::Running(seconds) | Self::Finished(seconds) => Some(seconds),
        }
    }

    /// True unless [`TimerReading::Inactive`].
    pub fn is_active(self) -> bool {
        !matches!(self, Self::Inactive)
    }

    /// True while the condition holds.
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running(_))
    }
}

/// Edge timer tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeTimerConfig {
    /// Seconds the final duration stays readable after the falling edge.
    pub grace: f64,
    /// Reported durations are capped at this many seconds.
    pub max_duration: f64,
}

impl EdgeTimerConfig {
    /// Return a copy with every value clamped to its safe range.
    pub fn sanitized(self) -> Self {
        Self {
            grace: clamp_finite(self.grace, 0.0, 0.0),
            max_duration: clamp_finite(self.max_duration, 1.0, 999.99),
        }
    }
}

impl Default for EdgeTimerConfig {
    fn default() -> Self {
        Self {
            grace: 0.0,
            max_duration: 999.99,
        }
    }
}

/// Rising-edge timer tolerant of a non-monotonic clock.
///
/// # Invariants
///
/// - A reported duration is never negative: when `now` is earlier than the
///   recorded start, the start moves to `now`
/// - A condition already true on the very first tick starts at that tick
#[derive(Debug, Clone)]
pub struct EdgeTimer {
    config: EdgeTimerConfig,
    timer_start: Option<f64>,
    falling_edge: Option<f64>,
    last_condition: bool,
    last_duration: f64,
    last_reading: TimerReading,
}

impl Default for EdgeTimer {
    fn default() -> Self {
        Self::new(EdgeTimerConfig::default())
    }
}

impl EdgeTimer {
    /// Create a timer; the configuration is sanitized first.
    pub fn new(config: EdgeTimerConfig) -> Self {
        Self {
            config: config.sanitized(),
            timer_start: None,
            falling_edge: None,
            last_condition: false,
            last_duration: 0.0,
            last_reading: TimerReading::Inactive,
        }
    }

    /// Feed the condition and the current clock value.
    ///
    /// A non-finite `now` repeats the previous reading without touching state.
    pub fn update(&mut self, condition: bool, now: f64) -> TimerReading {
        if !now.is_finite() {
            return self.last_reading;
        }

        let reading = if condition {
            self.falling_edge = None;
            let start = match self.timer_start {
                Some(start) if self.last_condition && now >= start => start,
                Some(start) if self.last_condition => {
                    trace!(start, now, "edge timer clock rewound, restarting");
                    self.timer_start = Some(now);
                    now
                }
                _ => {
                    self.timer_start = Some(now);
                    now
                }
            };
            let duration = (now - start).min(self.config.max_duration);
            self.last_duration = duration;
            TimerReading::Running(duration)
        } else if self.timer_start.is_some() {
            let fell_at = match self.falling_edge {
                Some(fell_at) if now >= fell_at => fell_at,
                _ => {
                    self.falling_edge = Some(now);
                    now
                }
            };
            if self.config.grace > 0.0 && now - fell_at <= self.config.grace {
                TimerReading::Finished(self.last_duration)
            } else {
                self.deactivate();
                TimerReading::Inactive
            }
        } else {
            TimerReading::Inactive
        };

        self.last_condition = condition;
        self.last_reading = reading;
        reading
    }

    fn deactivate(&mut self) {
        self.timer_start = None;
        self.falling_edge = None;
    }

    /// Reading produced by the most recent [`update`](Self::update).
    pub fn reading(&self) -> TimerReading {
        self.last_reading
    }

    /// Clock value of the current activation's rising edge.
    pub fn started_at(&self) -> Option<f64> {
        self.timer_start
    }

    /// Last duration observed while the condition held.
    pub fn last_duration(&self) -> f64 {
        self.last_duration
    }

    /// Timer configuration after sanitization.
    pub fn config(&self) -> &EdgeTimerConfig {
        &self.config
    }

    /// Return to the freshly constructed state.
    pub fn reset(&mut self) {
        self.deactivate();
        self.last_condition = false;
        self.last_duration = 0.0;
        self.last_reading = TimerReading::Inactive;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_grace(grace: f64) -> EdgeTimer {
        EdgeTimer::new(EdgeTimerConfig {
            grace,
            ..EdgeTimerConfig::default()
        })
    }

    #[test]
    fn test_inactive_until_condition() {
        let mut timer = EdgeTimer::default();
        assert_eq!(timer.update(false, 10.0), TimerReading::Inactive);
        assert!((timer.reading().as_signed() - TIMER_INACTIVE).abs() < 1e-9);
    }

    #[test]
    fn test_first_tick_true_starts_at_now() {
        let mut timer = EdgeTimer::default();
        assert_eq!(timer.update(true, 500.0), TimerReading::Running(0.0));
        assert_eq!(timer.update(true, 502.0), TimerReading::Running(2.0));
        assert_eq!(timer.started_at(), Some(500.0));
    }

    #[test]
    fn test_grace_reports_negative_duration() {
        let mut timer = with_grace(2.0);
        timer.update(true, 10.0);
        timer.update(true, 13.0);
        let reading = timer.update(false, 13.5);
        assert_eq!(reading, TimerReading::Finished(3.0));
        assert!((reading.as_signed() + 3.0).abs() < 1e-9);
        assert_eq!(timer.update(false, 15.5), TimerReading::Finished(3.0));
        assert_eq!(timer.update(false, 15.6), TimerReading::Inactive);
        assert_eq!(timer.started_at(), None);
    }

    #[test]
    fn test_zero_grace_deactivates_immediately() {
        let mut timer = EdgeTimer::default();
        timer.update(true, 1.0);
        assert_eq!(timer.update(false, 2.0), TimerReading::Inactive);
    }

    #[test]
    fn test_rewind_while_running_restarts() {
        let mut timer = EdgeTimer::default();
        timer.update(true, 100.0);
        timer.update(true, 110.0);
        assert_eq!(timer.update(true, 50.0), TimerReading::Running(0.0));
        assert_eq!(timer.update(true, 51.0), TimerReading::Running(1.0));
    }

    #[test]
    fn test_rewind_during_grace_restarts_grace() {
        let mut timer = with_grace(1.0);
        timer.update(true, 100.0);
        timer.update(true, 104.0);
        timer.update(false, 104.5);
        assert_eq!(timer.update(false, 20.0), TimerReading::Finished(4.0));
        assert_eq!(timer.update(false, 20.9), TimerReading::Finished(4.0));
        assert_eq!(timer.update(false, 21.1), TimerReading::Inactive);
    }

    #[test]
    fn test_new_rising_edge_during_grace_restarts() {
        let mut timer = with_grace(5.0);
        timer.update(true, 0.0);
        timer.update(true, 3.0);
        timer.update(false, 4.0);
        assert_eq!(timer.update(true, 6.0), TimerReading::Running(0.0));
    }

    #[test]
    fn test_duration_capped() {
        let mut timer = EdgeTimer::new(EdgeTimerConfig {
            grace: 0.0,
            max_duration: 10.0,
        });
        timer.update(true, 0.0);
        assert_eq!(timer.update(true, 60.0), TimerReading::Running(10.0));
    }

    #[test]
    fn test_non_finite_now_repeats_reading() {
        let mut timer = EdgeTimer::default();
        timer.update(true, 1.0);
        timer.update(true, 3.0);
        assert_eq!(timer.update(false, f64::NAN), TimerReading::Running(2.0));
        assert_eq!(timer.update(true, 4.0), TimerReading::Running(3.0));
    }

    #[test]
    fn test_reset() {
        let mut timer = with_grace(3.0);
        timer.update(true, 1.0);
        timer.update(false, 2.0);
        timer.reset();
        assert_eq!(timer.reading(), TimerReading::Inactive);
        assert_eq!(timer.update(false, 2.5), TimerReading::Inactive);
    }

    #[test]
    fn test_reading_helpers() {
        assert_eq!(TimerReading::Running(1.5).seconds(), Some(1.5));
        assert_eq!(TimerReading::Finished(2.0).seconds(), Some(2.0));
        assert_eq!(TimerReading::Inactive.seconds(), None);
        assert!(TimerReading::Finished(0.0).is_active());
        assert!(!TimerReading::Finished(0.0).is_running());
    }

    #[test]
    fn test_reading_serde() -> Result<(), serde_json::Error> {
        assert_eq!(
            serde_json::to_string(&TimerReading::Running(12.5))?,
            r#"{"Running":12.5}"#
        );
        assert_eq!(serde_json::to_string(&TimerReading::Inactive)?, r#""Inactive""#);
        let config: EdgeTimerConfig = serde_json::from_str(r#"{"grace": 2.0}"#)?;
        assert!((config.grace - 2.0).abs() < 1e-9);
        assert!((config.max_duration - 999.99).abs() < 1e-9);
        Ok(())
    }
}
