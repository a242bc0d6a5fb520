//! Per-lap fuel and energy consumption.
//!
//! A lap counts only when it was driven in one piece: no pit lane visit, no
//! refuel and no clock discontinuity between its start and its end.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::StintConfig;

/// Consumption figures after one tick.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsumptionReading {
    /// Consumption of a lap completed on this very tick.
    pub completed_lap: Option<f64>,
    /// Consumption of the most recent clean lap.
    pub last_lap: Option<f64>,
    /// Mean consumption over the recent clean laps.
    pub pace: Option<f64>,
}

/// Tracks one resource (fuel or virtual energy) lap by lap.
#[derive(Debug, Clone)]
pub struct ConsumptionTracker {
    refuel_threshold: f64,
    window: usize,
    samples: VecDeque<f64>,
    lap_start_amount: Option<f64>,
    last_amount: Option<f64>,
    last_completed_laps: Option<u32>,
    dirty: bool,
    last_lap: Option<f64>,
}

impl Default for ConsumptionTracker {
    fn default() -> Self {
        Self::new(StintConfig::default())
    }
}

impl ConsumptionTracker {
    /// Create a tracker using the refuel threshold and sample window of
    /// `config`.
    pub fn new(config: StintConfig) -> Self {
        let config = config.sanitized();
        let window = usize::try_from(config.consumption_samples).unwrap_or(1);
        Self {
            refuel_threshold: config.refuel_threshold,
            window,
            samples: VecDeque::with_capacity(window),
            lap_start_amount: None,
            last_amount: None,
            last_completed_laps: None,
            dirty: false,
            last_lap: None,
        }
    }

    /// Feed the current amount and lap count.
    pub fn update(&mut self, amount: f64, completed_laps: u32, in_pits: bool) -> ConsumptionReading {
        if !amount.is_finite() {
            return self.reading(None);
        }

        if in_pits {
            self.dirty = true;
        }
        if let Some(previous) = self.last_amount
            && amount > previous + self.refuel_threshold
        {
            self.dirty = true;
        }
        self.last_amount = Some(amount);

        let mut completed = None;
        match self.last_completed_laps {
            Some(previous) if previous == completed_laps => {}
            Some(previous) => {
                if completed_laps == previous.saturating_add(1) && !self.dirty {
                    completed = self.finish_lap(amount);
                }
                self.start_lap(amount, completed_laps, in_pits);
            }
            None => self.start_lap(amount, completed_laps, true),
        }
        self.reading(completed)
    }

    fn finish_lap(&mut self, amount: f64) -> Option<f64> {
        let used = self.lap_start_amount? - amount;
        if used <= 0.0 {
            return None;
        }
        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(used);
        self.last_lap = Some(used);
        trace!(used, "lap consumption recorded");
        Some(used)
    }

    // The first observed lap is joined part way through, so it never counts.
    fn start_lap(&mut self, amount: f64, completed_laps: u32, dirty: bool) {
        self.lap_start_amount = Some(amount);
        self.last_completed_laps = Some(completed_laps);
        self.dirty = dirty;
    }

    fn reading(&self, completed_lap: Option<f64>) -> ConsumptionReading {
        ConsumptionReading {
            completed_lap,
            last_lap: self.last_lap,
            pace: self.pace(),
        }
    }

    /// Exclude the lap in progress, e.g. after a clock discontinuity.
    pub fn invalidate_lap(&mut self) {
        self.dirty = true;
    }

    /// Mean of the recent clean laps.
    pub fn pace(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let count = u32::try_from(self.samples.len()).ok()?;
        Some(self.samples.iter().sum::<f64>() / f64::from(count))
    }

    /// Consumption of the most recent clean lap.
    pub fn last_lap(&self) -> Option<f64> {
        self.last_lap
    }

    /// Forget every lap.
    pub fn reset(&mut self) {
        self.samples.clear();
        self.lap_start_amount = None;
        self.last_amount = None;
        self.last_completed_laps = None;
        self.dirty = false;
        self.last_lap = None;
    }
}
