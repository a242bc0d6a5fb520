//! Adaptive Lap Time Pace
//!
//! Produces a representative lap time for one vehicle. A completed lap is
//! examined once, inside a short validation window after the lap start
//! changes, and only non-pit laps are accepted. Faster laps replace the
//! pace immediately; slower laps are blended in and can raise the pace by at
//! most the configured margin per lap.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::PaceConfig;
use crate::sample::VehicleTiming;

/// Sentinel for "no pace yet". Large enough to read as an implausible lap.
pub const PACE_UNKNOWN: f64 = 99999.0;

/// Validation window opens this many seconds after a new lap starts.
pub(crate) const VALIDATION_MIN_WAIT: f64 = 1.0;

/// Validation window cancels itself after this many seconds.
pub(crate) const VALIDATION_MAX_WAIT: f64 = 10.0;

/// Lap start times closer than this are the same lap.
const LAP_START_EPSILON: f64 = 1e-6;

/// True for a strictly positive, finite lap time below [`PACE_UNKNOWN`].
#[inline]
pub fn is_valid_laptime(seconds: f64) -> bool {
    seconds.is_finite() && seconds > 0.0 && seconds < PACE_UNKNOWN
}

/// Best available reference lap time: the lower of the valid last and best
/// lap times, or [`PACE_UNKNOWN`].
fn reference_laptime(last: f64, best: f64) -> f64 {
    [last, best]
        .into_iter()
        .filter(|t| is_valid_laptime(*t))
        .fold(PACE_UNKNOWN, f64::min)
}

/// Internal state of one [`AdaptivePaceEstimator`].
#[derive(Debug, Clone, PartialEq)]
pub struct PaceState {
    /// Smoothed pace in seconds, or [`PACE_UNKNOWN`].
    pub laptime_pace: f64,
    /// Vehicle class seen on the previous tick.
    pub last_vehicle_class: String,
    /// Lap start time seen on the previous tick.
    pub last_lap_start_time: Option<f64>,
    /// Session time at which the current validation window opened.
    pub validating_since: Option<f64>,
    /// In-pits flag OR-accumulated over the current lap.
    pub pit_lap_flag: bool,
    /// The lap under validation touched the pit lane.
    pub validating_pit_lap: bool,
}

impl Default for PaceState {
    fn default() -> Self {
        Self {
            laptime_pace: PACE_UNKNOWN,
            last_vehicle_class: String::new(),
            last_lap_start_time: None,
            validating_since: None,
            pit_lap_flag: false,
            validating_pit_lap: false,
        }
    }
}

/// Smoothed pace tracker for a single vehicle.
#[derive(Debug, Clone, Default)]
pub struct AdaptivePaceEstimator {
    config: PaceConfig,
    state: PaceState,
}

impl AdaptivePaceEstimator {
    /// Create an estimator; the configuration is sanitized first.
    pub fn new(config: PaceConfig) -> Self {
        Self {
            config: config.sanitized(),
            state: PaceState::default(),
        }
    }

    /// Feed one tick of timing data and return the current pace.
    pub fn update(&mut self, timing: &VehicleTiming<'_>) -> f64 {
        if timing.vehicle_class != self.state.last_vehicle_class {
            let seed = reference_laptime(timing.last_lap_time, timing.best_lap_time);
            debug!(
                from = %self.state.last_vehicle_class,
                to = timing.vehicle_class,
                seed,
                "vehicle class changed, pace reseeded"
            );
            self.state.last_vehicle_class.clear();
            self.state.last_vehicle_class.push_str(timing.vehicle_class);
            self.state.laptime_pace = seed;
        }

        let elapsed = timing.elapsed;
        if !elapsed.is_finite() {
            return self.state.laptime_pace;
        }

        self.track_lap_start(timing);
        self.validate(timing, elapsed);
        self.state.laptime_pace
    }

    fn track_lap_start(&mut self, timing: &VehicleTiming<'_>) {
        let lap_start = timing.lap_start_time;
        if !lap_start.is_finite() {
            self.state.pit_lap_flag |= timing.in_pits;
            return;
        }
        match self.state.last_lap_start_time {
            None => {
                self.state.last_lap_start_time = Some(lap_start);
                self.state.pit_lap_flag = timing.in_pits;
            }
            Some(previous) if (lap_start - previous).abs() > LAP_START_EPSILON => {
                self.state.last_lap_start_time = Some(lap_start);
                self.state.validating_since = Some(timing.elapsed);
                self.state.validating_pit_lap = self.state.pit_lap_flag || timing.in_pits;
                self.state.pit_lap_flag = timing.in_pits;
                trace!(lap_start, pit_lap = self.state.validating_pit_lap, "lap start detected");
            }
            Some(_) => self.state.pit_lap_flag |= timing.in_pits,
        }
    }

    fn validate(&mut self, timing: &VehicleTiming<'_>, elapsed: f64) {
        let Some(since) = self.state.validating_since else {
            return;
        };
        let waited = elapsed - since;

        if waited < 0.0 {
            self.state.validating_since = Some(elapsed);
        } else if waited > VALIDATION_MAX_WAIT {
            trace!(waited, "validation window expired without a lap time");
            self.state.validating_since = None;
        } else if waited >= VALIDATION_MIN_WAIT {
            if self.state.validating_pit_lap {
                if !is_valid_laptime(self.state.laptime_pace) {
                    self.state.laptime_pace =
                        reference_laptime(timing.last_lap_time, timing.best_lap_time);
                }
                debug!(laptime = timing.last_lap_time, "pit lap excluded from pace");
                self.state.validating_since = None;
            } else if is_valid_laptime(timing.last_lap_time) {
                self.record_lap(timing.last_lap_time);
                self.state.validating_since = None;
            }
        }
    }

    /// Fold an accepted lap time into the pace and return the new pace.
    ///
    /// A faster lap replaces the pace. A slower one is averaged in with
    /// `1 / sample_count` weight and can raise the pace by at most
    /// `margin`. Invalid lap times are ignored.
    pub fn record_lap(&mut self, laptime: f64) -> f64 {
        if !is_valid_laptime(laptime) {
            return self.state.laptime_pace;
        }
        let pace = self.state.laptime_pace;
        let next = if laptime < pace {
            laptime
        } else {
            let n = f64::from(self.config.sample_count);
            let mean = (pace * (n - 1.0) + laptime) / n;
            mean.min(pace + self.config.margin)
        };
        debug!(laptime, from = pace, to = next, "lap accepted into pace");
        self.state.laptime_pace = next;
        next
    }

    /// Current pace in seconds, or [`PACE_UNKNOWN`].
    pub fn pace(&self) -> f64 {
        self.state.laptime_pace
    }

    /// Current pace when known.
    pub fn known_pace(&self) -> Option<f64> {
        is_valid_laptime(self.state.laptime_pace).then_some(self.state.laptime_pace)
    }

    /// Internal state, for inspection.
    pub fn state(&self) -> &PaceState {
        &self.state
    }

    /// Active configuration after sanitizing.
    pub fn config(&self) -> &PaceConfig {
        &self.config
    }

    /// Forget everything, as if newly constructed.
    pub fn reset(&mut self) {
        self.state = PaceState::default();
    }
}

#[derive(Debug, Clone)]
struct PaceSlot {
    estimator: AdaptivePaceEstimator,
    generation: u64,
}

/// One [`AdaptivePaceEstimator`] per vehicle slot.
///
/// Slots that stop appearing in [`VehiclePaceBank::update_all`] are dropped.
#[derive(Debug, Clone, Default)]
pub struct VehiclePaceBank {
    config: PaceConfig,
    slots: HashMap<u32, PaceSlot>,
    generation: u64,
}

impl VehiclePaceBank {
    /// Create an empty bank; every estimator shares `config`.
    pub fn new(config: PaceConfig) -> Self {
        Self {
            config: config.sanitized(),
            slots: HashMap::new(),
            generation: 0,
        }
    }

    /// Update every vehicle present this tick and drop the rest.
    pub fn update_all<'a, I>(&mut self, vehicles: I)
    where
        I: IntoIterator<Item = (u32, VehicleTiming<'a>)>,
    {
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        for (slot_id, timing) in vehicles {
            let config = self.config;
            let slot = self.slots.entry(slot_id).or_insert_with(|| PaceSlot {
                estimator: AdaptivePaceEstimator::new(config),
                generation,
            });
            slot.generation = generation;
            slot.estimator.update(&timing);
        }
        let before = self.slots.len();
        self.slots.retain(|_, slot| slot.generation == generation);
        if self.slots.len() != before {
            debug!(dropped = before - self.slots.len(), "vehicle slots left the session");
        }
    }

    /// Update a single vehicle without touching the others.
    pub fn update(&mut self, slot_id: u32, timing: &VehicleTiming<'_>) -> f64 {
        let config = self.config;
        let generation = self.generation;
        self.slots
            .entry(slot_id)
            .or_insert_with(|| PaceSlot {
                estimator: AdaptivePaceEstimator::new(config),
                generation,
            })
            .estimator
            .update(timing)
    }

    /// Pace of one vehicle, [`PACE_UNKNOWN`] for an unknown slot.
    pub fn pace(&self, slot_id: u32) -> f64 {
        self.slots
            .get(&slot_id)
            .map_or(PACE_UNKNOWN, |slot| slot.estimator.pace())
    }

    /// Lowest known pace in the session, if any.
    pub fn best_pace(&self) -> Option<f64> {
        self.slots
            .values()
            .filter_map(|slot| slot.estimator.known_pace())
            .reduce(f64::min)
    }

    /// Number of tracked vehicles.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True when no vehicle is tracked.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop every vehicle.
    pub fn clear(&mut self) {
        self.slots.clear();
    }
}
