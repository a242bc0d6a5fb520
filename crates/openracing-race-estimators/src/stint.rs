//! Stint Strategy Calculator
//!
//! Projects how far the current fuel or energy load lasts, how much has to
//! be added to finish the race, and how many pit stops remain under two
//! strategies: stopping at the end of this lap ("early") or running the tank
//! dry first ("end").
//!
//! # Stint Boundaries
//!
//! A stint restarts when the car is in the garage, before the start, after a
//! clock discontinuity, and after a refuel or tyre change. Refuels and tyre
//! changes are measured against the last reading taken outside the pit lane,
//! so a partial top-up counts as well as a full tank. In the pit lane a
//! refuel or a tyre change only marks the stint; the reset happens on pit
//! exit so the new baseline is the amount the car leaves with.
//!
//! # Consumption Reference
//!
//! The lap time of a just-completed lap is published after the line. Its
//! consumption is held until the lap time can be read, inside the same
//! window the pace estimator uses, and only then ranked against the stint's
//! best lap.

use openracing_race_timing::clamp_finite;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::StintConfig;
use crate::consumption::ConsumptionReading;
use crate::pace::{PACE_UNKNOWN, VALIDATION_MAX_WAIT, VALIDATION_MIN_WAIT, is_valid_laptime};
use crate::sample::RaceLength;

/// Sentinel for an unavailable float estimate.
pub const NOT_AVAILABLE: f64 = -1.0;

/// Sentinel for an unavailable pit stop count.
pub const NOT_AVAILABLE_COUNT: i32 = -1;

/// Results within this distance above an integer do not round up.
const CEIL_TOLERANCE: f64 = 1e-9;

fn ceil_tolerant(value: f64) -> f64 {
    (value - CEIL_TOLERANCE).ceil()
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "pit stop counts are small non-negative whole numbers"
)]
fn to_count(value: f64) -> i32 {
    value.clamp(0.0, f64::from(i32::MAX)) as i32
}

/// Why a stint restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetReason {
    /// First valid sample.
    Initial,
    /// Vehicle in the garage.
    Garage,
    /// Formation lap or countdown.
    PreRace,
    /// Session clock rewound or skipped.
    ClockJump,
    /// Pit exit after a marked refuel or tyre change.
    PitStop,
    /// Amount increased while running.
    Refuel,
    /// Tyre wear decreased while running.
    TyreChange,
}

/// Inputs for one stint update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StintInput {
    /// Fuel or energy remaining.
    pub amount: f64,
    /// Tank or battery capacity.
    pub capacity: f64,
    /// Laps completed in the session.
    pub completed_laps: u32,
    /// Fraction of the current lap driven.
    pub lap_progress: f64,
    /// Smoothed lap time in seconds, or [`PACE_UNKNOWN`].
    pub laptime_pace: f64,
    /// Last completed lap time in seconds.
    pub last_lap_time: f64,
    /// Normalized session time in seconds.
    pub session_time: f64,
    /// Session length rule.
    pub race_length: RaceLength,
    /// Session time left in seconds.
    pub session_remaining: f64,
    /// Average tyre wear, when known.
    pub tyre_wear: Option<f64>,
    /// In the pit lane.
    pub in_pits: bool,
    /// In the garage.
    pub in_garage: bool,
    /// Formation lap or countdown.
    pub pre_race: bool,
    /// Clock rewound or skipped on this tick.
    pub clock_discontinuity: bool,
    /// Output of the matching consumption tracker.
    pub consumption: ConsumptionReading,
}

impl Default for StintInput {
    fn default() -> Self {
        Self {
            amount: 0.0,
            capacity: 0.0,
            completed_laps: 0,
            lap_progress: 0.0,
            laptime_pace: PACE_UNKNOWN,
            last_lap_time: 0.0,
            session_time: 0.0,
            race_length: RaceLength::Time,
            session_remaining: 0.0,
            tyre_wear: None,
            in_pits: false,
            in_garage: false,
            pre_race: false,
            clock_discontinuity: false,
            consumption: ConsumptionReading::default(),
        }
    }
}

/// Stint baseline and consumption reference.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StintState {
    /// Highest amount observed since the stint started.
    pub start_fuel: f64,
    /// Completed lap count at stint start.
    pub start_lap_number: u32,
    /// Fastest lap of the stint, or [`PACE_UNKNOWN`].
    pub best_stint_laptime: f64,
    /// Per-lap consumption of the reference lap.
    pub reference_consumption: Option<f64>,
    /// A refuel or tyre change was seen in the pit lane.
    pub resetting: bool,
    /// Lowest average tyre wear observed since the stint started.
    pub start_wear: Option<f64>,
    /// Amount on the last tick outside the pit lane.
    pub last_amount: f64,
    /// Average tyre wear on the last tick outside the pit lane.
    pub last_wear: Option<f64>,
}

impl Default for StintState {
    fn default() -> Self {
        Self {
            start_fuel: 0.0,
            start_lap_number: 0,
            best_stint_laptime: PACE_UNKNOWN,
            reference_consumption: None,
            resetting: false,
            start_wear: None,
            last_amount: 0.0,
            last_wear: None,
        }
    }
}

/// Projections for the current tick. Unavailable values carry
/// [`NOT_AVAILABLE`] or [`NOT_AVAILABLE_COUNT`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StintEstimate {
    /// Laps the current amount lasts.
    pub laps_remaining: f64,
    /// Minutes the current amount lasts at the current pace.
    pub minutes_remaining: f64,
    /// Laps left in the race, including configured extra laps.
    pub race_laps_remaining: f64,
    /// Total amount needed to finish the race.
    pub required_refuel_absolute: f64,
    /// Amount to add to the current load to finish the race.
    pub required_refuel_relative: f64,
    /// Pit stops needed when stopping at the end of this lap.
    pub pit_stops_early: i32,
    /// Pit stops needed when running the tank dry first.
    pub pit_stops_end: i32,
    /// Per-lap consumption that saves one pit stop.
    pub one_less_pit_consumption: f64,
    /// Per-lap saving needed to skip one pit stop.
    pub one_less_pit_saving: f64,
    /// Laps driven in this stint.
    pub stint_laps: f64,
    /// Amount used in this stint.
    pub stint_used: f64,
}

impl Default for StintEstimate {
    fn default() -> Self {
        Self {
            laps_remaining: NOT_AVAILABLE,
            minutes_remaining: NOT_AVAILABLE,
            race_laps_remaining: NOT_AVAILABLE,
            required_refuel_absolute: NOT_AVAILABLE,
            required_refuel_relative: NOT_AVAILABLE,
            pit_stops_early: NOT_AVAILABLE_COUNT,
            pit_stops_end: NOT_AVAILABLE_COUNT,
            one_less_pit_consumption: NOT_AVAILABLE,
            one_less_pit_saving: NOT_AVAILABLE,
            stint_laps: 0.0,
            stint_used: 0.0,
        }
    }
}

fn available(value: f64) -> Option<f64> {
    (value >= 0.0 && value.is_finite()).then_some(value)
}

fn available_count(value: i32) -> Option<u32> {
    u32::try_from(value).ok()
}

impl StintEstimate {
    // Overflowing projections read as unavailable rather than infinite.
    fn finite_or_unavailable(mut self) -> Self {
        for value in [
            &mut self.laps_remaining,
            &mut self.minutes_remaining,
            &mut self.race_laps_remaining,
            &mut self.required_refuel_absolute,
            &mut self.required_refuel_relative,
            &mut self.one_less_pit_consumption,
            &mut self.one_less_pit_saving,
            &mut self.stint_laps,
            &mut self.stint_used,
        ] {
            if !value.is_finite() {
                *value = NOT_AVAILABLE;
            }
        }
        self
    }

    /// Laps the current amount lasts.
    pub fn laps_remaining(&self) -> Option<f64> {
        available(self.laps_remaining)
    }

    /// Minutes the current amount lasts.
    pub fn minutes_remaining(&self) -> Option<f64> {
        available(self.minutes_remaining)
    }

    /// Laps left in the race.
    pub fn race_laps_remaining(&self) -> Option<f64> {
        available(self.race_laps_remaining)
    }

    /// Amount to add to finish the race.
    pub fn required_refuel_relative(&self) -> Option<f64> {
        available(self.required_refuel_relative)
    }

    /// Total amount needed to finish the race.
    pub fn required_refuel_absolute(&self) -> Option<f64> {
        available(self.required_refuel_absolute)
    }

    /// Pit stops when stopping at the end of this lap.
    pub fn pit_stops_early(&self) -> Option<u32> {
        available_count(self.pit_stops_early)
    }

    /// Pit stops when running the tank dry first.
    pub fn pit_stops_end(&self) -> Option<u32> {
        available_count(self.pit_stops_end)
    }

    /// Per-lap consumption that saves one pit stop.
    pub fn one_less_pit_consumption(&self) -> Option<f64> {
        available(self.one_less_pit_consumption)
    }

    /// Per-lap saving needed to skip one pit stop. May be negative when
    /// the current rate already saves a stop.
    pub fn one_less_pit_saving(&self) -> Option<f64> {
        self.one_less_pit_consumption()
            .map(|_| self.one_less_pit_saving)
    }
}

/// Laps left in the race, before extra laps.
///
/// Time limited races need a valid pace; the lap in progress is counted
/// whole and then the part already driven is subtracted.
pub fn race_laps_remaining(
    race_length: RaceLength,
    completed_laps: u32,
    lap_progress: f64,
    session_remaining: f64,
    laptime_pace: f64,
) -> Option<f64> {
    match race_length {
        RaceLength::Laps(total) => {
            Some((f64::from(total) - f64::from(completed_laps) - lap_progress).max(0.0))
        }
        RaceLength::Time => {
            if !is_valid_laptime(laptime_pace) || !session_remaining.is_finite() {
                return None;
            }
            let remaining = session_remaining.max(0.0);
            let laps = (ceil_tolerant(lap_progress + remaining / laptime_pace) - lap_progress).max(0.0);
            laps.is_finite().then_some(laps)
        }
    }
}

/// Pit stop counts `(early, end)` for the given load.
///
/// `needed` is the amount missing to finish the race. Stopping early also
/// throws away what is left in the tank at the end of this lap, since the
/// tank can only be topped up to capacity.
pub fn pit_stop_counts(
    amount: f64,
    capacity: f64,
    rate: f64,
    lap_progress: f64,
    race_laps: f64,
) -> Option<(i32, i32)> {
    if capacity <= 0.0 || !capacity.is_finite() {
        return None;
    }
    let needed = race_laps * rate - amount;
    if needed <= 0.0 {
        return Some((0, 0));
    }
    let end = ceil_tolerant(needed / capacity);
    let amount_at_lap_end = (amount - rate * (1.0 - lap_progress)).max(0.0);
    let early = ceil_tolerant((needed + amount_at_lap_end) / capacity);
    Some((to_count(early), to_count(end)))
}

/// Completed-lap consumption waiting for its lap time.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingLap {
    used: f64,
    completed_at: f64,
}

/// Stint tracking and strategy projection for one resource.
#[derive(Debug, Clone)]
pub struct StintStrategy {
    config: StintConfig,
    state: StintState,
    pending: Option<PendingLap>,
    initialized: bool,
    estimate: StintEstimate,
}

impl Default for StintStrategy {
    fn default() -> Self {
        Self::new(StintConfig::default())
    }
}

impl StintStrategy {
    /// Create a calculator; the configuration is sanitized first.
    pub fn new(config: StintConfig) -> Self {
        Self {
            config: config.sanitized(),
            state: StintState::default(),
            pending: None,
            initialized: false,
            estimate: StintEstimate::default(),
        }
    }

    /// Feed one tick and return the projections.
    ///
    /// A non-finite amount leaves state untouched and repeats the previous
    /// estimate.
    pub fn update(&mut self, input: &StintInput) -> StintEstimate {
        if !input.amount.is_finite() {
            return self.estimate;
        }

        match self.detect_reset(input) {
            Some(reason) => self.reset(input, reason),
            None => {
                if !input.in_pits {
                    self.state.start_fuel = self.state.start_fuel.max(input.amount);
                    self.state.last_amount = input.amount;
                    if let Some(wear) = input.tyre_wear {
                        self.state.start_wear =
                            Some(self.state.start_wear.map_or(wear, |start| start.min(wear)));
                        self.state.last_wear = Some(wear);
                    }
                }
                self.update_reference(input);
            }
        }

        self.estimate = self.project(input);
        self.estimate
    }

    fn detect_reset(&mut self, input: &StintInput) -> Option<ResetReason> {
        if !self.initialized {
            return Some(ResetReason::Initial);
        }
        if input.in_garage {
            return Some(ResetReason::Garage);
        }
        if input.pre_race {
            return Some(ResetReason::PreRace);
        }
        if input.clock_discontinuity {
            return Some(ResetReason::ClockJump);
        }

        // The last reading outside the pit lane is the pit entry value while
        // the car is being serviced.
        let refueled = input.amount > self.state.last_amount + self.config.refuel_threshold;
        let new_tyres = match (input.tyre_wear, self.state.last_wear) {
            (Some(wear), Some(last)) => wear < last - self.config.tyre_change_threshold,
            _ => false,
        };

        if input.in_pits {
            if (refueled || new_tyres) && !self.state.resetting {
                debug!(refueled, new_tyres, "pit service detected, stint marked for reset");
                self.state.resetting = true;
            }
            None
        } else if self.state.resetting {
            Some(ResetReason::PitStop)
        } else if refueled {
            Some(ResetReason::Refuel)
        } else if new_tyres {
            Some(ResetReason::TyreChange)
        } else {
            None
        }
    }

    /// Restart the stint from the current input.
    ///
    /// Repeating a reset with the same input leaves the state unchanged.
    pub fn reset(&mut self, input: &StintInput, reason: ResetReason) {
        let previous = self.state;
        self.state = StintState {
            start_fuel: input.amount,
            start_lap_number: input.completed_laps,
            best_stint_laptime: PACE_UNKNOWN,
            reference_consumption: input.consumption.last_lap.filter(|used| *used > 0.0),
            resetting: false,
            start_wear: input.tyre_wear,
            last_amount: input.amount,
            last_wear: input.tyre_wear,
        };
        self.pending = None;
        self.initialized = true;
        if self.state != previous {
            debug!(
                ?reason,
                start_fuel = self.state.start_fuel,
                start_lap = self.state.start_lap_number,
                "stint reset"
            );
        }
    }

    fn update_reference(&mut self, input: &StintInput) {
        let now = input.session_time;
        if let Some(used) = input.consumption.completed_lap.filter(|used| *used > 0.0) {
            if let Some(stale) = self.pending.take() {
                trace!(used = stale.used, "lap superseded before its lap time arrived");
                self.apply_reference(stale.used, None);
            }
            self.pending = Some(PendingLap {
                used,
                completed_at: now,
            });
        }

        let Some(pending) = self.pending else {
            return;
        };
        if !now.is_finite() {
            return;
        }
        let waited = now - pending.completed_at;
        if waited < 0.0 {
            self.pending = Some(PendingLap {
                completed_at: now,
                ..pending
            });
        } else if waited > VALIDATION_MAX_WAIT {
            trace!(waited, "no lap time for the completed lap");
            self.pending = None;
            self.apply_reference(pending.used, None);
        } else if waited >= VALIDATION_MIN_WAIT && is_valid_laptime(input.last_lap_time) {
            self.pending = None;
            self.apply_reference(pending.used, Some(input.last_lap_time));
        }
    }

    fn apply_reference(&mut self, used: f64, laptime: Option<f64>) {
        match (self.state.reference_consumption, laptime) {
            (None, _) => {
                self.state.reference_consumption = Some(used);
                self.state.best_stint_laptime = laptime.unwrap_or(PACE_UNKNOWN);
            }
            (Some(_), Some(laptime)) if laptime < self.state.best_stint_laptime => {
                debug!(laptime, used, "stint best lap, consumption reference replaced");
                self.state.reference_consumption = Some(used);
                self.state.best_stint_laptime = laptime;
            }
            (Some(_), _) => {}
        }
    }

    /// Consumption rate used for projections.
    pub fn rate(&self, consumption: &ConsumptionReading) -> Option<f64> {
        self.state
            .reference_consumption
            .or(consumption.pace)
            .filter(|rate| rate.is_finite() && *rate > 0.0)
    }

    fn project(&self, input: &StintInput) -> StintEstimate {
        self.project_raw(input).finite_or_unavailable()
    }

    fn project_raw(&self, input: &StintInput) -> StintEstimate {
        let amount = input.amount.max(0.0);
        let progress = clamp_finite(input.lap_progress, 0.0, 0.0).min(0.999_999);
        let mut estimate = StintEstimate {
            stint_laps: (f64::from(input.completed_laps)
                - f64::from(self.state.start_lap_number)
                + progress)
                .max(0.0),
            stint_used: (self.state.start_fuel - amount).max(0.0),
            ..StintEstimate::default()
        };

        let race_laps = race_laps_remaining(
            input.race_length,
            input.completed_laps,
            progress,
            input.session_remaining,
            input.laptime_pace,
        )
        .map(|laps| laps + self.config.extra_laps);
        if let Some(laps) = race_laps {
            estimate.race_laps_remaining = laps;
        }

        let Some(rate) = self.rate(&input.consumption) else {
            return estimate;
        };

        estimate.laps_remaining = amount / rate;
        if is_valid_laptime(input.laptime_pace) {
            estimate.minutes_remaining = estimate.laps_remaining * input.laptime_pace / 60.0;
        }

        let Some(race_laps) = race_laps else {
            return estimate;
        };

        let absolute = race_laps * rate;
        estimate.required_refuel_absolute = absolute;
        estimate.required_refuel_relative = (absolute - amount).max(0.0);

        if let Some((early, end)) =
            pit_stop_counts(amount, input.capacity, rate, progress, race_laps)
        {
            estimate.pit_stops_early = early;
            estimate.pit_stops_end = end;
            if end >= 1 && race_laps > 0.0 {
                let consumption = (amount + f64::from(end - 1) * input.capacity) / race_laps;
                estimate.one_less_pit_consumption = consumption;
                estimate.one_less_pit_saving = rate - consumption;
            }
        }

        estimate
    }

    /// Most recent estimate.
    pub fn estimate(&self) -> &StintEstimate {
        &self.estimate
    }

    /// Stint baseline and reference.
    pub fn state(&self) -> &StintState {
        &self.state
    }

    /// Forget everything, as if newly constructed.
    pub fn clear(&mut self) {
        self.state = StintState::default();
        self.pending = None;
        self.initialized = false;
        self.estimate = StintEstimate::default();
    }
}
