//! Estimator Engine
//!
//! Owns one instance of every estimator and feeds them a single
//! [`TelemetrySample`] per tick. The engine has no scheduling of its own;
//! the caller decides how often `update` runs.

use openracing_race_timing::{
    BlueFlagTimer, ClockEvent, DiffLockTracker, GreenFlagCountdown, PitTimer, SessionClock,
    TimerReading, TrafficGapTimer, WarningFlash,
};
use serde::Serialize;
use tracing::trace;

use crate::brake_migration::BrakeMigration;
use crate::config::EstimatorConfig;
use crate::consumption::{ConsumptionReading, ConsumptionTracker};
use crate::pace::{AdaptivePaceEstimator, PACE_UNKNOWN};
use crate::sample::{TelemetrySample, VehicleTiming};
use crate::stint::{StintEstimate, StintInput, StintStrategy};

/// Every derived value for one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EstimatorOutputs {
    /// Classification of this tick's session time.
    pub clock_event: ClockEvent,
    /// Normalized session time used by the timers.
    pub session_time: f64,
    /// Session time with rewinds and skips removed.
    pub monotonic_time: f64,
    /// Smoothed lap time, or [`PACE_UNKNOWN`].
    pub laptime_pace: f64,
    /// Fuel consumption figures.
    pub fuel_consumption: ConsumptionReading,
    /// Fuel stint projections.
    pub fuel: StintEstimate,
    /// Virtual energy consumption figures, when the car reports energy.
    pub energy_consumption: Option<ConsumptionReading>,
    /// Virtual energy stint projections, when the car reports energy.
    pub energy: Option<StintEstimate>,
    /// Time in the pit lane.
    pub pit_timer: TimerReading,
    /// Total pit lane time this session.
    pub pit_total_time: f64,
    /// Time the blue flag has been shown.
    pub blue_flag_timer: TimerReading,
    /// Time the car behind has been within the traffic gap.
    pub traffic_timer: TimerReading,
    /// Seconds to green.
    pub green_flag_countdown: TimerReading,
    /// Minimum differential locking on throttle.
    pub diff_power_minimum: TimerReading,
    /// Minimum differential locking off throttle.
    pub diff_coast_minimum: TimerReading,
    /// Low fuel indicator lit.
    pub low_fuel_warning: bool,
    /// Forward brake bias migration fraction.
    pub brake_migration: f64,
}

impl Default for EstimatorOutputs {
    fn default() -> Self {
        Self {
            clock_event: ClockEvent::Stalled,
            session_time: 0.0,
            monotonic_time: 0.0,
            laptime_pace: PACE_UNKNOWN,
            fuel_consumption: ConsumptionReading::default(),
            fuel: StintEstimate::default(),
            energy_consumption: None,
            energy: None,
            pit_timer: TimerReading::Inactive,
            pit_total_time: 0.0,
            blue_flag_timer: TimerReading::Inactive,
            traffic_timer: TimerReading::Inactive,
            green_flag_countdown: TimerReading::Inactive,
            diff_power_minimum: TimerReading::Inactive,
            diff_coast_minimum: TimerReading::Inactive,
            low_fuel_warning: false,
            brake_migration: 0.0,
        }
    }
}

/// Fuel or energy: a consumption tracker feeding a stint calculator.
#[derive(Debug, Clone)]
struct ResourceTracker {
    consumption: ConsumptionTracker,
    stint: StintStrategy,
}

impl ResourceTracker {
    fn new(config: &EstimatorConfig) -> Self {
        Self {
            consumption: ConsumptionTracker::new(config.stint),
            stint: StintStrategy::new(config.stint),
        }
    }

    fn update(
        &mut self,
        sample: &TelemetrySample,
        amount: f64,
        capacity: f64,
        laptime_pace: f64,
        now: f64,
        clock_discontinuity: bool,
    ) -> (ConsumptionReading, StintEstimate) {
        if clock_discontinuity {
            self.consumption.invalidate_lap();
        }
        let consumption =
            self.consumption
                .update(amount, sample.completed_laps, sample.in_pits || sample.in_garage);
        let estimate = self.stint.update(&StintInput {
            amount,
            capacity,
            completed_laps: sample.completed_laps,
            lap_progress: sample.clamped_lap_progress(),
            laptime_pace,
            last_lap_time: sample.last_lap_time,
            session_time: now,
            race_length: sample.race_length,
            session_remaining: sample.session_remaining,
            tyre_wear: sample.average_tyre_wear(),
            in_pits: sample.in_pits,
            in_garage: sample.in_garage,
            pre_race: sample.pre_race,
            clock_discontinuity,
            consumption,
        });
        (consumption, estimate)
    }
}

/// All estimators for the player's vehicle.
#[derive(Debug, Clone)]
pub struct EstimatorEngine {
    config: EstimatorConfig,
    clock: SessionClock,
    pace: AdaptivePaceEstimator,
    fuel: ResourceTracker,
    energy: ResourceTracker,
    pit: PitTimer,
    blue_flag: BlueFlagTimer,
    traffic: TrafficGapTimer,
    green_flag: GreenFlagCountdown,
    diff_power: DiffLockTracker,
    diff_coast: DiffLockTracker,
    low_fuel: WarningFlash,
    brake: BrakeMigration,
    outputs: EstimatorOutputs,
}

impl Default for EstimatorEngine {
    fn default() -> Self {
        Self::new(EstimatorConfig::default())
    }
}

impl EstimatorEngine {
    /// Build every estimator from `config`, sanitized first.
    pub fn new(config: EstimatorConfig) -> Self {
        let config = config.sanitized();
        let timers = config.timers;
        Self {
            config,
            clock: SessionClock::new(config.clock),
            pace: AdaptivePaceEstimator::new(config.pace),
            fuel: ResourceTracker::new(&config),
            energy: ResourceTracker::new(&config),
            pit: PitTimer::new(timers.pit),
            blue_flag: BlueFlagTimer::new(timers.blue_flag_cooldown),
            traffic: TrafficGapTimer::new(timers.traffic),
            green_flag: GreenFlagCountdown::new(timers.green_flag),
            diff_power: DiffLockTracker::new(timers.diff_power),
            diff_coast: DiffLockTracker::new(timers.diff_coast),
            low_fuel: WarningFlash::new(config.flash),
            brake: BrakeMigration::new(config.brake),
            outputs: EstimatorOutputs::default(),
        }
    }

    /// Run every estimator on one sample.
    pub fn update(&mut self, sample: &TelemetrySample) -> &EstimatorOutputs {
        let tick = self.clock.tick(sample.session_elapsed);
        let discontinuity = tick.is_discontinuity();
        let now = tick.now;

        // Pace windows run on the same normalized time as the timers.
        let timing = VehicleTiming {
            elapsed: now,
            ..sample.vehicle_timing()
        };
        let laptime_pace = self.pace.update(&timing);

        let (fuel_consumption, fuel) = self.fuel.update(
            sample,
            sample.fuel,
            sample.fuel_capacity,
            laptime_pace,
            now,
            discontinuity,
        );
        let (energy_consumption, energy) = match sample.energy {
            Some(amount) => {
                let (consumption, estimate) = self.energy.update(
                    sample,
                    amount,
                    sample.energy_capacity,
                    laptime_pace,
                    now,
                    discontinuity,
                );
                (Some(consumption), Some(estimate))
            }
            None => (None, None),
        };

        let low_fuel_condition = !sample.in_pits
            && !sample.in_garage
            && fuel
                .laps_remaining()
                .is_some_and(|laps| laps <= self.config.stint.low_fuel_laps);

        self.outputs = EstimatorOutputs {
            clock_event: tick.event,
            session_time: now,
            monotonic_time: self.clock.monotonic(),
            laptime_pace,
            fuel_consumption,
            fuel,
            energy_consumption,
            energy,
            pit_timer: self.pit.update(sample.in_pits, now),
            pit_total_time: self.pit.total_pit_time(),
            blue_flag_timer: self.blue_flag.update(sample.blue_flag, now),
            traffic_timer: self.traffic.update(sample.gap_behind, now),
            green_flag_countdown: self.green_flag.update(sample.start_lights, now),
            diff_power_minimum: self
                .diff_power
                .update(sample.throttle, sample.diff_locking, now),
            diff_coast_minimum: self
                .diff_coast
                .update(sample.throttle, sample.diff_locking, now),
            low_fuel_warning: self.low_fuel.state(now, low_fuel_condition),
            brake_migration: self.brake.calc(
                sample.brake,
                sample.front_brake_bias,
                &sample.brake_pressure,
                sample.electric_braking,
            ),
        };
        trace!(event = ?tick.event, now, pace = laptime_pace, "estimators updated");
        &self.outputs
    }

    /// Outputs of the most recent update.
    pub fn outputs(&self) -> &EstimatorOutputs {
        &self.outputs
    }

    /// Active configuration after sanitizing.
    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    /// Current stint baseline for fuel.
    pub fn fuel_stint(&self) -> &StintStrategy {
        &self.fuel.stint
    }

    /// Restore every estimator to its freshly constructed state.
    pub fn reset_session(&mut self) {
        *self = Self::new(self.config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::RaceLength;

    fn sample(elapsed: f64) -> TelemetrySample {
        TelemetrySample {
            session_elapsed: elapsed,
            vehicle_class: "GT3".to_string(),
            fuel: 50.0,
            fuel_capacity: 100.0,
            ..TelemetrySample::default()
        }
    }

    #[test]
    fn test_first_update_has_no_rates() {
        let mut engine = EstimatorEngine::default();
        let outputs = engine.update(&sample(10.0));
        assert_eq!(outputs.clock_event, ClockEvent::Started);
        assert_eq!(outputs.fuel.laps_remaining(), None);
        assert_eq!(outputs.energy, None);
        assert!(!outputs.low_fuel_warning);
    }

    #[test]
    fn test_pit_timer_follows_session_clock() {
        let mut engine = EstimatorEngine::default();
        let mut s = sample(100.0);
        s.in_pits = true;
        engine.update(&s);
        s.session_elapsed = 104.0;
        let outputs = engine.update(&s);
        assert_eq!(outputs.pit_timer, TimerReading::Running(4.0));
    }

    #[test]
    fn test_pace_window_uses_normalized_time() {
        let mut engine = EstimatorEngine::default();
        engine.update(&sample(90.0));

        // The line is crossed on a tick whose timestamp was lost.
        let mut line = sample(f64::NAN);
        line.lap_start_time = 89.9;
        engine.update(&line);

        let mut after = sample(91.5);
        after.lap_start_time = 89.9;
        after.last_lap_time = 89.9;
        let pace = engine.update(&after).laptime_pace;
        assert!((pace - 89.9).abs() < 1e-9);
    }

    #[test]
    fn test_stint_reference_waits_for_published_lap_time() {
        // Fuel at each lap start, and the lap time of each completed lap.
        let lap_start_fuel = [50.0, 48.5, 46.5, 44.0];
        let lap_times = [101.0, 99.0, 103.0];

        let mut engine = EstimatorEngine::default();
        let mut s = sample(0.0);
        s.race_length = RaceLength::Laps(30);
        for tick in 0..200u32 {
            let t = 0.5 + 2.0 * f64::from(tick);
            let lap = tick / 50;
            let lap_start = f64::from(lap) * 100.0;
            let index = usize::try_from(lap).unwrap_or(0);
            let start_fuel = lap_start_fuel.get(index).copied().unwrap_or(0.0);
            let end_fuel = lap_start_fuel.get(index + 1).copied().unwrap_or(start_fuel - 2.0);

            s.session_elapsed = t;
            s.completed_laps = lap;
            s.lap_start_time = lap_start;
            s.lap_progress = (t - lap_start) / 100.0;
            s.fuel = start_fuel - (start_fuel - end_fuel) * (t - lap_start - 0.5) / 100.0;
            // The finished lap's time is published a second after the line.
            let published = if t - lap_start >= 1.0 { index } else { index.saturating_sub(1) };
            s.last_lap_time = published
                .checked_sub(1)
                .and_then(|i| lap_times.get(i))
                .copied()
                .unwrap_or(-1.0);
            engine.update(&s);
        }

        // Lap two burned 2.5 on a 103 s lap; it must not be ranked by the
        // 99 s still showing when it completed.
        let state = engine.fuel_stint().state();
        assert_eq!(state.reference_consumption, Some(2.0));
        assert!((state.best_stint_laptime - 99.0).abs() < 1e-9);
    }

    #[test]
    fn test_energy_tracked_when_present() {
        let mut engine = EstimatorEngine::default();
        let mut s = sample(5.0);
        s.energy = Some(80.0);
        let outputs = engine.update(&s);
        assert!(outputs.energy.is_some());
        assert!(outputs.energy_consumption.is_some());
    }

    #[test]
    fn test_reset_session_restarts_clock() {
        let mut engine = EstimatorEngine::default();
        engine.update(&sample(10.0));
        engine.update(&sample(11.0));
        engine.reset_session();
        assert_eq!(engine.update(&sample(12.0)).clock_event, ClockEvent::Started);
    }
}
