//! Telemetry snapshot consumed by the estimators.
//!
//! A [`TelemetrySample`] is an immutable, caller-owned value read once per
//! tick. The estimators never mutate it and never keep references to it past
//! the call.

use serde::{Deserialize, Serialize};

/// How the session length is defined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceLength {
    /// Race ends after this many laps.
    Laps(u32),
    /// Race ends when the session timer runs out.
    Time,
}

impl Default for RaceLength {
    fn default() -> Self {
        Self::Time
    }
}

/// Point-in-time telemetry for the player's vehicle.
///
/// Fuel and energy are unit-agnostic; display conversion belongs to the
/// consumer. Wheel arrays are ordered front-left, front-right, rear-left,
/// rear-right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetrySample {
    /// Session elapsed time in seconds. May stall or move backwards.
    pub session_elapsed: f64,
    /// Session time left in seconds.
    pub session_remaining: f64,
    /// Lap or time limited race.
    pub race_length: RaceLength,
    /// Formation lap or pre-race countdown.
    pub pre_race: bool,
    /// Session time at which the current lap started.
    pub lap_start_time: f64,
    /// Laps completed so far.
    pub completed_laps: u32,
    /// Fraction of the current lap driven, `0.0..1.0`.
    pub lap_progress: f64,
    /// Last completed lap time in seconds; non-positive when unknown.
    pub last_lap_time: f64,
    /// Personal best lap time in seconds; non-positive when unknown.
    pub best_lap_time: f64,
    /// Vehicle class name.
    pub vehicle_class: String,
    /// In the pit lane.
    pub in_pits: bool,
    /// In the garage.
    pub in_garage: bool,
    /// Worn fraction per tyre, `0.0` for a new tyre.
    pub tyre_wear: [f64; 4],
    /// Brake pressure per wheel, any consistent unit.
    pub brake_pressure: [f64; 4],
    /// Raw throttle pedal, `0.0..=1.0`.
    pub throttle: f64,
    /// Raw brake pedal, `0.0..=1.0`.
    pub brake: f64,
    /// Configured static front brake bias fraction, `0.0..=1.0`.
    pub front_brake_bias: f64,
    /// Electric motor is in regenerative braking state.
    pub electric_braking: bool,
    /// Fuel remaining.
    pub fuel: f64,
    /// Fuel tank capacity.
    pub fuel_capacity: f64,
    /// Virtual energy remaining, when the series uses it.
    pub energy: Option<f64>,
    /// Virtual energy capacity.
    pub energy_capacity: f64,
    /// Blue flag shown to the driver.
    pub blue_flag: bool,
    /// Start lights sequence running.
    pub start_lights: bool,
    /// Gap to the car behind in seconds; non-positive when none.
    pub gap_behind: f64,
    /// Current differential locking percentage.
    pub diff_locking: f64,
}

impl Default for TelemetrySample {
    fn default() -> Self {
        Self {
            session_elapsed: 0.0,
            session_remaining: 0.0,
            race_length: RaceLength::Time,
            pre_race: false,
            lap_start_time: 0.0,
            completed_laps: 0,
            lap_progress: 0.0,
            last_lap_time: 0.0,
            best_lap_time: 0.0,
            vehicle_class: String::new(),
            in_pits: false,
            in_garage: false,
            tyre_wear: [0.0; 4],
            brake_pressure: [0.0; 4],
            throttle: 0.0,
            brake: 0.0,
            front_brake_bias: 0.5,
            electric_braking: false,
            fuel: 0.0,
            fuel_capacity: 0.0,
            energy: None,
            energy_capacity: 100.0,
            blue_flag: false,
            start_lights: false,
            gap_behind: 0.0,
            diff_locking: 0.0,
        }
    }
}

impl TelemetrySample {
    /// Borrow the timing subset the pace estimator needs.
    pub fn vehicle_timing(&self) -> VehicleTiming<'_> {
        VehicleTiming {
            elapsed: self.session_elapsed,
            lap_start_time: self.lap_start_time,
            vehicle_class: &self.vehicle_class,
            in_pits: self.in_pits,
            last_lap_time: self.last_lap_time,
            best_lap_time: self.best_lap_time,
        }
    }

    /// Mean tyre wear over the finite wheel readings.
    pub fn average_tyre_wear(&self) -> Option<f64> {
        let (sum, count) = self
            .tyre_wear
            .iter()
            .filter(|wear| wear.is_finite())
            .fold((0.0, 0u32), |(sum, count), wear| (sum + wear, count + 1));
        (count > 0).then(|| sum / f64::from(count))
    }

    /// Lap progress clamped into `[0, 1)`; non-finite values read as `0`.
    pub fn clamped_lap_progress(&self) -> f64 {
        if self.lap_progress.is_finite() {
            self.lap_progress.clamp(0.0, 0.999_999)
        } else {
            0.0
        }
    }
}

/// Per-vehicle timing signals, borrowed from a sample or a standings row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VehicleTiming<'a> {
    /// Session elapsed time in seconds.
    pub elapsed: f64,
    /// Session time at which the vehicle's current lap started.
    pub lap_start_time: f64,
    /// Vehicle class name.
    pub vehicle_class: &'a str,
    /// Vehicle is in the pit lane.
    pub in_pits: bool,
    /// Last completed lap time in seconds.
    pub last_lap_time: f64,
    /// Best lap time in seconds.
    pub best_lap_time: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_tyre_wear_skips_non_finite() {
        let sample = TelemetrySample {
            tyre_wear: [0.1, 0.3, f64::NAN, 0.2],
            ..TelemetrySample::default()
        };
        let wear = sample.average_tyre_wear().unwrap_or(-1.0);
        assert!((wear - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_average_tyre_wear_none_when_all_invalid() {
        let sample = TelemetrySample {
            tyre_wear: [f64::NAN; 4],
            ..TelemetrySample::default()
        };
        assert_eq!(sample.average_tyre_wear(), None);
    }

    #[test]
    fn test_lap_progress_clamped() {
        let mut sample = TelemetrySample {
            lap_progress: 1.7,
            ..TelemetrySample::default()
        };
        assert!(sample.clamped_lap_progress() < 1.0);
        sample.lap_progress = f64::NAN;
        assert!(sample.clamped_lap_progress().abs() < 1e-12);
    }

    #[test]
    fn test_vehicle_timing_borrows_class() {
        let sample = TelemetrySample {
            vehicle_class: "LMGT3".to_string(),
            last_lap_time: 101.5,
            ..TelemetrySample::default()
        };
        let timing = sample.vehicle_timing();
        assert_eq!(timing.vehicle_class, "LMGT3");
        assert!((timing.last_lap_time - 101.5).abs() < 1e-9);
    }

    #[test]
    fn test_sample_deserializes_with_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let sample: TelemetrySample =
            serde_json::from_str(r#"{"fuel": 42.5, "race_length": {"Laps": 30}}"#)?;
        assert!((sample.fuel - 42.5).abs() < 1e-9);
        assert_eq!(sample.race_length, RaceLength::Laps(30));
        assert!((sample.energy_capacity - 100.0).abs() < 1e-9);
        Ok(())
    }
}
