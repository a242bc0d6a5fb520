//! Estimator configuration.
//!
//! Configuration is read-only after construction. Every section clamps
//! out-of-range values through `sanitized()`, and every component calls it
//! itself, so malformed values can never reach the estimators.

use openracing_race_timing::{
    ClockConfig, DiffLockConfig, DiffLockSide, FlashConfig, GreenFlagConfig, PitTimerConfig,
    TrafficGapConfig, clamp_finite,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::ConfigResult;
use crate::brake_migration::ElectricAllocation;

/// Adaptive pace estimator tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaceConfig {
    /// Smoothing window; a new lap carries `1 / sample_count` weight.
    pub sample_count: u32,
    /// Largest increase in seconds a single slower lap can cause.
    pub margin: f64,
}

impl PaceConfig {
    /// Return a copy with every value clamped to its safe range.
    pub fn sanitized(self) -> Self {
        let sanitized = Self {
            sample_count: self.sample_count.max(1),
            margin: clamp_finite(self.margin, 0.1, 5.0),
        };
        if sanitized != self {
            warn!(requested = ?self, sanitized = ?sanitized, "pace configuration clamped");
        }
        sanitized
    }
}

impl Default for PaceConfig {
    fn default() -> Self {
        Self {
            sample_count: 6,
            margin: 5.0,
        }
    }
}

/// Stint strategy and consumption tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StintConfig {
    /// Laps added to every race distance projection.
    pub extra_laps: f64,
    /// Fuel or energy increase above which a refuel is detected.
    pub refuel_threshold: f64,
    /// Average tyre wear decrease above which a tyre change is detected.
    pub tyre_change_threshold: f64,
    /// Number of recent laps averaged into the consumption pace.
    pub consumption_samples: u32,
    /// Low fuel warning fires at or below this many laps remaining.
    pub low_fuel_laps: f64,
}

impl StintConfig {
    /// Return a copy with every value clamped to its safe range.
    pub fn sanitized(self) -> Self {
        let sanitized = Self {
            extra_laps: clamp_finite(self.extra_laps, 0.0, 0.0),
            refuel_threshold: clamp_finite(self.refuel_threshold, 0.001, 0.1),
            tyre_change_threshold: clamp_finite(self.tyre_change_threshold, 0.0001, 0.01),
            consumption_samples: self.consumption_samples.clamp(1, 100),
            low_fuel_laps: clamp_finite(self.low_fuel_laps, 0.0, 2.0),
        };
        if sanitized != self {
            warn!(requested = ?self, sanitized = ?sanitized, "stint configuration clamped");
        }
        sanitized
    }
}

impl Default for StintConfig {
    fn default() -> Self {
        Self {
            extra_laps: 0.0,
            refuel_threshold: 0.1,
            tyre_change_threshold: 0.01,
            consumption_samples: 5,
            low_fuel_laps: 2.0,
        }
    }
}

/// Tuning for every edge timer variant the engine runs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// Pit lane timer.
    pub pit: PitTimerConfig,
    /// Grace period after the blue flag is withdrawn.
    pub blue_flag_cooldown: f64,
    /// Traffic behind timer.
    pub traffic: TrafficGapConfig,
    /// Start lights countdown.
    pub green_flag: GreenFlagConfig,
    /// Minimum locking tracker on throttle.
    pub diff_power: DiffLockConfig,
    /// Minimum locking tracker off throttle.
    pub diff_coast: DiffLockConfig,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            pit: PitTimerConfig::default(),
            blue_flag_cooldown: 0.0,
            traffic: TrafficGapConfig::default(),
            green_flag: GreenFlagConfig::default(),
            diff_power: DiffLockConfig::default(),
            diff_coast: DiffLockConfig {
                side: DiffLockSide::Coast,
                ..DiffLockConfig::default()
            },
        }
    }
}

/// Brake migration detector tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrakeMigrationConfig {
    /// Axle the electric motor brakes, or auto-detect.
    pub electric_alloc: ElectricAllocation,
    /// Front/rear pressure ratio that locks auto-detection.
    pub lock_ratio: f64,
}

impl BrakeMigrationConfig {
    /// Return a copy with every value clamped to its safe range.
    pub fn sanitized(self) -> Self {
        Self {
            electric_alloc: self.electric_alloc,
            lock_ratio: clamp_finite(self.lock_ratio, 1.5, 4.0),
        }
    }
}

impl Default for BrakeMigrationConfig {
    fn default() -> Self {
        Self {
            electric_alloc: ElectricAllocation::Auto,
            lock_ratio: 4.0,
        }
    }
}

/// Complete configuration for an [`EstimatorEngine`](crate::EstimatorEngine).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Session clock tolerances.
    pub clock: ClockConfig,
    /// Adaptive pace estimator.
    pub pace: PaceConfig,
    /// Stint strategy and consumption.
    pub stint: StintConfig,
    /// Edge timer variants.
    pub timers: TimerConfig,
    /// Low fuel warning flash.
    pub flash: FlashConfig,
    /// Brake migration detector.
    pub brake: BrakeMigrationConfig,
}

impl EstimatorConfig {
    /// Parse a YAML document. Missing keys take their defaults.
    pub fn from_yaml_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Parse a JSON document. Missing keys take their defaults.
    pub fn from_json_str(text: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to YAML.
    pub fn to_yaml_string(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Return a copy with every section clamped to its safe range.
    pub fn sanitized(self) -> Self {
        Self {
            clock: self.clock.sanitized(),
            pace: self.pace.sanitized(),
            stint: self.stint.sanitized(),
            timers: self.timers,
            flash: self.flash.sanitized(),
            brake: self.brake.sanitized(),
        }
    }
}
