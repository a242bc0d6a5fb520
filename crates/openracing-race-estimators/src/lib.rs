//! Race Estimators for OpenRacing Telemetry
//!
//! This crate turns raw per-tick telemetry into the race-relevant derived
//! metrics a dashboard needs: a smoothed lap time pace, fuel and energy stint
//! strategy, and the live forward migration of brake bias under electric
//! braking.
//!
//! # Overview
//!
//! - **Pace**: [`AdaptivePaceEstimator`] validates each completed lap and
//!   keeps a representative lap time that ratchets down immediately and
//!   decays upward slowly
//! - **Consumption**: [`ConsumptionTracker`] measures per-lap fuel or energy
//!   use
//! - **Stint**: [`StintStrategy`] projects laps remaining, refuel amounts and
//!   pit stop counts, and detects stint boundaries
//! - **Brake Migration**: [`BrakeMigration`] infers the live forward shift of
//!   brake bias from per-wheel pressures
//! - **Engine**: [`EstimatorEngine`] wires everything to one
//!   [`TelemetrySample`] per tick
//!
//! Every estimator owns its state and reads an immutable sample, so one
//! instance per vehicle can run on any thread without synchronization.
//! Invalid telemetry is a no-op for the tick; unavailable quantities are
//! reported with sentinel values, never `NaN`.
//!
//! # Example
//!
//! ```
//! use openracing_race_estimators::prelude::*;
//!
//! let mut engine = EstimatorEngine::new(EstimatorConfig::default());
//! let sample = TelemetrySample {
//!     session_elapsed: 12.0,
//!     vehicle_class: "Hypercar".to_string(),
//!     fuel: 60.0,
//!     fuel_capacity: 90.0,
//!     ..TelemetrySample::default()
//! };
//!
//! let outputs = engine.update(&sample);
//! assert!(!is_valid_laptime(outputs.laptime_pace));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod brake_migration;
pub mod config;
pub mod consumption;
pub mod engine;
pub mod pace;
pub mod prelude;
pub mod sample;
pub mod stint;

pub use brake_migration::{BrakeMigration, BrakeMigrationState, ElectricAllocation};
pub use config::{
    BrakeMigrationConfig, EstimatorConfig, PaceConfig, StintConfig, TimerConfig,
};
pub use consumption::{ConsumptionReading, ConsumptionTracker};
pub use engine::{EstimatorEngine, EstimatorOutputs};
pub use pace::{AdaptivePaceEstimator, PACE_UNKNOWN, PaceState, VehiclePaceBank, is_valid_laptime};
pub use sample::{RaceLength, TelemetrySample, VehicleTiming};
pub use stint::{
    NOT_AVAILABLE, NOT_AVAILABLE_COUNT, ResetReason, StintEstimate, StintInput, StintState,
    StintStrategy,
};

use thiserror::Error;

/// Errors raised while loading estimator configuration text.
///
/// Estimation itself never fails; only parsing can.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// YAML text could not be parsed into an [`EstimatorConfig`].
    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON text could not be parsed into an [`EstimatorConfig`].
    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a configuration load.
pub type ConfigResult<T> = Result<T, ConfigError>;
