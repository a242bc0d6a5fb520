//! Prelude for the race estimators crate.
//!
//! Re-exports the estimator types together with the timing primitives they
//! are driven by.

pub use crate::brake_migration::{BrakeMigration, ElectricAllocation};
pub use crate::config::{
    BrakeMigrationConfig, EstimatorConfig, PaceConfig, StintConfig, TimerConfig,
};
pub use crate::consumption::{ConsumptionReading, ConsumptionTracker};
pub use crate::engine::{EstimatorEngine, EstimatorOutputs};
pub use crate::pace::{AdaptivePaceEstimator, PACE_UNKNOWN, VehiclePaceBank, is_valid_laptime};
pub use crate::sample::{RaceLength, TelemetrySample, VehicleTiming};
pub use crate::stint::{
    NOT_AVAILABLE, NOT_AVAILABLE_COUNT, ResetReason, StintEstimate, StintInput, StintState,
    StintStrategy,
};
pub use crate::{ConfigError, ConfigResult};

pub use openracing_race_timing::prelude::*;
