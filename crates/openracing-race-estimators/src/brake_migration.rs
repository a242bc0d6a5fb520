//! Brake Bias Migration
//!
//! Cars with brake-by-wire blend electric motor braking into one axle, so
//! the live front/rear balance drifts away from the static bias the driver
//! set. The detector infers the motor's share from the gap between pedal
//! demand and measured hydraulic pressure and reports how far the balance
//! has moved forward.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::BrakeMigrationConfig;

/// Axle braked by the electric motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ElectricAllocation {
    /// Detect from pressure asymmetry under electric braking.
    #[default]
    Auto,
    /// Motor brakes the front axle.
    Front,
    /// Motor brakes the rear axle.
    Rear,
}

/// Detector state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrakeMigrationState {
    /// Highest summed wheel pressure seen so far.
    pub peak_pressure_sum: f64,
    /// `2 / peak_pressure_sum`, or `0` before any pressure was seen.
    pub pressure_scale: f64,
    /// Allocation in use; leaves `Auto` at most once per session.
    pub electric_alloc: ElectricAllocation,
    /// Last reported migration.
    pub migration: f64,
}

/// Live brake bias migration detector.
#[derive(Debug, Clone)]
pub struct BrakeMigration {
    config: BrakeMigrationConfig,
    state: BrakeMigrationState,
}

impl Default for BrakeMigration {
    fn default() -> Self {
        Self::new(BrakeMigrationConfig::default())
    }
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() { value } else { 0.0 }
}

impl BrakeMigration {
    /// Create a detector; the configuration is sanitized first.
    pub fn new(config: BrakeMigrationConfig) -> Self {
        let config = config.sanitized();
        Self {
            config,
            state: BrakeMigrationState {
                peak_pressure_sum: 0.0,
                pressure_scale: 0.0,
                electric_alloc: config.electric_alloc,
                migration: 0.0,
            },
        }
    }

    /// Forward migration of the front bias fraction, never negative.
    ///
    /// `pressures` are ordered front-left, front-right, rear-left,
    /// rear-right.
    pub fn calc(
        &mut self,
        raw_brake: f64,
        front_bias: f64,
        pressures: &[f64; 4],
        electric_braking: bool,
    ) -> f64 {
        let raw_brake = finite_or_zero(raw_brake).clamp(0.0, 1.0);
        let front_bias = finite_or_zero(front_bias).clamp(0.0, 1.0);
        let [fl, fr, rl, rr] = pressures.map(|p| finite_or_zero(p).max(0.0));

        let sum = fl + fr + rl + rr;
        if !sum.is_finite() {
            return self.state.migration;
        }
        if sum > self.state.peak_pressure_sum {
            self.state.peak_pressure_sum = sum;
            self.state.pressure_scale = 2.0 / sum;
        }
        let scale = self.state.pressure_scale;
        if scale <= 0.0 {
            self.state.migration = 0.0;
            return 0.0;
        }

        let front = (fl + fr) * scale;
        let rear = (rl + rr) * scale;
        let max_wheel = fl.max(fr).max(rl).max(rr) * scale;

        if electric_braking {
            self.detect_allocation(front, rear);
        }

        self.state.migration = if raw_brake > max_wheel {
            self.migration(raw_brake, front_bias, front, rear, electric_braking)
        } else {
            0.0
        };
        self.state.migration
    }

    fn detect_allocation(&mut self, front: f64, rear: f64) {
        if self.state.electric_alloc != ElectricAllocation::Auto {
            return;
        }
        let ratio = self.config.lock_ratio;
        let detected = if front > rear * ratio {
            ElectricAllocation::Rear
        } else if rear > front * ratio {
            ElectricAllocation::Front
        } else {
            return;
        };
        debug!(?detected, front, rear, "electric braking axle locked");
        self.state.electric_alloc = detected;
    }

    fn migration(
        &self,
        raw_brake: f64,
        front_bias: f64,
        front: f64,
        rear: f64,
        electric_braking: bool,
    ) -> f64 {
        let motor = if electric_braking {
            (2.0 * raw_brake - (front + rear)).max(0.0)
        } else {
            0.0
        };
        let (front_eff, rear_eff) = match self.state.electric_alloc {
            ElectricAllocation::Front => (front + motor, rear),
            ElectricAllocation::Rear => (front, rear + motor),
            ElectricAllocation::Auto => (front, rear),
        };
        let total = front_eff + rear_eff;
        if total <= 0.0 {
            return 0.0;
        }
        (front_eff / total - front_bias).max(0.0)
    }

    /// Last reported migration.
    pub fn last(&self) -> f64 {
        self.state.migration
    }

    /// Detector state.
    pub fn state(&self) -> &BrakeMigrationState {
        &self.state
    }

    /// Forget the pressure peak and any detected allocation.
    pub fn reset(&mut self) {
        *self = Self::new(self.config);
    }
}
