//! Prelude for the race timing crate.
//!
//! This module re-exports the most commonly used types.
//!
//! # Example
//!
//! ```
//! use openracing_race_timing::prelude::*;
//!
//! let mut flash = WarningFlash::new(FlashConfig::default());
//! assert!(flash.state(0.0, true));
//! ```

pub use crate::clock::{ClockConfig, ClockEvent, ClockTick, SessionClock};
pub use crate::edge_timer::{EdgeTimer, EdgeTimerConfig, TIMER_INACTIVE, TimerReading};
pub use crate::flash::{FlashConfig, MIN_FLASH_PHASE, WarningFlash};
pub use crate::variants::{
    BlueFlagTimer, DiffLockConfig, DiffLockSide, DiffLockTracker, GreenFlagConfig,
    GreenFlagCountdown, PitTimer, PitTimerConfig, TrafficGapConfig, TrafficGapTimer,
};
