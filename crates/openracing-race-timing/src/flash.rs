//! Warning Flash Controller
//!
//! Blinks a warning indicator a bounded number of times after its condition
//! becomes true, then holds it solid until the condition clears.

use serde::{Deserialize, Serialize};

use crate::clamp_finite;

/// Shortest highlight or interval phase; anything shorter is imperceptible.
pub const MIN_FLASH_PHASE: f64 = 0.2;

/// Warning flash tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlashConfig {
    /// Seconds the indicator stays highlighted per flash.
    pub highlight: f64,
    /// Seconds between two highlights.
    pub interval: f64,
    /// Number of flashes before the indicator goes solid.
    pub max_flashes: u32,
}

impl FlashConfig {
    /// Return a copy with both phases clamped to [`MIN_FLASH_PHASE`].
    pub fn sanitized(self) -> Self {
        Self {
            highlight: clamp_finite(self.highlight, MIN_FLASH_PHASE, 0.4),
            interval: clamp_finite(self.interval, MIN_FLASH_PHASE, 0.4),
            max_flashes: self.max_flashes,
        }
    }
}

impl Default for FlashConfig {
    fn default() -> Self {
        Self {
            highlight: 0.4,
            interval: 0.4,
            max_flashes: 10,
        }
    }
}

/// Blink state machine bounded by a maximum flash count.
///
/// # Invariants
///
/// - `flash_count` never exceeds `max_flashes`
/// - Every flash is a full highlight and interval, so the indicator turns
///   off exactly `max_flashes` times
/// - After the last interval the output is `true` until the condition
///   clears
#[derive(Debug, Clone)]
pub struct WarningFlash {
    config: FlashConfig,
    highlight: bool,
    flash_count: u32,
    solid: bool,
    last_condition: bool,
    phase_start: f64,
}

impl Default for WarningFlash {
    fn default() -> Self {
        Self::new(FlashConfig::default())
    }
}

impl WarningFlash {
    /// Create a controller; the configuration is sanitized first.
    pub fn new(config: FlashConfig) -> Self {
        Self {
            config: config.sanitized(),
            highlight: false,
            flash_count: 0,
            solid: false,
            last_condition: false,
            phase_start: 0.0,
        }
    }

    /// Advance the state machine and return whether the indicator is lit.
    pub fn state(&mut self, elapsed: f64, condition: bool) -> bool {
        if !condition {
            self.last_condition = false;
            self.highlight = false;
            self.solid = false;
            return false;
        }
        if !elapsed.is_finite() {
            return self.is_lit();
        }

        if !self.last_condition {
            self.last_condition = true;
            self.phase_start = elapsed;
            self.solid = self.config.max_flashes == 0;
            self.highlight = !self.solid;
            self.flash_count = u32::from(self.highlight);
            return true;
        }

        if self.solid {
            return true;
        }

        if elapsed < self.phase_start {
            self.phase_start = elapsed;
        }
        let in_phase = elapsed - self.phase_start;
        if self.highlight {
            if in_phase >= self.config.highlight {
                self.highlight = false;
                self.phase_start = elapsed;
            }
        } else if in_phase >= self.config.interval {
            if self.flash_count >= self.config.max_flashes {
                self.solid = true;
            } else {
                self.highlight = true;
                self.flash_count = self.flash_count.saturating_add(1);
                self.phase_start = elapsed;
            }
        }
        self.is_lit()
    }

    fn is_lit(&self) -> bool {
        self.last_condition && (self.highlight || self.solid)
    }

    /// True once every flash has run and the indicator holds solid.
    pub fn is_solid(&self) -> bool {
        self.solid
    }

    /// Highlights started since the condition last became true.
    pub fn flash_count(&self) -> u32 {
        self.flash_count
    }

    /// Configuration after sanitization.
    pub fn config(&self) -> &FlashConfig {
        &self.config
    }

    /// Return to the freshly constructed state.
    pub fn reset(&mut self) {
        self.highlight = false;
        self.flash_count = 0;
        self.solid = false;
        self.last_condition = false;
        self.phase_start = 0.0;
    }
}
