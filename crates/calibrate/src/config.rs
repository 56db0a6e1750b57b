//! Calibration configuration.

use anyhow::{ensure, Result};
use serde::{Deserialize, Serialize};

/// Smallest accepted target duration in milliseconds.
///
/// Below this the initial margin `target - 16 * step_factor` reaches zero
/// and the growth branch of the search can never fire.
pub const TARGET_MS_MIN: u16 = 128;
/// Largest accepted target duration in milliseconds.
pub const TARGET_MS_MAX: u16 = u16::MAX;

/// Default upper bound on the adaptive step.
pub const DEFAULT_MAX_STEP: u32 = 65_535;
/// Default margin adjustment applied each time the step changes.
pub const DEFAULT_STEP_FACTOR: u64 = 8;

/// The initial margin sits `step_factor * HYSTERESIS_SCALE` below the target.
pub(crate) const HYSTERESIS_SCALE: u64 = 16;
/// First size attempted by the adaptive search.
pub(crate) const INITIAL_SIZE: u32 = 2;

/// Tunable parameters for one calibration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Desired upper bound on a single kernel execution, in milliseconds.
    pub target_ms: u16,
    /// Upper bound on the adaptive step.
    pub max_step: u32,
    /// Margin adjustment applied per step change.
    pub step_factor: u64,
    /// Record a per-iteration trace for diagnostics.
    pub record_trace: bool,
}

impl CalibrationConfig {
    pub fn new(target_ms: u16) -> Self {
        Self {
            target_ms,
            max_step: DEFAULT_MAX_STEP,
            step_factor: DEFAULT_STEP_FACTOR,
            record_trace: false,
        }
    }

    pub fn with_trace(mut self, record: bool) -> Self {
        self.record_trace = record;
        self
    }

    /// Callers are expected to reject out-of-range targets before starting a
    /// calibration; the search itself only clamps its margin at zero. The
    /// upper bound is carried by the `u16` type.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.target_ms >= TARGET_MS_MIN,
            "target duration {}ms is below the supported minimum of {}ms",
            self.target_ms,
            TARGET_MS_MIN
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_enforces_minimum_target() {
        assert!(CalibrationConfig::new(127).validate().is_err());
        assert!(CalibrationConfig::new(128).validate().is_ok());
        assert!(CalibrationConfig::new(u16::MAX).validate().is_ok());
    }
}
