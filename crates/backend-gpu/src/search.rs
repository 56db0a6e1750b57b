//! Growth-only calibration against the accelerator backend.

use crate::runtime::{AcceleratorInfo, AcceleratorReduction};
use anyhow::Result;
use stressforge_calibrate::growth::{GrowthConfig, GrowthOutcome, GrowthSearch};
use tracing::info;

/// Pairs the device-side reduction with the growth-only search.
pub struct AcceleratorCalibration {
    kernel: AcceleratorReduction,
}

impl AcceleratorCalibration {
    pub fn new() -> Result<Self> {
        Ok(Self {
            kernel: AcceleratorReduction::new()?,
        })
    }

    pub fn device_info(&self) -> &AcceleratorInfo {
        self.kernel.info()
    }

    pub fn run(&self, config: GrowthConfig) -> Result<GrowthOutcome> {
        info!(
            target_ms = config.target_ms,
            start_size = config.start_size,
            step = config.step,
            device = %self.device_info().name,
            "accelerator calibration"
        );
        GrowthSearch::new(config).run(&self.kernel)
    }
}
