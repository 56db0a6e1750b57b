//! Growth-only search for high-dispatch-overhead backends.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use stressforge_kernels::workload::WorkloadKernel;
use tracing::debug;

/// Default starting size for the growth-only search.
pub const DEFAULT_START_SIZE: u32 = 6_000;
/// Default fixed step between attempts.
pub const DEFAULT_GROWTH_STEP: u32 = 1_024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    pub target_ms: u16,
    pub start_size: u32,
    pub step: u32,
}

impl GrowthConfig {
    pub fn new(target_ms: u16) -> Self {
        Self {
            target_ms,
            start_size: DEFAULT_START_SIZE,
            step: DEFAULT_GROWTH_STEP,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthOutcome {
    pub score: u32,
    pub iterations: u32,
    pub last_elapsed_ms: u64,
}

/// One-directional variant of the adaptive search: grow by a fixed step and
/// stop at the first measurement at or above the target, returning the last
/// attempted size.
///
/// Every attempt costs a full backend round-trip, so coarser resolution is
/// traded for fewer invocations. There is no shrink phase.
pub struct GrowthSearch {
    config: GrowthConfig,
}

impl GrowthSearch {
    pub fn new(config: GrowthConfig) -> Self {
        Self { config }
    }

    pub fn run(&self, kernel: &dyn WorkloadKernel) -> Result<GrowthOutcome> {
        let target = u64::from(self.config.target_ms);
        let mut size = self.config.start_size;
        let mut iterations = 0u32;

        loop {
            let elapsed_ms = kernel.run(size)?.as_millis() as u64;
            iterations += 1;
            debug!(size, elapsed_ms, target_ms = target, "growth step");

            if elapsed_ms >= target {
                return Ok(GrowthOutcome {
                    score: size,
                    iterations,
                    last_elapsed_ms: elapsed_ms,
                });
            }
            size = size.saturating_add(self.config.step);
        }
    }
}
