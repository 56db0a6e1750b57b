//! Adaptive step search over workload sizes.

use crate::config::{CalibrationConfig, HYSTERESIS_SCALE, INITIAL_SIZE};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use stressforge_kernels::workload::WorkloadKernel;
use tracing::debug;

/// One measured iteration of the search, kept when tracing is enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationSample {
    pub size: u32,
    pub step: u32,
    pub limit_ms: u64,
    pub elapsed_ms: u64,
}

/// Result of a completed calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationOutcome {
    pub label: String,
    pub kernel: String,
    pub score: u32,
    pub iterations: u32,
    pub final_step: u32,
    pub final_limit_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<IterationSample>,
}

/// Searches for the largest workload size whose execution time stays within
/// the configured target duration.
///
/// The step doubles while measurements stay under a moving limit below the
/// target, and halves after each overshoot, with the overshooting increment
/// reverted. An overshoot at step 1 terminates the search; the score then
/// compensates for the two unit advances that landed past the target.
pub struct Calibrator {
    label: String,
    config: CalibrationConfig,
}

impl Calibrator {
    pub fn new(label: impl Into<String>, config: CalibrationConfig) -> Self {
        Self {
            label: label.into(),
            config,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn calibrate(&self, kernel: &dyn WorkloadKernel) -> Result<CalibrationOutcome> {
        let target = u64::from(self.config.target_ms);
        let step_factor = self.config.step_factor;
        let max_step = self.config.max_step;

        let mut size = INITIAL_SIZE;
        let mut step = max_step;
        let mut limit = target.saturating_sub(step_factor * HYSTERESIS_SCALE);
        let mut iterations = 0u32;
        let mut trace = Vec::new();
        let mut running = true;

        while running {
            let elapsed_ms = kernel.run(size)?.as_millis() as u64;
            iterations += 1;

            debug!(
                label = %self.label,
                size,
                step,
                limit_ms = limit,
                elapsed_ms,
                ops = stressforge_kernels::combine_op_count(size),
                "calibration step"
            );
            if self.config.record_trace {
                trace.push(IterationSample {
                    size,
                    step,
                    limit_ms: limit,
                    elapsed_ms,
                });
            }

            if elapsed_ms < limit && step < max_step {
                step = step.saturating_mul(2).min(max_step);
                limit = limit.saturating_sub(step_factor);
            } else if elapsed_ms > target {
                if step == 1 {
                    // Both unit advances that reached this size overshot;
                    // back them out before the advance below re-applies one.
                    running = false;
                    size = size.saturating_sub(2);
                } else {
                    size = size.saturating_sub(step);
                    step /= 2;
                    limit += step_factor;
                }
            }

            // Runs on the terminating iteration too, leaving the score one
            // below the first size that overshot at step 1.
            size = size.saturating_add(step);
        }

        Ok(CalibrationOutcome {
            label: self.label.clone(),
            kernel: kernel.name().to_string(),
            score: size,
            iterations,
            final_step: step,
            final_limit_ms: limit,
            trace,
        })
    }
}
