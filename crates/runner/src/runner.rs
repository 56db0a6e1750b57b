//! Fan-out of independent calibrations.

use crate::report::{InstanceOutcome, RunReport};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::thread;
use std::time::Instant;
use stressforge_calibrate::{CalibrationConfig, Calibrator};
use stressforge_kernels::workload::WorkloadKernel;
use tracing::info;

/// How the independent calibrations are distributed over the host. Both
/// strategies produce identical aggregation semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FanOutStrategy {
    /// One dedicated OS thread per instance.
    Threads,
    /// Parallel-for over the shared rayon pool.
    Pool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnerConfig {
    pub instances: usize,
    pub strategy: FanOutStrategy,
    pub calibration: CalibrationConfig,
}

impl RunnerConfig {
    pub fn new(calibration: CalibrationConfig) -> Self {
        Self {
            instances: detect_instances(),
            strategy: FanOutStrategy::Threads,
            calibration,
        }
    }

    pub fn with_instances(mut self, instances: usize) -> Self {
        self.instances = instances.max(1);
        self
    }

    pub fn with_strategy(mut self, strategy: FanOutStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Number of logical cores available to the process.
pub fn detect_instances() -> usize {
    thread::available_parallelism()
        .map(usize::from)
        .unwrap_or(1)
}

/// Launches K independent calibrations against the same kernel and target,
/// waits for all of them, and aggregates their scores.
///
/// Instances share nothing mutable; the join is the only synchronization
/// point and no partial results are accepted. A failed or panicked instance
/// is reported as such instead of contributing a score.
pub struct ParallelRunner {
    config: RunnerConfig,
}

impl ParallelRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    pub fn run(&self, kernel: &dyn WorkloadKernel) -> RunReport {
        let started = Instant::now();
        let count = self.config.instances.max(1);
        info!(
            instances = count,
            strategy = ?self.config.strategy,
            kernel = kernel.name(),
            target_ms = self.config.calibration.target_ms,
            "launching calibrations"
        );

        let outcomes = match self.config.strategy {
            FanOutStrategy::Threads => self.run_threads(kernel, count),
            FanOutStrategy::Pool => self.run_pool(kernel, count),
        };

        RunReport::from_outcomes(outcomes, started.elapsed())
    }

    fn run_threads(&self, kernel: &dyn WorkloadKernel, count: usize) -> Vec<InstanceOutcome> {
        thread::scope(|scope| {
            let handles: Vec<_> = (0..count)
                .map(|i| {
                    let calibrator =
                        Calibrator::new(instance_label(i), self.config.calibration.clone());
                    scope.spawn(move || calibrator.calibrate(kernel))
                })
                .collect();

            handles
                .into_iter()
                .enumerate()
                .map(|(i, handle)| match handle.join() {
                    Ok(result) => InstanceOutcome::from_result(instance_label(i), result),
                    Err(_) => {
                        InstanceOutcome::failed(instance_label(i), "calibration thread panicked")
                    }
                })
                .collect()
        })
    }

    fn run_pool(&self, kernel: &dyn WorkloadKernel, count: usize) -> Vec<InstanceOutcome> {
        (0..count)
            .into_par_iter()
            .map(|i| {
                let calibrator =
                    Calibrator::new(instance_label(i), self.config.calibration.clone());
                InstanceOutcome::from_result(instance_label(i), calibrator.calibrate(kernel))
            })
            .collect()
    }
}

fn instance_label(index: usize) -> String {
    format!("worker-{}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_instances_is_positive() {
        assert!(detect_instances() >= 1);
    }

    #[test]
    fn config_clamps_instances_to_one() {
        let config = RunnerConfig::new(CalibrationConfig::new(500)).with_instances(0);
        assert_eq!(config.instances, 1);
    }
}
