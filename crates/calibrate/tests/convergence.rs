use anyhow::{bail, Result};
use std::time::Duration;
use stressforge_calibrate::{CalibrationConfig, Calibrator};
use stressforge_kernels::WorkloadKernel;

/// Deterministic cost model standing in for wall-clock measurement.
struct SyntheticCost<F>
where
    F: Fn(u32) -> u64 + Send + Sync,
{
    cost: F,
}

impl<F> SyntheticCost<F>
where
    F: Fn(u32) -> u64 + Send + Sync,
{
    fn new(cost: F) -> Self {
        Self { cost }
    }
}

impl<F> WorkloadKernel for SyntheticCost<F>
where
    F: Fn(u32) -> u64 + Send + Sync,
{
    fn name(&self) -> &'static str {
        "synthetic"
    }

    fn run(&self, size: u32) -> Result<Duration> {
        Ok(Duration::from_millis((self.cost)(size)))
    }
}

fn calibrate(target_ms: u16, kernel: &dyn WorkloadKernel) -> stressforge_calibrate::CalibrationOutcome {
    Calibrator::new("test", CalibrationConfig::new(target_ms))
        .calibrate(kernel)
        .expect("calibration")
}

#[test]
fn identity_cost_converges_to_target() {
    let kernel = SyntheticCost::new(|size| u64::from(size));
    let outcome = calibrate(500, &kernel);
    assert_eq!(outcome.score, 500);
    assert_eq!(outcome.final_step, 1);
}

#[test]
fn same_inputs_give_same_score() {
    let kernel = SyntheticCost::new(|size| u64::from(size) / 3 + 7);
    let first = calibrate(900, &kernel);
    let second = calibrate(900, &kernel);
    assert_eq!(first.score, second.score);
    assert_eq!(first.iterations, second.iterations);
}

#[test]
fn converges_under_iteration_ceiling_across_cost_shapes() {
    let shapes: Vec<(&str, Box<dyn Fn(u32) -> u64 + Send + Sync>)> = vec![
        ("identity", Box::new(|s: u32| u64::from(s))),
        ("half", Box::new(|s: u32| u64::from(s) / 2)),
        ("double", Box::new(|s: u32| u64::from(s) * 2)),
        ("quadratic", Box::new(|s: u32| u64::from(s) * u64::from(s) / 1_000)),
        ("affine", Box::new(|s: u32| u64::from(s) / 3 + 7)),
    ];

    for (name, cost) in shapes {
        let kernel = SyntheticCost::new(cost);
        for target in [128u16, 500, 4_000] {
            let outcome = calibrate(target, &kernel);
            assert!(
                outcome.iterations < 200,
                "{name} cost took {} iterations for target {target}",
                outcome.iterations
            );
        }
    }
}

#[test]
fn score_sits_just_below_the_target() {
    let costs: Vec<Box<dyn Fn(u32) -> u64 + Send + Sync>> = vec![
        Box::new(|s: u32| u64::from(s)),
        Box::new(|s: u32| u64::from(s) * 2),
        Box::new(|s: u32| u64::from(s) * u64::from(s) / 1_000),
    ];

    for cost in costs {
        for target in [200u16, 500, 1_337] {
            let kernel = SyntheticCost::new(&cost);
            let outcome = calibrate(target, &kernel);
            let target = u64::from(target);
            assert!(
                (cost)(outcome.score) <= target,
                "score {} costs more than target {target}",
                outcome.score
            );
            assert!(
                (cost)(outcome.score + 1) > target,
                "score {} is not the largest size within target {target}",
                outcome.score
            );
        }
    }
}

#[test]
fn boundary_targets_terminate() {
    let kernel = SyntheticCost::new(|size| u64::from(size));

    let low = calibrate(128, &kernel);
    assert_eq!(low.score, 128);
    assert!(low.iterations < 200);

    let high = calibrate(u16::MAX, &kernel);
    assert_eq!(high.score, 65_535);
    assert!(high.iterations < 200);
}

#[test]
fn kernel_failure_aborts_the_calibration() {
    struct FailingKernel;

    impl WorkloadKernel for FailingKernel {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn run(&self, size: u32) -> Result<Duration> {
            if size > 10_000 {
                bail!("allocation of {size} elements failed");
            }
            Ok(Duration::from_millis(u64::from(size) / 100))
        }
    }

    let result = Calibrator::new("doomed", CalibrationConfig::new(500)).calibrate(&FailingKernel);
    let err = result.expect_err("calibration should abort");
    assert!(err.to_string().contains("allocation"));
}
