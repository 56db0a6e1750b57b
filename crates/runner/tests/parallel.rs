use anyhow::{bail, Result};
use std::time::Duration;
use stressforge_calibrate::CalibrationConfig;
use stressforge_kernels::WorkloadKernel;
use stressforge_runner::{FanOutStrategy, ParallelRunner, RunnerConfig};

struct LinearCost;

impl WorkloadKernel for LinearCost {
    fn name(&self) -> &'static str {
        "linear"
    }

    fn run(&self, size: u32) -> Result<Duration> {
        Ok(Duration::from_millis(u64::from(size)))
    }
}

struct AlwaysFailing;

impl WorkloadKernel for AlwaysFailing {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn run(&self, _size: u32) -> Result<Duration> {
        bail!("device lost");
    }
}

fn runner(strategy: FanOutStrategy, instances: usize) -> ParallelRunner {
    let config = RunnerConfig::new(CalibrationConfig::new(500))
        .with_instances(instances)
        .with_strategy(strategy);
    ParallelRunner::new(config)
}

#[test]
fn identical_instances_produce_identical_scores() {
    for strategy in [FanOutStrategy::Threads, FanOutStrategy::Pool] {
        let report = runner(strategy, 4).run(&LinearCost);

        assert_eq!(report.scored, 4);
        assert_eq!(report.failed, 0);
        for instance in &report.instances {
            assert_eq!(instance.score(), Some(500));
        }
        assert_eq!(report.total, 2_000);
        assert_eq!(report.average, 500);
        assert_eq!(report.average, report.total / 4);
    }
}

#[test]
fn instances_are_reported_in_launch_order() {
    let report = runner(FanOutStrategy::Pool, 4).run(&LinearCost);
    let labels: Vec<&str> = report
        .instances
        .iter()
        .map(|instance| instance.label.as_str())
        .collect();
    assert_eq!(labels, ["worker-1", "worker-2", "worker-3", "worker-4"]);
}

#[test]
fn failed_instances_are_surfaced_not_zeroed() {
    for strategy in [FanOutStrategy::Threads, FanOutStrategy::Pool] {
        let report = runner(strategy, 3).run(&AlwaysFailing);

        assert_eq!(report.scored, 0);
        assert_eq!(report.failed, 3);
        assert_eq!(report.total, 0);
        assert_eq!(report.average, 0);
        for instance in &report.instances {
            assert_eq!(instance.score(), None);
        }
    }
}

#[test]
fn report_round_trips_through_json() {
    let report = runner(FanOutStrategy::Threads, 2).run(&LinearCost);
    let dir = std::env::temp_dir().join("stressforge-runner-test");
    std::fs::create_dir_all(&dir).expect("temp dir");
    let path = dir.join("report.json");

    report.save(&path).expect("save report");
    let loaded = stressforge_runner::RunReport::load(&path).expect("load report");

    assert_eq!(loaded.total, report.total);
    assert_eq!(loaded.average, report.average);
    assert_eq!(loaded.instances.len(), 2);
    std::fs::remove_file(&path).ok();
}
