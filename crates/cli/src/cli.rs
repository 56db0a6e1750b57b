//! CLI wiring for the StressForge calibration toolkit.

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use stressforge_backend_gpu::AcceleratorCalibration;
use stressforge_calibrate::{
    CalibrationConfig, Calibrator, GrowthConfig, DEFAULT_GROWTH_STEP, DEFAULT_START_SIZE,
    TARGET_MS_MIN,
};
use stressforge_kernels::registry::KernelRegistry;
use stressforge_kernels::workload::DynWorkloadKernel;
use stressforge_runner::{FanOutStrategy, ParallelRunner, RunnerConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "stressforge", about = "Adaptive performance calibration toolkit")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum KernelArg {
    /// Pairwise hypotenuse reduction (canonical scoring kernel).
    Hypot,
    /// Square once, add pairwise, single square root at the end.
    SquareSum,
}

impl KernelArg {
    fn kernel_name(&self) -> &'static str {
        match self {
            KernelArg::Hypot => "hypot",
            KernelArg::SquareSum => "square-sum",
        }
    }
}

#[derive(clap::ValueEnum, Clone, Debug)]
pub enum StrategyArg {
    Threads,
    Pool,
}

impl From<StrategyArg> for FanOutStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::Threads => FanOutStrategy::Threads,
            StrategyArg::Pool => FanOutStrategy::Pool,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Calibrate a single instance and print its score.
    Calibrate {
        /// Target duration per kernel execution, in milliseconds (128-65535).
        #[arg(long, value_parser = parse_target)]
        target: u16,
        #[arg(long, value_enum, default_value = "hypot")]
        kernel: KernelArg,
        /// Print the per-iteration search trace.
        #[arg(long, default_value_t = false)]
        trace: bool,
    },
    /// Run one calibration per logical core and aggregate the scores.
    Parallel {
        /// Target duration per kernel execution, in milliseconds (128-65535).
        #[arg(long, value_parser = parse_target)]
        target: u16,
        /// Number of instances; defaults to the available logical cores.
        #[arg(long)]
        instances: Option<usize>,
        #[arg(long, value_enum, default_value = "threads")]
        strategy: StrategyArg,
        #[arg(long, value_enum, default_value = "hypot")]
        kernel: KernelArg,
        /// Write the full run report as JSON.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Calibrate the accelerator backend with the growth-only search.
    Accelerator {
        /// Target duration per kernel execution, in milliseconds (128-65535).
        #[arg(long, value_parser = parse_target)]
        target: u16,
        #[arg(long, default_value_t = DEFAULT_START_SIZE)]
        start_size: u32,
        #[arg(long, default_value_t = DEFAULT_GROWTH_STEP)]
        step: u32,
    },
}

fn parse_target(raw: &str) -> Result<u16, String> {
    let value: u16 = raw
        .parse()
        .map_err(|_| format!("`{raw}` is not a valid millisecond value"))?;
    if value < TARGET_MS_MIN {
        return Err(format!(
            "target must be in {TARGET_MS_MIN}..={} ms",
            u16::MAX
        ));
    }
    Ok(value)
}

fn resolve_kernel(arg: &KernelArg) -> Result<DynWorkloadKernel> {
    let registry = KernelRegistry::with_default_kernels();
    match registry.find_kernel(arg.kernel_name()) {
        Some(kernel) => Ok(kernel),
        None => bail!("kernel `{}` is not registered", arg.kernel_name()),
    }
}

pub fn run_cli(cli: Cli) -> Result<()> {
    tracing_subscriber::fmt::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();

    match cli.command {
        Command::Calibrate {
            target,
            kernel,
            trace,
        } => {
            let kernel = resolve_kernel(&kernel)?;
            let config = CalibrationConfig::new(target).with_trace(trace);
            config.validate()?;

            let outcome = Calibrator::new("main", config).calibrate(kernel.as_ref())?;
            info!(
                score = outcome.score,
                iterations = outcome.iterations,
                kernel = %outcome.kernel,
                "calibration finished"
            );
            if trace {
                for sample in &outcome.trace {
                    println!(
                        "size {} step {} limit {}ms elapsed {}ms",
                        sample.size, sample.step, sample.limit_ms, sample.elapsed_ms
                    );
                }
            }
            println!("Score: {}", outcome.score);
        }
        Command::Parallel {
            target,
            instances,
            strategy,
            kernel,
            output,
        } => {
            let kernel = resolve_kernel(&kernel)?;
            let calibration = CalibrationConfig::new(target);
            calibration.validate()?;

            let mut config = RunnerConfig::new(calibration).with_strategy(strategy.into());
            if let Some(instances) = instances {
                config = config.with_instances(instances);
            }

            let report = ParallelRunner::new(config).run(kernel.as_ref());

            println!("============= Scores =============");
            for instance in &report.instances {
                match instance.score() {
                    Some(score) => println!("{}: {}", instance.label, score),
                    None => println!("{}: unavailable", instance.label),
                }
            }
            println!(
                "Total: {}. Average: {}. Wall time: {}ms",
                report.total, report.average, report.wall_time_ms
            );
            if report.failed > 0 {
                eprintln!(
                    "{} instance(s) failed; aggregate covers {} scored instance(s)",
                    report.failed, report.scored
                );
            }
            if let Some(path) = output {
                report.save(&path)?;
                info!(path = %path.display(), "run report written");
            }
        }
        Command::Accelerator {
            target,
            start_size,
            step,
        } => {
            let calibration = AcceleratorCalibration::new()?;
            let device = calibration.device_info();
            println!("Using {} ({})", device.name, device.backend);

            let outcome = calibration.run(GrowthConfig {
                target_ms: target,
                start_size,
                step,
            })?;
            println!(
                "Score: {} ({} attempts, last run {}ms)",
                outcome.score, outcome.iterations, outcome.last_elapsed_ms
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_parser_rejects_out_of_range_values() {
        assert!(parse_target("127").is_err());
        assert!(parse_target("65536").is_err());
        assert!(parse_target("not-a-number").is_err());
        assert_eq!(parse_target("128"), Ok(128));
        assert_eq!(parse_target("65535"), Ok(65535));
    }
}
