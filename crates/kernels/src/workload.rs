//! Workload kernel implementations.

use anyhow::{anyhow, ensure, Result};
use std::hint::black_box;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A deterministic, size-parameterized computation whose wall-clock cost
/// grows with `size`.
///
/// Implementations perform exactly `size * (size - 1) / 2` adjacent combine
/// operations so that scores measured on different hosts stay comparable.
/// The reported duration covers buffer allocation plus the full reduction.
pub trait WorkloadKernel: Send + Sync {
    fn name(&self) -> &'static str;
    fn run(&self, size: u32) -> Result<Duration>;
}

pub type DynWorkloadKernel = Arc<dyn WorkloadKernel>;

/// Number of adjacent combine operations performed for a given input size.
pub fn combine_op_count(size: u32) -> u64 {
    let n = u64::from(size);
    n * n.saturating_sub(1) / 2
}

fn alloc_sequence(size: u32) -> Result<Vec<f64>> {
    let len = size as usize;
    let mut v = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| anyhow!("failed to allocate workload buffer of {len} elements"))?;
    v.extend((0..len).map(|i| (i + 1) as f64));
    Ok(v)
}

/// Pairwise hypotenuse reduction, the canonical scoring kernel.
///
/// Starts from `v[i] = i + 1` and repeatedly replaces each adjacent pair
/// with `sqrt(a^2 + b^2)`, shrinking the sequence by one element per round
/// until a single value remains. O(size^2) floating-point work against a
/// small buffer, so small size changes produce measurable time deltas.
#[derive(Default)]
pub struct HypotReduction;

impl HypotReduction {
    pub fn new() -> Self {
        Self
    }
}

impl WorkloadKernel for HypotReduction {
    fn name(&self) -> &'static str {
        "hypot"
    }

    fn run(&self, size: u32) -> Result<Duration> {
        ensure!(size >= 2, "workload size must be at least 2, got {size}");
        let start = Instant::now();

        let mut v = alloc_sequence(size)?;
        while v.len() > 1 {
            for i in 0..v.len() - 1 {
                v[i] = v[i].hypot(v[i + 1]);
            }
            v.pop();
        }
        black_box(v[0]);

        Ok(start.elapsed())
    }
}

/// Cheaper variant: square every element once, reduce by pairwise addition,
/// take a single square root at the end. Same combine count as
/// [`HypotReduction`] with far less math per combine.
#[derive(Default)]
pub struct SquareAddSqrt;

impl SquareAddSqrt {
    pub fn new() -> Self {
        Self
    }
}

impl WorkloadKernel for SquareAddSqrt {
    fn name(&self) -> &'static str {
        "square-sum"
    }

    fn run(&self, size: u32) -> Result<Duration> {
        ensure!(size >= 2, "workload size must be at least 2, got {size}");
        let start = Instant::now();

        let mut v = alloc_sequence(size)?;
        for x in v.iter_mut() {
            *x *= *x;
        }
        while v.len() > 1 {
            for i in 0..v.len() - 1 {
                v[i] += v[i + 1];
            }
            v.pop();
        }
        black_box(v[0].sqrt());

        Ok(start.elapsed())
    }
}
