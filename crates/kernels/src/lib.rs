//! Workload kernels for StressForge calibration.

pub mod registry;
pub mod workload;

pub use registry::*;
pub use workload::*;
