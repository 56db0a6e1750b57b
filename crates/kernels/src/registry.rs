//! Kernel registry for lookup and discovery.

use crate::workload::{DynWorkloadKernel, HypotReduction, SquareAddSqrt, WorkloadKernel};
use std::sync::Arc;

#[derive(Default)]
pub struct KernelRegistry {
    kernels: Vec<DynWorkloadKernel>,
}

impl Clone for KernelRegistry {
    fn clone(&self) -> Self {
        Self {
            kernels: self.kernels.clone(),
        }
    }
}

impl KernelRegistry {
    pub fn new() -> Self {
        Self {
            kernels: Vec::new(),
        }
    }

    pub fn with_default_kernels() -> Self {
        let mut registry = Self::new();
        registry.register_kernel(HypotReduction::new());
        registry.register_kernel(SquareAddSqrt::new());
        registry
    }

    pub fn register_kernel<K>(&mut self, kernel: K)
    where
        K: WorkloadKernel + 'static,
    {
        self.kernels.push(Arc::new(kernel));
    }

    pub fn kernels(&self) -> &[DynWorkloadKernel] {
        &self.kernels
    }

    pub fn find_kernel(&self, name: &str) -> Option<DynWorkloadKernel> {
        self.kernels
            .iter()
            .find(|kernel| kernel.name() == name)
            .map(Arc::clone)
    }
}
