//! Status derivation after a convergence pass.

/// Status reported once every workload has converged.
pub const HEALTHY_STATUS: &str = "Healthy";

/// Counters collected over one convergence pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassSummary {
    /// Workloads listed from the store.
    pub workloads_seen: usize,

    /// Workloads that needed a write (and got one).
    pub workloads_changed: usize,
}

impl PassSummary {
    /// Workloads that were already converged.
    pub fn workloads_unchanged(&self) -> usize {
        self.workloads_seen.saturating_sub(self.workloads_changed)
    }
}

/// Derives the status value to report for a completed pass.
pub trait StatusPolicy: Send + Sync {
    fn derive(&self, summary: &PassSummary) -> String;
}

/// Reports [`HEALTHY_STATUS`] for every completed pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct HealthyPolicy;

impl StatusPolicy for HealthyPolicy {
    fn derive(&self, _summary: &PassSummary) -> String {
        HEALTHY_STATUS.to_string()
    }
}
