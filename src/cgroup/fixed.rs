//! Provider for managed container platforms that expose a fixed CPU budget.
//!
//! These platforms mount a legacy hierarchy but leave the CFS quota unset;
//! the CPU limit is instead a known nanosecond budget per vCPU.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use super::snapshot::{SnapshotQueue, UsageSnapshot};
use super::utils::lock_snapshots;
use super::v1::LegacyFiles;
use super::{ResourceProvider, Result};

/// CPU budget of one vCPU, in nanoseconds.
pub const LIMIT_PER_VCPU: u64 = 1_206_340_307_240;

/// Resource provider with a CPU limit fixed at construction.
#[derive(Debug)]
pub struct FixedLimit {
    files: LegacyFiles,
    vcpus: f64,
    snapshots: Mutex<SnapshotQueue>,
}

impl FixedLimit {
    /// Creates a provider reading the legacy hierarchy at `root`, with a CPU
    /// limit of `vcpus` times [`LIMIT_PER_VCPU`].
    pub fn new(root: impl Into<PathBuf>, vcpus: f64, capacity: usize) -> Self {
        Self {
            files: LegacyFiles::new(root),
            vcpus,
            snapshots: Mutex::new(SnapshotQueue::new(capacity)),
        }
    }

    pub fn root(&self) -> &Path {
        self.files.root()
    }

    /// The absolute CPU budget in nanoseconds.
    pub fn cpu_limit(&self) -> f64 {
        LIMIT_PER_VCPU as f64 * self.vcpus
    }

    pub(crate) fn cpu_usage_at(&self, now: Instant) -> Result<f64> {
        let usage = self.files.cpu_usage_nanos()?;

        let mut snapshots = lock_snapshots(&self.snapshots);
        snapshots.enqueue(UsageSnapshot {
            usage,
            timestamp: now,
        });
        if !snapshots.is_full() {
            return Ok(0.0);
        }
        Ok(usage as f64 / self.cpu_limit())
    }
}

impl ResourceProvider for FixedLimit {
    fn set_cpu_quota(&mut self) -> Result<()> {
        Ok(())
    }

    fn cpu_usage(&self) -> Result<f64> {
        self.cpu_usage_at(Instant::now())
    }

    fn mem_usage(&self) -> Result<f64> {
        self.files.memory_ratio()
    }
}
