//! Unified (v2) hierarchy provider.
//!
//! All controllers share one directory: `cpu.max` for the limit, the
//! `usage_usec` field of `cpu.stat` for cumulative CPU time, and
//! `memory.current`, `memory.stat` and `memory.max` for memory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use super::snapshot::{SnapshotQueue, UsageSnapshot};
use super::stats::{Counter, CpuMax, CpuStat, MemoryLimit, MemoryStat};
use super::utils::{lock_snapshots, read_key_value, read_single, working_set_ratio};
use super::{Error, ResourceProvider, Result};

const CPU_MAX_FILE: &str = "cpu.max";
const CPU_STAT_FILE: &str = "cpu.stat";
const MEMORY_CURRENT_FILE: &str = "memory.current";
const MEMORY_STAT_FILE: &str = "memory.stat";
const MEMORY_MAX_FILE: &str = "memory.max";

/// Resource provider for hosts with unified (v2) cgroup accounting.
#[derive(Debug)]
pub struct CgroupV2 {
    root: PathBuf,
    cpu_quota: Option<f64>,
    snapshots: Mutex<SnapshotQueue>,
}

impl CgroupV2 {
    /// Creates a provider reading the cgroup directory at `root`, keeping
    /// `capacity` CPU usage snapshots for rate computation.
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            root: root.into(),
            cpu_quota: None,
            snapshots: Mutex::new(SnapshotQueue::new(capacity)),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The loaded CPU quota, if [`ResourceProvider::set_cpu_quota`] succeeded.
    pub fn cpu_quota(&self) -> Option<f64> {
        self.cpu_quota
    }

    pub(crate) fn cpu_usage_at(&self, now: Instant) -> Result<f64> {
        let quota = self.cpu_quota.ok_or(Error::QuotaNotLoaded)?;
        let stat: CpuStat = read_key_value(&self.root.join(CPU_STAT_FILE))?;

        let mut snapshots = lock_snapshots(&self.snapshots);
        snapshots.enqueue(UsageSnapshot {
            usage: stat.usage_nanos(),
            timestamp: now,
        });
        Ok(snapshots.rate().map_or(0.0, |rate| rate / quota))
    }
}

impl ResourceProvider for CgroupV2 {
    fn set_cpu_quota(&mut self) -> Result<()> {
        let path = self.root.join(CPU_MAX_FILE);
        let limit: CpuMax = read_single(&path)?;
        let quota = limit
            .quota
            .ok_or_else(|| Error::UnlimitedQuota { path: path.clone() })?;
        if limit.period == 0 {
            return Err(Error::InvalidPeriod { path });
        }

        let quota = quota as f64 / limit.period as f64;
        log::debug!("Loaded unified cpu quota: {quota:.3} cpus");
        self.cpu_quota = Some(quota);
        Ok(())
    }

    fn cpu_usage(&self) -> Result<f64> {
        self.cpu_usage_at(Instant::now())
    }

    fn mem_usage(&self) -> Result<f64> {
        let Counter(usage) = read_single(&self.root.join(MEMORY_CURRENT_FILE))?;
        let stat: MemoryStat = read_key_value(&self.root.join(MEMORY_STAT_FILE))?;
        let limit: MemoryLimit = read_single(&self.root.join(MEMORY_MAX_FILE))?;

        Ok(working_set_ratio(
            usage,
            stat.inactive_file,
            limit.bytes_or_max(),
        ))
    }
}
