//! Legacy (v1) hierarchy provider.
//!
//! Each controller is mounted in its own directory below the cgroup root:
//!
//! - `cpu/cpu.cfs_quota_us` and `cpu/cpu.cfs_period_us` for the CPU limit,
//! - `cpuacct/cpuacct.usage` for the cumulative CPU time in nanoseconds,
//! - `memory/memory.usage_in_bytes` and `memory/memory.stat` for memory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use super::snapshot::{SnapshotQueue, UsageSnapshot};
use super::stats::{CfsQuota, Counter, MemoryStat};
use super::utils::{lock_snapshots, read_key_value, read_single, working_set_ratio};
use super::{Error, ResourceProvider, Result};

const CPU_QUOTA_FILE: &str = "cpu/cpu.cfs_quota_us";
const CPU_PERIOD_FILE: &str = "cpu/cpu.cfs_period_us";
const CPU_USAGE_FILE: &str = "cpuacct/cpuacct.usage";
const MEMORY_USAGE_FILE: &str = "memory/memory.usage_in_bytes";
const MEMORY_STAT_FILE: &str = "memory/memory.stat";

/// Accounting files of a legacy hierarchy rooted at one directory.
///
/// Shared by [`CgroupV1`] and the fixed-limit provider, which reads the same
/// layout but derives its CPU limit differently.
#[derive(Debug, Clone)]
pub(crate) struct LegacyFiles {
    root: PathBuf,
}

impl LegacyFiles {
    pub(crate) fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// CFS quota divided by CFS period: the share of one logical CPU.
    pub(crate) fn cpu_quota(&self) -> Result<f64> {
        let quota_path = self.root.join(CPU_QUOTA_FILE);
        let quota = read_single::<CfsQuota>(&quota_path)?
            .quota
            .ok_or(Error::UnlimitedQuota { path: quota_path })?;

        let period_path = self.root.join(CPU_PERIOD_FILE);
        let Counter(period) = read_single(&period_path)?;
        if period == 0 {
            return Err(Error::InvalidPeriod { path: period_path });
        }

        Ok(quota as f64 / period as f64)
    }

    /// Cumulative CPU time in nanoseconds.
    pub(crate) fn cpu_usage_nanos(&self) -> Result<u64> {
        let Counter(usage) = read_single(&self.root.join(CPU_USAGE_FILE))?;
        Ok(usage)
    }

    /// `(usage - inactive_file) / hierarchical_memory_limit`.
    pub(crate) fn memory_ratio(&self) -> Result<f64> {
        let Counter(usage) = read_single(&self.root.join(MEMORY_USAGE_FILE))?;
        let stat_path = self.root.join(MEMORY_STAT_FILE);
        let stat: MemoryStat = read_key_value(&stat_path)?;
        let limit = stat
            .hierarchical_memory_limit
            .ok_or(Error::MissingField {
                path: stat_path,
                field: "hierarchical_memory_limit",
            })?;

        Ok(working_set_ratio(usage, stat.inactive_file, limit))
    }
}

/// Resource provider for hosts with legacy (v1) cgroup accounting.
#[derive(Debug)]
pub struct CgroupV1 {
    files: LegacyFiles,
    cpu_quota: Option<f64>,
    snapshots: Mutex<SnapshotQueue>,
}

impl CgroupV1 {
    /// Creates a provider reading the hierarchy mounted at `root`, keeping
    /// `capacity` CPU usage snapshots for rate computation.
    pub fn new(root: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            files: LegacyFiles::new(root),
            cpu_quota: None,
            snapshots: Mutex::new(SnapshotQueue::new(capacity)),
        }
    }

    /// Root directory of the hierarchy.
    pub fn root(&self) -> &Path {
        self.files.root()
    }

    /// The loaded CPU quota, if [`ResourceProvider::set_cpu_quota`] succeeded.
    pub fn cpu_quota(&self) -> Option<f64> {
        self.cpu_quota
    }

    pub(crate) fn cpu_usage_at(&self, now: Instant) -> Result<f64> {
        let quota = self.cpu_quota.ok_or(Error::QuotaNotLoaded)?;
        let usage = self.files.cpu_usage_nanos()?;

        let mut snapshots = lock_snapshots(&self.snapshots);
        snapshots.enqueue(UsageSnapshot {
            usage,
            timestamp: now,
        });
        Ok(snapshots.rate().map_or(0.0, |rate| rate / quota))
    }
}

impl ResourceProvider for CgroupV1 {
    fn set_cpu_quota(&mut self) -> Result<()> {
        let quota = self.files.cpu_quota()?;
        log::debug!("Loaded legacy cpu quota: {quota:.3} cpus");
        self.cpu_quota = Some(quota);
        Ok(())
    }

    fn cpu_usage(&self) -> Result<f64> {
        self.cpu_usage_at(Instant::now())
    }

    fn mem_usage(&self) -> Result<f64> {
        self.files.memory_ratio()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::time::Duration;

    /// Writes a legacy hierarchy with the given CFS quota/period below `root`.
    pub(crate) fn write_legacy_tree(root: &Path, quota: &str, period: &str) {
        for dir in ["cpu", "cpuacct", "memory"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        std::fs::write(root.join(CPU_QUOTA_FILE), format!("{quota}\n")).unwrap();
        std::fs::write(root.join(CPU_PERIOD_FILE), format!("{period}\n")).unwrap();
        std::fs::write(root.join(CPU_USAGE_FILE), "0\n").unwrap();
        std::fs::write(root.join(MEMORY_USAGE_FILE), "0\n").unwrap();
        std::fs::write(
            root.join(MEMORY_STAT_FILE),
            "inactive_file 0\nhierarchical_memory_limit 1000\n",
        )
        .unwrap();
    }

    pub(crate) fn write_legacy_cpu_usage(root: &Path, nanos: u64) {
        std::fs::write(root.join(CPU_USAGE_FILE), format!("{nanos}\n")).unwrap();
    }

    #[test]
    fn test_set_cpu_quota() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "50000", "100000");

        let mut cg = CgroupV1::new(dir.path(), 3);
        cg.set_cpu_quota().unwrap();
        assert_eq!(cg.cpu_quota(), Some(0.5));
    }

    #[test]
    fn test_unlimited_quota_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "-1", "100000");

        let mut cg = CgroupV1::new(dir.path(), 3);
        let err = cg.set_cpu_quota().unwrap_err();
        assert!(matches!(err, Error::UnlimitedQuota { .. }));
        assert_eq!(cg.cpu_quota(), None);
    }

    #[test]
    fn test_missing_quota_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut cg = CgroupV1::new(dir.path(), 3);
        assert!(matches!(
            cg.set_cpu_quota().unwrap_err(),
            Error::FileOpen(_)
        ));
    }

    #[test]
    fn test_zero_period() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "50000", "0");

        let mut cg = CgroupV1::new(dir.path(), 3);
        assert!(matches!(
            cg.set_cpu_quota().unwrap_err(),
            Error::InvalidPeriod { .. }
        ));
    }

    #[test]
    fn test_cpu_usage_before_quota() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "50000", "100000");
        let cg = CgroupV1::new(dir.path(), 3);
        assert!(matches!(cg.cpu_usage().unwrap_err(), Error::QuotaNotLoaded));
    }

    #[test]
    fn test_cpu_usage_not_ready_until_full() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "50000", "100000");
        let mut cg = CgroupV1::new(dir.path(), 3);
        cg.set_cpu_quota().unwrap();

        let origin = Instant::now();
        write_legacy_cpu_usage(dir.path(), 1_000_000_000_000);
        assert_eq!(cg.cpu_usage_at(origin).unwrap(), 0.0);
        write_legacy_cpu_usage(dir.path(), 9_000_000_000_000);
        assert_eq!(
            cg.cpu_usage_at(origin + Duration::from_secs(1)).unwrap(),
            0.0
        );
    }

    #[test]
    fn test_cpu_usage_rate() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "50000", "100000");
        let mut cg = CgroupV1::new(dir.path(), 3);
        cg.set_cpu_quota().unwrap();

        let origin = Instant::now();
        for (i, usage) in [0, 2_000_000_000, 4_000_000_000].into_iter().enumerate() {
            write_legacy_cpu_usage(dir.path(), usage);
            let ratio = cg
                .cpu_usage_at(origin + Duration::from_secs(i as u64))
                .unwrap();
            if i < 2 {
                assert_eq!(ratio, 0.0);
            } else {
                assert!((ratio - 4.0).abs() < 1e-9, "ratio = {ratio}");
            }
        }
    }

    #[test]
    fn test_mem_usage() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "50000", "100000");
        std::fs::write(dir.path().join(MEMORY_USAGE_FILE), "800\n").unwrap();
        std::fs::write(
            dir.path().join(MEMORY_STAT_FILE),
            "cache 100\ninactive_file 200\nhierarchical_memory_limit 1000\n",
        )
        .unwrap();

        let cg = CgroupV1::new(dir.path(), 3);
        assert!((cg.mem_usage().unwrap() - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_mem_usage_missing_limit() {
        let dir = tempfile::tempdir().unwrap();
        write_legacy_tree(dir.path(), "50000", "100000");
        std::fs::write(dir.path().join(MEMORY_STAT_FILE), "inactive_file 200\n").unwrap();

        let cg = CgroupV1::new(dir.path(), 3);
        assert!(matches!(
            cg.mem_usage().unwrap_err(),
            Error::MissingField {
                field: "hierarchical_memory_limit",
                ..
            }
        ));
    }
}
