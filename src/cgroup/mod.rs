//! CPU and memory utilization from cgroup resource accounting.
//!
//! Three providers normalize the platform-specific counters into ratios:
//!
//! - [`CgroupV1`]: legacy per-controller hierarchies (CFS quota/period,
//!   `cpuacct.usage`).
//! - [`CgroupV2`]: the unified hierarchy (`cpu.max`, `cpu.stat`).
//! - [`FixedLimit`]: managed platforms with a fixed per-vCPU nanosecond budget.
//!
//! CPU usage is a counter, so providers keep a [`SnapshotQueue`] of
//! `(usage, timestamp)` pairs and report the rate across the whole window,
//! divided by the CPU quota. Until the window is full the ratio is `0.0`.
//! Memory usage is a gauge and is read fresh on every call.
//!
//! [`Provider`] selects one variant at startup and dispatches to it without
//! re-detecting the platform on later calls.

mod error;
mod fixed;
mod snapshot;
pub mod stats;
mod utils;
mod v1;
mod v2;

pub use error::{Error, Result};
pub use fixed::{FixedLimit, LIMIT_PER_VCPU};
pub use snapshot::{DEFAULT_SNAPSHOT_CAPACITY, SnapshotQueue, UsageSnapshot};
pub use v1::CgroupV1;
pub use v2::CgroupV2;

use std::path::Path;

use crate::mountinfo::{self, CgroupMode};

/// The capability set shared by every accounting layout.
///
/// `cpu_usage` and `mem_usage` take `&self` so the CPU and memory watchers can
/// poll one provider concurrently; CPU snapshot state is synchronized inside
/// the provider.
pub trait ResourceProvider: Send + Sync + 'static {
    /// Loads the CPU quota. Called once before the first `cpu_usage`.
    ///
    /// # Errors
    ///
    /// Returns an error if the limit files are unreadable or declare an
    /// unlimited quota.
    fn set_cpu_quota(&mut self) -> Result<()>;

    /// CPU utilization as a fraction of the quota; `0.0` until enough
    /// snapshots have been collected.
    fn cpu_usage(&self) -> Result<f64>;

    /// Working-set memory as a fraction of the memory limit.
    fn mem_usage(&self) -> Result<f64>;
}

/// The provider chosen for this host.
#[derive(Debug)]
pub enum Provider {
    Legacy(CgroupV1),
    Unified(CgroupV2),
    Fixed(FixedLimit),
}

impl Provider {
    /// Picks a provider from the accounting mode listed in `mountinfo_path`.
    ///
    /// With `fixed_limit_vcpus` set the [`FixedLimit`] variant is used
    /// regardless of the detected mode, though detection must still succeed.
    ///
    /// # Errors
    ///
    /// Returns [`mountinfo::Error`] if no accounting hierarchy is recognized.
    pub fn detect(
        mountinfo_path: impl AsRef<Path>,
        fixed_limit_vcpus: Option<f64>,
        capacity: usize,
    ) -> mountinfo::Result<Self> {
        let mode = mountinfo::detect_cgroup_mode(mountinfo_path)?;
        log::debug!("Detected {mode} cgroup accounting");
        Ok(Self::for_mode(mode, fixed_limit_vcpus, capacity))
    }

    /// Builds the provider for an already known accounting mode, reading from
    /// the standard mount points.
    pub fn for_mode(mode: CgroupMode, fixed_limit_vcpus: Option<f64>, capacity: usize) -> Self {
        if let Some(vcpus) = fixed_limit_vcpus {
            return Provider::Fixed(FixedLimit::new(
                mountinfo::CGROUP_MOUNT_POINT,
                vcpus,
                capacity,
            ));
        }
        match mode {
            CgroupMode::Legacy => {
                Provider::Legacy(CgroupV1::new(mountinfo::CGROUP_MOUNT_POINT, capacity))
            }
            CgroupMode::Hybrid => Provider::Unified(CgroupV2::new(
                mountinfo::HYBRID_UNIFIED_MOUNT_POINT,
                capacity,
            )),
            CgroupMode::Unified => {
                Provider::Unified(CgroupV2::new(mountinfo::CGROUP_MOUNT_POINT, capacity))
            }
        }
    }
}

impl ResourceProvider for Provider {
    fn set_cpu_quota(&mut self) -> Result<()> {
        match self {
            Provider::Legacy(p) => p.set_cpu_quota(),
            Provider::Unified(p) => p.set_cpu_quota(),
            Provider::Fixed(p) => p.set_cpu_quota(),
        }
    }

    fn cpu_usage(&self) -> Result<f64> {
        match self {
            Provider::Legacy(p) => p.cpu_usage(),
            Provider::Unified(p) => p.cpu_usage(),
            Provider::Fixed(p) => p.cpu_usage(),
        }
    }

    fn mem_usage(&self) -> Result<f64> {
        match self {
            Provider::Legacy(p) => p.mem_usage(),
            Provider::Unified(p) => p.mem_usage(),
            Provider::Fixed(p) => p.mem_usage(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn mountinfo_file(contents: &str) -> tempfile::NamedTempFile {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(contents.as_bytes()).unwrap();
        tmp
    }

    const LEGACY: &str =
        "33 30 0:28 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid - cgroup cgroup rw,cpu,cpuacct\n";
    const HYBRID: &str = "\
31 30 0:27 / /sys/fs/cgroup/unified rw,nosuid - cgroup2 cgroup2 rw
33 30 0:28 / /sys/fs/cgroup/cpu,cpuacct rw,nosuid - cgroup cgroup rw,cpu,cpuacct
";
    const UNIFIED: &str = "42 35 0:39 / /sys/fs/cgroup rw,nosuid - cgroup2 cgroup2 rw\n";

    #[test]
    fn test_detect_legacy_provider() {
        let tmp = mountinfo_file(LEGACY);
        let provider = Provider::detect(tmp.path(), None, 24).unwrap();
        match provider {
            Provider::Legacy(p) => assert_eq!(p.root(), Path::new("/sys/fs/cgroup")),
            other => panic!("unexpected provider: {other:?}"),
        }
    }

    #[test]
    fn test_detect_hybrid_provider() {
        let tmp = mountinfo_file(HYBRID);
        let provider = Provider::detect(tmp.path(), None, 24).unwrap();
        match provider {
            Provider::Unified(p) => assert_eq!(p.root(), Path::new("/sys/fs/cgroup/unified")),
            other => panic!("unexpected provider: {other:?}"),
        }
    }

    #[test]
    fn test_detect_unified_provider() {
        let tmp = mountinfo_file(UNIFIED);
        let provider = Provider::detect(tmp.path(), None, 24).unwrap();
        assert!(matches!(provider, Provider::Unified(_)));
    }

    #[test]
    fn test_fixed_limit_overrides_detected_mode() {
        let tmp = mountinfo_file(UNIFIED);
        let provider = Provider::detect(tmp.path(), Some(2.0), 24).unwrap();
        match provider {
            Provider::Fixed(p) => assert_eq!(p.cpu_limit(), 2.0 * LIMIT_PER_VCPU as f64),
            other => panic!("unexpected provider: {other:?}"),
        }
    }

    #[test]
    fn test_detection_failure_is_fatal_even_with_fixed_limit() {
        let tmp = mountinfo_file("25 1 0:24 / /proc rw,relatime - proc proc rw\n");
        let err = Provider::detect(tmp.path(), Some(1.0), 24).unwrap_err();
        assert!(matches!(err, mountinfo::Error::AccountingUnavailable { .. }));
    }

    #[test]
    fn test_provider_dispatches_to_variant() {
        let dir = tempfile::tempdir().unwrap();
        v2::tests::write_unified_tree(dir.path(), "100000 100000");
        std::fs::write(dir.path().join("memory.current"), "250\n").unwrap();
        std::fs::write(dir.path().join("memory.max"), "1000\n").unwrap();

        let mut provider = Provider::Unified(CgroupV2::new(dir.path(), 2));
        provider.set_cpu_quota().unwrap();
        assert_eq!(provider.cpu_usage().unwrap(), 0.0);
        assert!((provider.mem_usage().unwrap() - 0.25).abs() < 1e-9);
    }
}
