use crate::fsutil;

use super::parser::parse_mount_info_line;
use super::{Error, Result};
use std::io::BufRead;
use std::path::Path;

/// Default location of the cgroup filesystem.
pub const CGROUP_MOUNT_POINT: &str = "/sys/fs/cgroup";

/// Location of the unified hierarchy when mounted beside legacy controllers.
pub const HYBRID_UNIFIED_MOUNT_POINT: &str = "/sys/fs/cgroup/unified";

/// The cgroup accounting layout of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CgroupMode {
    /// Only legacy (v1) per-controller hierarchies are mounted.
    Legacy,
    /// Legacy controllers plus a unified hierarchy at
    /// [`HYBRID_UNIFIED_MOUNT_POINT`].
    Hybrid,
    /// A single unified (v2) hierarchy at [`CGROUP_MOUNT_POINT`].
    Unified,
}

impl std::fmt::Display for CgroupMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CgroupMode::Legacy => "legacy",
            CgroupMode::Hybrid => "hybrid",
            CgroupMode::Unified => "unified",
        };
        f.write_str(name)
    }
}

/// Detects the cgroup accounting mode from a `mountinfo` file.
///
/// A `cgroup2` mount at [`CGROUP_MOUNT_POINT`] means a unified host. Legacy
/// `cgroup` mounts next to a `cgroup2` mount at [`HYBRID_UNIFIED_MOUNT_POINT`]
/// mean a hybrid host, and legacy mounts alone a legacy one.
///
/// # Errors
///
/// Fails if the file cannot be opened or read, contains a malformed entry,
/// or lists no cgroup hierarchy ([`Error::AccountingUnavailable`]).
///
/// ```no_run
/// let mode = autoprof::mountinfo::detect_cgroup_mode("/proc/self/mountinfo")?;
/// println!("cgroup mode: {mode}");
/// # Ok::<(), autoprof::mountinfo::Error>(())
/// ```
pub fn detect_cgroup_mode(path: impl AsRef<Path>) -> Result<CgroupMode> {
    let path = path.as_ref();
    scan(fsutil::open_buffered(path)?, path)
}

fn scan<R: BufRead>(reader: R, origin: &Path) -> Result<CgroupMode> {
    let mut legacy = false;
    let mut unified_beside_legacy = false;

    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| Error::Read {
            path: origin.to_path_buf(),
            source,
        })?;
        let mount = parse_mount_info_line(&line).map_err(|source| Error::Malformed {
            path: origin.to_path_buf(),
            line: idx + 1,
            source,
        })?;

        match mount.fs_type {
            "cgroup2" if mount.mount_point == CGROUP_MOUNT_POINT => {
                log::debug!("Found unified cgroup hierarchy at {CGROUP_MOUNT_POINT}");
                return Ok(CgroupMode::Unified);
            }
            "cgroup2" if mount.mount_point == HYBRID_UNIFIED_MOUNT_POINT => {
                unified_beside_legacy = true;
            }
            "cgroup" => {
                log::trace!(
                    "Found legacy cgroup mount `{}` ({})",
                    mount.mount_point,
                    mount.super_options
                );
                legacy = true;
            }
            _ => {}
        }
    }

    match (legacy, unified_beside_legacy) {
        (true, true) => Ok(CgroupMode::Hybrid),
        (true, false) => Ok(CgroupMode::Legacy),
        (false, _) => Err(Error::AccountingUnavailable {
            path: origin.to_path_buf(),
        }),
    }
}
