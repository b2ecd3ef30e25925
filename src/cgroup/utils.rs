use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::fsutil;

use super::snapshot::SnapshotQueue;
use super::stats::{KeyValueStat, SingleLineStat};
use super::{Error, Result};

/// Opens `path` and parses it as a single-line stat.
pub fn read_single<T: SingleLineStat>(path: &Path) -> Result<T> {
    let mut reader = fsutil::open_buffered(path)?;
    T::from_reader(&mut reader).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Opens `path` and parses it as a key-value stat.
pub fn read_key_value<T: KeyValueStat>(path: &Path) -> Result<T> {
    let mut reader = fsutil::open_buffered(path)?;
    T::from_reader(&mut reader).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Locks the snapshot queue, recovering it if a previous holder panicked.
///
/// The queue is valid after any partial `enqueue`, so a poisoned lock
/// carries no broken invariant.
pub fn lock_snapshots(queue: &Mutex<SnapshotQueue>) -> MutexGuard<'_, SnapshotQueue> {
    queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Working-set ratio: `(usage - inactive_file) / limit`.
pub fn working_set_ratio(usage: u64, inactive_file: u64, limit: u64) -> f64 {
    if limit == 0 {
        return 0.0;
    }
    usage.saturating_sub(inactive_file) as f64 / limit as f64
}
