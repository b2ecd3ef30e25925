//! Parsers for the memory accounting files used to compute the working set.
//!
//! - **`memory.stat`** (both hierarchies) is a key-value file parsed into
//!   [`MemoryStat`]. Only `inactive_file` and, on the legacy hierarchy,
//!   `hierarchical_memory_limit` are registered. Parsing stops as soon as
//!   both have been seen.
//!
//! - **`memory.max`** (unified only) is a single-line file parsed into
//!   [`MemoryLimit`], where `max` means no limit.
//!
//! `memory.usage_in_bytes` and `memory.current` hold one plain number and are
//! read as [`super::Counter`].
//!
//! # Parsing assumptions
//!
//! - Values are byte counts.
//! - `hierarchical_memory_limit` is absent on the unified hierarchy, so it
//!   stays `None` there.
//!
//! # Error handling
//!
//! A non-numeric value for a registered key, or a registered key appearing
//! twice, yields a [`super::StatParseError`] inside an `io::Error` of kind
//! `InvalidData`.
//!
//! # Examples
//!
//! ```rust
//! use autoprof::cgroup::stats::{KeyValueStat, MemoryLimit, MemoryStat, SingleLineStat};
//!
//! let data = "\
//! cache 4096
//! inactive_file 1024
//! hierarchical_memory_limit 104857600
//! ";
//! let stat = MemoryStat::from_reader(&mut data.as_bytes()).unwrap();
//! assert_eq!(stat.inactive_file, 1024);
//! assert_eq!(stat.hierarchical_memory_limit, Some(104_857_600));
//!
//! let limit = MemoryLimit::from_reader(&mut &b"max\n"[..]).unwrap();
//! assert_eq!(limit.bytes_or_max(), u64::MAX);
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::parser::{FieldHandler, KeyValueStat, SingleLineStat, parse_u64, read_first_line};

/// Working-set related fields of a `memory.stat` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MemoryStat {
    /// Page cache on the inactive LRU list, in bytes. Reclaimable without I/O
    /// pressure, so it is excluded from usage.
    pub inactive_file: u64,
    /// Effective memory limit of the hierarchy, in bytes (legacy only).
    pub hierarchical_memory_limit: Option<u64>,
}

impl MemoryStat {
    fn set_inactive_file(&mut self, v: u64) {
        self.inactive_file = v;
    }

    fn set_hierarchical_memory_limit(&mut self, v: u64) {
        self.hierarchical_memory_limit = Some(v);
    }
}

static HANDLERS: LazyLock<HashMap<&'static str, FieldHandler<MemoryStat>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, FieldHandler<MemoryStat>> = HashMap::with_capacity(2);
        m.insert("inactive_file", MemoryStat::set_inactive_file);
        m.insert(
            "hierarchical_memory_limit",
            MemoryStat::set_hierarchical_memory_limit,
        );
        m
    });

impl KeyValueStat for MemoryStat {
    fn field_handlers() -> &'static HashMap<&'static str, FieldHandler<Self>> {
        &HANDLERS
    }
}

/// Memory limit from a unified `memory.max` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryLimit {
    /// Limit in bytes; `None` represents `max`.
    pub limit_bytes: Option<u64>,
}

impl MemoryLimit {
    /// Returns the limit in bytes, treating `max` as the largest representable value.
    pub fn bytes_or_max(&self) -> u64 {
        self.limit_bytes.unwrap_or(u64::MAX)
    }
}

impl SingleLineStat for MemoryLimit {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        let limit_bytes = match line.as_str() {
            "max" => None,
            value => Some(parse_u64(value)?),
        };

        Ok(MemoryLimit { limit_bytes })
    }
}
