//! Typed views of the cgroup accounting files polled by the resource providers.
//!
//! Each file format maps to one type implementing either [`KeyValueStat`] or
//! [`SingleLineStat`]. Files holding a single plain number, such as
//! `cpuacct.usage`, `cpu.cfs_period_us`, `memory.usage_in_bytes` and
//! `memory.current`, are read as [`Counter`].

mod cpu;
mod error;
mod memory;
mod parser;

pub use cpu::{CfsQuota, CpuMax, CpuStat};
pub use error::StatParseError;
pub use memory::{MemoryLimit, MemoryStat};
pub use parser::{FieldHandler, KeyValueStat, SingleLineStat};

use std::io::BufRead;

/// A single unsigned value, such as a byte count or a nanosecond counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counter(pub u64);

impl SingleLineStat for Counter {
    /// # Errors
    ///
    /// Returns an error of kind `InvalidData` if the line is not a `u64`.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = parser::read_first_line(buf)?;
        Ok(Counter(parser::parse_u64(&line)?))
    }
}
