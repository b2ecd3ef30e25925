//! Parsers for the CPU accounting files of both cgroup hierarchies.
//!
//! Two file shapes are covered:
//!
//! - **Key-value files** such as the unified `cpu.stat`. Each line holds a
//!   whitespace separated key and value. Only `usage_usec` is registered on
//!   [`CpuStat`]; other keys are skipped without being parsed.
//!
//! - **Single-line files**: the unified `cpu.max` (`<quota> <period>`,
//!   `max <period>` or a bare `max`) parsed into [`CpuMax`], and the legacy
//!   `cpu.cfs_quota_us` parsed into [`CfsQuota`], where `-1` means unlimited.
//!
//! The legacy `cpuacct.usage` and `cpu.cfs_period_us` files hold one plain
//! number each and are read as [`super::Counter`].
//!
//! # Parsing assumptions
//!
//! - A registered key appears at most once in a key-value file.
//! - `cpu.max` may omit the period, in which case the kernel default of
//!   100000 microseconds applies. An empty `cpu.max` reads as unlimited.
//! - All times are in microseconds as written by the kernel.
//!
//! # Error handling
//!
//! Malformed values and duplicate keys surface as a [`StatParseError`]
//! wrapped in an `io::Error` of kind `InvalidData`.
//!
//! # Examples
//!
//! ```rust
//! use autoprof::cgroup::stats::{CfsQuota, CpuMax, CpuStat, KeyValueStat, SingleLineStat};
//!
//! let data = "\
//! usage_usec 1000000
//! user_usec 600000
//! system_usec 400000
//! nr_periods 10
//! ";
//! let stat = CpuStat::from_reader(&mut data.as_bytes()).unwrap();
//! assert_eq!(stat.usage_nanos(), 1_000_000_000);
//!
//! let max = CpuMax::from_reader(&mut &b"max 100000\n"[..]).unwrap();
//! assert_eq!(max.quota, None);
//! assert_eq!(max.period, 100_000);
//!
//! let quota = CfsQuota::from_reader(&mut &b"50000\n"[..]).unwrap();
//! assert_eq!(quota.quota, Some(50_000));
//! ```

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::LazyLock;

use super::parser::{FieldHandler, KeyValueStat, SingleLineStat, parse_u64, read_first_line};
use super::StatParseError;

/// Cumulative CPU time from a unified `cpu.stat` file.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CpuStat {
    /// Total CPU time (user + system) in microseconds.
    pub usage_usec: u64,
}

impl CpuStat {
    fn set_usage_usec(&mut self, v: u64) {
        self.usage_usec = v;
    }

    /// Returns the cumulative usage in nanoseconds.
    pub fn usage_nanos(&self) -> u64 {
        self.usage_usec.saturating_mul(1_000)
    }
}

static CPU_STAT_HANDLERS: LazyLock<HashMap<&'static str, FieldHandler<CpuStat>>> =
    LazyLock::new(|| {
        let mut m: HashMap<&'static str, FieldHandler<CpuStat>> = HashMap::with_capacity(1);
        m.insert("usage_usec", CpuStat::set_usage_usec);
        m
    });

impl KeyValueStat for CpuStat {
    fn field_handlers() -> &'static HashMap<&'static str, FieldHandler<Self>> {
        &CPU_STAT_HANDLERS
    }
}

/// Default enforcement period in microseconds when `cpu.max` omits it.
const DEFAULT_PERIOD: u64 = 100_000;

/// CPU bandwidth limit from a unified `cpu.max` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpuMax {
    /// Allowed CPU time per period in microseconds; `None` for `max`.
    pub quota: Option<u64>,
    /// Enforcement period in microseconds.
    pub period: u64,
}

impl Default for CpuMax {
    fn default() -> Self {
        Self {
            quota: None,
            period: DEFAULT_PERIOD,
        }
    }
}

impl SingleLineStat for CpuMax {
    /// Parses `<quota> <period>`, `max <period>` or a bare `max`.
    ///
    /// # Errors
    ///
    /// Returns an error of kind `InvalidData` if the quota or period is neither
    /// `max` nor a number. An empty file parses as unlimited.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        let mut parts = line.split_whitespace();
        let quota = match parts.next() {
            None | Some("max") => None,
            Some(value) => Some(parse_u64(value)?),
        };
        let period = match parts.next() {
            Some(value) => parse_u64(value)?,
            None => DEFAULT_PERIOD,
        };

        Ok(CpuMax { quota, period })
    }
}

/// CFS quota from a legacy `cpu.cfs_quota_us` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CfsQuota {
    /// Allowed CPU time per period in microseconds; `None` for `-1`.
    pub quota: Option<u64>,
}

impl SingleLineStat for CfsQuota {
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let line = read_first_line(buf)?;
        let value = line
            .parse::<i64>()
            .map_err(|source| StatParseError::InvalidNumber {
                value: line.clone(),
                source,
            })?;

        Ok(CfsQuota {
            quota: u64::try_from(value).ok(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cgroup::stats::error::unwrap_stat_error;

    #[test]
    fn test_parse_cpu_stat_usage() {
        let data = "\
usage_usec 623932088
user_usec 421230248
system_usec 202701840
nr_periods 0
";
        let stat = CpuStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.usage_usec, 623_932_088);
        assert_eq!(stat.usage_nanos(), 623_932_088_000);
    }

    #[test]
    fn test_parse_cpu_stat_ignores_invalid_unknown_keys() {
        let data = "nr_bursts abc\nusage_usec 10\n";
        let stat = CpuStat::from_reader(&mut data.as_bytes()).unwrap();
        assert_eq!(stat.usage_usec, 10);
    }

    #[test]
    fn test_parse_cpu_stat_invalid_usage() {
        let data = "usage_usec ten\n";
        let err = CpuStat::from_reader(&mut data.as_bytes()).unwrap_err();
        match unwrap_stat_error(&err) {
            StatParseError::InvalidKeyValue { key, value, line, .. } => {
                assert_eq!(key, "usage_usec");
                assert_eq!(value, "ten");
                assert_eq!(*line, 1);
            }
            other => panic!("Expected InvalidKeyValue error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_cpu_max() {
        let limit = CpuMax::from_reader(&mut &b"50000 100000\n"[..]).unwrap();
        assert_eq!(limit.quota, Some(50_000));
        assert_eq!(limit.period, 100_000);
    }

    #[test]
    fn test_parse_cpu_max_unlimited() {
        let limit = CpuMax::from_reader(&mut &b"max 250000"[..]).unwrap();
        assert_eq!(limit.quota, None);
        assert_eq!(limit.period, 250_000);

        let limit = CpuMax::from_reader(&mut &b""[..]).unwrap();
        assert_eq!(limit, CpuMax::default());
    }

    #[test]
    fn test_parse_cpu_max_invalid_quota() {
        let err = CpuMax::from_reader(&mut &b"lots 100000"[..]).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn test_parse_cfs_quota() {
        let quota = CfsQuota::from_reader(&mut &b"150000\n"[..]).unwrap();
        assert_eq!(quota.quota, Some(150_000));

        let quota = CfsQuota::from_reader(&mut &b"-1\n"[..]).unwrap();
        assert_eq!(quota.quota, None);
    }

    #[test]
    fn test_parse_cfs_quota_empty() {
        let err = CfsQuota::from_reader(&mut &b""[..]).unwrap_err();
        assert!(matches!(
            unwrap_stat_error(&err),
            StatParseError::InvalidNumber { value, .. } if value.is_empty()
        ));
    }
}
