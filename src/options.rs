use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cgroup::DEFAULT_SNAPSHOT_CAPACITY;
use crate::error::{Error, Result};

pub const DEFAULT_WATCH_INTERVAL: Duration = Duration::from_secs(5);
pub const DEFAULT_CPU_THRESHOLD: f64 = 0.75;
pub const DEFAULT_MEM_THRESHOLD: f64 = 0.75;
pub const DEFAULT_MIN_CONSECUTIVE_OVER_THRESHOLD: usize = 12;
pub const DEFAULT_MOUNTINFO_PATH: &str = "/proc/self/mountinfo";

/// Settings of a [`crate::Sentinel`].
#[derive(Debug, Clone, PartialEq)]
pub struct Options {
    /// Interval between two usage polls.
    pub watch_interval: Duration,
    /// CPU usage ratio at or above which a CPU profile is reported.
    pub cpu_threshold: f64,
    /// Memory usage ratio at or above which a heap profile is reported.
    pub mem_threshold: f64,
    /// Number of consecutive polls over a threshold before the same resource
    /// reports again.
    pub min_consecutive_over_threshold: usize,
    /// Number of CPU usage snapshots spanning the rate window.
    pub snapshot_capacity: usize,
    /// Report both profiles when either threshold is crossed.
    pub report_both: bool,
    pub disable_cpu_prof: bool,
    pub disable_mem_prof: bool,
    /// vCPU count of a fixed-limit platform; forces the fixed-limit provider.
    pub fixed_limit_vcpus: Option<f64>,
    /// Mount table used to detect the cgroup accounting mode.
    pub mountinfo_path: PathBuf,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            watch_interval: DEFAULT_WATCH_INTERVAL,
            cpu_threshold: DEFAULT_CPU_THRESHOLD,
            mem_threshold: DEFAULT_MEM_THRESHOLD,
            min_consecutive_over_threshold: DEFAULT_MIN_CONSECUTIVE_OVER_THRESHOLD,
            snapshot_capacity: DEFAULT_SNAPSHOT_CAPACITY,
            report_both: false,
            disable_cpu_prof: false,
            disable_mem_prof: false,
            fixed_limit_vcpus: None,
            mountinfo_path: PathBuf::from(DEFAULT_MOUNTINFO_PATH),
        }
    }
}

impl Options {
    /// Builds options from the defaults, overridden by `AUTOPROF_*` environment
    /// variables:
    ///
    /// - `AUTOPROF_WATCH_INTERVAL_MS`
    /// - `AUTOPROF_CPU_THRESHOLD`, `AUTOPROF_MEM_THRESHOLD`
    /// - `AUTOPROF_MIN_CONSECUTIVE_OVER_THRESHOLD`
    /// - `AUTOPROF_REPORT_BOTH`, `AUTOPROF_DISABLE_CPU_PROF`, `AUTOPROF_DISABLE_MEM_PROF`
    /// - `AUTOPROF_FIXED_LIMIT_VCPU`
    ///
    /// The result is not validated; call [`Options::validate`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut opts = Self::default();
        let interval_ms: Option<u64> = parse_var(&lookup, "AUTOPROF_WATCH_INTERVAL_MS")?;
        if let Some(ms) = interval_ms {
            opts.watch_interval = Duration::from_millis(ms);
        }
        if let Some(v) = parse_var(&lookup, "AUTOPROF_CPU_THRESHOLD")? {
            opts.cpu_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "AUTOPROF_MEM_THRESHOLD")? {
            opts.mem_threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "AUTOPROF_MIN_CONSECUTIVE_OVER_THRESHOLD")? {
            opts.min_consecutive_over_threshold = v;
        }
        if let Some(v) = parse_flag(&lookup, "AUTOPROF_REPORT_BOTH")? {
            opts.report_both = v;
        }
        if let Some(v) = parse_flag(&lookup, "AUTOPROF_DISABLE_CPU_PROF")? {
            opts.disable_cpu_prof = v;
        }
        if let Some(v) = parse_flag(&lookup, "AUTOPROF_DISABLE_MEM_PROF")? {
            opts.disable_mem_prof = v;
        }
        opts.fixed_limit_vcpus = parse_var(&lookup, "AUTOPROF_FIXED_LIMIT_VCPU")?;
        Ok(opts)
    }

    /// Checks value ranges and flag combinations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] naming the first offending option.
    pub fn validate(&self) -> Result<()> {
        if self.watch_interval.is_zero() {
            return Err(invalid("watch interval must be positive"));
        }
        if !in_unit_range(self.cpu_threshold) {
            return Err(invalid("cpu threshold must be in (0, 1]"));
        }
        if !in_unit_range(self.mem_threshold) {
            return Err(invalid("memory threshold must be in (0, 1]"));
        }
        if self.min_consecutive_over_threshold == 0 {
            return Err(invalid("min consecutive over threshold must be at least 1"));
        }
        if self.snapshot_capacity == 0 {
            return Err(invalid("snapshot capacity must be at least 1"));
        }
        if self.disable_cpu_prof && self.disable_mem_prof {
            return Err(invalid("cpu and memory profiling cannot both be disabled"));
        }
        if let Some(vcpus) = self.fixed_limit_vcpus {
            if !(vcpus.is_finite() && vcpus > 0.0) {
                return Err(invalid("fixed-limit vcpu count must be positive"));
            }
        }
        Ok(())
    }
}

fn invalid(msg: &str) -> Error {
    Error::InvalidOption(msg.to_owned())
}

fn in_unit_range(v: f64) -> bool {
    v > 0.0 && v <= 1.0
}

fn parse_var<T, F>(lookup: &F, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|err| Error::InvalidOption(format!("{name}=`{raw}`: {err}")))
        })
        .transpose()
}

fn parse_flag<F>(lookup: &F, name: &str) -> Result<Option<bool>>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            _ => Err(Error::InvalidOption(format!("{name}=`{raw}`: not a boolean"))),
        })
        .transpose()
}
