use std::time::Duration;

use crate::profile::ProfileKind;
use crate::watch::ResourceKind;
use crate::{cgroup, mountinfo};

/// Error type returned by the [`crate::profile::Profiler`] and
/// [`crate::report::Reporter`] collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid option: {0}")]
    InvalidOption(String),
    #[error("failed to detect cgroup accounting: {0}")]
    Mode(#[from] mountinfo::Error),
    #[error("failed to load the cpu quota: {0}")]
    Config(#[source] cgroup::Error),
    #[error("failed to read the {kind} usage: {source}")]
    AccountingRead {
        kind: ResourceKind,
        #[source]
        source: cgroup::Error,
    },
    #[error("failed to profile the {kind}: {source}")]
    Capture {
        kind: ProfileKind,
        #[source]
        source: BoxError,
    },
    #[error("failed to report the {kind} profile: {source}")]
    Delivery {
        kind: ProfileKind,
        #[source]
        source: BoxError,
    },
    #[error("reporting the {kind} profile did not finish within {timeout:?}")]
    DeliveryTimeout { kind: ProfileKind, timeout: Duration },
    #[error("blocking task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, Error>;

pub trait ResultOkLogExt<T, E> {
    /// Logs the error at `error` level and discards it.
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::fmt::Display,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::error!("autoprof: {err}");
                None
            }
        }
    }
}
