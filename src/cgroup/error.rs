use std::path::PathBuf;

use crate::fsutil;

/// Errors raised while reading cgroup accounting files.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    FileOpen(#[from] fsutil::FileOpenError),
    #[error("failed to read accounting file `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cpu quota in `{path}` is unlimited")]
    UnlimitedQuota { path: PathBuf },
    #[error("cpu period in `{path}` is zero")]
    InvalidPeriod { path: PathBuf },
    #[error("field `{field}` missing from `{path}`")]
    MissingField { path: PathBuf, field: &'static str },
    #[error("cpu quota has not been loaded")]
    QuotaNotLoaded,
}

pub type Result<T> = std::result::Result<T, Error>;
