use std::path::PathBuf;

use crate::fsutil;

/// Failure to determine the cgroup accounting mode.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("mount table unavailable: {0}")]
    Open(#[from] fsutil::FileOpenError),
    #[error("failed to read mount table `{path}`: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed entry on line {line} of `{path}`: {source}")]
    Malformed {
        path: PathBuf,
        line: usize,
        #[source]
        source: super::parser::ParseError,
    },
    #[error("no cgroup accounting hierarchy is mounted according to `{path}`")]
    AccountingUnavailable { path: PathBuf },
}

pub type Result<T> = std::result::Result<T, Error>;
