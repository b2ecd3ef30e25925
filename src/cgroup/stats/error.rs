use std::num::ParseIntError;

use thiserror::Error;

/// A malformed accounting file.
///
/// Parsers return `io::Result`; this error travels inside an
/// [`std::io::Error`] of kind [`std::io::ErrorKind::InvalidData`] and can be
/// recovered with `get_ref()` and `downcast_ref`.
#[derive(Debug, Error)]
pub enum StatParseError {
    #[error("key `{key}` appears twice (line {line})")]
    DuplicateKey { key: String, line: usize },

    #[error("key `{key}` on line {line} is not a number: `{value}`: {source}")]
    InvalidKeyValue {
        key: String,
        value: String,
        line: usize,
        #[source]
        source: ParseIntError,
    },

    #[error("expected a number, found `{value}`: {source}")]
    InvalidNumber {
        value: String,
        #[source]
        source: ParseIntError,
    },
}

impl From<StatParseError> for std::io::Error {
    fn from(err: StatParseError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, err)
    }
}

#[cfg(test)]
pub(crate) fn unwrap_stat_error(err: &std::io::Error) -> &StatParseError {
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    err.get_ref()
        .and_then(|e| e.downcast_ref::<StatParseError>())
        .unwrap()
}
