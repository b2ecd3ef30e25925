//! Generic parsing traits for cgroup accounting files.
//!
//! - [`KeyValueStat`] covers multi-line `key value` files such as `cpu.stat`
//!   and `memory.stat`. Only the keys an implementor registers are parsed;
//!   everything else is skipped without validation.
//! - [`SingleLineStat`] covers files holding one value or one pair of values,
//!   such as `cpu.max`, `cpu.cfs_quota_us` or `memory.current`.

use std::collections::{HashMap, HashSet};
use std::io::BufRead;

use super::StatParseError;

/// Handler applying a parsed value to one field.
pub type FieldHandler<S> = fn(&mut S, u64);

/// A trait for parsing whitespace separated `key value` files.
///
/// Parsing stops early once every registered key has been seen, which keeps
/// large files like the legacy `memory.stat` cheap to poll.
pub trait KeyValueStat: Default + 'static {
    /// Returns the registered keys and the handlers writing them into `Self`.
    fn field_handlers() -> &'static HashMap<&'static str, FieldHandler<Self>>;

    /// Parses a `key value` formatted buffer.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if reading fails, or a [`StatParseError`] wrapped
    /// in an `io::Error` if a registered key carries a non-numeric value or
    /// appears twice.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self> {
        let mut stat = Self::default();
        let handlers = Self::field_handlers();
        let mut seen = HashSet::with_capacity(handlers.len());

        let mut line = String::new();
        let mut lineno = 0;
        while buf.read_line(&mut line)? != 0 {
            lineno += 1;
            let mut parts = line.split_whitespace();
            if let (Some(key), Some(val)) = (parts.next(), parts.next()) {
                if let Some((k, handler)) = handlers.get_key_value(key) {
                    let parsed =
                        val.parse::<u64>()
                            .map_err(|source| StatParseError::InvalidKeyValue {
                                key: key.to_string(),
                                value: val.to_string(),
                                line: lineno,
                                source,
                            })?;
                    if !seen.insert(*k) {
                        return Err(StatParseError::DuplicateKey {
                            key: key.to_string(),
                            line: lineno,
                        }
                        .into());
                    }
                    handler(&mut stat, parsed);
                    if seen.len() == handlers.len() {
                        break;
                    }
                }
            }
            line.clear();
        }

        Ok(stat)
    }
}

/// A trait for parsing single-line accounting files.
pub trait SingleLineStat: Sized {
    /// Parses the statistic from the provided buffered reader.
    ///
    /// # Errors
    ///
    /// Returns an `io::Error` if reading or parsing fails.
    fn from_reader<R: BufRead>(buf: &mut R) -> std::io::Result<Self>;
}

/// Reads the first line of `buf`, trimmed of surrounding whitespace.
pub(super) fn read_first_line<R: BufRead>(buf: &mut R) -> std::io::Result<String> {
    let mut line = String::new();
    buf.read_line(&mut line)?;
    Ok(line.trim().to_owned())
}

pub(super) fn parse_u64(value: &str) -> Result<u64, StatParseError> {
    value
        .parse::<u64>()
        .map_err(|source| StatParseError::InvalidNumber {
            value: value.to_string(),
            source,
        })
}
