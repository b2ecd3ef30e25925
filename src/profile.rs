//! The profile capture collaborator.

use std::fmt;

use crate::error::BoxError;

/// Kind of runtime profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileKind {
    /// A CPU profile sampled over a capture duration.
    Cpu,
    /// An instantaneous heap snapshot.
    Heap,
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileKind::Cpu => f.write_str("cpu"),
            ProfileKind::Heap => f.write_str("heap"),
        }
    }
}

/// Captures runtime profiles as raw bytes.
///
/// Both methods block: `profile_cpu` for the implementor's configured capture
/// duration. They are run on the blocking thread pool, never on a runtime
/// worker. Failures (e.g. a capture already in progress) are surfaced to the
/// caller and never retried.
pub trait Profiler: Send + Sync + 'static {
    fn profile_cpu(&self) -> Result<Vec<u8>, BoxError>;

    fn profile_heap(&self) -> Result<Vec<u8>, BoxError>;

    /// Captures a profile of the given kind.
    fn profile(&self, kind: ProfileKind) -> Result<Vec<u8>, BoxError> {
        match kind {
            ProfileKind::Cpu => self.profile_cpu(),
            ProfileKind::Heap => self.profile_heap(),
        }
    }
}
