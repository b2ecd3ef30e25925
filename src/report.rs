//! The profile delivery collaborator and the values handed to it.

use tokio::time::Instant;

use crate::error::BoxError;
use crate::profile::ProfileKind;

/// Usage metadata accompanying a delivered profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileInfo {
    /// Configured threshold on a 0-100 scale.
    pub threshold_percentage: f64,
    /// Observed usage on a 0-100 scale. May exceed 100 for CPU.
    pub usage_percentage: f64,
    /// Point after which the delivery is abandoned.
    pub deadline: Instant,
}

/// A captured profile together with the usage that triggered it.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportEvent {
    pub kind: ProfileKind,
    pub usage_percentage: f64,
    pub threshold_percentage: f64,
    pub profile: Vec<u8>,
}

impl ReportEvent {
    /// Builds an event from ratios on a 0-1 scale.
    pub fn new(kind: ProfileKind, usage: f64, threshold: f64, profile: Vec<u8>) -> Self {
        Self {
            kind,
            usage_percentage: usage * 100.0,
            threshold_percentage: threshold * 100.0,
            profile,
        }
    }

    /// Splits the event into the payload and the metadata a [`Reporter`] receives.
    pub fn into_parts(self, deadline: Instant) -> (Vec<u8>, ProfileInfo) {
        let info = ProfileInfo {
            threshold_percentage: self.threshold_percentage,
            usage_percentage: self.usage_percentage,
            deadline,
        };
        (self.profile, info)
    }
}

/// Delivers captured profiles to a remote collector.
///
/// Implementations should stop their I/O once `info.deadline` passes; the
/// caller drops the returned future at the deadline either way.
pub trait Reporter: Send + Sync + 'static {
    fn report_cpu_profile(
        &self,
        profile: Vec<u8>,
        info: ProfileInfo,
    ) -> impl std::future::Future<Output = Result<(), BoxError>> + Send;

    fn report_heap_profile(
        &self,
        profile: Vec<u8>,
        info: ProfileInfo,
    ) -> impl std::future::Future<Output = Result<(), BoxError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_uses_percentages() {
        let event = ReportEvent::new(ProfileKind::Heap, 0.8125, 0.75, vec![1, 2, 3]);
        assert_eq!(event.usage_percentage, 81.25);
        assert_eq!(event.threshold_percentage, 75.0);

        let deadline = Instant::now();
        let (profile, info) = event.into_parts(deadline);
        assert_eq!(profile, vec![1, 2, 3]);
        assert_eq!(info.usage_percentage, 81.25);
        assert_eq!(info.threshold_percentage, 75.0);
        assert_eq!(info.deadline, deadline);
    }
}
