use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::{BoxError, Error, Result};
use crate::profile::{ProfileKind, Profiler};
use crate::report::{ReportEvent, Reporter};

use super::ResourceKind;

/// Deadline for a single delivery to the [`Reporter`].
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(5);

/// Captures a profile and hands it to the reporter under [`REPORT_TIMEOUT`].
#[derive(Debug)]
pub(crate) struct Dispatcher<P, R> {
    profiler: Arc<P>,
    reporter: R,
    cpu_threshold: f64,
    mem_threshold: f64,
}

impl<P: Profiler, R: Reporter> Dispatcher<P, R> {
    pub(crate) fn new(profiler: P, reporter: R, cpu_threshold: f64, mem_threshold: f64) -> Self {
        Self {
            profiler: Arc::new(profiler),
            reporter,
            cpu_threshold,
            mem_threshold,
        }
    }

    pub(crate) fn threshold(&self, kind: ResourceKind) -> f64 {
        match kind {
            ResourceKind::Cpu => self.cpu_threshold,
            ResourceKind::Memory => self.mem_threshold,
        }
    }

    pub(crate) async fn report(&self, kind: ResourceKind, usage: f64) -> Result<()> {
        match kind {
            ResourceKind::Cpu => self.report_cpu(usage).await,
            ResourceKind::Memory => self.report_heap(usage).await,
        }
    }

    pub(crate) async fn report_cpu(&self, usage: f64) -> Result<()> {
        let event = self.capture(ResourceKind::Cpu, usage).await?;
        let deadline = Instant::now() + REPORT_TIMEOUT;
        let (profile, info) = event.into_parts(deadline);
        deliver(
            ProfileKind::Cpu,
            deadline,
            self.reporter.report_cpu_profile(profile, info),
        )
        .await
    }

    pub(crate) async fn report_heap(&self, usage: f64) -> Result<()> {
        let event = self.capture(ResourceKind::Memory, usage).await?;
        let deadline = Instant::now() + REPORT_TIMEOUT;
        let (profile, info) = event.into_parts(deadline);
        deliver(
            ProfileKind::Heap,
            deadline,
            self.reporter.report_heap_profile(profile, info),
        )
        .await
    }

    async fn capture(&self, resource: ResourceKind, usage: f64) -> Result<ReportEvent> {
        let kind = resource.profile_kind();
        let profiler = Arc::clone(&self.profiler);
        let profile = tokio::task::spawn_blocking(move || profiler.profile(kind))
            .await?
            .map_err(|source| Error::Capture { kind, source })?;
        log::debug!("Captured {} byte {kind} profile", profile.len());
        Ok(ReportEvent::new(kind, usage, self.threshold(resource), profile))
    }
}

async fn deliver<F>(kind: ProfileKind, deadline: Instant, delivery: F) -> Result<()>
where
    F: Future<Output = std::result::Result<(), BoxError>>,
{
    match tokio::time::timeout_at(deadline, delivery).await {
        Ok(Ok(())) => {
            log::debug!("Reported {kind} profile");
            Ok(())
        }
        Ok(Err(source)) => Err(Error::Delivery { kind, source }),
        Err(_) => Err(Error::DeliveryTimeout {
            kind,
            timeout: REPORT_TIMEOUT,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::ProfileInfo;
    use std::sync::Mutex;

    struct BytesProfiler;

    impl Profiler for BytesProfiler {
        fn profile_cpu(&self) -> std::result::Result<Vec<u8>, BoxError> {
            Ok(b"cpu".to_vec())
        }

        fn profile_heap(&self) -> std::result::Result<Vec<u8>, BoxError> {
            Ok(b"heap".to_vec())
        }
    }

    struct FailingProfiler;

    impl Profiler for FailingProfiler {
        fn profile_cpu(&self) -> std::result::Result<Vec<u8>, BoxError> {
            Err("cpu profiling already in progress".into())
        }

        fn profile_heap(&self) -> std::result::Result<Vec<u8>, BoxError> {
            Err("heap unavailable".into())
        }
    }

    #[derive(Default)]
    struct RecordingReporter {
        delivered: Mutex<Vec<(ProfileKind, Vec<u8>, ProfileInfo)>>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl RecordingReporter {
        async fn record(
            &self,
            kind: ProfileKind,
            profile: Vec<u8>,
            info: ProfileInfo,
        ) -> std::result::Result<(), BoxError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                return Err("collector unreachable".into());
            }
            self.delivered.lock().unwrap().push((kind, profile, info));
            Ok(())
        }
    }

    impl Reporter for RecordingReporter {
        async fn report_cpu_profile(
            &self,
            profile: Vec<u8>,
            info: ProfileInfo,
        ) -> std::result::Result<(), BoxError> {
            self.record(ProfileKind::Cpu, profile, info).await
        }

        async fn report_heap_profile(
            &self,
            profile: Vec<u8>,
            info: ProfileInfo,
        ) -> std::result::Result<(), BoxError> {
            self.record(ProfileKind::Heap, profile, info).await
        }
    }

    #[tokio::test]
    async fn test_report_packages_percentages() {
        let dispatcher = Dispatcher::new(BytesProfiler, RecordingReporter::default(), 0.8, 0.7);

        dispatcher.report(ResourceKind::Cpu, 0.9).await.unwrap();
        dispatcher.report(ResourceKind::Memory, 0.75).await.unwrap();

        let delivered = dispatcher.reporter.delivered.lock().unwrap();
        assert_eq!(delivered.len(), 2);

        let (kind, profile, info) = &delivered[0];
        assert_eq!(*kind, ProfileKind::Cpu);
        assert_eq!(profile, b"cpu");
        assert!((info.usage_percentage - 90.0).abs() < 1e-9);
        assert!((info.threshold_percentage - 80.0).abs() < 1e-9);

        let (kind, profile, info) = &delivered[1];
        assert_eq!(*kind, ProfileKind::Heap);
        assert_eq!(profile, b"heap");
        assert!((info.usage_percentage - 75.0).abs() < 1e-9);
        assert!((info.threshold_percentage - 70.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_capture_failure_skips_delivery() {
        let dispatcher = Dispatcher::new(FailingProfiler, RecordingReporter::default(), 0.8, 0.8);

        let err = dispatcher.report_cpu(0.9).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Capture {
                kind: ProfileKind::Cpu,
                ..
            }
        ));
        assert!(dispatcher.reporter.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delivery_failure_is_returned() {
        let reporter = RecordingReporter {
            fail: true,
            ..RecordingReporter::default()
        };
        let dispatcher = Dispatcher::new(BytesProfiler, reporter, 0.8, 0.8);

        let err = dispatcher.report_heap(0.9).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Delivery {
                kind: ProfileKind::Heap,
                ..
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_reporter_times_out_at_deadline() {
        let reporter = RecordingReporter {
            delay: Some(Duration::from_secs(10)),
            ..RecordingReporter::default()
        };
        let dispatcher = Dispatcher::new(BytesProfiler, reporter, 0.8, 0.8);

        let started = Instant::now();
        let err = dispatcher.report_cpu(0.9).await.unwrap_err();
        let elapsed = started.elapsed();

        assert!(matches!(
            err,
            Error::DeliveryTimeout {
                kind: ProfileKind::Cpu,
                timeout,
            } if timeout == REPORT_TIMEOUT
        ));
        assert!(elapsed >= REPORT_TIMEOUT, "returned early: {elapsed:?}");
        assert!(elapsed < Duration::from_secs(6), "returned late: {elapsed:?}");
        assert!(dispatcher.reporter.delivered.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reporter_sees_deadline() {
        let dispatcher = Dispatcher::new(BytesProfiler, RecordingReporter::default(), 0.8, 0.8);

        let before = Instant::now();
        dispatcher.report_heap(0.9).await.unwrap();

        let delivered = dispatcher.reporter.delivered.lock().unwrap();
        let (_, _, info) = &delivered[0];
        assert!(info.deadline >= before + REPORT_TIMEOUT);
        assert!(info.deadline <= Instant::now() + REPORT_TIMEOUT);
    }
}
