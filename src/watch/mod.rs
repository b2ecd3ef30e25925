//! The watch engine: two polling loops with debounced profile reporting.

mod dispatch;
mod state;
mod watcher;

pub use dispatch::REPORT_TIMEOUT;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::cgroup::{Provider, ResourceProvider};
use crate::error::{Error, Result};
use crate::options::Options;
use crate::profile::{ProfileKind, Profiler};
use crate::report::Reporter;

use dispatch::Dispatcher;

/// Resource watched by one loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Cpu,
    Memory,
}

impl ResourceKind {
    /// The profile captured when this resource breaches its threshold.
    pub fn profile_kind(self) -> ProfileKind {
        match self {
            ResourceKind::Cpu => ProfileKind::Cpu,
            ResourceKind::Memory => ProfileKind::Heap,
        }
    }

    pub fn other(self) -> Self {
        match self {
            ResourceKind::Cpu => ResourceKind::Memory,
            ResourceKind::Memory => ResourceKind::Cpu,
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Cpu => f.write_str("cpu"),
            ResourceKind::Memory => f.write_str("memory"),
        }
    }
}

/// Read-only state shared by both loops.
pub(crate) struct Shared<Q, P, R> {
    provider: Arc<Q>,
    dispatcher: Dispatcher<P, R>,
    interval: Duration,
    min_consecutive_over_threshold: usize,
    report_both: bool,
    cpu_enabled: bool,
    mem_enabled: bool,
}

impl<Q, P, R> Shared<Q, P, R> {
    fn is_enabled(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Cpu => self.cpu_enabled,
            ResourceKind::Memory => self.mem_enabled,
        }
    }
}

/// Watches CPU and memory usage and reports profiles when they run high.
///
/// Each enabled resource gets its own loop. A loop polls the provider every
/// [`Options::watch_interval`]; on a fresh breach it captures a profile with
/// the [`Profiler`] and hands it to the [`Reporter`]. Under a sustained breach
/// it reports again every [`Options::min_consecutive_over_threshold`] polls.
///
/// Report failures are logged and the loop carries on. A failed usage read ends
/// only the loop that hit it.
///
/// Dropping the sentinel stops its loops.
pub struct Sentinel<Q, P, R> {
    shared: Arc<Shared<Q, P, R>>,
    stop_tx: Option<watch::Sender<bool>>,
    handles: Vec<JoinHandle<()>>,
    started: bool,
}

impl<Q, P, R> Sentinel<Q, P, R>
where
    Q: ResourceProvider,
    P: Profiler,
    R: Reporter,
{
    /// Creates a stopped sentinel around an already selected provider.
    ///
    /// The CPU quota is loaded here. If it cannot be determined and memory
    /// monitoring is enabled, CPU monitoring is turned off with a warning.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the CPU quota cannot be determined and
    /// memory monitoring is disabled, leaving nothing to watch.
    pub fn new(options: &Options, mut provider: Q, profiler: P, reporter: R) -> Result<Self> {
        let mut cpu_enabled = !options.disable_cpu_prof;
        let mem_enabled = !options.disable_mem_prof;

        if cpu_enabled {
            if let Err(err) = provider.set_cpu_quota() {
                if !mem_enabled {
                    return Err(Error::Config(err));
                }
                log::warn!("autoprof: disabling cpu monitoring: {err}");
                cpu_enabled = false;
            }
        }

        let (stop_tx, _) = watch::channel(false);
        let shared = Shared {
            provider: Arc::new(provider),
            dispatcher: Dispatcher::new(
                profiler,
                reporter,
                options.cpu_threshold,
                options.mem_threshold,
            ),
            interval: options.watch_interval,
            min_consecutive_over_threshold: options.min_consecutive_over_threshold,
            report_both: options.report_both,
            cpu_enabled,
            mem_enabled,
        };

        Ok(Self {
            shared: Arc::new(shared),
            stop_tx: Some(stop_tx),
            handles: Vec::with_capacity(2),
            started: false,
        })
    }

    /// Spawns the watcher loops onto the current Tokio runtime.
    ///
    /// Calling it again, or after [`Sentinel::stop`], does nothing.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn start(&mut self) {
        if self.started {
            return;
        }
        let Some(stop_tx) = &self.stop_tx else {
            return;
        };
        self.started = true;

        for kind in [ResourceKind::Cpu, ResourceKind::Memory] {
            if !self.shared.is_enabled(kind) {
                continue;
            }
            self.handles.push(tokio::spawn(watcher::watch_loop(
                kind,
                Arc::clone(&self.shared),
                stop_tx.subscribe(),
            )));
        }
        log::debug!(
            "Started sentinel: cpu={}, memory={}",
            self.shared.cpu_enabled,
            self.shared.mem_enabled
        );
    }
}

impl<P, R> Sentinel<Provider, P, R>
where
    P: Profiler,
    R: Reporter,
{
    /// Validates `options`, detects the accounting mode of this host and
    /// creates a sentinel for it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOption`] for invalid options, [`Error::Mode`]
    /// if no accounting hierarchy is mounted, and [`Error::Config`] as
    /// described in [`Sentinel::new`].
    pub fn from_options(options: &Options, profiler: P, reporter: R) -> Result<Self> {
        options.validate()?;
        let provider = Provider::detect(
            &options.mountinfo_path,
            options.fixed_limit_vcpus,
            options.snapshot_capacity,
        )?;
        Self::new(options, provider, profiler, reporter)
    }
}

impl<Q, P, R> Sentinel<Q, P, R> {
    /// Signals the loops to stop. Later calls do nothing.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            // No receivers before `start`.
            let _ = stop_tx.send(true);
            log::debug!("Stopping sentinel");
        }
    }

    /// Waits for the spawned loops to finish.
    pub async fn wait(&mut self) {
        for handle in self.handles.drain(..) {
            if let Err(err) = handle.await {
                log::error!("autoprof: watcher task failed: {err}");
            }
        }
    }

    pub fn cpu_monitoring_enabled(&self) -> bool {
        self.shared.cpu_enabled
    }

    pub fn mem_monitoring_enabled(&self) -> bool {
        self.shared.mem_enabled
    }

    pub fn is_running(&self) -> bool {
        self.started && self.stop_tx.is_some()
    }
}

impl<Q, P, R> Drop for Sentinel<Q, P, R> {
    fn drop(&mut self) {
        self.stop();
    }
}

impl<Q, P, R> fmt::Debug for Sentinel<Q, P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sentinel")
            .field("cpu_enabled", &self.shared.cpu_enabled)
            .field("mem_enabled", &self.shared.mem_enabled)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}
