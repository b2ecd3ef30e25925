use std::sync::Arc;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};

use crate::cgroup::ResourceProvider;
use crate::error::{Error, Result, ResultOkLogExt};
use crate::profile::Profiler;
use crate::report::Reporter;

use super::state::ThresholdState;
use super::{ResourceKind, Shared};

/// Polls one resource kind until the stop signal fires or a read fails.
pub(super) async fn watch_loop<Q, P, R>(
    kind: ResourceKind,
    shared: Arc<Shared<Q, P, R>>,
    mut stop: watch::Receiver<bool>,
) where
    Q: ResourceProvider,
    P: Profiler,
    R: Reporter,
{
    let threshold = shared.dispatcher.threshold(kind);
    let mut state = ThresholdState::new(shared.min_consecutive_over_threshold);
    let mut ticker = tokio::time::interval_at(Instant::now() + shared.interval, shared.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    log::debug!("Started {kind} watcher: threshold={threshold}");

    loop {
        tokio::select! {
            biased;
            _ = stop.changed() => break,
            _ = ticker.tick() => {}
        }

        let usage = match read_usage(&shared.provider, kind).await {
            Ok(usage) => usage,
            Err(err) => {
                log::error!("autoprof: {err}; stopping the {kind} watcher");
                return;
            }
        };
        log::debug!("{kind} usage: {:.2}%", usage * 100.0);

        if !state.observe(usage >= threshold) {
            continue;
        }
        shared.dispatcher.report(kind, usage).await.ok_log();

        let other = kind.other();
        if shared.report_both && shared.is_enabled(other) {
            match read_usage(&shared.provider, other).await {
                Ok(usage) => {
                    shared.dispatcher.report(other, usage).await.ok_log();
                }
                Err(err) => log::error!("autoprof: skipping the {other} cross-report: {err}"),
            }
        }
    }

    log::debug!("Stopped {kind} watcher");
}

async fn read_usage<Q: ResourceProvider>(provider: &Arc<Q>, kind: ResourceKind) -> Result<f64> {
    let provider = Arc::clone(provider);
    tokio::task::spawn_blocking(move || match kind {
        ResourceKind::Cpu => provider.cpu_usage(),
        ResourceKind::Memory => provider.mem_usage(),
    })
    .await?
    .map_err(|source| Error::AccountingRead { kind, source })
}
