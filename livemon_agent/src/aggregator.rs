//! Demand-driven polling: once per tick, fetch the union of what open
//! sessions subscribe to, then hand each session only its own categories
//! plus any alerts the same sample triggered.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use crate::proto::ServerMessage;
use crate::registry::{SessionHandle, SessionRegistry};
use crate::sampler::MetricSource;
use crate::session;
use crate::types::{DiskUsage, MemoryUsage, Metric, MetricSample, MetricSet, MetricsUpdate};

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No sessions registered.
    Idle,
    /// Sessions exist but none of the open ones subscribe to anything.
    NoDemand,
    /// The source failed; nothing was delivered this tick.
    FetchFailed,
    Delivered { updates: usize, alerts: usize },
}

/// Union of the subscription sets.
pub fn demand<'a, I>(sets: I) -> MetricSet
where
    I: IntoIterator<Item = &'a MetricSet>,
{
    sets.into_iter()
        .fold(MetricSet::empty(), |acc, s| acc.union(*s))
}

/// Payload for one session: the subscribed categories the sample actually
/// carries. `None` when nothing is left to send.
pub fn build_update(subscribed: MetricSet, sample: &MetricSample) -> Option<MetricsUpdate> {
    let mut update = MetricsUpdate::default();

    if subscribed.contains(Metric::Cpu) {
        update.cpu = sample.current_load;
    }
    if subscribed.contains(Metric::Memory) {
        update.memory = sample.memory.and_then(|m| {
            m.percentage().map(|percentage| MemoryUsage {
                used: m.used,
                total: m.total,
                percentage,
            })
        });
    }
    if subscribed.contains(Metric::Disk) {
        update.disk = sample.disk_volumes.as_ref().map(|vols| {
            vols.iter()
                .map(|v| DiskUsage {
                    name: v.name.clone(),
                    used: v.used,
                    total: v.total,
                    percentage: v.used_percent,
                })
                .collect()
        });
    }

    (!update.is_empty()).then_some(update)
}

/// One fetch-and-fan-out pass over a snapshot of the registry.
pub async fn run_tick<S: MetricSource>(registry: &SessionRegistry, source: &S) -> TickOutcome {
    let sessions = registry.snapshot().await;
    if sessions.is_empty() {
        return TickOutcome::Idle;
    }

    let open: Vec<SessionHandle> = sessions.into_iter().filter(|h| h.is_open()).collect();
    let subscriptions: Vec<MetricSet> = open
        .iter()
        .map(|h| session::lock(&h.session).subscribed)
        .collect();
    let wanted = demand(&subscriptions);
    if wanted.is_empty() {
        return TickOutcome::NoDemand;
    }

    let sample = match source.fetch(wanted).await {
        Ok(s) => s,
        Err(e) => {
            warn!("metric fetch for {wanted} failed: {e}");
            return TickOutcome::FetchFailed;
        }
    };
    trace!(demand = %wanted, ?sample, "sampled");

    let mut updates = 0;
    let mut alerts = 0;
    for handle in &open {
        // may have disconnected while we were fetching
        if !handle.is_open() {
            continue;
        }
        let (update, fired) = {
            let mut s = session::lock(&handle.session);
            if s.subscribed.is_empty() {
                continue;
            }
            let update = build_update(s.subscribed, &sample);
            let fired = s.alerts.evaluate(&sample);
            (update, fired)
        };

        if let Some(data) = update {
            if handle.send(ServerMessage::SubscribedMetricsUpdate { data }) {
                updates += 1;
            }
        }
        for alert in fired {
            debug!(
                session = %handle.id,
                metric = ?alert.metric,
                value = alert.value,
                "alert triggered"
            );
            if handle.send(alert.into()) {
                alerts += 1;
            }
        }
    }

    TickOutcome::Delivered { updates, alerts }
}

/// Handle to the running tick loop.
pub struct Aggregator {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Aggregator {
    /// Stop the loop and wait for it; no tick starts after this returns.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(e) = self.task.await {
            warn!("aggregator task ended abnormally: {e}");
        }
    }
}

pub fn spawn_aggregator<S: MetricSource>(
    registry: SessionRegistry,
    source: Arc<S>,
    period: Duration,
) -> Aggregator {
    let (stop, mut stopped) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = interval(period);
        // A tick that overruns the period swallows the ones it missed, so
        // source calls never overlap.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("aggregator running every {}ms", period.as_millis());
        loop {
            tokio::select! {
                _ = stopped.changed() => break,
                _ = ticker.tick() => {
                    let outcome = run_tick(&registry, source.as_ref()).await;
                    trace!(?outcome, "tick");
                }
            }
        }
        info!("aggregator stopped");
    });
    Aggregator { stop, task }
}
