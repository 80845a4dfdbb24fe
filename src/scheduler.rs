//! Poll scheduler – one independent timer per category group.
//!
//! | Group   | Default interval | Notes                                   |
//! |---------|------------------|-----------------------------------------|
//! | players | 400 ms           | gated by the run/pause toggle           |
//! | npcs    | 5 000 ms         | only started when `npcs_enabled`        |
//! | garages | 20 000 ms        |                                         |
//!
//! Every tick spawns its own fetch, so a slow response can overlap the next
//! tick. Results are applied in completion order: the last poll to finish
//! wins, even if it was dispatched earlier. Each dispatch carries a sequence
//! number so out-of-order completions show up in the logs.

use crate::feed::SnapshotSource;
use crate::layer::{MapLayer, SceneLayer};
use crate::service::{LiveMapService, PollOutcome};
use crate::types::CategoryGroup;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub struct PollScheduler<S: SnapshotSource, L: MapLayer = SceneLayer> {
    service: Arc<Mutex<LiveMapService<L>>>,
    source: Arc<S>,
    dispatched: [AtomicU64; 3],
    applied: [AtomicU64; 3],
}

fn slot(group: CategoryGroup) -> usize {
    match group {
        CategoryGroup::Players => 0,
        CategoryGroup::Npcs => 1,
        CategoryGroup::Garages => 2,
    }
}

impl<S, L> PollScheduler<S, L>
where
    S: SnapshotSource,
    L: MapLayer + Send + 'static,
{
    pub fn new(service: Arc<Mutex<LiveMapService<L>>>, source: Arc<S>) -> Self {
        Self {
            service,
            source,
            dispatched: Default::default(),
            applied: Default::default(),
        }
    }

    pub fn service(&self) -> &Arc<Mutex<LiveMapService<L>>> {
        &self.service
    }

    /// Number of fetches dispatched so far for `group`.
    pub fn dispatched(&self, group: CategoryGroup) -> u64 {
        self.dispatched[slot(group)].load(Ordering::Relaxed)
    }

    /// Highest dispatch sequence number whose result has been applied.
    pub fn latest_applied(&self, group: CategoryGroup) -> u64 {
        self.applied[slot(group)].load(Ordering::Relaxed)
    }

    /// Interval for `group`, or `None` if it is not polled.
    pub fn interval_for(&self, group: CategoryGroup) -> Option<Duration> {
        let svc = self.service.lock();
        let config = svc.config();
        let ms = match group {
            CategoryGroup::Players => config.player_interval_ms,
            CategoryGroup::Npcs if !config.npcs_enabled => return None,
            CategoryGroup::Npcs => config.npc_interval_ms,
            CategoryGroup::Garages => config.garage_interval_ms,
        };
        Some(Duration::from_millis(ms.max(1)))
    }

    /// Fetch one snapshot for `group` and apply it.
    ///
    /// The service lock is only taken after the fetch completes.
    pub async fn poll_once(&self, group: CategoryGroup) -> PollOutcome {
        let seq = self.dispatched[slot(group)].fetch_add(1, Ordering::Relaxed) + 1;
        let result = self.source.fetch(group).await;

        let previous = self.applied[slot(group)].fetch_max(seq, Ordering::Relaxed);
        if previous > seq {
            debug!(%group, seq, previous, "late poll result applied after a newer one");
        }

        let outcome = self.service.lock().apply_poll(group, result);
        match &outcome {
            PollOutcome::Applied(report) => debug!(
                %group,
                seq,
                created = report.created.len(),
                updated = report.updated.len(),
                removed = report.removed.len(),
                out_of_bounds = report.skipped_out_of_bounds.len(),
                "poll applied"
            ),
            PollOutcome::Failed => debug!(%group, seq, "poll failed, state kept"),
            PollOutcome::Paused => debug!(%group, seq, "poll skipped while paused"),
        }
        outcome
    }

    /// Start one timer task per polled group.
    pub fn spawn(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        CategoryGroup::ALL
            .into_iter()
            .filter_map(|group| {
                let period = self.interval_for(group)?;
                let this = Arc::clone(self);
                info!(%group, period_ms = period.as_millis() as u64, "starting poll timer");
                Some(tokio::spawn(async move {
                    let mut timer = tokio::time::interval(period);
                    timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
                    loop {
                        timer.tick().await;
                        let poller = Arc::clone(&this);
                        tokio::spawn(async move {
                            poller.poll_once(group).await;
                        });
                    }
                }))
            })
            .collect()
    }

    /// Run every timer until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        let timers = self.spawn();
        if timers.is_empty() {
            warn!("no category is polled; nothing to do");
            return Ok(());
        }

        tokio::signal::ctrl_c().await?;
        info!("shutting down poll timers (SIGINT)");
        for t in timers {
            t.abort();
        }
        Ok(())
    }
}
