use crate::execution::orchestrator::{PollCycle, StreamOrchestrator};
use engine_core::metrics::Metrics;
use engine_processing::producer::poller::ShardOutcome;
use futures::future::join_all;
use std::{sync::Arc, time::Duration};
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Fires an orchestration cycle on a fixed interval until cancelled.
pub struct TickScheduler {
    orchestrator: Arc<StreamOrchestrator>,
    interval: Duration,
    cancel: CancellationToken,
}

impl TickScheduler {
    pub fn new(
        orchestrator: Arc<StreamOrchestrator>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            orchestrator,
            interval,
            cancel,
        }
    }

    /// Runs until the cancellation token fires and returns how many cycles
    /// were started. The first cycle starts immediately.
    ///
    /// Cycles are not awaited before the next tick; a reporter task per cycle
    /// logs its summary. On shutdown the reporters still running are awaited,
    /// which lets in-flight shard pollers reach their next checkpoint.
    pub async fn run(self) -> usize {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let metrics = self.orchestrator.context().metrics.clone();
        let mut reporters: Vec<JoinHandle<()>> = Vec::new();
        let mut cycles = 0;

        info!(interval = ?self.interval, "Scheduler started");
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    reporters.retain(|handle| !handle.is_finished());
                    if !reporters.is_empty() {
                        warn!(in_flight = reporters.len(), "Previous cycle still running");
                    }

                    match self.orchestrator.poll_once().await {
                        Ok(cycle) => {
                            cycles += 1;
                            reporters.push(tokio::spawn(report(cycle, metrics.clone())));
                        }
                        Err(err) => error!(error = %err, "Poll cycle skipped"),
                    }
                }
            }
        }

        info!(pending = reporters.len(), "Shutdown requested. Waiting for in-flight cycles.");
        join_all(reporters).await;
        info!(cycles, "Scheduler stopped");
        cycles
    }
}

async fn report(cycle: PollCycle, metrics: Metrics) {
    let started_at = cycle.started_at();
    let outcomes = cycle.wait().await;
    log_summary(&outcomes, &metrics);
    info!(%started_at, "Poll cycle finished");
}

/// Logs per-cycle totals and the process-wide counters.
pub fn log_summary(outcomes: &[ShardOutcome], metrics: &Metrics) {
    let records: usize = outcomes.iter().map(|o| o.records).sum();
    let events: usize = outcomes.iter().map(|o| o.events).sum();
    let failed = outcomes.iter().filter(|o| o.is_failure()).count();

    for outcome in outcomes.iter().filter(|o| o.is_failure()) {
        warn!(shard_id = %outcome.shard_id, stop = %outcome.stop, "Shard did not complete");
    }

    info!(
        shards = outcomes.len(),
        failed,
        records,
        events,
        totals = ?metrics.snapshot(),
        "Cycle summary"
    );
}
