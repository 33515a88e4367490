use crate::{error::BridgeError, execution::factory};
use chrono::{DateTime, Utc};
use engine_config::settings::BridgeConfig;
use engine_core::context::bridge::BridgeContext;
use engine_processing::{
    producer::poller::{ShardOutcome, ShardPoller, StopReason},
    transform::mapping::EventMapper,
};
use futures::future::join_all;
use model::core::identifiers::ShardId;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Lists the stream's shards and dispatches one poller task per shard.
pub struct StreamOrchestrator {
    ctx: Arc<BridgeContext>,
    mapper: Arc<EventMapper>,
}

impl StreamOrchestrator {
    pub fn new(ctx: Arc<BridgeContext>) -> Self {
        let mapper = Arc::new(EventMapper::new(ctx.mapping.clone()));
        Self { ctx, mapper }
    }

    /// Builds the context from a validated config. Called once at startup.
    pub async fn setup(
        config: &BridgeConfig,
        dry_run: bool,
        cancel: CancellationToken,
    ) -> Result<Self, BridgeError> {
        let ctx = factory::build_context(config, dry_run, cancel).await?;
        info!(
            stream = %ctx.stream_name,
            event_key = %ctx.mapping.event_key,
            mappings = ctx.mapping.properties.len(),
            dry_run,
            "Bridge initialised"
        );
        Ok(Self::new(Arc::new(ctx)))
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        &self.ctx
    }

    /// Starts one orchestration cycle.
    ///
    /// The shard set is re-read on every call. The returned [`PollCycle`] owns
    /// the spawned shard tasks: dropping it leaves them running, `wait` joins
    /// them.
    pub async fn poll_once(&self) -> Result<PollCycle, BridgeError> {
        // The budget covers shard discovery too.
        let started_at = self.ctx.clock.now();
        let stream = &self.ctx.stream_name;
        let descriptor = self
            .ctx
            .provider
            .describe_stream(stream)
            .await
            .map_err(|source| {
                error!(stream = %stream, error = %source, "Failed to describe stream");
                BridgeError::Describe {
                    stream: stream.clone(),
                    source,
                }
            })?;

        info!(
            stream = %stream,
            shards = descriptor.shards.len(),
            "Starting poll cycle"
        );

        let handles = descriptor
            .shards
            .iter()
            .map(|shard| {
                let poller = ShardPoller::new(self.ctx.clone(), self.mapper.clone(), shard);
                let handle = tokio::spawn(async move { poller.run(started_at).await });
                (shard.shard_id.clone(), handle)
            })
            .collect();

        Ok(PollCycle {
            started_at,
            handles,
        })
    }
}

/// Handle on the shard tasks of one cycle.
pub struct PollCycle {
    started_at: DateTime<Utc>,
    handles: Vec<(ShardId, JoinHandle<ShardOutcome>)>,
}

impl PollCycle {
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn shard_ids(&self) -> impl Iterator<Item = &ShardId> {
        self.handles.iter().map(|(id, _)| id)
    }

    /// Waits for every shard task. A task that panicked is reported as a
    /// failed outcome for its shard.
    pub async fn wait(self) -> Vec<ShardOutcome> {
        let (ids, handles): (Vec<_>, Vec<_>) = self.handles.into_iter().unzip();

        join_all(handles)
            .await
            .into_iter()
            .zip(ids)
            .map(|(joined, shard_id)| match joined {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(shard_id = %shard_id, error = %err, "Shard task aborted");
                    ShardOutcome {
                        shard_id,
                        pages: 0,
                        records: 0,
                        events: 0,
                        reissues: 0,
                        last_cursor: None,
                        stop: StopReason::Failed(err.to_string()),
                    }
                }
            })
            .collect()
    }
}
