use crate::{
    clock::Clock,
    connectors::{sink::CaptureSink, stream::StreamProvider},
    metrics::Metrics,
    state::KeyValueCache,
};
use model::transform::mapping::FieldMappingSpec;
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIME_BUDGET: Duration = Duration::from_secs(60);
pub const DEFAULT_CURSOR_TTL: Duration = Duration::from_secs(120);
pub const DEFAULT_PAGE_DELAY: Duration = Duration::from_millis(200);
pub const DEFAULT_MAX_EXPIRED_REISSUES: usize = 3;

/// Tunables for a single shard poll.
#[derive(Debug, Clone)]
pub struct PollSettings {
    /// Upper bound on how long one cycle keeps paginating.
    pub time_budget: Duration,
    /// Lifetime of a persisted cursor, refreshed on each page.
    pub cursor_ttl: Duration,
    /// Pause between consecutive page fetches on the same shard.
    pub page_delay: Duration,
    /// Cursor reissues tolerated per shard per cycle.
    pub max_expired_reissues: usize,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            time_budget: DEFAULT_TIME_BUDGET,
            cursor_ttl: DEFAULT_CURSOR_TTL,
            page_delay: DEFAULT_PAGE_DELAY,
            max_expired_reissues: DEFAULT_MAX_EXPIRED_REISSUES,
        }
    }
}

/// Everything a poll cycle needs, built once at startup and shared by `Arc`.
#[derive(Clone)]
pub struct BridgeContext {
    pub stream_name: String,
    pub mapping: FieldMappingSpec,
    pub settings: PollSettings,

    pub provider: Arc<dyn StreamProvider>,
    pub cache: Arc<dyn KeyValueCache>,
    pub sink: Arc<dyn CaptureSink>,
    pub clock: Arc<dyn Clock>,

    pub metrics: Metrics,
    pub cancel: CancellationToken,
}

pub struct BridgeContextParams {
    pub stream_name: String,
    pub mapping: FieldMappingSpec,
    pub settings: PollSettings,
    pub provider: Arc<dyn StreamProvider>,
    pub cache: Arc<dyn KeyValueCache>,
    pub sink: Arc<dyn CaptureSink>,
    pub clock: Arc<dyn Clock>,
    pub cancel: CancellationToken,
}

impl BridgeContext {
    pub fn new(params: BridgeContextParams) -> Self {
        Self {
            stream_name: params.stream_name,
            mapping: params.mapping,
            settings: params.settings,
            provider: params.provider,
            cache: params.cache,
            sink: params.sink,
            clock: params.clock,
            metrics: Metrics::new(),
            cancel: params.cancel,
        }
    }
}
