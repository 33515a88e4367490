#![allow(dead_code)]

use connectors::{capture::memory::MemoryCaptureSink, memory::stream::InMemoryStream};
use engine_config::settings::BridgeConfig;
use engine_core::{
    clock::ManualClock,
    context::bridge::{BridgeContext, BridgeContextParams},
    state::{KeyValueCache, memory::MemoryCache},
};
use engine_processing::{producer::poller::ShardOutcome, state_manager::CursorStore};
use engine_runtime::execution::orchestrator::StreamOrchestrator;
use model::{core::identifiers::ShardId, transform::mapping::FieldMappingSpec};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub mod utils;

pub const STREAM: &str = "analytics";

/// A bridge wired to in-process fakes. Time only moves when a poller sleeps
/// between pages.
pub struct TestBridge {
    pub stream: Arc<InMemoryStream>,
    pub cache: Arc<dyn KeyValueCache>,
    pub sink: Arc<MemoryCaptureSink>,
    pub clock: Arc<ManualClock>,
    pub cancel: CancellationToken,
    pub orchestrator: StreamOrchestrator,
}

pub struct TestBridgeBuilder {
    config: BridgeConfig,
    stream: Arc<InMemoryStream>,
    clock: Arc<ManualClock>,
    cache: Option<Arc<dyn KeyValueCache>>,
}

impl TestBridge {
    pub fn builder(stream: Arc<InMemoryStream>) -> TestBridgeBuilder {
        TestBridgeBuilder {
            config: test_config(),
            stream,
            clock: Arc::new(ManualClock::default()),
            cache: None,
        }
    }

    /// Runs one orchestration cycle and waits for every shard.
    pub async fn cycle(&self) -> Vec<ShardOutcome> {
        self.orchestrator
            .poll_once()
            .await
            .expect("describe stream")
            .wait()
            .await
    }

    pub async fn cursor(&self, shard: &str) -> Option<String> {
        let key = CursorStore::cursor_key(STREAM, &ShardId::from(shard));
        self.cache.get(&key).await.expect("read cursor")
    }

    pub fn context(&self) -> &Arc<BridgeContext> {
        self.orchestrator.context()
    }
}

impl TestBridgeBuilder {
    pub fn config(mut self, f: impl FnOnce(&mut BridgeConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache(mut self, cache: Arc<dyn KeyValueCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn build(self) -> TestBridge {
        self.config.validate().expect("valid test config");

        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(MemoryCache::with_clock(self.clock.clone())));
        let sink = Arc::new(MemoryCaptureSink::new());
        let cancel = CancellationToken::new();

        let ctx = BridgeContext::new(BridgeContextParams {
            stream_name: self.config.stream_name.clone(),
            mapping: FieldMappingSpec::parse(
                &self.config.event_key,
                &self.config.additional_property_mappings,
            )
            .expect("valid mapping"),
            settings: self.config.poll_settings(),
            provider: self.stream.clone(),
            cache: cache.clone(),
            sink: sink.clone(),
            clock: self.clock.clone(),
            cancel: cancel.clone(),
        });

        TestBridge {
            stream: self.stream,
            cache,
            sink,
            clock: self.clock,
            cancel,
            orchestrator: StreamOrchestrator::new(Arc::new(ctx)),
        }
    }
}

/// One-minute budget with a 20s page delay: five pages per shard per cycle.
pub fn test_config() -> BridgeConfig {
    BridgeConfig {
        stream_name: STREAM.to_string(),
        event_key: "event".to_string(),
        additional_property_mappings: "props.foo:foo, props.user.id:distinct_id".to_string(),
        page_delay_ms: 20_000,
        ..BridgeConfig::default()
    }
}
