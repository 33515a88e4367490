use crate::error::BridgeError;
use connectors::{
    capture::{http::HttpCaptureSink, log::LogCaptureSink},
    kinesis::client::KinesisProvider,
};
use engine_config::settings::BridgeConfig;
use engine_core::{
    clock::SystemClock,
    connectors::sink::CaptureSink,
    context::bridge::{BridgeContext, BridgeContextParams},
    state::{KeyValueCache, memory::MemoryCache, sled_store::SledCache},
};
use std::{path::PathBuf, sync::Arc};
use tokio_util::sync::CancellationToken;
use tracing::info;

const CACHE_DIR: &str = ".kinesis-bridge/cache";

/// Builds the context every poller shares from a validated config.
///
/// A dry run keeps cursors in memory and logs events instead of sending them.
pub async fn build_context(
    config: &BridgeConfig,
    dry_run: bool,
    cancel: CancellationToken,
) -> Result<BridgeContext, BridgeError> {
    let mapping = config.mapping_spec()?;
    let provider = Arc::new(KinesisProvider::connect(&config.kinesis_settings()).await);

    let (cache, sink): (Arc<dyn KeyValueCache>, Arc<dyn CaptureSink>) = if dry_run {
        info!("Dry run: cursors kept in memory, events logged only");
        (Arc::new(MemoryCache::new()), Arc::new(LogCaptureSink))
    } else {
        let sink = HttpCaptureSink::new(&config.capture_settings())?;
        (open_cache(config)?, Arc::new(sink))
    };

    Ok(BridgeContext::new(BridgeContextParams {
        stream_name: config.stream_name.clone(),
        mapping,
        settings: config.poll_settings(),
        provider,
        cache,
        sink,
        clock: Arc::new(SystemClock),
        cancel,
    }))
}

/// Opens the persistent cursor cache at the configured path, or under the
/// home directory when none is set.
pub fn open_cache(config: &BridgeConfig) -> Result<Arc<dyn KeyValueCache>, BridgeError> {
    let path = match &config.cache_path {
        Some(path) => path.clone(),
        None => default_cache_path()?,
    };
    info!(path = %path.display(), "Opening cursor cache");
    Ok(Arc::new(SledCache::open(path)?))
}

pub fn default_cache_path() -> Result<PathBuf, BridgeError> {
    let home_dir = dirs::home_dir().ok_or_else(|| {
        BridgeError::InitializationError("Could not determine home directory".to_string())
    })?;
    Ok(home_dir.join(CACHE_DIR))
}
