use async_trait::async_trait;
use engine_core::{connectors::sink::CaptureSink, error::SinkError};
use model::events::capture::OutputEvent;
use tracing::info;

/// Writes events to the log instead of delivering them. Used for dry runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogCaptureSink;

#[async_trait]
impl CaptureSink for LogCaptureSink {
    async fn capture(&self, event: &OutputEvent) -> Result<(), SinkError> {
        let properties = serde_json::to_string(&event.properties)?;
        info!(event = %event.event, %properties, "Captured event (dry run)");
        Ok(())
    }
}
