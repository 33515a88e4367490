use crate::error::SinkError;
use async_trait::async_trait;
use model::events::capture::OutputEvent;

/// Downstream receiver for mapped events. Delivery is best-effort.
#[async_trait]
pub trait CaptureSink: Send + Sync {
    async fn capture(&self, event: &OutputEvent) -> Result<(), SinkError>;
}
