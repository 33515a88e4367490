use async_trait::async_trait;
use engine_core::{connectors::sink::CaptureSink, error::SinkError};
use model::events::capture::OutputEvent;
use std::sync::Mutex;

/// Keeps captured events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryCaptureSink {
    events: Mutex<Vec<OutputEvent>>,
    fail_with: Mutex<Option<String>>,
}

impl MemoryCaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.event).collect()
    }

    /// Makes every subsequent capture fail with a transport error (or succeed
    /// again with `None`).
    pub fn fail_with(&self, reason: Option<&str>) {
        *self.fail_with.lock().unwrap_or_else(|e| e.into_inner()) = reason.map(str::to_string);
    }
}

#[async_trait]
impl CaptureSink for MemoryCaptureSink {
    async fn capture(&self, event: &OutputEvent) -> Result<(), SinkError> {
        if let Some(reason) = self
            .fail_with
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(SinkError::Transport(reason));
        }

        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
        Ok(())
    }
}
