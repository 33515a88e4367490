use crate::error::ConnectorError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use engine_core::{connectors::sink::CaptureSink, error::SinkError};
use model::events::capture::OutputEvent;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, time::Duration};
use uuid::Uuid;

/// Mapped property that, when present, overrides the configured distinct id.
pub const DISTINCT_ID_PROPERTY: &str = "distinct_id";

const CAPTURE_PATH: &str = "/capture/";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    pub host: String,
    pub api_key: String,
    pub distinct_id: String,
}

#[derive(Debug, Serialize)]
struct CapturePayload<'a> {
    api_key: &'a str,
    event: &'a str,
    distinct_id: &'a str,
    properties: &'a BTreeMap<String, String>,
    timestamp: DateTime<Utc>,
    uuid: Uuid,
}

/// Posts each event to an HTTP capture endpoint.
pub struct HttpCaptureSink {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    distinct_id: String,
}

impl HttpCaptureSink {
    pub fn new(settings: &CaptureSettings) -> Result<Self, ConnectorError> {
        if settings.api_key.is_empty() {
            return Err(ConnectorError::MissingProperty("capture.api_key".to_string()));
        }

        let endpoint = capture_endpoint(&settings.host)?;
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: settings.api_key.clone(),
            distinct_id: settings.distinct_id.clone(),
        })
    }

    fn payload<'a>(&'a self, event: &'a OutputEvent) -> CapturePayload<'a> {
        CapturePayload {
            api_key: &self.api_key,
            event: &event.event,
            distinct_id: event
                .property(DISTINCT_ID_PROPERTY)
                .unwrap_or(&self.distinct_id),
            properties: &event.properties,
            timestamp: Utc::now(),
            uuid: Uuid::new_v4(),
        }
    }
}

#[async_trait]
impl CaptureSink for HttpCaptureSink {
    async fn capture(&self, event: &OutputEvent) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.payload(event))
            .send()
            .await
            .map_err(|e| SinkError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}

fn capture_endpoint(host: &str) -> Result<String, ConnectorError> {
    let host = host.trim().trim_end_matches('/');
    if !(host.starts_with("http://") || host.starts_with("https://")) {
        return Err(ConnectorError::InvalidEndpoint {
            url: host.to_string(),
            reason: "expected an http:// or https:// URL".to_string(),
        });
    }
    Ok(format!("{host}{CAPTURE_PATH}"))
}
