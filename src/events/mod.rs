pub mod publisher;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use crate::context::EvaluationContext;
use crate::error::{ConfigurationError, PublishError};
use crate::resolver::Sdk;
use crate::value::FlagValue;

pub use publisher::EventPublisher;

// MODELS

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub event_definition: String,
    pub event_time: DateTime<Utc>,
    pub payload: Map<String, Value>,
}

impl Event {
    /// Payload is the context with `properties` layered on top.
    pub fn new(name: &str, context: &EvaluationContext, properties: &HashMap<String, FlagValue>) -> Self {
        let mut payload = context.to_json_map();
        for (key, value) in properties {
            payload.insert(key.clone(), value.to_json());
        }

        Self {
            event_definition: format!("eventDefinitions/{}", name),
            event_time: Utc::now(),
            payload,
        }
    }

    pub fn name(&self) -> &str {
        self.event_definition
            .strip_prefix("eventDefinitions/")
            .unwrap_or(&self.event_definition)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequest {
    pub client_secret: String,
    pub events: Vec<Event>,
    pub send_time: DateTime<Utc>,
    pub sdk: Sdk,
}

/// Where batches of tracked events end up.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn send(&self, client_secret: &str, events: Vec<Event>) -> Result<(), PublishError>;
}

/// Publishes events to the events service over HTTP.
#[derive(Clone, Debug)]
pub struct HttpEventSink {
    client: reqwest::Client,
    base_url: String,
}

impl HttpEventSink {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ConfigurationError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}/v1/events:publish", self.base_url)
    }
}

#[async_trait]
impl EventSink for HttpEventSink {
    async fn send(&self, client_secret: &str, events: Vec<Event>) -> Result<(), PublishError> {
        let count = events.len();
        let request = EventRequest {
            client_secret: client_secret.to_string(),
            events,
            send_time: Utc::now(),
            sdk: Sdk::default(),
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("Accept", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PublishError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(count, "published events");
        Ok(())
    }
}

/// Keeps events in memory. Useful offline and in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<Event>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventSink for MemorySink {
    async fn send(&self, _client_secret: &str, events: Vec<Event>) -> Result<(), PublishError> {
        if let Ok(mut stored) = self.events.lock() {
            stored.extend(events);
        }
        Ok(())
    }
}
