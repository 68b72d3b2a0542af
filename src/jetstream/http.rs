//! HTTP client for the stream management API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::StreamClient;
use crate::crd::StreamSpec;
use crate::error::{OperatorError, Result};

/// Stream configuration as sent to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub subjects: Vec<String>,
    pub retention: String,
    pub max_consumers: i64,
    pub max_msgs: i64,
    pub max_bytes: i64,
    pub max_age: String,
    pub max_msg_size: i64,
    pub max_msgs_per_subject: i64,
    pub storage: String,
    pub num_replicas: i32,
    pub no_ack: bool,
    pub discard: String,
    pub duplicate_window: String,
}

impl From<&StreamSpec> for StreamConfig {
    fn from(spec: &StreamSpec) -> Self {
        Self {
            name: spec.name.clone(),
            description: spec.description.clone(),
            subjects: spec.subjects.clone(),
            retention: spec.retention.clone(),
            max_consumers: spec.max_consumers,
            max_msgs: spec.max_msgs,
            max_bytes: spec.max_bytes,
            max_age: spec.max_age.clone(),
            max_msg_size: spec.max_msg_size,
            max_msgs_per_subject: spec.max_msgs_per_subject,
            storage: spec.storage.clone(),
            num_replicas: spec.replicas,
            no_ack: spec.no_ack,
            discard: spec.discard.clone(),
            duplicate_window: spec.duplicate_window.clone(),
        }
    }
}

/// HTTP client for managing streams on the server.
#[derive(Debug, Clone)]
pub struct HttpStreamClient {
    client: Client,
    base_url: Url,
}

impl HttpStreamClient {
    /// Create a client for the server at `url`.
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(url)
            .map_err(|e| OperatorError::Configuration(format!("invalid server url {url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(OperatorError::Configuration(format!(
                "invalid server url {url}: not a base url"
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| OperatorError::Configuration(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Base url with `segments` appended, each percent-encoded.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                OperatorError::Configuration(format!("invalid server url {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn stream_url(&self, name: &str) -> Result<Url> {
        self.endpoint(&["api", "v1", "streams", name])
    }
}

#[async_trait]
impl StreamClient for HttpStreamClient {
    async fn connect(&self) -> Result<()> {
        let response = self.client.get(self.endpoint(&["healthz"])?).send().await?;

        if !response.status().is_success() {
            return Err(OperatorError::StreamClient(format!(
                "server health check failed: {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        let response = self.client.get(self.stream_url(name)?).send().await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(OperatorError::StreamClient(format!(
                "failed to look up stream {name}: {status}"
            ))),
        }
    }

    async fn create(&self, spec: &StreamSpec) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint(&["api", "v1", "streams"])?)
            .json(&StreamConfig::from(spec))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(stream = %spec.name, "stream created on server");
                Ok(())
            }
            status => Err(OperatorError::StreamClient(format!(
                "failed to create stream {}: {status}",
                spec.name
            ))),
        }
    }

    async fn update(&self, spec: &StreamSpec) -> Result<()> {
        let response = self
            .client
            .put(self.stream_url(&spec.name)?)
            .json(&StreamConfig::from(spec))
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => {
                debug!(stream = %spec.name, "stream updated on server");
                Ok(())
            }
            status => Err(OperatorError::StreamClient(format!(
                "failed to update stream {}: {status}",
                spec.name
            ))),
        }
    }

    async fn delete(&self, name: &str) -> Result<()> {
        let response = self.client.delete(self.stream_url(name)?).send().await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(stream = %name, "stream already absent on server");
                Ok(())
            }
            status => Err(OperatorError::StreamClient(format!(
                "failed to delete stream {name}: {status}"
            ))),
        }
    }
}
