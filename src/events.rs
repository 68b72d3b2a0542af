//! Kubernetes event recording for Stream resources.

use std::fmt;

use async_trait::async_trait;
use kube::runtime::events::{Event, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::warn;

use crate::crd::Stream;

// Event reasons
pub const REASON_CREATING: &str = "Creating";
pub const REASON_CREATED: &str = "Created";
pub const REASON_UPDATING: &str = "Updating";
pub const REASON_UPDATED: &str = "Updated";
pub const REASON_DELETING: &str = "Deleting";
pub const REASON_FAILED: &str = "Failed";
pub const REASON_INVALID_UPDATE: &str = "InvalidUpdate";

/// Severity of a recorded event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Normal => write!(f, "Normal"),
            Severity::Warning => write!(f, "Warning"),
        }
    }
}

impl From<Severity> for EventType {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Normal => EventType::Normal,
            Severity::Warning => EventType::Warning,
        }
    }
}

/// Fire-and-forget event sink.
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn record(&self, stream: &Stream, severity: Severity, reason: &str, message: &str);
}

/// Publishes events through the Kubernetes events API.
pub struct KubeEventSink {
    client: Client,
    reporter: Reporter,
}

impl KubeEventSink {
    pub fn new(client: Client, controller: &str) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: controller.to_string(),
                instance: std::env::var("POD_NAME").ok(),
            },
        }
    }
}

#[async_trait]
impl EventSink for KubeEventSink {
    async fn record(&self, stream: &Stream, severity: Severity, reason: &str, message: &str) {
        let recorder = Recorder::new(
            self.client.clone(),
            self.reporter.clone(),
            stream.object_ref(&()),
        );
        let event = Event {
            type_: severity.into(),
            reason: reason.to_string(),
            note: Some(message.to_string()),
            action: reason.to_string(),
            secondary: None,
        };
        if let Err(e) = recorder.publish(event).await {
            warn!(
                stream = %stream.name_any(),
                reason = %reason,
                error = %e,
                "failed to publish event"
            );
        }
    }
}
