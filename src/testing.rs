//! In-memory doubles for the controller's capabilities.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use kube::ResourceExt;
use tokio::sync::Mutex;

use crate::crd::Stream;
use crate::error::{OperatorError, Result};
use crate::events::{EventSink, Severity};
use crate::store::StreamStore;
use crate::writer::StreamWriter;

/// Stream store backed by a map keyed on namespace and name.
#[derive(Default)]
pub struct MemoryStore {
    streams: RwLock<HashMap<(String, String), Arc<Stream>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a stream, keyed by its namespace and name.
    pub fn insert(&self, stream: Stream) {
        let key = (stream.namespace().unwrap_or_default(), stream.name_any());
        self.streams
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, Arc::new(stream));
    }

    pub fn remove(&self, namespace: &str, name: &str) {
        self.streams
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&(namespace.to_string(), name.to_string()));
    }
}

impl StreamStore for MemoryStore {
    fn get(&self, namespace: &str, name: &str) -> Option<Arc<Stream>> {
        self.streams
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
    }
}

/// Writer that records every update.
#[derive(Default)]
pub struct RecordingWriter {
    updates: Mutex<Vec<Stream>>,
    conflict: bool,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every write with a version conflict.
    pub fn with_conflicts(mut self) -> Self {
        self.conflict = true;
        self
    }

    pub async fn updates(&self) -> Vec<Stream> {
        self.updates.lock().await.clone()
    }

    pub async fn last(&self) -> Option<Stream> {
        self.updates.lock().await.last().cloned()
    }
}

#[async_trait]
impl StreamWriter for RecordingWriter {
    async fn update(&self, stream: &Stream) -> Result<Stream> {
        if self.conflict {
            return Err(OperatorError::Conflict(format!(
                "stream {} has been modified",
                stream.name_any()
            )));
        }
        self.updates.lock().await.push(stream.clone());
        Ok(stream.clone())
    }
}

/// Collects events as `"<Severity> <reason> <message>"` strings.
#[derive(Default)]
pub struct FakeRecorder {
    events: Mutex<Vec<String>>,
}

impl FakeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<String> {
        self.events.lock().await.clone()
    }
}

#[async_trait]
impl EventSink for FakeRecorder {
    async fn record(&self, _stream: &Stream, severity: Severity, reason: &str, message: &str) {
        self.events
            .lock()
            .await
            .push(format!("{severity} {reason} {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::StreamSpec;
    use crate::events::{REASON_CREATING, REASON_FAILED};

    fn stream(namespace: &str, name: &str) -> Stream {
        let mut s = Stream::new(name, StreamSpec::named(name));
        s.metadata.namespace = Some(namespace.to_string());
        s
    }

    #[test]
    fn test_memory_store_lookup_is_namespaced() {
        let store = MemoryStore::new();
        store.insert(stream("default", "orders"));

        assert!(store.get("default", "orders").is_some());
        assert!(store.get("other", "orders").is_none());

        store.remove("default", "orders");
        assert!(store.get("default", "orders").is_none());
    }

    #[tokio::test]
    async fn test_recording_writer_keeps_updates() {
        let writer = RecordingWriter::new();

        let returned = writer.update(&stream("default", "orders")).await.unwrap();
        assert_eq!(returned.name_any(), "orders");
        assert_eq!(writer.updates().await.len(), 1);
        assert_eq!(writer.last().await.unwrap().spec.name, "orders");
    }

    #[tokio::test]
    async fn test_recording_writer_conflict() {
        let writer = RecordingWriter::new().with_conflicts();

        let err = writer.update(&stream("default", "orders")).await.unwrap_err();
        assert!(matches!(err, OperatorError::Conflict(_)));
        assert!(writer.updates().await.is_empty());
    }

    #[tokio::test]
    async fn test_fake_recorder_formats_events() {
        let recorder = FakeRecorder::new();
        let stream = stream("default", "orders");

        recorder
            .record(&stream, Severity::Normal, REASON_CREATING, "Creating stream \"orders\"")
            .await;
        recorder
            .record(&stream, Severity::Warning, REASON_FAILED, "boom")
            .await;

        assert_eq!(
            recorder.events().await,
            vec![
                "Normal Creating Creating stream \"orders\"".to_string(),
                "Warning Failed boom".to_string(),
            ]
        );
    }
}
