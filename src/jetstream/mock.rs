//! Deterministic in-memory stream client.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::StreamClient;
use crate::crd::StreamSpec;
use crate::error::{OperatorError, Result};

/// Stream client double with scripted answers and call counters.
#[derive(Debug, Default)]
pub struct MockStreamClient {
    exists_ok: bool,
    connect_err: Option<String>,
    exists_err: Option<String>,
    create_err: Option<String>,
    update_err: Option<String>,
    delete_err: Option<String>,

    connect_calls: AtomicUsize,
    exists_calls: AtomicUsize,
    create_calls: AtomicUsize,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,

    log: Mutex<Vec<String>>,
}

impl MockStreamClient {
    /// A client whose streams never exist and whose calls all succeed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report every stream as present.
    pub fn with_existing_streams(mut self) -> Self {
        self.exists_ok = true;
        self
    }

    pub fn with_connect_error(mut self, msg: impl Into<String>) -> Self {
        self.connect_err = Some(msg.into());
        self
    }

    pub fn with_exists_error(mut self, msg: impl Into<String>) -> Self {
        self.exists_err = Some(msg.into());
        self
    }

    pub fn with_create_error(mut self, msg: impl Into<String>) -> Self {
        self.create_err = Some(msg.into());
        self
    }

    pub fn with_update_error(mut self, msg: impl Into<String>) -> Self {
        self.update_err = Some(msg.into());
        self
    }

    pub fn with_delete_error(mut self, msg: impl Into<String>) -> Self {
        self.delete_err = Some(msg.into());
        self
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn exists_calls(&self) -> usize {
        self.exists_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Every call made so far as `"<operation> <stream>"`, in order.
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn note(&self, operation: &str, name: &str) {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(format!("{operation} {name}"));
    }

    fn scripted(err: &Option<String>) -> Result<()> {
        match err {
            Some(msg) => Err(OperatorError::StreamClient(msg.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl StreamClient for MockStreamClient {
    async fn connect(&self) -> Result<()> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        Self::scripted(&self.connect_err)
    }

    async fn exists(&self, name: &str) -> Result<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.note("exists", name);
        Self::scripted(&self.exists_err)?;
        Ok(self.exists_ok)
    }

    async fn create(&self, spec: &StreamSpec) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.note("create", &spec.name);
        Self::scripted(&self.create_err)
    }

    async fn update(&self, spec: &StreamSpec) -> Result<()> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.note("update", &spec.name);
        Self::scripted(&self.update_err)
    }

    async fn delete(&self, name: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.note("delete", name);
        Self::scripted(&self.delete_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_defaults_succeed_with_absent_streams() {
        let client = MockStreamClient::new();
        client.connect().await.unwrap();
        assert!(!client.exists("a").await.unwrap());
        client.create(&StreamSpec::named("a")).await.unwrap();
        assert_eq!(client.connect_calls(), 1);
        assert_eq!(client.exists_calls(), 1);
        assert_eq!(client.create_calls(), 1);
        assert_eq!(client.calls(), vec!["exists a", "create a"]);
    }

    #[tokio::test]
    async fn test_scripted_errors() {
        let client = MockStreamClient::new()
            .with_existing_streams()
            .with_connect_error("bad connect")
            .with_delete_error("bad delete");
        assert!(client.exists("a").await.unwrap());
        assert!(client.connect().await.is_err());
        assert!(client.delete("a").await.is_err());
        assert_eq!(client.delete_calls(), 1);
    }
}
