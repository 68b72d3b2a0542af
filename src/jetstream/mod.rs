//! Client capability for the JetStream server
//!
//! The controller only depends on [`StreamClient`]. [`HttpStreamClient`]
//! talks to a live server.

mod http;
#[cfg(test)]
mod mock;

pub use http::{HttpStreamClient, StreamConfig};
#[cfg(test)]
pub use mock::MockStreamClient;

use crate::crd::StreamSpec;
use crate::error::Result;

/// Operations the controller needs from the stream server.
///
/// Every operation must be safe to repeat: the controller may redeliver the
/// same request after a crash or a retry.
#[async_trait::async_trait]
pub trait StreamClient: Send + Sync {
    /// Establish or validate the session with the server.
    async fn connect(&self) -> Result<()>;

    /// Whether a stream with this name exists on the server.
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Create a stream from the spec.
    async fn create(&self, spec: &StreamSpec) -> Result<()>;

    /// Replace the configuration of an existing stream.
    async fn update(&self, spec: &StreamSpec) -> Result<()>;

    /// Delete a stream. A stream that is already gone is not an error.
    async fn delete(&self, name: &str) -> Result<()>;
}
