//! JetStream Kubernetes Operator
//!
//! A Kubernetes operator that keeps streams on a JetStream server in sync
//! with declarative `Stream` resources.
//!
//! ## Custom Resources
//!
//! - `Stream`: a stream on the server, removed again when the resource is
//!   deleted (guarded by a finalizer)
//!
//! ## Example
//!
//! ```yaml
//! apiVersion: jetstream.nats.io/v1beta2
//! kind: Stream
//! metadata:
//!   name: orders
//! spec:
//!   name: orders
//!   subjects: ["orders.*"]
//!   maxAge: 1h
//! ```

pub mod conditions;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod events;
pub mod jetstream;
pub mod queue;
pub mod store;
#[cfg(test)]
pub(crate) mod testing;
pub mod validation;
pub mod writer;

pub use config::{OperatorConfig, MAX_RETRIES};
pub use controllers::{Context, StreamController};
pub use crd::{Stream, StreamCondition, StreamSpec, StreamStatus};
pub use error::{OperatorError, Result};
