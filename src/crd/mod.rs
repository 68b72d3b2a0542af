//! Custom Resource Definitions for the JetStream Kubernetes Operator
//!
//! - Stream: a stream on the JetStream server

mod stream;

pub use stream::{Stream, StreamCondition, StreamSpec, StreamStatus};
