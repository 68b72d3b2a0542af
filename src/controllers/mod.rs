//! Controllers for the JetStream Kubernetes Operator
//!
//! The stream controller watches Stream resources and reconciles the
//! streams on the JetStream server with the desired state they declare.

mod stream;

pub use stream::{
    classify, enqueue_stream_work, split_key, stream_key, Context, ReconcileState,
    StreamController,
};
