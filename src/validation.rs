//! Update validation for Stream resources
//!
//! Decides whether a transition between two observed versions of a Stream
//! should be reconciled.

use crate::crd::Stream;
use crate::error::{OperatorError, Result};

/// Outcome of a legal spec transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCheck {
    /// The spec changed and should be pushed to the server
    Proceed,
    /// Nothing in the spec changed; not an error
    NothingToUpdate,
}

/// Validate a transition from `prev` to `next`.
///
/// A resource being deleted always proceeds so the finalizer can run.
/// Renaming the stream is rejected with [`OperatorError::InvalidUpdate`];
/// the server cannot rename a stream in place.
pub fn validate_stream_update(prev: &Stream, next: &Stream) -> Result<UpdateCheck> {
    if next.metadata.deletion_timestamp.is_some() {
        return Ok(UpdateCheck::Proceed);
    }

    if prev.spec == next.spec {
        return Ok(UpdateCheck::NothingToUpdate);
    }

    if prev.spec.name != next.spec.name {
        return Err(OperatorError::InvalidUpdate(format!(
            "updating stream name from {:?} to {:?} is not allowed, please recreate",
            prev.spec.name, next.spec.name
        )));
    }

    Ok(UpdateCheck::Proceed)
}
