//! Kubernetes-standard status condition helpers
//!
//! Provides constants and builder functions for managing Stream status
//! conditions following the Kubernetes API conventions.

use crate::crd::StreamCondition;
use chrono::Utc;

// Condition status values
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";
pub const CONDITION_UNKNOWN: &str = "Unknown";

// Stream condition types
pub const STREAM_CONDITION_READY: &str = "Ready";

/// Finalizer guarding removal of the stream from the server
pub const STREAM_FINALIZER: &str = "jetstream.nats.io/stream-cleanup";

/// Build a condition with the current timestamp.
pub fn build_condition(
    condition_type: &str,
    status: &str,
    reason: &str,
    message: &str,
) -> StreamCondition {
    StreamCondition {
        r#type: condition_type.to_string(),
        status: status.to_string(),
        last_transition_time: Some(Utc::now().to_rfc3339()),
        reason: Some(reason.to_string()),
        message: Some(message.to_string()),
    }
}

/// Set or update a condition in a list, preserving lastTransitionTime when status hasn't changed.
pub fn set_condition(conditions: &mut Vec<StreamCondition>, new: StreamCondition) {
    if let Some(existing) = conditions.iter_mut().find(|c| c.r#type == new.r#type) {
        if existing.status != new.status {
            *existing = new;
        } else {
            existing.reason = new.reason;
            existing.message = new.message;
        }
    } else {
        conditions.push(new);
    }
}

/// Look up a condition by type.
pub fn find_condition<'a>(
    conditions: &'a [StreamCondition],
    condition_type: &str,
) -> Option<&'a StreamCondition> {
    conditions.iter().find(|c| c.r#type == condition_type)
}
