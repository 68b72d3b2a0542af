//! Stream Custom Resource Definition
//!
//! Declares a stream that should exist on the JetStream server with the
//! given configuration.

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Stream is the Schema for the streams API
#[derive(CustomResource, Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "jetstream.nats.io",
    version = "v1beta2",
    kind = "Stream",
    namespaced,
    status = "StreamStatus",
    shortname = "str",
    printcolumn = r#"{"name":"Stream","type":"string","jsonPath":".spec.name"}"#,
    printcolumn = r#"{"name":"Subjects","type":"string","jsonPath":".spec.subjects"}"#,
    printcolumn = r#"{"name":"Ready","type":"string","jsonPath":".status.conditions[?(@.type==\"Ready\")].status"}"#,
    printcolumn = r#"{"name":"Age","type":"date","jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StreamSpec {
    /// Name of the stream on the server. Cannot be changed once created.
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: Option<String>,

    /// Subjects the stream consumes messages from
    #[serde(default)]
    pub subjects: Vec<String>,

    /// Message retention policy (limits, interest, workqueue)
    #[serde(default = "default_retention")]
    pub retention: String,

    /// Maximum number of consumers (-1 for unlimited)
    #[serde(default = "default_unlimited")]
    pub max_consumers: i64,

    /// Maximum number of messages (-1 for unlimited)
    #[serde(default = "default_unlimited")]
    pub max_msgs: i64,

    /// Maximum total size in bytes (-1 for unlimited)
    #[serde(default = "default_unlimited")]
    pub max_bytes: i64,

    /// Maximum message age as a duration string, e.g. `1h` (empty for unlimited)
    #[serde(default)]
    pub max_age: String,

    /// Maximum size of a single message in bytes (-1 for unlimited)
    #[serde(default = "default_unlimited")]
    pub max_msg_size: i64,

    /// Maximum messages per subject (-1 for unlimited)
    #[serde(default = "default_unlimited")]
    pub max_msgs_per_subject: i64,

    /// Storage backend (file, memory)
    #[serde(default = "default_storage")]
    pub storage: String,

    /// Number of replicas
    #[serde(default = "default_replicas")]
    pub replicas: i32,

    /// Disable acknowledgements for published messages
    #[serde(default)]
    pub no_ack: bool,

    /// Discard policy once limits are reached (old, new)
    #[serde(default = "default_discard")]
    pub discard: String,

    /// Window for duplicate message tracking, e.g. `2m`
    #[serde(default)]
    pub duplicate_window: String,
}

/// Status of the Stream
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamStatus {
    /// Generation of the spec last applied to the server
    #[serde(default)]
    pub observed_generation: Option<i64>,

    /// Name of the stream on the server as last created or updated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_name: Option<String>,

    /// Conditions representing stream state
    #[serde(default)]
    pub conditions: Vec<StreamCondition>,
}

/// Condition of the stream
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StreamCondition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last time the condition transitioned
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

fn default_retention() -> String {
    "limits".to_string()
}

fn default_storage() -> String {
    "file".to_string()
}

fn default_discard() -> String {
    "old".to_string()
}

fn default_unlimited() -> i64 {
    -1
}

fn default_replicas() -> i32 {
    1
}

impl StreamSpec {
    /// Spec with server defaults for everything but the stream name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            subjects: Vec::new(),
            retention: default_retention(),
            max_consumers: default_unlimited(),
            max_msgs: default_unlimited(),
            max_bytes: default_unlimited(),
            max_age: String::new(),
            max_msg_size: default_unlimited(),
            max_msgs_per_subject: default_unlimited(),
            storage: default_storage(),
            replicas: default_replicas(),
            no_ack: false,
            discard: default_discard(),
            duplicate_window: String::new(),
        }
    }
}
