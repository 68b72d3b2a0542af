//! Persistence of Stream finalizers and status.

use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams};
use kube::{Client, ResourceExt};
use tracing::debug;

use crate::crd::Stream;
use crate::error::{OperatorError, Result};

/// Writes a reconciled Stream back to the API.
///
/// One call persists both the finalizer list and the status of the given
/// object. Writes carry the object's `resourceVersion`; a stale version
/// fails with [`OperatorError::Conflict`].
#[async_trait]
pub trait StreamWriter: Send + Sync {
    async fn update(&self, stream: &Stream) -> Result<Stream>;
}

/// Writer backed by the Kubernetes API.
pub struct KubeStreamWriter {
    client: Client,
}

impl KubeStreamWriter {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StreamWriter for KubeStreamWriter {
    async fn update(&self, stream: &Stream) -> Result<Stream> {
        let name = stream.name_any();
        let namespace = stream
            .namespace()
            .ok_or_else(|| OperatorError::InvalidState(format!("stream {name} has no namespace")))?;
        let streams: Api<Stream> = Api::namespaced(self.client.clone(), &namespace);

        // Finalizers before status; status is a separate subresource.
        let meta_patch = serde_json::json!({
            "metadata": {
                "resourceVersion": stream.resource_version(),
                "finalizers": stream.finalizers(),
            }
        });
        let patched = streams
            .patch(&name, &PatchParams::default(), &Patch::Merge(&meta_patch))
            .await?;

        // The object may already be gone once its last finalizer is removed.
        if stream.metadata.deletion_timestamp.is_some() {
            debug!(stream = %name, "finalizers persisted for deleting stream");
            return Ok(patched);
        }

        let status_patch = serde_json::json!({
            "metadata": { "resourceVersion": patched.resource_version() },
            "status": stream.status,
        });
        let updated = streams
            .patch_status(&name, &PatchParams::default(), &Patch::Merge(&status_patch))
            .await?;

        debug!(stream = %name, "finalizers and status persisted");
        Ok(updated)
    }
}
