//! Error types for the JetStream Kubernetes Operator

use thiserror::Error;

/// Result type alias for operator operations
pub type Result<T> = std::result::Result<T, OperatorError>;

/// Errors that can occur during operator operations
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    KubeApi(String),

    /// Optimistic concurrency failure on a resource write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Stream server rejected or failed an operation
    #[error("Stream client error: {0}")]
    StreamClient(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Work item key is not of the form `<namespace>/<name>`
    #[error("Invalid work item key: {0}")]
    InvalidKey(String),

    /// Spec transition that cannot be applied in place
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),

    /// Invalid resource state
    #[error("Invalid state: {0}")]
    InvalidState(String),
}

impl OperatorError {
    /// Whether the executor should requeue the work item after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            OperatorError::InvalidKey(_)
                | OperatorError::InvalidUpdate(_)
                | OperatorError::Configuration(_)
        )
    }
}

impl From<kube::Error> for OperatorError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == 409 => OperatorError::Conflict(ae.message),
            other => OperatorError::KubeApi(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for OperatorError {
    fn from(err: reqwest::Error) -> Self {
        OperatorError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        OperatorError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::error::ErrorResponse;

    #[test]
    fn test_error_display() {
        let err = OperatorError::KubeApi("test error".to_string());
        assert!(err.to_string().contains("Kubernetes API error"));

        let err = OperatorError::InvalidKey("a/b/c".to_string());
        assert_eq!(err.to_string(), "Invalid work item key: a/b/c");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(OperatorError::KubeApi("api".to_string()).is_retryable());
        assert!(OperatorError::Conflict("stale".to_string()).is_retryable());
        assert!(OperatorError::StreamClient("down".to_string()).is_retryable());
        assert!(OperatorError::Http("timeout".to_string()).is_retryable());

        assert!(!OperatorError::InvalidKey("x".to_string()).is_retryable());
        assert!(!OperatorError::InvalidUpdate("rename".to_string()).is_retryable());
        assert!(!OperatorError::Configuration("bad".to_string()).is_retryable());
    }

    #[test]
    fn test_kube_conflict_maps_to_conflict() {
        let err: OperatorError = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "the object has been modified".to_string(),
            reason: "Conflict".to_string(),
            code: 409,
        })
        .into();
        assert!(matches!(err, OperatorError::Conflict(_)));

        let err: OperatorError = kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "boom".to_string(),
            reason: "InternalError".to_string(),
            code: 500,
        })
        .into();
        assert!(matches!(err, OperatorError::KubeApi(_)));
    }
}
