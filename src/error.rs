//! Error types for the test harness

use thiserror::Error;

/// Error variants are named with the `Error` suffix for clarity (e.g., `KubeError`, `TimeoutError`).
#[allow(clippy::enum_variant_names)]
#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to infer kube config: {0}")]
    InferConfigError(#[from] kube::config::InferConfigError),

    #[error("Failed to load kubeconfig: {0}")]
    KubeconfigError(#[from] kube::config::KubeconfigError),

    #[error("unable to find available namespace after {attempts} candidates")]
    NoAvailableNamespaceError { attempts: usize },

    #[error("The {name} ServiceAccount was not created for the Namespace: {namespace}")]
    ServiceAccountNotReadyError { namespace: String, name: String },

    #[error("error copying the secret into ns {namespace:?}: {source}")]
    PullSecretError {
        namespace: String,
        #[source]
        source: kube::Error,
    },

    #[error("Timed out waiting for {0}")]
    TimeoutError(String),

    #[error("Cleanup failed: {}", .0.join("; "))]
    CleanupError(Vec<String>),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),
}

impl Error {
    /// Check if this error wraps a 404 from the API server
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::KubeError(e) if is_not_found(e))
    }

    /// Check if this error wraps a 409 AlreadyExists from the API server
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::KubeError(e) if is_already_exists(e))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Check if a kube error is a NotFound status.
pub fn is_not_found(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 404)
}

/// Check if a kube error is an AlreadyExists status.
///
/// A 409 is also returned for optimistic-concurrency conflicts, so the reason
/// has to be checked as well.
pub fn is_already_exists(e: &kube::Error) -> bool {
    matches!(e, kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists")
}

#[cfg(test)]
pub(crate) fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} ({})", reason, code),
        reason: reason.to_string(),
        code,
    })
}
