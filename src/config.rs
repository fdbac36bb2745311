//! Harness configuration
//!
//! Process-wide settings for a test run. Values are read from the environment
//! once and then passed around explicitly.

use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the namespace base name
pub const NAMESPACE_ENV: &str = "EVENTING_E2E_NAMESPACE";
/// Environment variable enabling namespace reuse
pub const REUSE_NAMESPACE_ENV: &str = "EVENTING_E2E_REUSE_NAMESPACE";
/// Environment variable selecting the kubeconfig context
pub const CLUSTER_ENV: &str = "EVENTING_E2E_CLUSTER";

/// Default namespace base name
pub const DEFAULT_NAMESPACE_BASE: &str = "eventing-e2e";
/// Default artifacts root when `ARTIFACTS` is unset
pub const DEFAULT_ARTIFACTS_DIR: &str = "artifacts";

/// Number of namespace candidates tried before giving up
pub const MAX_NAMESPACE_SKIP: usize = 20;
/// Attempts made by the namespace create retry loop
pub const MAX_RETRIES: u32 = 5;
/// Sleep between namespace create attempts
pub const RETRY_SLEEP_DURATION: Duration = Duration::from_secs(2);

/// Bounded blind retry
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub attempts: u32,
    /// Fixed delay after each failed attempt
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: MAX_RETRIES,
            delay: RETRY_SLEEP_DURATION,
        }
    }
}

/// Fixed-interval polling with an overall timeout
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            timeout: Duration::from_secs(120),
        }
    }
}

/// Settings shared by every test in the process
#[derive(Clone, Debug)]
pub struct HarnessConfig {
    /// Prefix for generated namespace names
    pub namespace_base: String,
    /// Namespaces are pre-provisioned externally; never create or delete them
    pub reuse_namespace: bool,
    /// Explicit kubeconfig path; `None` infers the config
    pub kubeconfig: Option<PathBuf>,
    /// Kubeconfig context to use
    pub cluster: Option<String>,
    /// Running under continuous integration
    pub is_ci: bool,
    /// Root directory for CI artifacts
    pub artifacts_dir: PathBuf,
    /// Namespace create retry
    pub namespace_retry: RetryPolicy,
    /// Wait for the default ServiceAccount
    pub service_account_wait: PollPolicy,
    /// Wait for tracked objects to disappear on teardown
    pub deletion_wait: PollPolicy,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            namespace_base: DEFAULT_NAMESPACE_BASE.to_string(),
            reuse_namespace: false,
            kubeconfig: None,
            cluster: None,
            is_ci: false,
            artifacts_dir: PathBuf::from(DEFAULT_ARTIFACTS_DIR),
            namespace_retry: RetryPolicy::default(),
            service_account_wait: PollPolicy::default(),
            deletion_wait: PollPolicy::default(),
        }
    }
}

impl HarnessConfig {
    /// Build the configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        Self {
            namespace_base: non_empty(NAMESPACE_ENV)
                .unwrap_or_else(|| DEFAULT_NAMESPACE_BASE.to_string()),
            reuse_namespace: non_empty(REUSE_NAMESPACE_ENV)
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            // Only the first entry of a KUBECONFIG path list is honored
            kubeconfig: non_empty("KUBECONFIG").and_then(|v| std::env::split_paths(&v).next()),
            cluster: non_empty(CLUSTER_ENV),
            is_ci: lookup("CI").as_deref() == Some("true"),
            artifacts_dir: non_empty("ARTIFACTS")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_ARTIFACTS_DIR)),
            ..Default::default()
        }
    }

    pub fn with_namespace_base(mut self, base: impl Into<String>) -> Self {
        self.namespace_base = base.into();
        self
    }

    pub fn with_reuse_namespace(mut self, reuse: bool) -> Self {
        self.reuse_namespace = reuse;
        self
    }

    pub fn with_ci(mut self, is_ci: bool, artifacts_dir: impl Into<PathBuf>) -> Self {
        self.is_ci = is_ci;
        self.artifacts_dir = artifacts_dir.into();
        self
    }

    pub fn with_namespace_retry(mut self, policy: RetryPolicy) -> Self {
        self.namespace_retry = policy;
        self
    }

    pub fn with_service_account_wait(mut self, policy: PollPolicy) -> Self {
        self.service_account_wait = policy;
        self
    }

    pub fn with_deletion_wait(mut self, policy: PollPolicy) -> Self {
        self.deletion_wait = policy;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1")
}
