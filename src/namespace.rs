//! Test namespace allocation
//!
//! Namespace names are `{base}{n}` where `n` comes from a counter shared by
//! every test in the process. Names can collide with leftovers from earlier
//! runs, so allocation skips candidates that already exist.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::cluster::ClusterApi;
use crate::config::{HarnessConfig, MAX_NAMESPACE_SKIP, RetryPolicy};
use crate::error::{Error, Result};
use crate::reporter::TestHandle;
use crate::session::TestSession;

/// Hands out unique namespace names
#[derive(Debug)]
pub struct NamespaceAllocator {
    base: String,
    counter: Mutex<u64>,
}

impl NamespaceAllocator {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            counter: Mutex::new(0),
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(config.namespace_base.clone())
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// Return the current counter value and advance it
    pub fn next_namespace_id(&self) -> u64 {
        let mut counter = self.counter.lock().unwrap_or_else(PoisonError::into_inner);
        let current = *counter;
        *counter += 1;
        current
    }

    /// Return the next unique namespace name
    pub fn next_namespace(&self) -> String {
        format!("{}{}", self.base, self.next_namespace_id())
    }
}

/// Create a namespace, retrying any failure
///
/// Makes up to `policy.attempts` create calls with a fixed sleep after each
/// failure and returns the last error if none succeeds. Errors are not
/// classified here, so AlreadyExists is retried like anything else.
pub async fn create_namespace_with_retry(
    api: &dyn ClusterApi,
    namespace: &str,
    policy: &RetryPolicy,
) -> Result<()> {
    let mut last_error = None;

    for attempt in 1..=policy.attempts {
        match api.create_namespace(namespace).await {
            Ok(()) => {
                info!(namespace = %namespace, attempt, "Created test namespace");
                return Ok(());
            }
            Err(e) => {
                debug!(namespace = %namespace, attempt, error = %e, "Namespace create failed");
                last_error = Some(e);
                tokio::time::sleep(policy.delay).await;
            }
        }
    }

    Err(last_error.unwrap_or_else(|| {
        Error::ConfigError("namespace retry policy allows no attempts".to_string())
    }))
}

/// Allocate a namespace and build a session bound to it
///
/// In reuse mode the first candidate is accepted as-is. Otherwise candidates
/// that already exist are skipped; any other create failure aborts.
pub async fn create_namespaced_session(
    api: Arc<dyn ClusterApi>,
    config: Arc<HarnessConfig>,
    allocator: &NamespaceAllocator,
    reporter: TestHandle,
) -> Result<TestSession> {
    for _ in 0..MAX_NAMESPACE_SKIP {
        let namespace = allocator.next_namespace();
        let session = TestSession::new(api.clone(), config.clone(), namespace.clone(), reporter.clone());

        if config.reuse_namespace {
            info!(namespace = %namespace, "Reusing existing namespace");
            return Ok(session);
        }

        match create_namespace_with_retry(api.as_ref(), &namespace, &config.namespace_retry).await {
            Ok(()) => return Ok(session),
            Err(e) if e.is_already_exists() => {
                warn!(namespace = %namespace, "Namespace already exists, trying the next one");
                continue;
            }
            Err(e) => return Err(e),
        }
    }

    Err(Error::NoAvailableNamespaceError {
        attempts: MAX_NAMESPACE_SKIP,
    })
}

/// Delete the session's namespace
///
/// Probes first: a namespace that is already gone, or whose state cannot be
/// read, is reported back without a delete call.
pub async fn delete_namespace(session: &TestSession) -> Result<()> {
    let api = session.api();
    let namespace = session.namespace();

    api.get_namespace(namespace).await?;

    debug!(namespace = %namespace, "Deleting test namespace");
    api.delete_namespace(namespace).await
}
