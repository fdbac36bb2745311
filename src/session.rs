//! Test session
//!
//! A [`TestSession`] is one test's footprint on the cluster: the API handle,
//! the namespace it runs in, the objects it created and the cleanup hooks it
//! registered. Cloning yields another handle to the same session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::BoxFuture;
use kube::Resource;
use kube::api::ApiResource;
use serde::Serialize;
use tracing::info;

use crate::cluster::{ClusterApi, TrackedResource};
use crate::config::HarnessConfig;
use crate::error::{Error, Result};
use crate::interrupt::CleanupRegistration;
use crate::reporter::TestHandle;
use crate::tracker::ResourceTracker;

/// Further setup applied to a session after it is created
pub type SetupClientOption = Arc<dyn Fn(&TestSession) + Send + Sync>;

/// A [`SetupClientOption`] that does nothing
pub fn setup_client_option_noop() -> SetupClientOption {
    Arc::new(|_: &TestSession| {})
}

/// Caller-registered teardown action
pub type CleanupHook = Box<dyn FnOnce() -> BoxFuture<'static, Result<()>> + Send>;

pub(crate) struct SessionInner {
    pub(crate) api: Arc<dyn ClusterApi>,
    pub(crate) config: Arc<HarnessConfig>,
    pub(crate) namespace: String,
    pub(crate) reporter: TestHandle,
    tracker: Mutex<ResourceTracker>,
    cleanups: Mutex<Vec<CleanupHook>>,
    interrupt: Mutex<Option<CleanupRegistration>>,
    torn_down: AtomicBool,
}

/// Handle to one isolated test environment
#[derive(Clone)]
pub struct TestSession {
    pub(crate) inner: Arc<SessionInner>,
}

impl std::fmt::Debug for TestSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSession")
            .field("namespace", &self.inner.namespace)
            .field("test", &self.inner.reporter.name())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TestSession {
    pub fn new(
        api: Arc<dyn ClusterApi>,
        config: Arc<HarnessConfig>,
        namespace: impl Into<String>,
        reporter: TestHandle,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                api,
                config,
                namespace: namespace.into(),
                reporter,
                tracker: Mutex::new(ResourceTracker::new()),
                cleanups: Mutex::new(Vec::new()),
                interrupt: Mutex::new(None),
                torn_down: AtomicBool::new(false),
            }),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn api(&self) -> &Arc<dyn ClusterApi> {
        &self.inner.api
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.inner.config
    }

    /// Test-reporting handle of the test that owns this session
    pub fn reporter(&self) -> &TestHandle {
        &self.inner.reporter
    }

    /// Record an already-created object for deletion at teardown
    pub fn track(&self, resource: TrackedResource) {
        lock(&self.inner.tracker).add(resource);
    }

    /// Snapshot of the tracked objects, in creation order
    pub fn tracked_resources(&self) -> Vec<TrackedResource> {
        lock(&self.inner.tracker).resources().to_vec()
    }

    pub(crate) fn drain_tracker(&self) -> Vec<TrackedResource> {
        lock(&self.inner.tracker).drain()
    }

    /// Create a typed object and track it
    ///
    /// Namespaced kinds are created in `namespace` (defaulting to the session
    /// namespace); cluster-scoped kinds ignore it.
    pub async fn create_resource<K>(&self, object: &K, namespaced: bool) -> Result<()>
    where
        K: Resource<DynamicType = ()> + Serialize,
    {
        let name = object
            .meta()
            .name
            .clone()
            .ok_or_else(|| Error::ConfigError("object has no metadata.name".to_string()))?;
        let namespace = if namespaced {
            Some(
                object
                    .meta()
                    .namespace
                    .clone()
                    .unwrap_or_else(|| self.inner.namespace.clone()),
            )
        } else {
            None
        };

        let target = TrackedResource::new(ApiResource::erase::<K>(&()), namespace.as_deref(), &name);
        let body = serde_json::to_value(object)?;
        self.inner.api.create_object(&target, body).await?;

        info!(resource = %target, "Created resource");
        self.track(target);
        Ok(())
    }

    /// Register a teardown action
    pub fn add_cleanup<F>(&self, hook: F)
    where
        F: FnOnce() -> BoxFuture<'static, Result<()>> + Send + 'static,
    {
        lock(&self.inner.cleanups).push(Box::new(hook));
    }

    pub(crate) fn take_cleanups(&self) -> Vec<CleanupHook> {
        std::mem::take(&mut *lock(&self.inner.cleanups))
    }

    pub(crate) fn set_interrupt_registration(&self, registration: CleanupRegistration) {
        *lock(&self.inner.interrupt) = Some(registration);
    }

    pub(crate) fn take_interrupt_registration(&self) -> Option<CleanupRegistration> {
        lock(&self.inner.interrupt).take()
    }

    /// Latch the session as torn down; true only for the first caller
    pub(crate) fn begin_teardown(&self) -> bool {
        !self.inner.torn_down.swap(true, Ordering::SeqCst)
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }

    /// Run the teardown pipeline for this session
    ///
    /// Only the first call has any effect.
    pub async fn tear_down(&self) {
        crate::teardown::tear_down(self).await;
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<SessionInner> {
        Arc::downgrade(&self.inner)
    }

    pub(crate) fn from_inner(inner: Arc<SessionInner>) -> Self {
        Self { inner }
    }
}
