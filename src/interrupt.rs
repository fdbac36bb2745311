//! Cleanup on interrupt
//!
//! One Ctrl+C listener per registry. Sessions register their teardown and
//! hold a [`CleanupRegistration`]; dropping it removes the callback. On
//! interrupt every remaining callback runs once, then the process exits.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use futures::future::BoxFuture;
use tracing::{error, info, warn};

/// Exit status used after an interrupt (128 + SIGINT)
pub const INTERRUPT_EXIT_CODE: i32 = 130;

type Callback = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

#[derive(Default)]
struct RegistryInner {
    next_id: AtomicU64,
    callbacks: Mutex<BTreeMap<u64, Callback>>,
    listener: OnceLock<()>,
}

/// Set of teardown callbacks to run if the process is interrupted
#[derive(Clone, Default)]
pub struct InterruptRegistry {
    inner: Arc<RegistryInner>,
}

impl InterruptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn callbacks(&self) -> MutexGuard<'_, BTreeMap<u64, Callback>> {
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a callback and make sure the signal listener is running
    pub fn register<F>(&self, callback: F) -> CleanupRegistration
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let registration = self.register_without_listener(callback);
        self.ensure_listener();
        registration
    }

    /// Register a callback without installing the signal handler
    pub fn register_without_listener<F>(&self, callback: F) -> CleanupRegistration
    where
        F: FnOnce() -> BoxFuture<'static, ()> + Send + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst);
        self.callbacks().insert(id, Box::new(callback));
        CleanupRegistration {
            registry: self.clone(),
            id,
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks().is_empty()
    }

    /// Run every registered callback once, in registration order
    pub async fn run_all(&self) {
        let callbacks = std::mem::take(&mut *self.callbacks());
        info!(count = callbacks.len(), "Running interrupt cleanup callbacks");
        for (_, callback) in callbacks {
            callback().await;
        }
    }

    /// Whether the Ctrl+C listener task has been started
    pub fn has_listener(&self) -> bool {
        self.inner.listener.get().is_some()
    }

    fn ensure_listener(&self) {
        if self.has_listener() {
            return;
        }
        // Without a runtime the latch stays open so a later registration
        // from inside one can still start the listener.
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, cleanup on interrupt is not active yet");
            return;
        };
        if self.inner.listener.set(()).is_err() {
            return;
        }

        let registry = self.clone();
        runtime.spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    warn!("Interrupted, cleaning up test resources");
                    registry.run_all().await;
                    std::process::exit(INTERRUPT_EXIT_CODE);
                }
                Err(e) => error!("Failed to install Ctrl+C handler: {}", e),
            }
        });
    }
}

/// Keeps a callback registered until dropped
pub struct CleanupRegistration {
    registry: InterruptRegistry,
    id: u64,
}

impl Drop for CleanupRegistration {
    fn drop(&mut self) {
        self.registry.callbacks().remove(&self.id);
    }
}
