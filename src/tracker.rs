//! Resource tracker
//!
//! Records every object a test creates so teardown can delete them again,
//! newest first.

use tracing::{debug, warn};

use crate::cluster::{ClusterApi, TrackedResource};
use crate::config::PollPolicy;
use crate::error::{Error, Result};
use crate::wait::poll_immediate;

/// Append-only ledger of created objects
#[derive(Debug, Default)]
pub struct ResourceTracker {
    resources: Vec<TrackedResource>,
}

impl ResourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an object for deletion at teardown
    pub fn add(&mut self, resource: TrackedResource) {
        debug!(resource = %resource, "Tracking resource");
        self.resources.push(resource);
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Tracked objects in creation order
    pub fn resources(&self) -> &[TrackedResource] {
        &self.resources
    }

    /// Take every tracked object out of the tracker, leaving it empty
    pub fn drain(&mut self) -> Vec<TrackedResource> {
        std::mem::take(&mut self.resources)
    }
}

/// Delete the given objects in reverse creation order
///
/// Every object gets a delete call even if earlier ones failed. Objects that
/// are already gone are not an error. With `await_deletion`, waits for each
/// deleted object to disappear.
pub async fn clean(
    api: &dyn ClusterApi,
    resources: Vec<TrackedResource>,
    await_deletion: bool,
    wait: &PollPolicy,
) -> Result<()> {
    let mut failures = Vec::new();

    for resource in resources.into_iter().rev() {
        debug!(resource = %resource, "Deleting tracked resource");
        match api.delete_object(&resource).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => continue,
            Err(e) => {
                warn!(resource = %resource, error = %e, "Failed to delete tracked resource");
                failures.push(format!("deleting {}: {}", resource, e));
                continue;
            }
        }

        if await_deletion {
            let target = &resource;
            let gone = poll_immediate(wait, move || async move {
                matches!(api.object_exists(target).await, Ok(false))
            })
            .await;
            if gone.is_err() {
                warn!(resource = %resource, "Timed out waiting for tracked resource deletion");
                failures.push(format!("timed out waiting for {} to be deleted", resource));
            }
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(Error::CleanupError(failures))
    }
}
