//! Test-reporting handle
//!
//! A small tree of named test nodes. Each node records its log lines,
//! failure and skip state, and the sub-tests spawned from it. Log lines are
//! also emitted through `tracing` so they show up in the test output.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::FutureExt;
use tracing::{info, warn};

/// Final state of a test node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TestOutcome {
    Passed,
    Failed,
    Skipped(String),
}

#[derive(Default)]
struct NodeState {
    failed: bool,
    skipped: Option<String>,
    parallel: bool,
    logs: Vec<String>,
    children: Vec<TestHandle>,
}

struct TestNode {
    name: String,
    state: Mutex<NodeState>,
}

/// Handle to one test or sub-test
///
/// Cloning is cheap; all clones refer to the same node.
#[derive(Clone)]
pub struct TestHandle {
    node: Arc<TestNode>,
}

impl std::fmt::Debug for TestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHandle")
            .field("name", &self.node.name)
            .field("outcome", &self.outcome())
            .finish()
    }
}

impl TestHandle {
    /// Create a root test node
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node: Arc::new(TestNode {
                name: name.into(),
                state: Mutex::new(NodeState::default()),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, NodeState> {
        self.node.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Full name, `parent/child` for sub-tests
    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// Record a log line
    pub fn log(&self, message: impl Into<String>) {
        let message = message.into();
        info!(test = %self.node.name, "{}", message);
        self.state().logs.push(message);
    }

    /// Mark the test failed without logging
    pub fn fail(&self) {
        self.state().failed = true;
    }

    /// Log a message and mark the test failed
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        warn!(test = %self.node.name, "{}", message);
        let mut state = self.state();
        state.logs.push(message);
        state.failed = true;
    }

    /// Same as [`TestHandle::error`]; the caller is expected to stop the test
    pub fn fatal(&self, message: impl Into<String>) {
        self.error(message);
    }

    pub fn failed(&self) -> bool {
        self.state().failed
    }

    /// Mark the test skipped; the caller is expected to return afterwards
    pub fn skip(&self, reason: impl Into<String>) {
        let reason = reason.into();
        info!(test = %self.node.name, "SKIP: {}", reason);
        let mut state = self.state();
        state.logs.push(reason.clone());
        state.skipped = Some(reason);
    }

    pub fn skipped(&self) -> Option<String> {
        self.state().skipped.clone()
    }

    /// Mark the test as eligible to run in parallel with its siblings
    pub fn parallel(&self) {
        self.state().parallel = true;
    }

    pub fn is_parallel(&self) -> bool {
        self.state().parallel
    }

    pub fn outcome(&self) -> TestOutcome {
        let state = self.state();
        if state.failed {
            TestOutcome::Failed
        } else if let Some(reason) = &state.skipped {
            TestOutcome::Skipped(reason.clone())
        } else {
            TestOutcome::Passed
        }
    }

    /// Snapshot of the recorded log lines
    pub fn logs(&self) -> Vec<String> {
        self.state().logs.clone()
    }

    /// Sub-tests spawned from this node, in spawn order
    pub fn subtests(&self) -> Vec<TestHandle> {
        self.state().children.clone()
    }

    /// Run `f` as a named sub-test and wait for it
    ///
    /// A panic inside the sub-test marks it failed. A failed sub-test fails
    /// its parent. Returns whether the sub-test did not fail.
    pub async fn run<F, Fut>(&self, name: &str, f: F) -> bool
    where
        F: FnOnce(TestHandle) -> Fut,
        Fut: Future<Output = ()>,
    {
        let child = TestHandle::new(format!("{}/{}", self.node.name, name));
        self.state().children.push(child.clone());

        if let Err(panic) = AssertUnwindSafe(f(child.clone())).catch_unwind().await {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic".to_string());
            child.error(format!("test panicked: {}", message));
        }

        let passed = !child.failed();
        if !passed {
            self.fail();
        }
        passed
    }
}
