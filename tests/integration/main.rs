// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Integration tests for the e2e harness
//!
//! These tests require a running Kubernetes cluster accessible via kubeconfig.
//! Tests are marked with #[ignore] and must be run explicitly:
//!
//! ```bash
//! cargo test --test integration -- --ignored --test-threads=1
//! ```
//!
//! The tests use your existing kubeconfig (~/.kube/config or KUBECONFIG env var),
//! optionally narrowed to one context with EVENTING_E2E_CLUSTER.

mod lifecycle;

use eventing_e2e_harness::{Harness, HarnessConfig, init_test_logging};

/// Connect a harness for one test
///
/// Each `#[tokio::test]` has its own runtime and a kube client is tied to the
/// runtime it was built on, so harnesses are not shared between tests.
pub async fn harness() -> Harness {
    init_test_logging();
    Harness::connect(HarnessConfig::from_env())
        .await
        .expect("Failed to connect to cluster")
}

/// A second client for assertions, independent of the harness's own calls
pub async fn client(harness: &Harness) -> kube::Client {
    eventing_e2e_harness::KubeClusterApi::connect(harness.config())
        .await
        .expect("Failed to create client")
        .client()
}
