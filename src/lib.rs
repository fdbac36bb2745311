//! End-to-end test harness for eventing components on Kubernetes
//!
//! A [`Harness`] hands each test a [`TestSession`] bound to a freshly
//! created namespace, tracks what the test creates, and tears it all down
//! afterwards (also on Ctrl+C). [`ComponentsTestRunner`] fans one test out
//! across every component implementation that supports a feature.

pub mod ci;
pub mod cluster;
pub mod config;
pub mod error;
pub mod events;
pub mod interrupt;
pub mod logs;
pub mod namespace;
pub mod rbac;
pub mod reporter;
pub mod runner;
pub mod session;
pub mod setup;
pub mod teardown;
pub mod telemetry;
pub mod tracker;
pub mod wait;

pub use cluster::{ClusterApi, KubeClusterApi, TrackedResource};
pub use config::{HarnessConfig, PollPolicy, RetryPolicy};
pub use error::{Error, Result};
pub use interrupt::{CleanupRegistration, InterruptRegistry};
pub use namespace::{NamespaceAllocator, create_namespaced_session, delete_namespace};
pub use reporter::{TestHandle, TestOutcome};
pub use runner::{Capability, ComponentRef, ComponentsTestRunner, Feature};
pub use session::{CleanupHook, SetupClientOption, TestSession, setup_client_option_noop};
pub use setup::Harness;
pub use teardown::tear_down;
pub use telemetry::init_test_logging;
