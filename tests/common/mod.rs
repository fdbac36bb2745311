// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]
#![allow(dead_code)]

//! Common test utilities shared across test targets
//!
//! Include this module in your test file:
//! ```rust,ignore
//! #[path = "../common/mod.rs"]
//! mod common;
//! use common::*;
//! ```


pub use fake_cluster::*;

use std::time::Duration;

use eventing_e2e_harness::{HarnessConfig, PollPolicy, RetryPolicy};

/// Config with short waits so unit tests finish quickly in real time
pub fn fast_config() -> HarnessConfig {
    let poll = PollPolicy {
        interval: Duration::from_millis(1),
        timeout: Duration::from_millis(50),
    };
    HarnessConfig::default()
        .with_namespace_retry(RetryPolicy {
            attempts: 2,
            delay: Duration::from_millis(1),
        })
        .with_service_account_wait(poll.clone())
        .with_deletion_wait(poll)
}

/// Build a 4xx/5xx API error the way the API server reports it
pub fn api_error(code: u16, reason: &str) -> kube::Error {
    kube::Error::Api(kube::error::ErrorResponse {
        status: "Failure".to_string(),
        message: format!("{} ({})", reason, code),
        reason: reason.to_string(),
        code,
    })
}
