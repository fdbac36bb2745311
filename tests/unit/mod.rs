// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic,
    clippy::string_slice
)]

//! Unit tests for the e2e harness
//!
//! These run against an in-memory cluster and cover:
//! - Namespace allocation and session creation
//! - The setup pipeline and teardown pipeline end to end
//! - Interrupt-driven cleanup
//! - The component capability matrix

#[path = "../common/mod.rs"]
mod common;

mod runner;
