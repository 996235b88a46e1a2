//! Integration test suite for selfup
//!
//! End-to-end tests that run full updates against a local HTTP release
//! server and drive the `selfup` binary.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **self_update**: Orchestrated updates against a mocked release server
//! - **cli**: The `selfup` binary, exit status, and user-facing messages

#[path = "../fixtures/mod.rs"]
mod fixtures;

mod cli;
mod self_update;
