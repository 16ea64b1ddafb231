//! Execution Store Integration Test Suite
//!
//! Drives `ExecutionStore` end to end against `MemorySession`, one module per
//! operation plus cross-cutting modules for conflict diagnosis and
//! concurrent writers.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test executions
//!
//! # Run the diagnosis tests only
//! cargo test --test executions diagnose::
//! ```

#[path = "../common/mod.rs"]
mod common;

pub use common::*;

// Test modules
pub mod concurrency;
pub mod config;
pub mod delete;
pub mod diagnose;
pub mod get;
pub mod list;
pub mod set;
