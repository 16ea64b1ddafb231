//! Storage layer for execstore
//!
//! This crate is the contract with the partitioned wide-column store:
//! - CqlValue / Row: typed cells and rows
//! - Statement / Query / Batch: statements as values, never query strings
//! - Session: point reads, paged scans, single and batched conditional writes
//! - StoreError: rejected condition vs. missing row vs. transport failure
//! - MemorySession: in-process store with lightweight-transaction semantics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod session;
pub mod statement;
pub mod value;

pub use memory::{FaultTarget, MemorySession, SessionStats};
pub use session::{Deadline, Page, Paging, Session, StoreError, StoreResult};
pub use statement::{Assignment, Batch, Binding, Condition, Mutation, PrimaryKey, Query, Statement};
pub use value::{CqlValue, Row};
