//! Transactional engine for execstore
//!
//! This crate maps workflow lifecycle operations onto atomic conditional
//! batches and classifies rejected batches:
//! - schema: tables, columns, statement and query constructors
//! - mapper: typed row views, decode failures as type mismatches
//! - lease: shard lease guard appended to every mutating batch
//! - current: current-execution registry (one current run per workflow)
//! - batch: conditional batch builder, per operation mode
//! - diagnose: ordered read-only checks run after a rejection
//! - store: MutableStateStore, the operations callers use

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod batch;
pub mod current;
pub mod diagnose;
pub mod lease;
pub mod mapper;
pub mod schema;
pub mod store;

pub use batch::{BatchBuilder, RecordExpectation, RunExpectation, WriteBatch};
pub use current::{CurrentExpectation, CurrentRecord};
pub use diagnose::{diagnose, Diagnoser, Finding};
pub use store::{MutableStateStore, StoreOptions};
