//! # execstore
//!
//! Workflow-execution persistence over a partitioned wide-column store with
//! lightweight transactions.
//!
//! Every lifecycle operation (create, update, reset, set, delete) becomes a
//! single atomic conditional batch, fenced on the shard lease. When the store
//! rejects a batch, execstore re-reads what the batch assumed and reports
//! exactly which assumption broke.
//!
//! ## Quick Start
//!
//! ```ignore
//! use execstore::prelude::*;
//!
//! let store = ExecutionStore::builder()
//!     .config(StoreConfig::from_file("execstore.toml")?)
//!     .session(session)
//!     .build()?;
//!
//! store.create_execution(&request)?;
//! let current = store.get_current_execution(&GetCurrentExecutionRequest {
//!     shard_id: 1,
//!     namespace_id: "ns".into(),
//!     workflow_id: "wf".into(),
//! })?;
//! ```
//!
//! ## Errors
//!
//! | Error | Retry? |
//! |-------|--------|
//! | `CurrentWorkflowConflict`, `WorkflowConflict` | after reloading state |
//! | `Store(Timeout)`, `Store(Io)` | with backoff |
//! | `ShardOwnershipLost` | only after reacquiring the shard |
//! | `NotFound`, `PersistedTypeMismatch`, `Internal` | no |
//!
//! ## Crates
//!
//! - `execstore-core`: domain types, requests, errors
//! - `execstore-storage`: the store contract and an in-memory session
//! - `execstore-engine`: batch building, lease guard, diagnosis

#![warn(missing_docs)]

mod config;
mod error;
mod store;

pub mod logging;
pub mod prelude;

// Main entry points
pub use config::{LoggingConfig, StoreConfig};
pub use error::{ConfigError, Error, Result};
pub use store::{ExecutionStore, ExecutionStoreBuilder};

// Layers
pub use execstore_engine as engine;
pub use execstore_storage as storage;

// Domain types
pub use execstore_core::{
    ConflictResolveRequest, ConflictResolveWorkflowMode, CreateExecutionRequest,
    CreateWorkflowMode, CurrentVersion, CurrentWorkflowConflict, DataBlob,
    DeleteCurrentExecutionRequest, DeleteExecutionRequest, EncodingType, ExecutionState,
    ExecutionSummary, GetCurrentExecutionRequest, GetCurrentExecutionResponse,
    GetExecutionRequest, GetExecutionResponse, ListExecutionsRequest, ListExecutionsResponse,
    RunId, SetExecutionRequest, ShardId, TypeMismatch, UpdateExecutionRequest,
    UpdateWorkflowMode, WorkflowConflict, WorkflowExecutionState, WorkflowExecutionStatus,
    WorkflowKey, WorkflowMutableState, WorkflowMutation, WorkflowSnapshot,
};
pub use execstore_storage::{Deadline, MemorySession, Session, StoreError};
