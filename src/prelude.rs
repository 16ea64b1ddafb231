//! Convenient imports for execstore.
//!
//! ```ignore
//! use execstore::prelude::*;
//!
//! let store = ExecutionStore::in_memory()?;
//! ```

// Main entry point
pub use crate::store::{ExecutionStore, ExecutionStoreBuilder};
pub use crate::config::{LoggingConfig, StoreConfig};

// Error handling
pub use crate::error::{Error, Result};

// Requests and modes
pub use execstore_core::{
    ConflictResolveRequest, ConflictResolveWorkflowMode, CreateExecutionRequest,
    CreateWorkflowMode, CurrentVersion, DeleteCurrentExecutionRequest, DeleteExecutionRequest,
    GetCurrentExecutionRequest, GetExecutionRequest, ListExecutionsRequest, SetExecutionRequest,
    UpdateExecutionRequest, UpdateWorkflowMode,
};

// State
pub use execstore_core::{
    DataBlob, EncodingType, ExecutionState, RunId, WorkflowExecutionState,
    WorkflowExecutionStatus, WorkflowMutation, WorkflowSnapshot,
};

// Store contract
pub use execstore_storage::{Deadline, Session};
