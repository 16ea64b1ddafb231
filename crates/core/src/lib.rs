//! Core types for execstore
//!
//! This crate defines the domain shared by every layer:
//! - RunId / WorkflowKey / ShardId: identifiers
//! - DataBlob / EncodingType: self-describing payloads
//! - ExecutionState, WorkflowSnapshot, WorkflowMutation: mutable state
//! - Requests, responses and write modes for each operation
//! - Error: the failure taxonomy callers classify on

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod blob;
pub mod error;
pub mod request;
pub mod state;
pub mod types;

pub use blob::{DataBlob, EncodingType};
pub use error::{CurrentWorkflowConflict, Error, Result, TypeMismatch, WorkflowConflict};
pub use request::{
    ConflictResolveRequest, ConflictResolveWorkflowMode, CreateExecutionRequest,
    CreateWorkflowMode, CurrentVersion, DeleteCurrentExecutionRequest, DeleteExecutionRequest,
    GetCurrentExecutionRequest, GetCurrentExecutionResponse, GetExecutionRequest,
    GetExecutionResponse, ListExecutionsRequest, ListExecutionsResponse, SetExecutionRequest,
    UpdateExecutionRequest, UpdateWorkflowMode,
};
pub use state::{
    ExecutionState, ExecutionSummary, WorkflowExecutionState, WorkflowExecutionStatus,
    WorkflowMutableState, WorkflowMutation, WorkflowSnapshot,
};
pub use types::{RunId, ShardId, WorkflowKey};
