//! Operation requests, responses and write modes
//!
//! Each mutating request names a shard and the lease (`range_id`) the caller
//! believes it holds. Every batch the engine builds for such a request is
//! fenced on that lease.
//!
//! ## Modes
//!
//! Modes decide how a write treats the current-execution record:
//!
//! | Operation | Mode | Current record |
//! |-----------|------|----------------|
//! | Create | `BrandNew` | inserted, must not exist |
//! | Create | `UpdateCurrent` | replaced, CAS on the previous completed run |
//! | Create | `BypassCurrent` | untouched |
//! | Update / ConflictResolve | `UpdateCurrent` | replaced, CAS on the current run |
//! | Update / ConflictResolve | `BypassCurrent` | untouched, target must not be current |
//!
//! Modes arriving as raw codes are parsed with `from_code`; an unknown code
//! is a programming error and fails with [`Error::Internal`].

use crate::error::{Error, Result};
use crate::state::{
    ExecutionState, ExecutionSummary, WorkflowExecutionState, WorkflowMutableState,
    WorkflowMutation, WorkflowSnapshot,
};
use crate::types::{RunId, ShardId};

/// How `CreateExecution` treats the current-execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CreateWorkflowMode {
    /// No current record may exist
    BrandNew,
    /// Replace the current record of a completed previous run
    UpdateCurrent,
    /// Leave the current record alone
    BypassCurrent,
}

impl CreateWorkflowMode {
    /// Wire code of the mode
    pub fn code(self) -> i32 {
        match self {
            CreateWorkflowMode::BrandNew => 0,
            CreateWorkflowMode::UpdateCurrent => 1,
            CreateWorkflowMode::BypassCurrent => 2,
        }
    }

    /// Parse a wire code
    ///
    /// # Errors
    ///
    /// `Internal` naming the code if it is not a known mode.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(CreateWorkflowMode::BrandNew),
            1 => Ok(CreateWorkflowMode::UpdateCurrent),
            2 => Ok(CreateWorkflowMode::BypassCurrent),
            other => Err(Error::Internal(format!(
                "CreateWorkflowExecution: unknown mode: {}",
                other
            ))),
        }
    }
}

/// How `UpdateExecution` treats the current-execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UpdateWorkflowMode {
    /// The updated run is current; keep the record pointing at it (or its
    /// continuation)
    UpdateCurrent,
    /// The updated run must not be current
    BypassCurrent,
}

impl UpdateWorkflowMode {
    /// Wire code of the mode
    pub fn code(self) -> i32 {
        match self {
            UpdateWorkflowMode::UpdateCurrent => 0,
            UpdateWorkflowMode::BypassCurrent => 1,
        }
    }

    /// Parse a wire code
    ///
    /// # Errors
    ///
    /// `Internal` naming the code if it is not a known mode.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(UpdateWorkflowMode::UpdateCurrent),
            1 => Ok(UpdateWorkflowMode::BypassCurrent),
            other => Err(Error::Internal(format!(
                "UpdateWorkflowExecution: unknown mode: {}",
                other
            ))),
        }
    }
}

/// How `ConflictResolve` treats the current-execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictResolveWorkflowMode {
    /// Point the current record at the reset (or new) run
    UpdateCurrent,
    /// The reset run must not be current
    BypassCurrent,
}

impl ConflictResolveWorkflowMode {
    /// Wire code of the mode
    pub fn code(self) -> i32 {
        match self {
            ConflictResolveWorkflowMode::UpdateCurrent => 0,
            ConflictResolveWorkflowMode::BypassCurrent => 1,
        }
    }

    /// Parse a wire code
    ///
    /// # Errors
    ///
    /// `Internal` naming the code if it is not a known mode.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(ConflictResolveWorkflowMode::UpdateCurrent),
            1 => Ok(ConflictResolveWorkflowMode::BypassCurrent),
            other => Err(Error::Internal(format!(
                "ConflictResolveWorkflowExecution: unknown mode: {}",
                other
            ))),
        }
    }
}

/// Expected version of the current-execution record
///
/// Together with a run id this forms the triple a current-record CAS can be
/// conditioned on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentVersion {
    /// Expected `workflow_last_write_version`
    pub last_write_version: i64,
    /// Expected `workflow_state`
    pub state: WorkflowExecutionState,
}

/// Create a run
#[derive(Debug, Clone)]
pub struct CreateExecutionRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Lease held by the caller
    pub range_id: i64,
    /// Current-record handling
    pub mode: CreateWorkflowMode,
    /// Previous current run, required for `UpdateCurrent`
    pub previous_run_id: Option<RunId>,
    /// Last write version of the previous current run
    pub previous_last_write_version: i64,
    /// The new run
    pub new_workflow: WorkflowSnapshot,
}

/// Read one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetExecutionRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run
    pub run_id: RunId,
}

/// Stored image of one run plus its record version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetExecutionResponse {
    /// Stored image
    pub state: WorkflowMutableState,
    /// Record version, `0` for rows written before versioning
    pub db_record_version: i64,
}

/// Apply a mutation to a run, optionally continuing it as a new run
#[derive(Debug, Clone)]
pub struct UpdateExecutionRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Lease held by the caller
    pub range_id: i64,
    /// Current-record handling
    pub mode: UpdateWorkflowMode,
    /// Delta for the updated run
    pub update_workflow: WorkflowMutation,
    /// Continuation run, created in the same batch
    pub new_workflow: Option<WorkflowSnapshot>,
    /// Expected current-record version when continuing as new; when set, the
    /// current-record CAS compares the full triple
    pub expected_current: Option<CurrentVersion>,
}

/// Reset a run, optionally mutating the current run and creating a new one
#[derive(Debug, Clone)]
pub struct ConflictResolveRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Lease held by the caller
    pub range_id: i64,
    /// Current-record handling
    pub mode: ConflictResolveWorkflowMode,
    /// Full replacement image of the reset run
    pub reset_workflow: WorkflowSnapshot,
    /// Run created in the same batch
    pub new_workflow: Option<WorkflowSnapshot>,
    /// Delta for the run that is current before the reset
    pub current_workflow: Option<WorkflowMutation>,
}

/// Overwrite a run wholesale
#[derive(Debug, Clone)]
pub struct SetExecutionRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Lease held by the caller
    pub range_id: i64,
    /// Full replacement image
    pub set_workflow: WorkflowSnapshot,
}

/// Delete one run's execution record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteExecutionRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run
    pub run_id: RunId,
}

/// Delete the current-execution record if it points at `run_id`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteCurrentExecutionRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run the record must point at
    pub run_id: RunId,
}

/// Read the current-execution record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCurrentExecutionRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
}

/// The current run of a workflow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetCurrentExecutionResponse {
    /// Current run
    pub run_id: RunId,
    /// Decoded execution state of the current run
    pub execution_state: ExecutionState,
    /// Last write version of the current run
    pub last_write_version: i64,
}

/// Page through every run on a shard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListExecutionsRequest {
    /// Shard
    pub shard_id: ShardId,
    /// Maximum runs per page
    pub page_size: usize,
    /// Token from the previous page; empty for the first page
    pub page_token: Vec<u8>,
}

/// One page of runs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListExecutionsResponse {
    /// Runs in storage order
    pub executions: Vec<ExecutionSummary>,
    /// Token for the next page; empty when exhausted
    pub next_page_token: Vec<u8>,
}
