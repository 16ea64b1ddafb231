//! Error types for execution persistence.
//!
//! Every operation reports failures through [`Error`]. The variants map onto
//! the categories callers act on:
//!
//! | Variant | Meaning | Caller action |
//! |---------|---------|---------------|
//! | `NotFound` | record absent | treat as missing |
//! | `PersistedTypeMismatch` | stored column has the wrong shape | surface as unavailable |
//! | `ShardOwnershipLost` | lease fencing failed | stop serving the shard |
//! | `CurrentWorkflowConflict` | current pointer not as expected | reload and retry |
//! | `WorkflowConflict` | execution record version moved | reload and retry |
//! | `Internal` | invalid request or invariant violation | fix the caller |
//! | `Store` | transport failure | retry with backoff |

use crate::state::{WorkflowExecutionState, WorkflowExecutionStatus};
use crate::types::{RunId, ShardId};
use chrono::{DateTime, Utc};
use execstore_storage::StoreError;
use std::fmt;
use thiserror::Error;

/// All execution-store errors.
#[derive(Debug, Error)]
pub enum Error {
    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// A stored column could not be decoded into its expected type
    #[error("{operation} operation failed. {mismatch}")]
    PersistedTypeMismatch {
        /// Operation that read the row
        operation: &'static str,
        /// What was wrong
        mismatch: Box<TypeMismatch>,
    },

    /// The shard lease moved to another owner
    #[error(
        "shard ownership lost: shard {shard_id}, expected range id {expected_range_id}, actual range id {}",
        fmt_range(.actual_range_id)
    )]
    ShardOwnershipLost {
        /// Shard
        shard_id: ShardId,
        /// Range id the caller holds
        expected_range_id: i64,
        /// Range id found on disk, `None` if the shard row is missing
        actual_range_id: Option<i64>,
    },

    /// The current-execution record did not match expectations
    #[error("{0}")]
    CurrentWorkflowConflict(Box<CurrentWorkflowConflict>),

    /// An execution record version did not match expectations
    #[error("{0}")]
    WorkflowConflict(Box<WorkflowConflict>),

    /// Invalid request or invariant violation
    #[error("internal error: {0}")]
    Internal(String),

    /// Payload encode or decode failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Failure reported by the store session
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

fn fmt_range(range: &Option<i64>) -> String {
    match range {
        Some(r) => r.to_string(),
        None => "<missing>".to_string(),
    }
}

/// Result type for execution-store operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Conflicts may succeed after reloading state; timeouts and transport
    /// failures may succeed on a plain retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::CurrentWorkflowConflict(_) | Error::WorkflowConflict(_) => true,
            Error::Store(e) => matches!(e, StoreError::Timeout | StoreError::Io(_)),
            _ => false,
        }
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::CurrentWorkflowConflict(_) | Error::WorkflowConflict(_)
        )
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if the stored data is unreadable.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::PersistedTypeMismatch { .. })
    }

    /// Check if the shard lease was lost.
    pub fn is_shard_ownership_lost(&self) -> bool {
        matches!(self, Error::ShardOwnershipLost { .. })
    }

    /// Wrap a type mismatch found while serving `operation`.
    pub fn type_mismatch(operation: &'static str, mismatch: TypeMismatch) -> Self {
        Error::PersistedTypeMismatch {
            operation,
            mismatch: Box::new(mismatch),
        }
    }
}

/// A column whose stored value had the wrong type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeMismatch {
    /// Column name
    pub column: String,
    /// Expected type name
    pub expected: &'static str,
    /// Rendering of the value found
    pub actual: String,
    /// Rendering of the whole row
    pub row: String,
}

impl fmt::Display for TypeMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Column '{}' is of unexpected type. Expected {}, got {}. Row: {}",
            self.column, self.expected, self.actual, self.row
        )
    }
}

/// Details of a current-execution mismatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentWorkflowConflict {
    /// Human-readable description
    pub message: String,
    /// Run the current record points at, `None` if there is no current record
    pub run_id: Option<RunId>,
    /// Request id that created that run
    pub create_request_id: String,
    /// Its lifecycle state
    pub state: WorkflowExecutionState,
    /// Its outcome
    pub status: WorkflowExecutionStatus,
    /// Its last write version
    pub last_write_version: i64,
    /// When it started
    pub start_time: Option<DateTime<Utc>>,
}

impl CurrentWorkflowConflict {
    /// Conflict raised when no current record exists
    pub fn missing(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            run_id: None,
            create_request_id: String::new(),
            state: WorkflowExecutionState::Unspecified,
            status: WorkflowExecutionStatus::Unspecified,
            last_write_version: 0,
            start_time: None,
        }
    }
}

impl fmt::Display for CurrentWorkflowConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Details of an execution-record mismatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowConflict {
    /// Shard
    pub shard_id: ShardId,
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run, `None` when no single run was identified
    pub run_id: Option<RunId>,
    /// Version the writer required on disk
    pub expected_db_record_version: Option<i64>,
    /// Version found on disk
    pub actual_db_record_version: Option<i64>,
    /// `next_event_id` the legacy writer required on disk
    pub expected_next_event_id: Option<i64>,
    /// `next_event_id` found on disk
    pub actual_next_event_id: Option<i64>,
}

impl WorkflowConflict {
    /// Conflict that could not be attributed to a record
    pub fn unattributed(
        shard_id: ShardId,
        namespace_id: impl Into<String>,
        workflow_id: impl Into<String>,
    ) -> Self {
        Self {
            shard_id,
            namespace_id: namespace_id.into(),
            workflow_id: workflow_id.into(),
            ..Default::default()
        }
    }
}

impl fmt::Display for WorkflowConflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "workflow execution conflict: shard {}, namespace {}, workflow {}",
            self.shard_id, self.namespace_id, self.workflow_id
        )?;
        if let Some(run_id) = &self.run_id {
            write!(f, ", run {}", run_id)?;
        }
        match (self.expected_db_record_version, self.actual_db_record_version) {
            (Some(expected), actual) => write!(
                f,
                ", expected record version {}, actual {}",
                expected,
                fmt_range(&actual)
            )?,
            (None, Some(actual)) if self.expected_next_event_id.is_none() => {
                write!(f, ", record already exists at version {}", actual)?
            }
            _ => {}
        }
        if let Some(expected) = self.expected_next_event_id {
            write!(
                f,
                ", expected next event id {}, actual {}",
                expected,
                fmt_range(&self.actual_next_event_id)
            )?;
        }
        Ok(())
    }
}
