//! Workflow mutable state
//!
//! This module defines the shapes handed to and returned from the
//! persistence layer:
//! - [`ExecutionState`]: lifecycle summary of one run
//! - [`WorkflowSnapshot`]: a complete mutable-state image (create, reset, set)
//! - [`WorkflowMutation`]: a delta against the stored image (update)
//! - [`WorkflowMutableState`]: what a point read returns
//! - [`ExecutionSummary`]: what a shard listing returns
//!
//! ## Record versions
//!
//! `db_record_version` is the optimistic-concurrency token of an execution
//! record. A write carrying version `v` is conditioned on the stored version
//! being `v - 1`. A version of `0` selects the legacy strategy, which
//! conditions on `next_event_id == condition` instead.

use crate::blob::{DataBlob, EncodingType};
use crate::error::Result;
use crate::types::{RunId, WorkflowKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Lifecycle state of a run, as stored in the current-execution record
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowExecutionState {
    /// Not set
    #[default]
    Unspecified,
    /// Created, first task not yet scheduled
    Created,
    /// Running
    Running,
    /// Closed
    Completed,
    /// Exists but is not current (replication)
    Zombie,
    /// Tombstoned
    Void,
    /// Unusable
    Corrupted,
}

impl WorkflowExecutionState {
    /// Stored integer code
    pub fn code(self) -> i32 {
        match self {
            WorkflowExecutionState::Unspecified => 0,
            WorkflowExecutionState::Created => 1,
            WorkflowExecutionState::Running => 2,
            WorkflowExecutionState::Completed => 3,
            WorkflowExecutionState::Zombie => 4,
            WorkflowExecutionState::Void => 5,
            WorkflowExecutionState::Corrupted => 6,
        }
    }

    /// Parse a stored integer code
    pub fn from_code(code: i32) -> Option<Self> {
        Some(match code {
            0 => WorkflowExecutionState::Unspecified,
            1 => WorkflowExecutionState::Created,
            2 => WorkflowExecutionState::Running,
            3 => WorkflowExecutionState::Completed,
            4 => WorkflowExecutionState::Zombie,
            5 => WorkflowExecutionState::Void,
            6 => WorkflowExecutionState::Corrupted,
            _ => return None,
        })
    }
}

/// Externally visible outcome of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkflowExecutionStatus {
    /// Not set
    #[default]
    Unspecified,
    /// Still running
    Running,
    /// Completed successfully
    Completed,
    /// Failed
    Failed,
    /// Canceled
    Canceled,
    /// Terminated
    Terminated,
    /// Closed by continuing as a new run
    ContinuedAsNew,
    /// Timed out
    TimedOut,
}

/// Lifecycle summary of one run
///
/// Persisted as a blob in both the execution record and the
/// current-execution record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionState {
    /// Request id that created the run
    pub create_request_id: String,
    /// The run
    pub run_id: RunId,
    /// Lifecycle state
    pub state: WorkflowExecutionState,
    /// Outcome
    pub status: WorkflowExecutionStatus,
    /// When the run started
    pub start_time: Option<DateTime<Utc>>,
}

impl ExecutionState {
    /// Encode for storage
    pub fn to_blob(&self, encoding: EncodingType) -> Result<DataBlob> {
        DataBlob::encode(self, encoding)
    }

    /// Decode a stored blob
    pub fn from_blob(blob: &DataBlob) -> Result<Self> {
        blob.decode()
    }
}

/// Complete mutable-state image of one run
///
/// Used to create a run, to reset one, and to overwrite one wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowSnapshot {
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run id
    pub run_id: RunId,

    /// Encoded execution info
    pub execution_info: DataBlob,
    /// Decoded execution state, used for the current-execution record
    pub execution_state: ExecutionState,
    /// Encoded execution state
    pub execution_state_blob: DataBlob,
    /// Next history event id
    pub next_event_id: i64,
    /// Failover version of the last write
    pub last_write_version: i64,
    /// Version this snapshot will be stored at
    pub db_record_version: i64,
    /// Expected stored `next_event_id`, legacy strategy only
    pub condition: i64,

    /// Activity infos by schedule id
    pub activity_infos: BTreeMap<i64, DataBlob>,
    /// Timer infos by timer id
    pub timer_infos: BTreeMap<String, DataBlob>,
    /// Child execution infos by initiated id
    pub child_execution_infos: BTreeMap<i64, DataBlob>,
    /// Request-cancel infos by initiated id
    pub request_cancel_infos: BTreeMap<i64, DataBlob>,
    /// Signal infos by initiated id
    pub signal_infos: BTreeMap<i64, DataBlob>,
    /// Ids of signals already requested
    pub signal_requested_ids: BTreeSet<String>,

    /// Checksum over the mutable state
    pub checksum: DataBlob,
}

impl WorkflowSnapshot {
    /// Namespace and workflow id
    pub fn workflow_key(&self) -> WorkflowKey {
        WorkflowKey::new(self.namespace_id.clone(), self.workflow_id.clone())
    }
}

/// Delta against the stored image of one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowMutation {
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run id
    pub run_id: RunId,

    /// Encoded execution info, replaces the stored one
    pub execution_info: DataBlob,
    /// Decoded execution state
    pub execution_state: ExecutionState,
    /// Encoded execution state
    pub execution_state_blob: DataBlob,
    /// Next history event id
    pub next_event_id: i64,
    /// Failover version of the last write
    pub last_write_version: i64,
    /// Version this mutation will be stored at
    pub db_record_version: i64,
    /// Expected stored `next_event_id`, legacy strategy only
    pub condition: i64,

    /// Activity infos to upsert
    pub upsert_activity_infos: BTreeMap<i64, DataBlob>,
    /// Activity infos to delete
    pub delete_activity_infos: BTreeSet<i64>,
    /// Timer infos to upsert
    pub upsert_timer_infos: BTreeMap<String, DataBlob>,
    /// Timer infos to delete
    pub delete_timer_infos: BTreeSet<String>,
    /// Child execution infos to upsert
    pub upsert_child_execution_infos: BTreeMap<i64, DataBlob>,
    /// Child execution infos to delete
    pub delete_child_execution_infos: BTreeSet<i64>,
    /// Request-cancel infos to upsert
    pub upsert_request_cancel_infos: BTreeMap<i64, DataBlob>,
    /// Request-cancel infos to delete
    pub delete_request_cancel_infos: BTreeSet<i64>,
    /// Signal infos to upsert
    pub upsert_signal_infos: BTreeMap<i64, DataBlob>,
    /// Signal infos to delete
    pub delete_signal_infos: BTreeSet<i64>,
    /// Signal-requested ids to add
    pub upsert_signal_requested_ids: BTreeSet<String>,
    /// Signal-requested ids to remove
    pub delete_signal_requested_ids: BTreeSet<String>,

    /// Clear buffered events before appending
    pub clear_buffered_events: bool,
    /// Event batch to append to the buffered events
    pub new_buffered_events: Option<DataBlob>,

    /// Checksum over the mutable state
    pub checksum: DataBlob,
}

impl WorkflowMutation {
    /// Namespace and workflow id
    pub fn workflow_key(&self) -> WorkflowKey {
        WorkflowKey::new(self.namespace_id.clone(), self.workflow_id.clone())
    }
}

/// Stored image of one run, as returned by a point read
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkflowMutableState {
    /// Encoded execution info
    pub execution_info: DataBlob,
    /// Encoded execution state
    pub execution_state: DataBlob,
    /// Next history event id
    pub next_event_id: i64,
    /// Activity infos by schedule id
    pub activity_infos: BTreeMap<i64, DataBlob>,
    /// Timer infos by timer id
    pub timer_infos: BTreeMap<String, DataBlob>,
    /// Child execution infos by initiated id
    pub child_execution_infos: BTreeMap<i64, DataBlob>,
    /// Request-cancel infos by initiated id
    pub request_cancel_infos: BTreeMap<i64, DataBlob>,
    /// Signal infos by initiated id
    pub signal_infos: BTreeMap<i64, DataBlob>,
    /// Ids of signals already requested
    pub signal_requested_ids: BTreeSet<String>,
    /// Buffered event batches, oldest first
    pub buffered_events: Vec<DataBlob>,
    /// Checksum over the mutable state
    pub checksum: DataBlob,
}

/// One run as returned by a shard listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionSummary {
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run id
    pub run_id: RunId,
    /// Encoded execution info
    pub execution_info: DataBlob,
    /// Encoded execution state
    pub execution_state: DataBlob,
    /// Next history event id
    pub next_event_id: i64,
}
