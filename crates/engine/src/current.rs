//! Current-execution registry
//!
//! At most one run per (shard, namespace, workflow id) is current. The
//! registry has a read path of its own, but writes exist only as statements
//! the batch builder places next to the execution-record writes they guard.
//!
//! A [`CurrentExpectation`] describes what a write assumes about the stored
//! record. The same value produces the write's condition and, if the batch
//! is rejected, the check that tells whether this was the predicate that
//! failed.

use crate::mapper::CurrentExecutionRow;
use crate::schema::{self, col, CURRENT_EXECUTIONS};
use chrono::{DateTime, Utc};
use execstore_core::{
    CurrentWorkflowConflict, DataBlob, Error, Result, RunId, ShardId, WorkflowExecutionState,
};
use execstore_storage::{Deadline, Session, Statement, StoreError};

/// What a write assumes about the stored current-execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrentExpectation {
    /// No record exists
    Absent,
    /// The record points at this run
    Run(RunId),
    /// The record points at this run with this version and state
    Version {
        /// Expected current run
        run_id: RunId,
        /// Expected last write version
        last_write_version: i64,
        /// Expected lifecycle state
        state: WorkflowExecutionState,
    },
}

impl CurrentExpectation {
    /// Compare the expectation with what is stored
    ///
    /// # Errors
    ///
    /// `CurrentWorkflowConflict` carrying the stored values when they differ.
    /// A missing record under a run or version expectation reports no run id.
    pub fn check(&self, stored: Option<CurrentExecutionRow>) -> Result<()> {
        let conflict = match (self, stored) {
            (CurrentExpectation::Absent, None) => return Ok(()),
            (CurrentExpectation::Absent, Some(row)) => {
                let message = format!("Workflow execution already running. RunId: {}", row.run_id);
                row.into_conflict(message)
            }
            (_, None) => CurrentWorkflowConflict::missing("Current workflow execution not found"),
            (CurrentExpectation::Run(run_id), Some(row)) => {
                if row.run_id == *run_id {
                    return Ok(());
                }
                let message = format!(
                    "Current run id mismatch: expected {}, actual {}",
                    run_id, row.run_id
                );
                row.into_conflict(message)
            }
            (
                CurrentExpectation::Version {
                    run_id,
                    last_write_version,
                    state,
                },
                Some(row),
            ) => {
                if row.run_id == *run_id
                    && row.last_write_version == *last_write_version
                    && row.state == *state
                {
                    return Ok(());
                }
                let message = format!(
                    "Current execution mismatch: expected run {} version {} state {:?}, actual run {} version {} state {:?}",
                    run_id, last_write_version, state, row.run_id, row.last_write_version, row.state
                );
                row.into_conflict(message)
            }
        };
        Err(Error::CurrentWorkflowConflict(Box::new(conflict)))
    }
}

/// Values written into a current-execution record
#[derive(Debug, Clone, Copy)]
pub struct CurrentRecord<'a> {
    /// Run to point at
    pub run_id: RunId,
    /// Its encoded execution state
    pub execution_state: &'a DataBlob,
    /// Its last write version
    pub last_write_version: i64,
    /// Its lifecycle state
    pub state: WorkflowExecutionState,
}

/// Write `record` as the current execution, conditioned on `expected`
///
/// `Absent` inserts the record if it does not exist; the other expectations
/// update it in place under an equality condition.
pub fn write_current(
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    record: &CurrentRecord<'_>,
    expected: &CurrentExpectation,
) -> Statement {
    let key = schema::current_key(shard_id, namespace_id, workflow_id);
    let stmt = match expected {
        CurrentExpectation::Absent => Statement::insert(CURRENT_EXECUTIONS, key),
        _ => Statement::update(CURRENT_EXECUTIONS, key),
    };
    let stmt = stmt
        .value(col::CURRENT_RUN_ID, record.run_id.as_uuid())
        .value(col::EXECUTION_STATE, record.execution_state.data.clone())
        .value(col::EXECUTION_STATE_ENCODING, record.execution_state.encoding.as_str())
        .value(col::WORKFLOW_LAST_WRITE_VERSION, record.last_write_version)
        .value(col::WORKFLOW_STATE, record.state.code());

    match expected {
        CurrentExpectation::Absent => stmt.if_not_exists(),
        CurrentExpectation::Run(run_id) => stmt.if_equals(col::CURRENT_RUN_ID, run_id.as_uuid()),
        CurrentExpectation::Version {
            run_id,
            last_write_version,
            state,
        } => stmt
            .if_equals(col::WORKFLOW_LAST_WRITE_VERSION, *last_write_version)
            .if_equals(col::WORKFLOW_STATE, state.code())
            .if_equals(col::CURRENT_RUN_ID, run_id.as_uuid()),
    }
}

/// Delete the current-execution record if it points at `run_id`
pub fn delete_current(
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    run_id: RunId,
) -> Statement {
    Statement::delete(
        CURRENT_EXECUTIONS,
        schema::current_key(shard_id, namespace_id, workflow_id),
    )
    .if_equals(col::CURRENT_RUN_ID, run_id.as_uuid())
}

/// Read the current-execution record, `None` if absent
///
/// # Errors
///
/// - `PersistedTypeMismatch` if the row does not decode
/// - `Store` for transport failures
pub fn read_current<S: Session + ?Sized>(
    session: &S,
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    deadline: &Deadline,
    operation: &'static str,
) -> Result<Option<CurrentExecutionRow>> {
    let query = schema::get_current(shard_id, namespace_id, workflow_id);
    match session.query_one(&query, deadline) {
        Ok(row) => CurrentExecutionRow::decode(&row)
            .map(Some)
            .map_err(|m| Error::type_mismatch(operation, m)),
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Read the current-execution record
///
/// # Errors
///
/// `NotFound` if no run is current, otherwise as [`read_current`].
pub fn get_current<S: Session + ?Sized>(
    session: &S,
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    deadline: &Deadline,
) -> Result<CurrentExecutionRow> {
    read_current(
        session,
        shard_id,
        namespace_id,
        workflow_id,
        deadline,
        "GetCurrentExecution",
    )?
    .ok_or_else(|| {
        Error::NotFound(format!(
            "current execution: shard {}, namespace {}, workflow {}",
            shard_id, namespace_id, workflow_id
        ))
    })
}

/// Fail if `run_id` is the current run
///
/// An absent current record passes.
///
/// # Errors
///
/// `CurrentWorkflowConflict` carrying `start_time` when `run_id` is current.
pub fn assert_not_current<S: Session + ?Sized>(
    session: &S,
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    run_id: RunId,
    start_time: Option<DateTime<Utc>>,
    deadline: &Deadline,
) -> Result<()> {
    match get_current(session, shard_id, namespace_id, workflow_id, deadline) {
        Ok(current) if current.run_id == run_id => {
            let mut conflict = CurrentWorkflowConflict::missing(format!(
                "Assertion on current record failed. Current run ID is not expected: {}",
                current.run_id
            ));
            conflict.start_time = start_time;
            Err(Error::CurrentWorkflowConflict(Box::new(conflict)))
        }
        Ok(_) => Ok(()),
        Err(Error::NotFound(_)) => Ok(()),
        Err(e) => Err(e),
    }
}
