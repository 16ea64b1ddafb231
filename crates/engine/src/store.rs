//! MutableStateStore: workflow-execution persistence
//!
//! ## Design
//!
//! The store is stateless apart from its session handle and options. Every
//! mutating operation builds one [`WriteBatch`], submits it atomically and,
//! only if the store rejects it, runs diagnosis to turn the rejection into a
//! specific error. Nothing is retried internally.
//!
//! Reads (`get_execution`, `get_current_execution`, `list_executions`) are
//! plain reads and are not fenced against concurrent writers.
//!
//! ## Thread Safety
//!
//! `MutableStateStore` is `Send + Sync` whenever its session is, and can be
//! shared across threads behind an `Arc`.

use crate::batch::{BatchBuilder, WriteBatch};
use crate::current::{self, assert_not_current, CurrentExpectation, CurrentRecord};
use crate::diagnose::diagnose;
use crate::mapper::{decode_summary, ExecutionRow};
use crate::schema;
use execstore_core::{
    ConflictResolveRequest, ConflictResolveWorkflowMode, CreateExecutionRequest,
    CreateWorkflowMode, DeleteCurrentExecutionRequest, DeleteExecutionRequest, Error,
    ExecutionState, GetCurrentExecutionRequest, GetCurrentExecutionResponse, GetExecutionRequest,
    GetExecutionResponse, ListExecutionsRequest, ListExecutionsResponse, Result,
    SetExecutionRequest, ShardId, UpdateExecutionRequest, UpdateWorkflowMode, WorkflowExecutionState,
    WorkflowMutation, WorkflowSnapshot,
};
use execstore_storage::{Deadline, Paging, Session, StoreError};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Tunables of a [`MutableStateStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreOptions {
    /// Permit the legacy `next_event_id` CAS for unversioned records
    pub allow_legacy_cas: bool,
    /// Upper bound on the page size of `list_executions`
    pub max_page_size: usize,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            allow_legacy_cas: true,
            max_page_size: 1000,
        }
    }
}

/// Workflow-execution persistence over a [`Session`]
pub struct MutableStateStore<S: Session + ?Sized> {
    session: Arc<S>,
    options: StoreOptions,
}

impl<S: Session + ?Sized> MutableStateStore<S> {
    /// Create a store over `session`
    pub fn new(session: Arc<S>, options: StoreOptions) -> Self {
        info!(
            "execution store ready: legacy CAS {}, max page size {}",
            if options.allow_legacy_cas { "allowed" } else { "disabled" },
            options.max_page_size
        );
        Self { session, options }
    }

    /// The underlying session
    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// Active options
    pub fn options(&self) -> StoreOptions {
        self.options
    }

    // =========================================================================
    // Create
    // =========================================================================

    /// Create a run
    ///
    /// # Errors
    ///
    /// - `CurrentWorkflowConflict`: the current record is not as the mode requires
    /// - `WorkflowConflict`: the run already exists
    /// - `ShardOwnershipLost`: the lease moved
    /// - `Internal`: `UpdateCurrent` without a previous run id
    pub fn create_execution(
        &self,
        request: &CreateExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        const OP: &str = "CreateWorkflowExecution";
        let new = &request.new_workflow;
        let mut builder = self.builder(OP, request.shard_id, request.range_id, new);

        match request.mode {
            CreateWorkflowMode::BypassCurrent => {}
            CreateWorkflowMode::UpdateCurrent => {
                let previous = request.previous_run_id.ok_or_else(|| {
                    Error::Internal(format!("{}: UpdateCurrent requires a previous run id", OP))
                })?;
                builder.current(
                    &snapshot_record(new),
                    CurrentExpectation::Version {
                        run_id: previous,
                        last_write_version: request.previous_last_write_version,
                        state: WorkflowExecutionState::Completed,
                    },
                );
            }
            CreateWorkflowMode::BrandNew => {
                builder.current(&snapshot_record(new), CurrentExpectation::Absent);
            }
        }

        builder.snapshot_as_new(new)?;
        self.execute(builder.finish(), deadline)
    }

    // =========================================================================
    // Read
    // =========================================================================

    /// Read one run
    ///
    /// # Errors
    ///
    /// - `NotFound`: no such run
    /// - `PersistedTypeMismatch`: the stored row does not decode
    pub fn get_execution(
        &self,
        request: &GetExecutionRequest,
        deadline: &Deadline,
    ) -> Result<GetExecutionResponse> {
        let query = schema::get_execution(
            request.shard_id,
            &request.namespace_id,
            &request.workflow_id,
            request.run_id,
        );
        let row = self.session.query_one(&query, deadline).map_err(|e| match e {
            StoreError::NotFound => Error::NotFound(format!(
                "workflow execution: shard {}, {}/{} run {}",
                request.shard_id, request.namespace_id, request.workflow_id, request.run_id
            )),
            other => other.into(),
        })?;
        let decoded =
            ExecutionRow::decode(&row).map_err(|m| Error::type_mismatch("GetWorkflowExecution", m))?;
        Ok(GetExecutionResponse {
            state: decoded.state,
            db_record_version: decoded.db_record_version,
        })
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Apply a mutation, optionally continuing as a new run
    ///
    /// # Errors
    ///
    /// - `CurrentWorkflowConflict`: the run is (`BypassCurrent`) or is not
    ///   (`UpdateCurrent`) the current one
    /// - `WorkflowConflict` / `NotFound`: the record version moved or the run
    ///   is gone
    /// - `ShardOwnershipLost`: the lease moved
    /// - `Internal`: continue-as-new into another namespace or workflow
    pub fn update_execution(
        &self,
        request: &UpdateExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        const OP: &str = "UpdateWorkflowExecution";
        let update = &request.update_workflow;
        let mut builder = BatchBuilder::new(
            OP,
            request.shard_id,
            request.range_id,
            &update.namespace_id,
            &update.workflow_id,
            self.options.allow_legacy_cas,
        );
        if let Some(new) = &request.new_workflow {
            same_workflow(OP, &update.namespace_id, &update.workflow_id, new)?;
        }

        match request.mode {
            UpdateWorkflowMode::BypassCurrent => {
                assert_not_current(
                    self.session.as_ref(),
                    request.shard_id,
                    &update.namespace_id,
                    &update.workflow_id,
                    update.run_id,
                    update.execution_state.start_time,
                    deadline,
                )?;
            }
            UpdateWorkflowMode::UpdateCurrent => {
                let expected = match request.expected_current {
                    Some(version) => CurrentExpectation::Version {
                        run_id: update.run_id,
                        last_write_version: version.last_write_version,
                        state: version.state,
                    },
                    None => CurrentExpectation::Run(update.run_id),
                };
                match &request.new_workflow {
                    Some(new) => builder.current(&snapshot_record(new), expected),
                    None => builder.current(&mutation_record(update), expected),
                }
            }
        }

        builder.mutation(update)?;
        if let Some(new) = &request.new_workflow {
            builder.snapshot_as_new(new)?;
        }
        self.execute(builder.finish(), deadline)
    }

    // =========================================================================
    // Conflict resolution
    // =========================================================================

    /// Reset a run, optionally mutating the current run and creating a new one
    ///
    /// # Errors
    ///
    /// As [`update_execution`](Self::update_execution).
    pub fn conflict_resolve(
        &self,
        request: &ConflictResolveRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        const OP: &str = "ConflictResolveWorkflowExecution";
        let reset = &request.reset_workflow;
        let mut builder = self.builder(OP, request.shard_id, request.range_id, reset);
        if let Some(current) = &request.current_workflow {
            if current.namespace_id != reset.namespace_id
                || current.workflow_id != reset.workflow_id
            {
                return Err(Error::Internal(format!(
                    "{}: current run {} belongs to another workflow",
                    OP, current.run_id
                )));
            }
        }
        if let Some(new) = &request.new_workflow {
            same_workflow(OP, &reset.namespace_id, &reset.workflow_id, new)?;
        }

        match request.mode {
            ConflictResolveWorkflowMode::BypassCurrent => {
                let start_time = request
                    .current_workflow
                    .as_ref()
                    .and_then(|c| c.execution_state.start_time);
                assert_not_current(
                    self.session.as_ref(),
                    request.shard_id,
                    &reset.namespace_id,
                    &reset.workflow_id,
                    reset.run_id,
                    start_time,
                    deadline,
                )?;
            }
            ConflictResolveWorkflowMode::UpdateCurrent => {
                let record = match &request.new_workflow {
                    Some(new) => snapshot_record(new),
                    None => snapshot_record(reset),
                };
                let current_run_id = request
                    .current_workflow
                    .as_ref()
                    .map(|c| c.run_id)
                    .unwrap_or(reset.run_id);
                builder.current(&record, CurrentExpectation::Run(current_run_id));
            }
        }

        builder.snapshot_as_reset(reset)?;
        if let Some(current) = &request.current_workflow {
            builder.mutation(current)?;
        }
        if let Some(new) = &request.new_workflow {
            builder.snapshot_as_new(new)?;
        }
        self.execute(builder.finish(), deadline)
    }

    // =========================================================================
    // Set
    // =========================================================================

    /// Overwrite a run wholesale under its version CAS
    ///
    /// # Errors
    ///
    /// `WorkflowConflict`, `NotFound` or `ShardOwnershipLost`.
    pub fn set_execution(&self, request: &SetExecutionRequest, deadline: &Deadline) -> Result<()> {
        let set = &request.set_workflow;
        let mut builder = self.builder("SetWorkflowExecution", request.shard_id, request.range_id, set);
        builder.snapshot_as_reset(set)?;
        self.execute(builder.finish(), deadline)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete one run's execution record; absent records are not an error
    pub fn delete_execution(
        &self,
        request: &DeleteExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        let stmt = schema::delete_execution(
            request.shard_id,
            &request.namespace_id,
            &request.workflow_id,
            request.run_id,
        );
        self.session.execute(&stmt, deadline)?;
        Ok(())
    }

    /// Delete the current-execution record if it points at the given run
    ///
    /// A record pointing elsewhere, or no record at all, is left alone and
    /// the call still succeeds.
    pub fn delete_current_execution(
        &self,
        request: &DeleteCurrentExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        let stmt = current::delete_current(
            request.shard_id,
            &request.namespace_id,
            &request.workflow_id,
            request.run_id,
        );
        if !self.session.execute(&stmt, deadline)? {
            debug!(
                "current execution of {}/{} on shard {} does not point at run {}, nothing deleted",
                request.namespace_id, request.workflow_id, request.shard_id, request.run_id
            );
        }
        Ok(())
    }

    // =========================================================================
    // Current execution
    // =========================================================================

    /// Read the current run of a workflow
    ///
    /// # Errors
    ///
    /// - `NotFound`: no run is current
    /// - `PersistedTypeMismatch`: the stored row does not decode
    /// - `Serialization`: the execution-state payload does not decode
    pub fn get_current_execution(
        &self,
        request: &GetCurrentExecutionRequest,
        deadline: &Deadline,
    ) -> Result<GetCurrentExecutionResponse> {
        let row = current::get_current(
            self.session.as_ref(),
            request.shard_id,
            &request.namespace_id,
            &request.workflow_id,
            deadline,
        )?;
        let execution_state = ExecutionState::from_blob(&row.execution_state)?;
        Ok(GetCurrentExecutionResponse {
            run_id: row.run_id,
            execution_state,
            last_write_version: row.last_write_version,
        })
    }

    // =========================================================================
    // List
    // =========================================================================

    /// Page through every run on a shard
    ///
    /// Page sizes above `max_page_size` are clamped. Rows without an
    /// execution payload are skipped, so a page may hold fewer runs than
    /// requested while more remain.
    ///
    /// # Errors
    ///
    /// - `Internal`: page size of zero
    /// - `Store(InvalidPageToken)`: the token was not produced by this store
    pub fn list_executions(
        &self,
        request: &ListExecutionsRequest,
        deadline: &Deadline,
    ) -> Result<ListExecutionsResponse> {
        if request.page_size == 0 {
            return Err(Error::Internal(
                "ListConcreteExecutions: page size must be positive".to_string(),
            ));
        }
        let paging = Paging {
            page_size: request.page_size.min(self.options.max_page_size),
            page_state: request.page_token.clone(),
        };
        let page = self.session.query_page(
            &schema::list_executions(request.shard_id),
            &paging,
            deadline,
        )?;

        let mut executions = Vec::with_capacity(page.rows.len());
        for row in &page.rows {
            let summary = decode_summary(row)
                .map_err(|m| Error::type_mismatch("ListConcreteExecutions", m))?;
            executions.extend(summary);
        }
        Ok(ListExecutionsResponse {
            executions,
            next_page_token: page.page_state,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn builder(
        &self,
        operation: &'static str,
        shard_id: ShardId,
        range_id: i64,
        primary: &WorkflowSnapshot,
    ) -> BatchBuilder {
        BatchBuilder::new(
            operation,
            shard_id,
            range_id,
            &primary.namespace_id,
            &primary.workflow_id,
            self.options.allow_legacy_cas,
        )
    }

    /// Submit a batch; diagnose it if the store rejects it
    fn execute(&self, write: WriteBatch, deadline: &Deadline) -> Result<()> {
        match self.session.execute_batch(&write.batch, deadline) {
            Ok(()) => Ok(()),
            Err(StoreError::ConditionFailed) => {
                warn!(
                    "{} batch rejected on shard {} {}/{}, diagnosing",
                    write.operation, write.shard_id, write.namespace_id, write.workflow_id
                );
                Err(diagnose(self.session.as_ref(), &write, deadline))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn snapshot_record(snapshot: &WorkflowSnapshot) -> CurrentRecord<'_> {
    CurrentRecord {
        run_id: snapshot.run_id,
        execution_state: &snapshot.execution_state_blob,
        last_write_version: snapshot.last_write_version,
        state: snapshot.execution_state.state,
    }
}

fn mutation_record(mutation: &WorkflowMutation) -> CurrentRecord<'_> {
    CurrentRecord {
        run_id: mutation.run_id,
        execution_state: &mutation.execution_state_blob,
        last_write_version: mutation.last_write_version,
        state: mutation.execution_state.state,
    }
}

/// A new run must land under the workflow whose current record it replaces
fn same_workflow(
    op: &str,
    namespace_id: &str,
    workflow_id: &str,
    new: &WorkflowSnapshot,
) -> Result<()> {
    if new.namespace_id != namespace_id {
        return Err(Error::Internal(format!(
            "{}: cannot continue as new to another namespace",
            op
        )));
    }
    if new.workflow_id != workflow_id {
        return Err(Error::Internal(format!(
            "{}: cannot continue as new to another workflow: {} -> {}",
            op, workflow_id, new.workflow_id
        )));
    }
    Ok(())
}
