//! Conditional batch builder
//!
//! One logical operation becomes one atomic batch:
//!
//! ```text
//! [current-execution write]      per mode, optional
//! execution-record write(s)      insert-if-absent or version CAS
//! sub-entity deltas              maps, signal-requested set, buffered events
//! lease guard                    always last, always present
//! ```
//!
//! Alongside the statements the builder records every assumption it made
//! (which runs must be absent or at which version, what the current record
//! must look like). Those assumptions drive conflict diagnosis if the store
//! rejects the batch.
//!
//! ## Record CAS strategies
//!
//! A snapshot or mutation carrying `db_record_version = v > 0` is conditioned
//! on the stored version being `v - 1` and writes `v`. A version of `0`
//! selects the legacy strategy: the write is conditioned on
//! `next_event_id == condition`. The legacy strategy is scheduled for removal
//! and can be disabled with `allow_legacy_cas`.

use crate::current::{write_current, CurrentExpectation, CurrentRecord};
use crate::lease::lease_guard;
use crate::schema::{self, col, EXECUTIONS};
use execstore_core::{
    DataBlob, Error, Result, RunId, ShardId, WorkflowMutation, WorkflowSnapshot,
};
use execstore_storage::{Batch, CqlValue, PrimaryKey, Statement};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// What a batch assumed about one execution record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordExpectation {
    /// The record does not exist
    Absent,
    /// The record is at this `db_record_version`
    Version(i64),
    /// The record has this `next_event_id` (legacy strategy)
    NextEventId(i64),
}

/// A record assumption, keyed by run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunExpectation {
    /// Namespace
    pub namespace_id: String,
    /// Workflow id
    pub workflow_id: String,
    /// Run
    pub run_id: RunId,
    /// What the batch assumed
    pub expected: RecordExpectation,
}

/// A batch ready to execute, with the assumptions it was built on
#[derive(Debug, Clone)]
pub struct WriteBatch {
    /// Operation name, for logs and errors
    pub operation: &'static str,
    /// Shard
    pub shard_id: ShardId,
    /// Lease the batch is fenced on
    pub range_id: i64,
    /// Namespace of the primary run
    pub namespace_id: String,
    /// Workflow id of the primary run
    pub workflow_id: String,
    /// Statements, lease guard last
    pub batch: Batch,
    /// Execution-record assumptions, in the order they were made
    pub runs: Vec<RunExpectation>,
    /// Current-record assumption, if the batch writes the current record
    pub current: Option<CurrentExpectation>,
}

/// Accumulates the statements of one operation
pub struct BatchBuilder {
    write: WriteBatch,
    allow_legacy_cas: bool,
}

impl BatchBuilder {
    /// Start a batch for `operation` on the given workflow
    pub fn new(
        operation: &'static str,
        shard_id: ShardId,
        range_id: i64,
        namespace_id: &str,
        workflow_id: &str,
        allow_legacy_cas: bool,
    ) -> Self {
        Self {
            write: WriteBatch {
                operation,
                shard_id,
                range_id,
                namespace_id: namespace_id.to_string(),
                workflow_id: workflow_id.to_string(),
                batch: Batch::new(),
                runs: Vec::new(),
                current: None,
            },
            allow_legacy_cas,
        }
    }

    /// Write the current-execution record under `expected`
    ///
    /// The record is keyed by the workflow the batch was started for.
    pub fn current(&mut self, record: &CurrentRecord<'_>, expected: CurrentExpectation) {
        let stmt = write_current(
            self.write.shard_id,
            &self.write.namespace_id,
            &self.write.workflow_id,
            record,
            &expected,
        );
        self.write.batch.push(stmt);
        self.write.current = Some(expected);
    }

    /// Write a snapshot as a brand-new execution record
    ///
    /// Inserts the record if absent, then writes every sub-entity map and
    /// the signal-requested set in full.
    pub fn snapshot_as_new(&mut self, snapshot: &WorkflowSnapshot) -> Result<()> {
        let key = self.key(&snapshot.namespace_id, &snapshot.workflow_id, snapshot.run_id);
        let stmt = execution_columns(
            Statement::insert(EXECUTIONS, key.clone()),
            &snapshot.execution_info,
            &snapshot.execution_state_blob,
            snapshot.next_event_id,
            snapshot.db_record_version,
            &snapshot.checksum,
        )
        .if_not_exists();
        self.write.batch.push(stmt);
        self.expect(
            &snapshot.namespace_id,
            &snapshot.workflow_id,
            snapshot.run_id,
            RecordExpectation::Absent,
        );
        self.reset_sub_entities(key, snapshot);
        Ok(())
    }

    /// Overwrite an existing execution record with a snapshot
    ///
    /// Version-CAS update of the record, full rewrite of every map and set,
    /// and a clear of the buffered events.
    ///
    /// # Errors
    ///
    /// `Internal` if the snapshot needs the legacy strategy and it is disabled.
    pub fn snapshot_as_reset(&mut self, snapshot: &WorkflowSnapshot) -> Result<()> {
        let key = self.key(&snapshot.namespace_id, &snapshot.workflow_id, snapshot.run_id);
        let stmt = execution_columns(
            Statement::update(EXECUTIONS, key.clone()),
            &snapshot.execution_info,
            &snapshot.execution_state_blob,
            snapshot.next_event_id,
            snapshot.db_record_version,
            &snapshot.checksum,
        );
        let expected = self.record_cas(
            snapshot.run_id,
            snapshot.db_record_version,
            snapshot.condition,
        )?;
        self.write.batch.push(guard_record(stmt, expected));
        self.expect(
            &snapshot.namespace_id,
            &snapshot.workflow_id,
            snapshot.run_id,
            expected,
        );
        self.reset_sub_entities(key.clone(), snapshot);
        self.write.batch.push(
            Statement::update(EXECUTIONS, key).set(col::BUFFERED_EVENTS_LIST, CqlValue::List(Vec::new())),
        );
        Ok(())
    }

    /// Apply a mutation to an existing execution record
    ///
    /// # Errors
    ///
    /// `Internal` if the mutation needs the legacy strategy and it is disabled.
    pub fn mutation(&mut self, mutation: &WorkflowMutation) -> Result<()> {
        let key = self.key(&mutation.namespace_id, &mutation.workflow_id, mutation.run_id);
        let stmt = execution_columns(
            Statement::update(EXECUTIONS, key.clone()),
            &mutation.execution_info,
            &mutation.execution_state_blob,
            mutation.next_event_id,
            mutation.db_record_version,
            &mutation.checksum,
        );
        let expected = self.record_cas(
            mutation.run_id,
            mutation.db_record_version,
            mutation.condition,
        )?;
        self.write.batch.push(guard_record(stmt, expected));
        self.expect(
            &mutation.namespace_id,
            &mutation.workflow_id,
            mutation.run_id,
            expected,
        );

        let batch = &mut self.write.batch;
        for (id, blob) in &mutation.upsert_activity_infos {
            batch.push(schema::put_map_entry(key.clone(), schema::ACTIVITY, *id, blob));
        }
        for id in &mutation.delete_activity_infos {
            batch.push(schema::delete_map_entry(key.clone(), schema::ACTIVITY, *id));
        }
        for (id, blob) in &mutation.upsert_timer_infos {
            batch.push(schema::put_map_entry(key.clone(), schema::TIMER, id.as_str(), blob));
        }
        for id in &mutation.delete_timer_infos {
            batch.push(schema::delete_map_entry(key.clone(), schema::TIMER, id.as_str()));
        }
        for (id, blob) in &mutation.upsert_child_execution_infos {
            batch.push(schema::put_map_entry(key.clone(), schema::CHILD_EXECUTION, *id, blob));
        }
        for id in &mutation.delete_child_execution_infos {
            batch.push(schema::delete_map_entry(key.clone(), schema::CHILD_EXECUTION, *id));
        }
        for (id, blob) in &mutation.upsert_request_cancel_infos {
            batch.push(schema::put_map_entry(key.clone(), schema::REQUEST_CANCEL, *id, blob));
        }
        for id in &mutation.delete_request_cancel_infos {
            batch.push(schema::delete_map_entry(key.clone(), schema::REQUEST_CANCEL, *id));
        }
        for (id, blob) in &mutation.upsert_signal_infos {
            batch.push(schema::put_map_entry(key.clone(), schema::SIGNAL, *id, blob));
        }
        for id in &mutation.delete_signal_infos {
            batch.push(schema::delete_map_entry(key.clone(), schema::SIGNAL, *id));
        }

        if !mutation.upsert_signal_requested_ids.is_empty() {
            batch.push(
                Statement::update(EXECUTIONS, key.clone())
                    .set_add(col::SIGNAL_REQUESTED, text_set(&mutation.upsert_signal_requested_ids)),
            );
        }
        if !mutation.delete_signal_requested_ids.is_empty() {
            batch.push(
                Statement::update(EXECUTIONS, key.clone())
                    .set_remove(col::SIGNAL_REQUESTED, text_set(&mutation.delete_signal_requested_ids)),
            );
        }

        if mutation.clear_buffered_events {
            batch.push(
                Statement::update(EXECUTIONS, key.clone())
                    .set(col::BUFFERED_EVENTS_LIST, CqlValue::List(Vec::new())),
            );
        }
        if let Some(events) = &mutation.new_buffered_events {
            batch.push(
                Statement::update(EXECUTIONS, key)
                    .list_append(col::BUFFERED_EVENTS_LIST, vec![schema::buffered_events_element(events)]),
            );
        }
        Ok(())
    }

    /// Append the lease guard and hand out the finished batch
    pub fn finish(mut self) -> WriteBatch {
        self.write
            .batch
            .push(lease_guard(self.write.shard_id, self.write.range_id));
        debug!(
            "{} batch for shard {} {}/{}: {} statements, {} conditional",
            self.write.operation,
            self.write.shard_id,
            self.write.namespace_id,
            self.write.workflow_id,
            self.write.batch.len(),
            self.write.batch.conditional_count()
        );
        self.write
    }

    fn key(&self, namespace_id: &str, workflow_id: &str, run_id: RunId) -> PrimaryKey {
        schema::execution_key(self.write.shard_id, namespace_id, workflow_id, run_id)
    }

    fn expect(
        &mut self,
        namespace_id: &str,
        workflow_id: &str,
        run_id: RunId,
        expected: RecordExpectation,
    ) {
        self.write.runs.push(RunExpectation {
            namespace_id: namespace_id.to_string(),
            workflow_id: workflow_id.to_string(),
            run_id,
            expected,
        });
    }

    /// Pick the CAS strategy for a record written at `db_record_version`
    fn record_cas(
        &self,
        run_id: RunId,
        db_record_version: i64,
        condition: i64,
    ) -> Result<RecordExpectation> {
        if db_record_version > 0 {
            return Ok(RecordExpectation::Version(db_record_version - 1));
        }
        if !self.allow_legacy_cas {
            return Err(Error::Internal(format!(
                "{}: run {} has no record version and legacy next_event_id CAS is disabled",
                self.write.operation, run_id
            )));
        }
        warn!(
            "{}: legacy next_event_id CAS for run {} (next_event_id = {})",
            self.write.operation, run_id, condition
        );
        Ok(RecordExpectation::NextEventId(condition))
    }

    fn reset_sub_entities(&mut self, key: PrimaryKey, snapshot: &WorkflowSnapshot) {
        let batch = &mut self.write.batch;
        batch.push(schema::reset_map(key.clone(), schema::ACTIVITY, &snapshot.activity_infos));
        batch.push(schema::reset_map(key.clone(), schema::TIMER, &snapshot.timer_infos));
        batch.push(schema::reset_map(
            key.clone(),
            schema::CHILD_EXECUTION,
            &snapshot.child_execution_infos,
        ));
        batch.push(schema::reset_map(
            key.clone(),
            schema::REQUEST_CANCEL,
            &snapshot.request_cancel_infos,
        ));
        batch.push(schema::reset_map(key.clone(), schema::SIGNAL, &snapshot.signal_infos));
        batch.push(
            Statement::update(EXECUTIONS, key).set(
                col::SIGNAL_REQUESTED,
                CqlValue::Set(text_set(&snapshot.signal_requested_ids)),
            ),
        );
    }
}

/// Bind the scalar columns of an execution record
fn execution_columns(
    stmt: Statement,
    execution_info: &DataBlob,
    execution_state: &DataBlob,
    next_event_id: i64,
    db_record_version: i64,
    checksum: &DataBlob,
) -> Statement {
    stmt.value(col::EXECUTION, execution_info.data.clone())
        .value(col::EXECUTION_ENCODING, execution_info.encoding.as_str())
        .value(col::EXECUTION_STATE, execution_state.data.clone())
        .value(col::EXECUTION_STATE_ENCODING, execution_state.encoding.as_str())
        .value(col::NEXT_EVENT_ID, next_event_id)
        .value(col::DB_RECORD_VERSION, db_record_version)
        .value(col::CHECKSUM, checksum.data.clone())
        .value(col::CHECKSUM_ENCODING, checksum.encoding.as_str())
}

fn guard_record(stmt: Statement, expected: RecordExpectation) -> Statement {
    match expected {
        RecordExpectation::Absent => stmt.if_not_exists(),
        RecordExpectation::Version(v) => stmt.if_equals(col::DB_RECORD_VERSION, v),
        RecordExpectation::NextEventId(n) => stmt.if_equals(col::NEXT_EVENT_ID, n),
    }
}

fn text_set(ids: &BTreeSet<String>) -> BTreeSet<CqlValue> {
    ids.iter().map(|id| CqlValue::Text(id.clone())).collect()
}
