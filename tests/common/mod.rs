//! Shared fixtures for the integration suites.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use execstore::storage::{CqlValue, PrimaryKey, Query, Statement};
use execstore::{
    CreateExecutionRequest, CreateWorkflowMode, DataBlob, Deadline, EncodingType,
    ExecutionState, ExecutionStore, GetCurrentExecutionRequest, GetExecutionRequest,
    GetExecutionResponse, MemorySession, RunId, Session, ShardId, UpdateExecutionRequest,
    UpdateWorkflowMode, WorkflowExecutionState, WorkflowExecutionStatus, WorkflowMutation,
    WorkflowSnapshot,
};

pub const SHARD: ShardId = 1;
pub const RANGE: i64 = 5;
pub const NS: &str = "n";
pub const WF: &str = "w";

/// Store over a fresh in-memory session, with the session handed back for
/// direct inspection and fault injection
pub fn create_store() -> (ExecutionStore, Arc<MemorySession>) {
    create_store_with(|b| b)
}

/// As [`create_store`], with builder overrides
pub fn create_store_with(
    configure: impl FnOnce(execstore::ExecutionStoreBuilder) -> execstore::ExecutionStoreBuilder,
) -> (ExecutionStore, Arc<MemorySession>) {
    let session = Arc::new(MemorySession::new());
    let store = configure(ExecutionStore::builder().session(Arc::clone(&session)))
        .build()
        .expect("store builds");
    seed_shard(&session, SHARD, RANGE);
    (store, session)
}

/// Provision a shard row owned at `range_id`
pub fn seed_shard(session: &MemorySession, shard_id: ShardId, range_id: i64) {
    let stmt = Statement::insert("shards", PrimaryKey::partition("shard_id", shard_id))
        .value("range_id", range_id);
    session
        .execute(&stmt, &Deadline::none())
        .expect("seed shard");
}

/// Move the shard lease to another owner
pub fn steal_shard(session: &MemorySession, shard_id: ShardId, range_id: i64) {
    let stmt = Statement::update("shards", PrimaryKey::partition("shard_id", shard_id))
        .set("range_id", range_id);
    session
        .execute(&stmt, &Deadline::none())
        .expect("steal shard");
}

/// Stored range id of a shard
pub fn range_of(session: &MemorySession, shard_id: ShardId) -> i64 {
    let query = Query::select(
        "shards",
        &["range_id"],
        PrimaryKey::partition("shard_id", shard_id),
    );
    session
        .query_one(&query, &Deadline::none())
        .expect("shard row")
        .get("range_id")
        .and_then(CqlValue::as_bigint)
        .expect("range id")
}

pub fn execution_state(run_id: RunId, state: WorkflowExecutionState) -> ExecutionState {
    ExecutionState {
        create_request_id: format!("req-{}", run_id),
        run_id,
        state,
        status: WorkflowExecutionStatus::Running,
        start_time: Some(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()),
    }
}

pub fn blob(bytes: &[u8]) -> DataBlob {
    DataBlob::new(bytes.to_vec(), EncodingType::Proto3)
}

/// A running snapshot at record version 1
pub fn snapshot(workflow_id: &str, run_id: RunId) -> WorkflowSnapshot {
    let state = execution_state(run_id, WorkflowExecutionState::Running);
    WorkflowSnapshot {
        namespace_id: NS.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id,
        execution_info: blob(b"info"),
        execution_state_blob: state.to_blob(EncodingType::Json).expect("encode state"),
        execution_state: state,
        next_event_id: 2,
        last_write_version: 10,
        db_record_version: 1,
        condition: 0,
        checksum: blob(b"sum"),
        ..Default::default()
    }
}

/// A snapshot carrying every kind of sub-entity
pub fn rich_snapshot(workflow_id: &str, run_id: RunId) -> WorkflowSnapshot {
    let mut s = snapshot(workflow_id, run_id);
    s.activity_infos = BTreeMap::from([(5, blob(b"a5")), (9, blob(b"a9"))]);
    s.timer_infos = BTreeMap::from([("t1".to_string(), blob(b"t1"))]);
    s.child_execution_infos = BTreeMap::from([(7, blob(b"c7"))]);
    s.request_cancel_infos = BTreeMap::from([(8, blob(b"r8"))]);
    s.signal_infos = BTreeMap::from([(11, blob(b"s11"))]);
    s.signal_requested_ids = BTreeSet::from(["sig-a".to_string(), "sig-b".to_string()]);
    s
}

/// A mutation moving `run_id` from record version `from` to `from + 1`
pub fn mutation(workflow_id: &str, run_id: RunId, from: i64) -> WorkflowMutation {
    let state = execution_state(run_id, WorkflowExecutionState::Running);
    WorkflowMutation {
        namespace_id: NS.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id,
        execution_info: blob(format!("info-v{}", from + 1).as_bytes()),
        execution_state_blob: state.to_blob(EncodingType::Json).expect("encode state"),
        execution_state: state,
        next_event_id: 2 + from,
        last_write_version: 10,
        db_record_version: from + 1,
        condition: 0,
        checksum: blob(b"sum"),
        ..Default::default()
    }
}

pub fn create_request(mode: CreateWorkflowMode, new_workflow: WorkflowSnapshot) -> CreateExecutionRequest {
    CreateExecutionRequest {
        shard_id: SHARD,
        range_id: RANGE,
        mode,
        previous_run_id: None,
        previous_last_write_version: 0,
        new_workflow,
    }
}

pub fn update_request(mode: UpdateWorkflowMode, update_workflow: WorkflowMutation) -> UpdateExecutionRequest {
    UpdateExecutionRequest {
        shard_id: SHARD,
        range_id: RANGE,
        mode,
        update_workflow,
        new_workflow: None,
        expected_current: None,
    }
}

/// Create `run_id` as the brand-new current run of `workflow_id`
pub fn create_brand_new(store: &ExecutionStore, workflow_id: &str, run_id: RunId) {
    store
        .create_execution(&create_request(
            CreateWorkflowMode::BrandNew,
            snapshot(workflow_id, run_id),
        ))
        .expect("brand new create");
}

pub fn get(store: &ExecutionStore, workflow_id: &str, run_id: RunId) -> execstore::Result<GetExecutionResponse> {
    store.get_execution(&GetExecutionRequest {
        shard_id: SHARD,
        namespace_id: NS.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id,
    })
}

/// Run the current record points at, if any
pub fn current_run(store: &ExecutionStore, workflow_id: &str) -> Option<RunId> {
    match store.get_current_execution(&GetCurrentExecutionRequest {
        shard_id: SHARD,
        namespace_id: NS.to_string(),
        workflow_id: workflow_id.to_string(),
    }) {
        Ok(response) => Some(response.run_id),
        Err(e) if e.is_not_found() => None,
        Err(e) => panic!("unexpected error reading current run: {}", e),
    }
}
