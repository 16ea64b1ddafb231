//! Point Read Tests
//!
//! Tests for GetWorkflowExecution and GetCurrentExecution, including rows
//! whose stored shape does not decode.

use crate::*;
use execstore::storage::{PrimaryKey, Statement};
use execstore::{
    Deadline, EncodingType, Error, ExecutionState, GetCurrentExecutionRequest, RunId, Session,
    WorkflowExecutionState,
};

fn execution_key(workflow_id: &str, run_id: RunId) -> PrimaryKey {
    PrimaryKey::partition("shard_id", SHARD)
        .clustering("namespace_id", NS)
        .clustering("workflow_id", workflow_id)
        .clustering("run_id", run_id.as_uuid())
}

fn current_request(workflow_id: &str) -> GetCurrentExecutionRequest {
    GetCurrentExecutionRequest {
        shard_id: SHARD,
        namespace_id: NS.to_string(),
        workflow_id: workflow_id.to_string(),
    }
}

/// Minimal execution row as an unversioned writer would have left it
fn legacy_row(workflow_id: &str, run_id: RunId) -> Statement {
    Statement::insert("executions", execution_key(workflow_id, run_id))
        .value("execution", vec![1u8, 2, 3])
        .value("execution_encoding", "Proto3")
        .value("execution_state", vec![4u8])
        .value("execution_state_encoding", "Proto3")
        .value("next_event_id", 42i64)
        .value("checksum", Vec::<u8>::new())
        .value("checksum_encoding", "Unspecified")
}

// =============================================================================
// GET EXECUTION
// =============================================================================

#[test]
fn test_get_missing_run_is_not_found() {
    let (store, _) = create_store();
    let err = get(&store, WF, RunId::new()).unwrap_err();
    assert!(err.is_not_found());
    assert!(!err.is_retryable());
}

#[test]
fn test_get_returns_buffered_events_in_order() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    for (from, payload) in [(1, b"e1"), (2, b"e2")] {
        let mut m = mutation(WF, r1, from);
        m.new_buffered_events = Some(blob(payload));
        store
            .update_execution(&update_request(execstore::UpdateWorkflowMode::UpdateCurrent, m))
            .unwrap();
    }

    let state = get(&store, WF, r1).unwrap().state;
    assert_eq!(state.buffered_events, vec![blob(b"e1"), blob(b"e2")]);
}

#[test]
fn test_get_unversioned_row_reads_version_zero() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    session
        .execute(&legacy_row(WF, r1), &Deadline::none())
        .unwrap();

    let read = get(&store, WF, r1).unwrap();
    assert_eq!(read.db_record_version, 0);
    assert_eq!(read.state.next_event_id, 42);
    assert_eq!(read.state.execution_info.encoding, EncodingType::Proto3);
}

#[test]
fn test_get_mistyped_column_is_unavailable() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    session
        .execute(
            &legacy_row(WF, r1).value("next_event_id", "not a number"),
            &Deadline::none(),
        )
        .unwrap();

    let err = get(&store, WF, r1).unwrap_err();
    assert!(err.is_unavailable());
    assert!(!err.is_retryable());
    let Error::PersistedTypeMismatch { mismatch, .. } = err else {
        panic!("expected type mismatch");
    };
    assert_eq!(mismatch.column, "next_event_id");
    assert!(mismatch.actual.contains("not a number"));
}

#[test]
fn test_get_missing_encoding_is_unavailable() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    let stmt = Statement::insert("executions", execution_key(WF, r1))
        .value("execution", vec![1u8])
        .value("next_event_id", 1i64);
    session.execute(&stmt, &Deadline::none()).unwrap();

    let err = get(&store, WF, r1).unwrap_err();
    assert!(matches!(err, Error::PersistedTypeMismatch { .. }));
}

// =============================================================================
// GET CURRENT EXECUTION
// =============================================================================

#[test]
fn test_get_current_decodes_state() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    let current = store.get_current_execution(&current_request(WF)).unwrap();
    assert_eq!(current.run_id, r1);
    assert_eq!(current.last_write_version, 10);
    assert_eq!(
        current.execution_state,
        execution_state(r1, WorkflowExecutionState::Running)
    );
}

#[test]
fn test_get_current_absent_is_not_found() {
    let (store, _) = create_store();
    let err = store.get_current_execution(&current_request(WF)).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_get_current_with_undecodable_state() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    let key = PrimaryKey::partition("shard_id", SHARD)
        .clustering("namespace_id", NS)
        .clustering("workflow_id", WF);
    let stmt = Statement::insert("current_executions", key)
        .value("current_run_id", r1.as_uuid())
        .value("execution_state", vec![0xffu8, 0x00])
        .value("execution_state_encoding", "Proto3")
        .value("workflow_state", 1i32)
        .value("workflow_last_write_version", 3i64);
    session.execute(&stmt, &Deadline::none()).unwrap();

    let err = store.get_current_execution(&current_request(WF)).unwrap_err();
    assert!(matches!(err, Error::Serialization(_)));
}

#[test]
fn test_get_current_with_mistyped_run_id() {
    let (store, session) = create_store();
    let key = PrimaryKey::partition("shard_id", SHARD)
        .clustering("namespace_id", NS)
        .clustering("workflow_id", WF);
    let state = ExecutionState::default().to_blob(EncodingType::Json).unwrap();
    let stmt = Statement::insert("current_executions", key)
        .value("current_run_id", "r1")
        .value("execution_state", state.data)
        .value("execution_state_encoding", "Json")
        .value("workflow_state", 1i32)
        .value("workflow_last_write_version", 3i64);
    session.execute(&stmt, &Deadline::none()).unwrap();

    let err = store.get_current_execution(&current_request(WF)).unwrap_err();
    assert!(err.is_unavailable());
    assert!(err.to_string().contains("current_run_id"));
}

#[test]
fn test_get_current_state_blob_in_msgpack() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    let mut s = snapshot(WF, r1);
    s.execution_state_blob = s.execution_state.to_blob(EncodingType::MsgPack).unwrap();
    store
        .create_execution(&create_request(execstore::CreateWorkflowMode::BrandNew, s.clone()))
        .unwrap();

    let current = store.get_current_execution(&current_request(WF)).unwrap();
    assert_eq!(current.execution_state, s.execution_state);
}
