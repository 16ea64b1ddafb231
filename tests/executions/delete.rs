//! Delete Tests
//!
//! Both deletes are idempotent: an absent row is success, not NotFound.

use crate::*;
use execstore::{DeleteCurrentExecutionRequest, DeleteExecutionRequest, RunId};

fn delete_request(workflow_id: &str, run_id: RunId) -> DeleteExecutionRequest {
    DeleteExecutionRequest {
        shard_id: SHARD,
        namespace_id: NS.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id,
    }
}

fn delete_current_request(workflow_id: &str, run_id: RunId) -> DeleteCurrentExecutionRequest {
    DeleteCurrentExecutionRequest {
        shard_id: SHARD,
        namespace_id: NS.to_string(),
        workflow_id: workflow_id.to_string(),
        run_id,
    }
}

// =============================================================================
// DELETE EXECUTION
// =============================================================================

#[test]
fn test_delete_execution_removes_record() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    store.delete_execution(&delete_request(WF, r1)).unwrap();

    assert!(get(&store, WF, r1).unwrap_err().is_not_found());
    // The current record is a separate delete
    assert_eq!(current_run(&store, WF), Some(r1));
}

#[test]
fn test_delete_missing_execution_succeeds() {
    let (store, _) = create_store();
    store
        .delete_execution(&delete_request(WF, RunId::new()))
        .unwrap();
}

#[test]
fn test_delete_execution_twice() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    store.delete_execution(&delete_request(WF, r1)).unwrap();
    store.delete_execution(&delete_request(WF, r1)).unwrap();
}

#[test]
fn test_recreate_after_delete() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);
    store.delete_execution(&delete_request(WF, r1)).unwrap();
    store
        .delete_current_execution(&delete_current_request(WF, r1))
        .unwrap();

    create_brand_new(&store, WF, r1);
    assert_eq!(get(&store, WF, r1).unwrap().db_record_version, 1);
}

// =============================================================================
// DELETE CURRENT EXECUTION
// =============================================================================

#[test]
fn test_delete_current_for_matching_run() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    store
        .delete_current_execution(&delete_current_request(WF, r1))
        .unwrap();

    assert_eq!(current_run(&store, WF), None);
    assert_eq!(session.row_count("current_executions"), 0);
    assert!(get(&store, WF, r1).is_ok());
}

#[test]
fn test_delete_current_for_other_run_is_noop() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    store
        .delete_current_execution(&delete_current_request(WF, RunId::new()))
        .unwrap();

    assert_eq!(current_run(&store, WF), Some(r1));
}

#[test]
fn test_delete_absent_current_succeeds() {
    let (store, _) = create_store();
    store
        .delete_current_execution(&delete_current_request(WF, RunId::new()))
        .unwrap();
}
