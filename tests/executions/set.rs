//! SetWorkflowExecution Tests

use crate::*;
use execstore::{Error, RunId, SetExecutionRequest, WorkflowSnapshot};

fn set_request(set_workflow: WorkflowSnapshot) -> SetExecutionRequest {
    SetExecutionRequest {
        shard_id: SHARD,
        range_id: RANGE,
        set_workflow,
    }
}

#[test]
fn test_set_overwrites_run() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    store
        .create_execution(&create_request(
            execstore::CreateWorkflowMode::BrandNew,
            rich_snapshot(WF, r1),
        ))
        .unwrap();

    let mut s = snapshot(WF, r1);
    s.db_record_version = 2;
    s.next_event_id = 40;
    store.set_execution(&set_request(s)).unwrap();

    let read = get(&store, WF, r1).unwrap();
    assert_eq!(read.db_record_version, 2);
    assert_eq!(read.state.next_event_id, 40);
    assert!(read.state.activity_infos.is_empty());
    assert!(read.state.signal_requested_ids.is_empty());
}

#[test]
fn test_set_does_not_touch_current_record() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    let r2 = RunId::new();
    create_brand_new(&store, WF, r1);
    store
        .create_execution(&create_request(
            execstore::CreateWorkflowMode::BypassCurrent,
            snapshot(WF, r2),
        ))
        .unwrap();

    let mut s = snapshot(WF, r2);
    s.db_record_version = 2;
    store.set_execution(&set_request(s)).unwrap();

    assert_eq!(current_run(&store, WF), Some(r1));
    assert_eq!(session.row_count("current_executions"), 1);
}

#[test]
fn test_stale_set_is_conflict() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    let mut s = snapshot(WF, r1);
    s.db_record_version = 3;
    let err = store.set_execution(&set_request(s)).unwrap_err();

    let Error::WorkflowConflict(conflict) = err else {
        panic!("expected workflow conflict, got {:?}", err);
    };
    assert_eq!(conflict.expected_db_record_version, Some(2));
    assert_eq!(conflict.actual_db_record_version, Some(1));
}

#[test]
fn test_set_of_missing_run_is_not_found() {
    let (store, session) = create_store();
    let mut s = snapshot(WF, RunId::new());
    s.db_record_version = 2;

    let err = store.set_execution(&set_request(s)).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(session.row_count("executions"), 0);
}
