//! ListConcreteExecutions Tests

use crate::*;
use execstore::storage::{PrimaryKey, Statement};
use execstore::{Deadline, Error, ListExecutionsRequest, RunId, Session, StoreError};
use std::collections::BTreeSet;

fn list_request(page_size: usize, page_token: Vec<u8>) -> ListExecutionsRequest {
    ListExecutionsRequest {
        shard_id: SHARD,
        page_size,
        page_token,
    }
}

/// Create `count` runs, each the current run of its own workflow
fn create_runs(store: &execstore::ExecutionStore, count: usize) -> BTreeSet<RunId> {
    (0..count)
        .map(|i| {
            let run_id = RunId::new();
            create_brand_new(store, &format!("w{}", i), run_id);
            run_id
        })
        .collect()
}

#[test]
fn test_list_empty_shard() {
    let (store, _) = create_store();
    let page = store.list_executions(&list_request(10, Vec::new())).unwrap();
    assert!(page.executions.is_empty());
    assert!(page.next_page_token.is_empty());
}

#[test]
fn test_list_pages_through_every_run() {
    let (store, _) = create_store();
    let created = create_runs(&store, 5);

    let mut seen = BTreeSet::new();
    let mut token = Vec::new();
    let mut pages = 0;
    loop {
        let page = store.list_executions(&list_request(2, token)).unwrap();
        assert!(page.executions.len() <= 2);
        seen.extend(page.executions.iter().map(|e| e.run_id));
        pages += 1;
        if page.next_page_token.is_empty() {
            break;
        }
        token = page.next_page_token;
    }

    assert_eq!(seen, created);
    assert_eq!(pages, 3);
}

#[test]
fn test_list_reports_keys_and_state() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    let page = store.list_executions(&list_request(10, Vec::new())).unwrap();
    assert_eq!(page.executions.len(), 1);
    let summary = &page.executions[0];
    assert_eq!(summary.namespace_id, NS);
    assert_eq!(summary.workflow_id, WF);
    assert_eq!(summary.run_id, r1);
    assert_eq!(summary.execution_info, blob(b"info"));
    assert_eq!(summary.next_event_id, 2);
}

#[test]
fn test_same_token_returns_same_page() {
    let (store, _) = create_store();
    create_runs(&store, 4);

    let first = store.list_executions(&list_request(2, Vec::new())).unwrap();
    let again = store
        .list_executions(&list_request(2, first.next_page_token.clone()))
        .unwrap();
    let once_more = store
        .list_executions(&list_request(2, first.next_page_token.clone()))
        .unwrap();
    assert_eq!(again, once_more);
}

#[test]
fn test_page_size_clamped_to_config() {
    let (store, _) = create_store_with(|b| b.max_page_size(2));
    create_runs(&store, 3);

    let page = store.list_executions(&list_request(100, Vec::new())).unwrap();
    assert_eq!(page.executions.len(), 2);
    assert!(!page.next_page_token.is_empty());
}

#[test]
fn test_zero_page_size_is_internal() {
    let (store, session) = create_store();
    let err = store.list_executions(&list_request(0, Vec::new())).unwrap_err();
    assert!(matches!(err, Error::Internal(_)));
    assert_eq!(session.stats().page_reads, 0);
}

#[test]
fn test_foreign_token_is_rejected() {
    let (store, _) = create_store();
    create_runs(&store, 1);
    let err = store
        .list_executions(&list_request(10, vec![0xc1]))
        .unwrap_err();
    assert!(matches!(err, Error::Store(StoreError::InvalidPageToken)));
}

#[test]
fn test_rows_without_execution_are_skipped() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);

    let key = PrimaryKey::partition("shard_id", SHARD)
        .clustering("namespace_id", NS)
        .clustering("workflow_id", "partial")
        .clustering("run_id", RunId::new().as_uuid());
    let stmt = Statement::insert("executions", key).value("next_event_id", 1i64);
    session.execute(&stmt, &Deadline::none()).unwrap();

    let page = store.list_executions(&list_request(10, Vec::new())).unwrap();
    assert_eq!(page.executions.len(), 1);
    assert_eq!(page.executions[0].run_id, r1);
}

#[test]
fn test_list_is_scoped_to_shard() {
    let (store, session) = create_store();
    seed_shard(&session, 2, 1);
    create_runs(&store, 2);

    let page = store
        .list_executions(&ListExecutionsRequest {
            shard_id: 2,
            page_size: 10,
            page_token: Vec::new(),
        })
        .unwrap();
    assert!(page.executions.is_empty());
}
