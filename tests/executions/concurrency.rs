//! Concurrent Writer Tests
//!
//! Writers racing on the same CAS token: exactly one wins, every loser gets
//! a typed conflict naming the winner's state.

use crate::*;
use execstore::{CreateWorkflowMode, Error, RunId, UpdateWorkflowMode};
use std::sync::{Arc, Barrier};
use std::thread;

const WRITERS: usize = 8;

#[test]
fn test_concurrent_brand_new_creates_have_one_winner() {
    let (store, session) = create_store();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let run_id = RunId::new();
                barrier.wait();
                let result = store.create_execution(&create_request(
                    CreateWorkflowMode::BrandNew,
                    snapshot(WF, run_id),
                ));
                (run_id, result)
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let winners: Vec<RunId> = results
        .iter()
        .filter(|(_, r)| r.is_ok())
        .map(|(run_id, _)| *run_id)
        .collect();
    assert_eq!(winners.len(), 1, "exactly one create succeeds");
    let winner = winners[0];

    for (_, result) in results.iter().filter(|(_, r)| r.is_err()) {
        match result {
            Err(Error::CurrentWorkflowConflict(conflict)) => {
                assert_eq!(conflict.run_id, Some(winner));
            }
            other => panic!("expected current workflow conflict, got {:?}", other),
        }
    }
    assert_eq!(current_run(&store, WF), Some(winner));
    assert_eq!(session.row_count("executions"), 1);
    assert_eq!(session.row_count("current_executions"), 1);
}

#[test]
fn test_concurrent_updates_from_same_version() {
    let (store, _) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                store.update_execution(&update_request(
                    UpdateWorkflowMode::UpdateCurrent,
                    mutation(WF, r1, 1),
                ))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    for result in results.iter().filter(|r| r.is_err()) {
        match result {
            Err(Error::WorkflowConflict(conflict)) => {
                assert_eq!(conflict.expected_db_record_version, Some(1));
                assert_eq!(conflict.actual_db_record_version, Some(2));
            }
            other => panic!("expected workflow conflict, got {:?}", other),
        }
    }
    assert_eq!(get(&store, WF, r1).unwrap().db_record_version, 2);
}

#[test]
fn test_disjoint_workflows_proceed_in_parallel() {
    let (store, _) = create_store();
    let barrier = Arc::new(Barrier::new(WRITERS));

    let handles: Vec<_> = (0..WRITERS)
        .map(|i| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let workflow_id = format!("w{}", i);
                let run_id = RunId::new();
                barrier.wait();
                create_brand_new(&store, &workflow_id, run_id);
                for from in 1..=3 {
                    store
                        .update_execution(&update_request(
                            UpdateWorkflowMode::UpdateCurrent,
                            mutation(&workflow_id, run_id, from),
                        ))
                        .unwrap();
                }
                (workflow_id, run_id)
            })
        })
        .collect();

    for handle in handles {
        let (workflow_id, run_id) = handle.join().unwrap();
        assert_eq!(get(&store, &workflow_id, run_id).unwrap().db_record_version, 4);
        assert_eq!(current_run(&store, &workflow_id), Some(run_id));
    }
}
