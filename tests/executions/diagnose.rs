//! Conflict Diagnosis Tests
//!
//! A rejected batch is diagnosed by re-reading what it assumed, lease first.
//! These tests check the order of the checks, that transport failures pass
//! through untouched, and that diagnosis never writes.

use crate::*;
use execstore::storage::FaultTarget;
use execstore::{CreateWorkflowMode, Deadline, Error, RunId, StoreError, UpdateWorkflowMode};
use std::time::Instant;

// =============================================================================
// LEASE
// =============================================================================

#[test]
fn test_lease_loss_wins_over_other_violations() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);
    steal_shard(&session, SHARD, RANGE + 1);

    // Both the current record and the lease would reject this batch
    let err = store
        .create_execution(&create_request(CreateWorkflowMode::BrandNew, snapshot(WF, RunId::new())))
        .unwrap_err();

    let Error::ShardOwnershipLost {
        shard_id,
        expected_range_id,
        actual_range_id,
    } = err
    else {
        panic!("expected shard ownership lost, got {:?}", err);
    };
    assert_eq!(shard_id, SHARD);
    assert_eq!(expected_range_id, RANGE);
    assert_eq!(actual_range_id, Some(RANGE + 1));
}

#[test]
fn test_lease_loss_on_update_leaves_version() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);
    steal_shard(&session, SHARD, 9);

    let err = store
        .update_execution(&update_request(UpdateWorkflowMode::UpdateCurrent, mutation(WF, r1, 1)))
        .unwrap_err();

    assert!(err.is_shard_ownership_lost());
    assert!(!err.is_retryable());
    assert_eq!(get(&store, WF, r1).unwrap().db_record_version, 1);
}

#[test]
fn test_unprovisioned_shard_reports_missing_range() {
    let (store, _) = create_store();
    let mut request = create_request(CreateWorkflowMode::BrandNew, snapshot(WF, RunId::new()));
    request.shard_id = 42;

    let err = store.create_execution(&request).unwrap_err();
    assert!(matches!(
        err,
        Error::ShardOwnershipLost {
            shard_id: 42,
            actual_range_id: None,
            ..
        }
    ));
    assert!(err.to_string().contains("<missing>"));
}

#[test]
fn test_lease_guard_does_not_move_range() {
    let (store, session) = create_store();
    create_brand_new(&store, WF, RunId::new());
    assert_eq!(range_of(&session, SHARD), RANGE);
}

// =============================================================================
// UNATTRIBUTED
// =============================================================================

#[test]
fn test_rejection_without_violation_is_generic_conflict() {
    let (store, session) = create_store();
    session.inject_fault(FaultTarget::Batch, StoreError::ConditionFailed);

    let err = store
        .create_execution(&create_request(CreateWorkflowMode::BrandNew, snapshot(WF, RunId::new())))
        .unwrap_err();

    assert!(err.is_retryable());
    let Error::WorkflowConflict(conflict) = err else {
        panic!("expected workflow conflict, got {:?}", err);
    };
    assert_eq!(conflict.shard_id, SHARD);
    assert_eq!(conflict.namespace_id, NS);
    assert_eq!(conflict.workflow_id, WF);
    assert_eq!(conflict.run_id, None);
}

// =============================================================================
// TRANSPORT FAILURES
// =============================================================================

#[test]
fn test_batch_transport_failure_is_not_diagnosed() {
    let (store, session) = create_store();
    session.inject_fault(FaultTarget::Batch, StoreError::Io("connection reset".into()));
    let reads = session.stats().point_reads;

    let err = store
        .create_execution(&create_request(CreateWorkflowMode::BrandNew, snapshot(WF, RunId::new())))
        .unwrap_err();

    assert!(matches!(err, Error::Store(StoreError::Io(ref m)) if m == "connection reset"));
    assert!(err.is_retryable());
    assert_eq!(session.stats().point_reads, reads, "no diagnosis reads");
}

#[test]
fn test_read_failure_during_diagnosis_propagates() {
    let (store, session) = create_store();
    create_brand_new(&store, WF, RunId::new());
    session.inject_fault(FaultTarget::PointRead, StoreError::Timeout);

    let err = store
        .create_execution(&create_request(CreateWorkflowMode::BrandNew, snapshot(WF, RunId::new())))
        .unwrap_err();

    assert!(matches!(err, Error::Store(StoreError::Timeout)));
}

#[test]
fn test_expired_deadline_applies_nothing() {
    let (store, session) = create_store();
    let expired = Deadline::at(Instant::now());

    let err = store
        .create_execution_with_deadline(
            &create_request(CreateWorkflowMode::BrandNew, snapshot(WF, RunId::new())),
            &expired,
        )
        .unwrap_err();

    assert!(matches!(err, Error::Store(StoreError::Timeout)));
    assert_eq!(session.row_count("executions"), 0);
    assert_eq!(session.row_count("current_executions"), 0);
}

// =============================================================================
// READ-ONLY
// =============================================================================

#[test]
fn test_diagnosis_is_read_only_and_repeatable() {
    let (store, session) = create_store();
    let r1 = RunId::new();
    create_brand_new(&store, WF, r1);
    let rows = (
        session.row_count("executions"),
        session.row_count("current_executions"),
        session.row_count("shards"),
    );
    let executes = session.stats().executes;

    let request = create_request(CreateWorkflowMode::BrandNew, snapshot(WF, RunId::new()));
    let first = store.create_execution(&request).unwrap_err();
    let second = store.create_execution(&request).unwrap_err();

    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(
        rows,
        (
            session.row_count("executions"),
            session.row_count("current_executions"),
            session.row_count("shards"),
        )
    );
    assert_eq!(session.stats().executes, executes);
    assert_eq!(session.stats().rejected_batches, 2);
}
