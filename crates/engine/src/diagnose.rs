//! Conflict diagnosis
//!
//! The store reports a rejected batch with a single "condition failed"
//! signal. Diagnosis narrows it down: it runs a list of independent,
//! read-only checks in a fixed order and returns the first concrete
//! violation.
//!
//! 1. Lease: stored `range_id` against the one the batch was fenced on
//! 2. Runs: each execution record the batch assumed something about
//! 3. Current record: the expectation the current-record write was built on
//!
//! When nothing is found the race resolved itself between the rejection and
//! the reads; the caller gets an unattributed `WorkflowConflict` and retries
//! with fresh state.
//!
//! Checks never write and are never retried here. A read failure inside a
//! check is returned as is.

use crate::batch::{RecordExpectation, RunExpectation, WriteBatch};
use crate::current::read_current;
use crate::lease::{check_ownership, read_range_id};
use crate::mapper::ExecutionVersionRow;
use crate::schema;
use execstore_core::{Error, Result, ShardId, WorkflowConflict};
use execstore_storage::{Deadline, Session, StoreError};
use tracing::warn;

/// Outcome of one check
#[derive(Debug)]
pub enum Finding {
    /// The assumption holds on disk
    NoViolation,
    /// The assumption is broken; this is the error to report
    Violation(Error),
}

type Check<'a> = Box<dyn FnOnce() -> Result<Finding> + 'a>;

/// Ordered list of deferred checks
pub struct Diagnoser<'a> {
    checks: Vec<(&'static str, Check<'a>)>,
}

impl<'a> Diagnoser<'a> {
    /// Empty diagnoser
    pub fn new() -> Self {
        Self { checks: Vec::new() }
    }

    /// Queue a check; checks run in the order they were added
    pub fn add(&mut self, name: &'static str, check: impl FnOnce() -> Result<Finding> + 'a) {
        self.checks.push((name, Box::new(check)));
    }

    /// Number of queued checks
    pub fn len(&self) -> usize {
        self.checks.len()
    }

    /// True if no check is queued
    pub fn is_empty(&self) -> bool {
        self.checks.is_empty()
    }

    /// Run checks until one reports a violation
    ///
    /// Returns `Ok(None)` if every check passed.
    ///
    /// # Errors
    ///
    /// The first read failure, unchanged.
    pub fn run(self) -> Result<Option<(&'static str, Error)>> {
        for (name, check) in self.checks {
            if let Finding::Violation(err) = check()? {
                return Ok(Some((name, err)));
            }
        }
        Ok(None)
    }
}

impl Default for Diagnoser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify the rejection of `write`
///
/// Always returns an error: the violation found, a read failure hit while
/// looking, or an unattributed `WorkflowConflict`.
pub fn diagnose<S: Session + ?Sized>(session: &S, write: &WriteBatch, deadline: &Deadline) -> Error {
    let mut diagnoser = Diagnoser::new();

    diagnoser.add("lease", move || {
        let actual = read_range_id(session, write.shard_id, deadline)?;
        Ok(match check_ownership(write.shard_id, write.range_id, actual) {
            Ok(()) => Finding::NoViolation,
            Err(e) => Finding::Violation(e),
        })
    });

    for run in &write.runs {
        diagnoser.add("execution", move || {
            check_run(session, write.shard_id, run, deadline, write.operation)
        });
    }

    if let Some(expected) = write.current {
        diagnoser.add("current", move || {
            let stored = read_current(
                session,
                write.shard_id,
                &write.namespace_id,
                &write.workflow_id,
                deadline,
                write.operation,
            )?;
            Ok(match expected.check(stored) {
                Ok(()) => Finding::NoViolation,
                Err(e) => Finding::Violation(e),
            })
        });
    }

    match diagnoser.run() {
        Ok(Some((check, err))) => {
            warn!(
                "{} rejected on shard {} {}/{}: {} check failed: {}",
                write.operation, write.shard_id, write.namespace_id, write.workflow_id, check, err
            );
            err
        }
        Ok(None) => {
            warn!(
                "{} rejected on shard {} {}/{}: no violation found on re-read",
                write.operation, write.shard_id, write.namespace_id, write.workflow_id
            );
            Error::WorkflowConflict(Box::new(WorkflowConflict::unattributed(
                write.shard_id,
                write.namespace_id.clone(),
                write.workflow_id.clone(),
            )))
        }
        Err(e) => e,
    }
}

/// Compare one run's stored versions with what the batch assumed
fn check_run<S: Session + ?Sized>(
    session: &S,
    shard_id: ShardId,
    run: &RunExpectation,
    deadline: &Deadline,
    operation: &'static str,
) -> Result<Finding> {
    let query = schema::get_execution_versions(
        shard_id,
        &run.namespace_id,
        &run.workflow_id,
        run.run_id,
    );
    let stored = match session.query_one(&query, deadline) {
        Ok(row) => {
            ExecutionVersionRow::decode(&row).map_err(|m| Error::type_mismatch(operation, m))?
        }
        Err(StoreError::NotFound) => {
            return Ok(match run.expected {
                RecordExpectation::Absent => Finding::NoViolation,
                _ => Finding::Violation(Error::NotFound(format!(
                    "Workflow does not exist: {}/{} run {}",
                    run.namespace_id, run.workflow_id, run.run_id
                ))),
            });
        }
        Err(e) => return Err(e.into()),
    };

    let conflict = WorkflowConflict {
        run_id: Some(run.run_id),
        actual_db_record_version: Some(stored.db_record_version),
        actual_next_event_id: Some(stored.next_event_id),
        ..WorkflowConflict::unattributed(shard_id, run.namespace_id.clone(), run.workflow_id.clone())
    };
    let conflict = match run.expected {
        RecordExpectation::Absent => conflict,
        RecordExpectation::Version(v) if stored.db_record_version != v => WorkflowConflict {
            expected_db_record_version: Some(v),
            ..conflict
        },
        RecordExpectation::NextEventId(n) if stored.next_event_id != n => WorkflowConflict {
            expected_next_event_id: Some(n),
            ..conflict
        },
        _ => return Ok(Finding::NoViolation),
    };
    Ok(Finding::Violation(Error::WorkflowConflict(Box::new(conflict))))
}
