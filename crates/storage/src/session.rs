//! Session contract
//!
//! A [`Session`] is the connection to the wide-column store. It offers four
//! primitives and nothing else:
//!
//! - point read (`query_one`)
//! - paged partition scan (`query_page`)
//! - single statement execution (`execute`)
//! - atomic conditional batch execution (`execute_batch`)
//!
//! Failures are classified into [`StoreError`] so callers can tell a rejected
//! lightweight transaction apart from an absent row or a transport failure.

use crate::statement::{Batch, Query, Statement};
use crate::value::Row;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Classified store failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// A conditional write (or a batch containing one) was not applied
    #[error("conditional write rejected")]
    ConditionFailed,

    /// Point read found no row
    #[error("row not found")]
    NotFound,

    /// Deadline expired before the call completed
    #[error("deadline exceeded")]
    Timeout,

    /// Page token could not be decoded
    #[error("invalid page token")]
    InvalidPageToken,

    /// Any other transport or server failure
    #[error("I/O error: {0}")]
    Io(String),
}

impl StoreError {
    /// Check if this is a rejected conditional write
    pub fn is_condition_failed(&self) -> bool {
        matches!(self, StoreError::ConditionFailed)
    }

    /// Check if this is a missing row
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

/// Result type for session calls
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Caller-supplied bound on how long a call may take
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline
    pub fn none() -> Self {
        Deadline(None)
    }

    /// Expires `timeout` from now
    pub fn after(timeout: Duration) -> Self {
        Deadline(Instant::now().checked_add(timeout))
    }

    /// Expires at `instant`
    pub fn at(instant: Instant) -> Self {
        Deadline(Some(instant))
    }

    /// Whether the deadline has passed
    pub fn is_expired(&self) -> bool {
        match self.0 {
            Some(at) => Instant::now() >= at,
            None => false,
        }
    }

    /// Time left, `None` when unbounded
    pub fn remaining(&self) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(Instant::now()))
    }

    /// Fail with [`StoreError::Timeout`] if expired
    pub fn check(&self) -> StoreResult<()> {
        if self.is_expired() {
            Err(StoreError::Timeout)
        } else {
            Ok(())
        }
    }
}

impl Default for Deadline {
    fn default() -> Self {
        Self::none()
    }
}

/// Paging request for a partition scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paging {
    /// Maximum rows to return
    pub page_size: usize,
    /// Opaque token from a previous page; empty for the first page
    pub page_state: Vec<u8>,
}

/// One page of a partition scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Rows in clustering order
    pub rows: Vec<Row>,
    /// Token for the next page; empty when the scan is exhausted
    pub page_state: Vec<u8>,
}

/// Connection to the wide-column store
///
/// Implementations must make `execute_batch` all-or-nothing: every
/// condition in the batch is evaluated against the same pre-batch state and
/// either every statement is applied or none is.
pub trait Session: Send + Sync {
    /// Point read of a single row
    ///
    /// # Errors
    ///
    /// - `NotFound`: no row at the key
    /// - `Timeout`, `Io`: transport failures
    fn query_one(&self, query: &Query, deadline: &Deadline) -> StoreResult<Row>;

    /// Scan one page of a partition in clustering order
    ///
    /// Repeating a call with the same token returns the same page.
    fn query_page(&self, query: &Query, paging: &Paging, deadline: &Deadline)
        -> StoreResult<Page>;

    /// Execute a single statement
    ///
    /// Returns whether the statement was applied. An unconditional
    /// statement always applies; a conditional one reports `false` rather
    /// than failing when its predicate does not hold.
    fn execute(&self, statement: &Statement, deadline: &Deadline) -> StoreResult<bool>;

    /// Execute a batch atomically
    ///
    /// # Errors
    ///
    /// - `ConditionFailed`: at least one predicate did not hold; nothing applied
    /// - `Timeout`, `Io`: transport failures; nothing applied
    fn execute_batch(&self, batch: &Batch, deadline: &Deadline) -> StoreResult<()>;
}
