//! In-memory session
//!
//! A single-process implementation of [`Session`] with lightweight-transaction
//! semantics, used for tests and for embedding without a cluster.
//!
//! # Design
//!
//! - DashMap keyed by (table, partition key): one entry per partition
//! - BTreeMap within a partition: rows in clustering order for paged scans
//! - Commit gate: a read/write lock so a batch's conditions are evaluated
//!   and its writes applied without any reader observing a partial batch
//!
//! # Semantics
//!
//! - `UPDATE` creates the row if it does not exist
//! - Conditions in a batch see the state before the batch
//! - Statements in a batch apply in submission order
//! - Empty collections read as absent

use crate::session::{Deadline, Page, Paging, Session, StoreError, StoreResult};
use crate::statement::{Assignment, Batch, Condition, Mutation, PrimaryKey, Query, Statement};
use crate::value::{CqlValue, Row};
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;
use std::sync::atomic::{AtomicU64, Ordering};

type PartitionKey = (&'static str, Vec<CqlValue>);
type ClusteringKey = Vec<CqlValue>;

/// Rows of one partition, in clustering order
#[derive(Debug, Default)]
struct Partition {
    rows: BTreeMap<ClusteringKey, Row>,
}

/// Which session call a fault applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultTarget {
    /// `query_one`
    PointRead,
    /// `query_page`
    PageRead,
    /// `execute`
    Execute,
    /// `execute_batch`
    Batch,
}

/// Call counters, for asserting what a caller did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Point reads served
    pub point_reads: u64,
    /// Pages served
    pub page_reads: u64,
    /// Single statements executed
    pub executes: u64,
    /// Batches submitted (applied or rejected)
    pub batches: u64,
    /// Batches rejected on a condition
    pub rejected_batches: u64,
}

/// In-memory wide-column store with lightweight transactions
pub struct MemorySession {
    partitions: DashMap<PartitionKey, Partition>,
    commit_gate: RwLock<()>,
    faults: Mutex<FxHashMap<FaultTarget, Vec<StoreError>>>,
    point_reads: AtomicU64,
    page_reads: AtomicU64,
    executes: AtomicU64,
    batches: AtomicU64,
    rejected_batches: AtomicU64,
}

impl MemorySession {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            partitions: DashMap::new(),
            commit_gate: RwLock::new(()),
            faults: Mutex::new(FxHashMap::default()),
            point_reads: AtomicU64::new(0),
            page_reads: AtomicU64::new(0),
            executes: AtomicU64::new(0),
            batches: AtomicU64::new(0),
            rejected_batches: AtomicU64::new(0),
        }
    }

    /// Make the next call of `target` fail with `error`
    ///
    /// Faults queue up per target and are consumed in order.
    pub fn inject_fault(&self, target: FaultTarget, error: StoreError) {
        self.faults.lock().entry(target).or_default().push(error);
    }

    /// Snapshot of call counters
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            point_reads: self.point_reads.load(Ordering::Relaxed),
            page_reads: self.page_reads.load(Ordering::Relaxed),
            executes: self.executes.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
            rejected_batches: self.rejected_batches.load(Ordering::Relaxed),
        }
    }

    /// Number of rows stored in a table, across partitions
    pub fn row_count(&self, table: &str) -> usize {
        let _gate = self.commit_gate.read();
        self.partitions
            .iter()
            .filter(|entry| entry.key().0 == table)
            .map(|entry| entry.value().rows.len())
            .sum()
    }

    fn take_fault(&self, target: FaultTarget) -> StoreResult<()> {
        let mut faults = self.faults.lock();
        if let Some(queue) = faults.get_mut(&target) {
            if !queue.is_empty() {
                return Err(queue.remove(0));
            }
        }
        Ok(())
    }

    fn read_row(&self, table: &'static str, key: &PrimaryKey) -> Option<Row> {
        self.partitions
            .get(&(table, key.partition_values()))
            .and_then(|p| p.rows.get(&key.clustering_values()).cloned())
    }

    fn condition_holds(&self, statement: &Statement) -> bool {
        match &statement.condition {
            Condition::None => true,
            Condition::IfNotExists => self.read_row(statement.table, &statement.key).is_none(),
            Condition::IfEquals(preds) => match self.read_row(statement.table, &statement.key) {
                Some(row) => preds.iter().all(|(c, v)| row.get(c) == Some(v)),
                None => false,
            },
        }
    }

    fn apply(&self, statement: &Statement) {
        let partition_key = (statement.table, statement.key.partition_values());
        let clustering = statement.key.clustering_values();

        match &statement.mutation {
            Mutation::Delete => {
                if let Some(mut partition) = self.partitions.get_mut(&partition_key) {
                    partition.rows.remove(&clustering);
                }
                self.partitions
                    .remove_if(&partition_key, |_, partition| partition.rows.is_empty());
            }
            Mutation::Insert(values) => {
                let mut partition = self.partitions.entry(partition_key).or_default();
                let row = partition
                    .rows
                    .entry(clustering)
                    .or_insert_with(|| key_row(statement));
                for (column, value) in values {
                    row.set(*column, value.clone());
                }
            }
            Mutation::Update(assignments) => {
                let mut partition = self.partitions.entry(partition_key).or_default();
                let row = partition
                    .rows
                    .entry(clustering)
                    .or_insert_with(|| key_row(statement));
                for assignment in assignments {
                    apply_assignment(row, assignment);
                }
            }
        }
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

/// A fresh row holding only its key columns
fn key_row(statement: &Statement) -> Row {
    statement
        .key
        .bindings()
        .map(|(c, v)| ((*c).to_string(), v.clone()))
        .collect()
}

fn apply_assignment(row: &mut Row, assignment: &Assignment) {
    match assignment {
        Assignment::Set(column, value) => row.set(*column, value.clone()),
        Assignment::MapPut { column, key, value } => match row.entry(column) {
            Some(CqlValue::Map(map)) => {
                map.insert(key.clone(), value.clone());
            }
            _ => {
                let mut map = BTreeMap::new();
                map.insert(key.clone(), value.clone());
                row.set(*column, CqlValue::Map(map));
            }
        },
        Assignment::MapRemove { column, key } => {
            if let Some(CqlValue::Map(map)) = row.entry(column) {
                map.remove(key);
                if map.is_empty() {
                    row.remove(column);
                }
            }
        }
        Assignment::SetAdd { column, values } => match row.entry(column) {
            Some(CqlValue::Set(set)) => set.extend(values.iter().cloned()),
            _ => row.set(*column, CqlValue::Set(values.clone())),
        },
        Assignment::SetRemove { column, values } => {
            if let Some(CqlValue::Set(set)) = row.entry(column) {
                let remaining: BTreeSet<CqlValue> = set.difference(values).cloned().collect();
                row.set(*column, CqlValue::Set(remaining));
            }
        }
        Assignment::ListAppend { column, values } => match row.entry(column) {
            Some(CqlValue::List(list)) => list.extend(values.iter().cloned()),
            _ => row.set(*column, CqlValue::List(values.clone())),
        },
    }
}

fn project(row: &Row, query: &Query) -> Row {
    if query.columns.is_empty() {
        return row.clone();
    }
    let mut columns: Vec<&str> = query.key.bindings().map(|(c, _)| *c).collect();
    columns.extend(query.columns.iter().copied());
    row.project(&columns)
}

impl Session for MemorySession {
    fn query_one(&self, query: &Query, deadline: &Deadline) -> StoreResult<Row> {
        deadline.check()?;
        self.take_fault(FaultTarget::PointRead)?;
        self.point_reads.fetch_add(1, Ordering::Relaxed);

        let _gate = self.commit_gate.read();
        self.read_row(query.table, &query.key)
            .map(|row| project(&row, query))
            .ok_or(StoreError::NotFound)
    }

    fn query_page(
        &self,
        query: &Query,
        paging: &Paging,
        deadline: &Deadline,
    ) -> StoreResult<Page> {
        deadline.check()?;
        self.take_fault(FaultTarget::PageRead)?;
        self.page_reads.fetch_add(1, Ordering::Relaxed);

        let after: Option<ClusteringKey> = if paging.page_state.is_empty() {
            None
        } else {
            Some(
                rmp_serde::from_slice(&paging.page_state)
                    .map_err(|_| StoreError::InvalidPageToken)?,
            )
        };

        let _gate = self.commit_gate.read();
        let partition = match self
            .partitions
            .get(&(query.table, query.key.partition_values()))
        {
            Some(p) => p,
            None => return Ok(Page::default()),
        };

        let lower = match &after {
            Some(k) => Bound::Excluded(k.clone()),
            None => Bound::Unbounded,
        };
        let prefix = query.key.clustering_values();
        let mut matching = partition
            .rows
            .range((lower, Bound::Unbounded))
            .filter(|(k, _)| k.starts_with(&prefix));

        let mut page = Page::default();
        let mut last: Option<&ClusteringKey> = None;
        for (k, row) in matching.by_ref().take(paging.page_size) {
            page.rows.push(project(row, query));
            last = Some(k);
        }

        if matching.next().is_some() {
            if let Some(k) = last {
                page.page_state =
                    rmp_serde::to_vec(k).map_err(|e| StoreError::Io(e.to_string()))?;
            }
        }
        Ok(page)
    }

    fn execute(&self, statement: &Statement, deadline: &Deadline) -> StoreResult<bool> {
        deadline.check()?;
        self.take_fault(FaultTarget::Execute)?;
        self.executes.fetch_add(1, Ordering::Relaxed);

        let _gate = self.commit_gate.write();
        if !self.condition_holds(statement) {
            return Ok(false);
        }
        self.apply(statement);
        Ok(true)
    }

    fn execute_batch(&self, batch: &Batch, deadline: &Deadline) -> StoreResult<()> {
        deadline.check()?;
        self.take_fault(FaultTarget::Batch)?;
        self.batches.fetch_add(1, Ordering::Relaxed);

        let _gate = self.commit_gate.write();

        // Every predicate is checked against the pre-batch state
        if !batch.statements().iter().all(|s| self.condition_holds(s)) {
            self.rejected_batches.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                statements = batch.len(),
                conditional = batch.conditional_count(),
                "batch rejected"
            );
            return Err(StoreError::ConditionFailed);
        }

        for statement in batch.statements() {
            self.apply(statement);
        }
        Ok(())
    }
}
