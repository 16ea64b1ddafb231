//! Statement values
//!
//! Reads and writes are expressed as plain values: a target table, a primary
//! key, an operation and (for writes) an optional lightweight-transaction
//! condition. Nothing is ever rendered into a query string, so caller data
//! can never change the shape of a statement.
//!
//! ```text
//! Statement::update(EXECUTIONS, key)
//!     .set("next_event_id", 12i64)
//!     .map_put("activity_map", 7i64, blob)
//!     .if_equals("db_record_version", 3i64)
//! ```

use crate::value::CqlValue;
use std::collections::BTreeSet;
use std::fmt;

/// A named column bound to a value
pub type Binding = (&'static str, CqlValue);

/// Primary key of a row: partition columns followed by clustering columns
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PrimaryKey {
    /// Partition key columns, in schema order
    pub partition: Vec<Binding>,
    /// Clustering key columns, in schema order
    pub clustering: Vec<Binding>,
}

impl PrimaryKey {
    /// Start a key with its first partition column
    pub fn partition(column: &'static str, value: impl Into<CqlValue>) -> Self {
        Self {
            partition: vec![(column, value.into())],
            clustering: Vec::new(),
        }
    }

    /// Append a partition column
    pub fn and_partition(mut self, column: &'static str, value: impl Into<CqlValue>) -> Self {
        self.partition.push((column, value.into()));
        self
    }

    /// Append a clustering column
    pub fn clustering(mut self, column: &'static str, value: impl Into<CqlValue>) -> Self {
        self.clustering.push((column, value.into()));
        self
    }

    /// Partition key values without column names
    pub fn partition_values(&self) -> Vec<CqlValue> {
        self.partition.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Clustering key values without column names
    pub fn clustering_values(&self) -> Vec<CqlValue> {
        self.clustering.iter().map(|(_, v)| v.clone()).collect()
    }

    /// All key bindings, partition first
    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.partition.iter().chain(self.clustering.iter())
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (c, v)) in self.bindings().enumerate() {
            if i > 0 {
                write!(f, " and ")?;
            }
            write!(f, "{} = {}", c, v)?;
        }
        Ok(())
    }
}

/// A single column update inside an `UPDATE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// `column = value`
    Set(&'static str, CqlValue),
    /// `column[key] = value`
    MapPut {
        /// Map column
        column: &'static str,
        /// Entry key
        key: CqlValue,
        /// Entry value
        value: CqlValue,
    },
    /// `DELETE column[key]`
    MapRemove {
        /// Map column
        column: &'static str,
        /// Entry key
        key: CqlValue,
    },
    /// `column = column + {values}`
    SetAdd {
        /// Set column
        column: &'static str,
        /// Members to add
        values: BTreeSet<CqlValue>,
    },
    /// `column = column - {values}`
    SetRemove {
        /// Set column
        column: &'static str,
        /// Members to remove
        values: BTreeSet<CqlValue>,
    },
    /// `column = column + [values]`
    ListAppend {
        /// List column
        column: &'static str,
        /// Elements to append, in order
        values: Vec<CqlValue>,
    },
}

impl Assignment {
    /// The column this assignment touches
    pub fn column(&self) -> &'static str {
        match self {
            Assignment::Set(c, _) => c,
            Assignment::MapPut { column, .. }
            | Assignment::MapRemove { column, .. }
            | Assignment::SetAdd { column, .. }
            | Assignment::SetRemove { column, .. }
            | Assignment::ListAppend { column, .. } => column,
        }
    }
}

/// What a statement does to its row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// `INSERT` of the given columns (key columns are implied)
    Insert(Vec<Binding>),
    /// `UPDATE` with the given assignments; creates the row if absent
    Update(Vec<Assignment>),
    /// `DELETE` of the whole row
    Delete,
}

/// Lightweight-transaction predicate attached to a write
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Condition {
    /// Unconditional
    #[default]
    None,
    /// `IF NOT EXISTS`
    IfNotExists,
    /// `IF c1 = v1 AND c2 = v2 ...`; an absent row never matches
    IfEquals(Vec<Binding>),
}

impl Condition {
    /// True if this is a lightweight transaction
    pub fn is_conditional(&self) -> bool {
        !matches!(self, Condition::None)
    }
}

/// A write statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Target table
    pub table: &'static str,
    /// Target row
    pub key: PrimaryKey,
    /// Operation
    pub mutation: Mutation,
    /// Predicate, evaluated atomically with the write
    pub condition: Condition,
}

impl Statement {
    /// `INSERT INTO table (...)`
    pub fn insert(table: &'static str, key: PrimaryKey) -> Self {
        Self {
            table,
            key,
            mutation: Mutation::Insert(Vec::new()),
            condition: Condition::None,
        }
    }

    /// `UPDATE table SET ...`
    pub fn update(table: &'static str, key: PrimaryKey) -> Self {
        Self {
            table,
            key,
            mutation: Mutation::Update(Vec::new()),
            condition: Condition::None,
        }
    }

    /// `DELETE FROM table`
    pub fn delete(table: &'static str, key: PrimaryKey) -> Self {
        Self {
            table,
            key,
            mutation: Mutation::Delete,
            condition: Condition::None,
        }
    }

    /// Bind a column value on an insert, or `SET column = value` on an update
    pub fn value(mut self, column: &'static str, value: impl Into<CqlValue>) -> Self {
        let value = value.into();
        match &mut self.mutation {
            Mutation::Insert(values) => values.push((column, value)),
            Mutation::Update(assignments) => assignments.push(Assignment::Set(column, value)),
            Mutation::Delete => {}
        }
        self
    }

    /// `SET column = value`
    pub fn set(self, column: &'static str, value: impl Into<CqlValue>) -> Self {
        self.value(column, value)
    }

    /// `SET column[key] = value`
    pub fn map_put(
        self,
        column: &'static str,
        key: impl Into<CqlValue>,
        value: impl Into<CqlValue>,
    ) -> Self {
        self.assign(Assignment::MapPut {
            column,
            key: key.into(),
            value: value.into(),
        })
    }

    /// `DELETE column[key]`
    pub fn map_remove(self, column: &'static str, key: impl Into<CqlValue>) -> Self {
        self.assign(Assignment::MapRemove {
            column,
            key: key.into(),
        })
    }

    /// `SET column = column + {values}`
    pub fn set_add(self, column: &'static str, values: BTreeSet<CqlValue>) -> Self {
        self.assign(Assignment::SetAdd { column, values })
    }

    /// `SET column = column - {values}`
    pub fn set_remove(self, column: &'static str, values: BTreeSet<CqlValue>) -> Self {
        self.assign(Assignment::SetRemove { column, values })
    }

    /// `SET column = column + [values]`
    pub fn list_append(self, column: &'static str, values: Vec<CqlValue>) -> Self {
        self.assign(Assignment::ListAppend { column, values })
    }

    /// Add an arbitrary assignment to an update
    pub fn assign(mut self, assignment: Assignment) -> Self {
        if let Mutation::Update(assignments) = &mut self.mutation {
            assignments.push(assignment);
        }
        self
    }

    /// `IF NOT EXISTS`
    pub fn if_not_exists(mut self) -> Self {
        self.condition = Condition::IfNotExists;
        self
    }

    /// `IF column = value`, conjoined with any previous equality predicate
    pub fn if_equals(mut self, column: &'static str, value: impl Into<CqlValue>) -> Self {
        let value = value.into();
        match &mut self.condition {
            Condition::IfEquals(preds) => preds.push((column, value)),
            _ => self.condition = Condition::IfEquals(vec![(column, value)]),
        }
        self
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match &self.mutation {
            Mutation::Insert(_) => "INSERT",
            Mutation::Update(_) => "UPDATE",
            Mutation::Delete => "DELETE",
        };
        write!(f, "{} {} WHERE {}", op, self.table, self.key)?;
        match &self.condition {
            Condition::None => Ok(()),
            Condition::IfNotExists => write!(f, " IF NOT EXISTS"),
            Condition::IfEquals(preds) => {
                write!(f, " IF ")?;
                for (i, (c, v)) in preds.iter().enumerate() {
                    if i > 0 {
                        write!(f, " and ")?;
                    }
                    write!(f, "{} = {}", c, v)?;
                }
                Ok(())
            }
        }
    }
}

/// A read of named columns
///
/// With a full primary key this is a point read; with only the partition key
/// it scans the partition in clustering order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Source table
    pub table: &'static str,
    /// Key prefix (full key for point reads)
    pub key: PrimaryKey,
    /// Columns to return; key columns are always included
    pub columns: Vec<&'static str>,
}

impl Query {
    /// `SELECT columns FROM table WHERE key`
    pub fn select(table: &'static str, columns: &[&'static str], key: PrimaryKey) -> Self {
        Self {
            table,
            key,
            columns: columns.to_vec(),
        }
    }
}

/// An ordered set of write statements executed atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    statements: Vec<Statement>,
}

impl Batch {
    /// Create an empty batch
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a statement
    pub fn push(&mut self, statement: Statement) {
        self.statements.push(statement);
    }

    /// Statements in submission order
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Number of statements
    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// True if the batch holds no statements
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Number of conditional statements
    pub fn conditional_count(&self) -> usize {
        self.statements
            .iter()
            .filter(|s| s.condition.is_conditional())
            .count()
    }
}

impl Extend<Statement> for Batch {
    fn extend<T: IntoIterator<Item = Statement>>(&mut self, iter: T) {
        self.statements.extend(iter);
    }
}
