//! Cell values and rows
//!
//! The wide-column store is schema-typed: every cell carries one of a small
//! set of scalar or collection types. [`CqlValue`] models those types and
//! [`Row`] is the column → value view returned by reads.
//!
//! ## Collections
//!
//! An empty collection is indistinguishable from an unset cell on read:
//! writing `{}` or `[]` clears the cell, and reading it yields `None`.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use uuid::Uuid;

/// A typed cell value
///
/// Ordering is total so values can be used as clustering keys, map keys and
/// set members.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CqlValue {
    /// 32-bit signed integer (`int`)
    Int(i32),
    /// 64-bit signed integer (`bigint`)
    BigInt(i64),
    /// UTF-8 string (`text`)
    Text(String),
    /// UUID (`uuid`)
    Uuid(Uuid),
    /// Opaque bytes (`blob`)
    Blob(Vec<u8>),
    /// Map collection (`map<K, V>`)
    Map(BTreeMap<CqlValue, CqlValue>),
    /// Set collection (`set<T>`)
    Set(BTreeSet<CqlValue>),
    /// List collection (`list<T>`), order preserved
    List(Vec<CqlValue>),
    /// Frozen user-defined type, fields by name
    Udt(BTreeMap<String, CqlValue>),
}

impl CqlValue {
    /// Name of the cell type, used in diagnostics
    pub fn type_name(&self) -> &'static str {
        match self {
            CqlValue::Int(_) => "int",
            CqlValue::BigInt(_) => "bigint",
            CqlValue::Text(_) => "text",
            CqlValue::Uuid(_) => "uuid",
            CqlValue::Blob(_) => "blob",
            CqlValue::Map(_) => "map",
            CqlValue::Set(_) => "set",
            CqlValue::List(_) => "list",
            CqlValue::Udt(_) => "udt",
        }
    }

    /// True for collections holding no elements
    pub fn is_empty_collection(&self) -> bool {
        match self {
            CqlValue::Map(m) => m.is_empty(),
            CqlValue::Set(s) => s.is_empty(),
            CqlValue::List(l) => l.is_empty(),
            _ => false,
        }
    }

    /// Borrow as `bigint`
    pub fn as_bigint(&self) -> Option<i64> {
        match self {
            CqlValue::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow as `int`
    pub fn as_int(&self) -> Option<i32> {
        match self {
            CqlValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow as `text`
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as `blob`
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            CqlValue::Blob(v) => Some(v),
            _ => None,
        }
    }

    /// Borrow as `uuid`
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            CqlValue::Uuid(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for CqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CqlValue::Int(v) => write!(f, "{}", v),
            CqlValue::BigInt(v) => write!(f, "{}", v),
            CqlValue::Text(v) => write!(f, "'{}'", v),
            CqlValue::Uuid(v) => write!(f, "{}", v),
            CqlValue::Blob(v) => write!(f, "<blob {} bytes>", v.len()),
            CqlValue::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            CqlValue::Set(s) => {
                write!(f, "{{")?;
                for (i, v) in s.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "}}")
            }
            CqlValue::List(l) => {
                write!(f, "[")?;
                for (i, v) in l.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            CqlValue::Udt(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<i32> for CqlValue {
    fn from(v: i32) -> Self {
        CqlValue::Int(v)
    }
}

impl From<i64> for CqlValue {
    fn from(v: i64) -> Self {
        CqlValue::BigInt(v)
    }
}

impl From<&str> for CqlValue {
    fn from(v: &str) -> Self {
        CqlValue::Text(v.to_string())
    }
}

impl From<String> for CqlValue {
    fn from(v: String) -> Self {
        CqlValue::Text(v)
    }
}

impl From<Uuid> for CqlValue {
    fn from(v: Uuid) -> Self {
        CqlValue::Uuid(v)
    }
}

impl From<Vec<u8>> for CqlValue {
    fn from(v: Vec<u8>) -> Self {
        CqlValue::Blob(v)
    }
}

/// A row as returned by a read: column name → value
///
/// Columns that are unset (or hold an empty collection) are absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    columns: BTreeMap<String, CqlValue>,
}

impl Row {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a column value
    pub fn get(&self, column: &str) -> Option<&CqlValue> {
        self.columns.get(column)
    }

    /// Whether the column holds a value
    pub fn contains(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    /// Set a column value; empty collections clear the column
    pub fn set(&mut self, column: impl Into<String>, value: CqlValue) {
        let column = column.into();
        if value.is_empty_collection() {
            self.columns.remove(&column);
        } else {
            self.columns.insert(column, value);
        }
    }

    /// Remove a column
    pub fn remove(&mut self, column: &str) -> Option<CqlValue> {
        self.columns.remove(column)
    }

    /// Mutable access to a column, used for in-place collection updates
    pub(crate) fn entry(&mut self, column: &str) -> Option<&mut CqlValue> {
        self.columns.get_mut(column)
    }

    /// Iterate over present columns in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &CqlValue)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of present columns
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if no column is present
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Keep only the named columns
    pub fn project(&self, columns: &[&str]) -> Row {
        let mut out = Row::new();
        for c in columns {
            if let Some(v) = self.columns.get(*c) {
                out.columns.insert((*c).to_string(), v.clone());
            }
        }
        out
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (k, v)) in self.columns.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", k, v)?;
        }
        write!(f, "}}")
    }
}

impl FromIterator<(String, CqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, CqlValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (k, v) in iter {
            row.set(k, v);
        }
        row
    }
}
