//! Core identifier types
//!
//! This module defines the identifiers every persisted record is keyed by:
//! - [`ShardId`]: the shard owning a set of workflows
//! - [`RunId`]: unique identifier for one run of a workflow
//! - [`WorkflowKey`]: (namespace, workflow id) pair naming a workflow

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Shard identifier
pub type ShardId = i32;

/// Identifier of one run of a workflow
///
/// Stored as a `uuid` column in both the execution and the current-execution
/// tables, and echoed back in conflict reports.
///
/// ```
/// use execstore_core::types::RunId;
///
/// let run = RunId::new();
/// assert_eq!(run.to_string().parse::<RunId>().unwrap(), run);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Fresh random (v4) run id
    pub fn new() -> Self {
        RunId(Uuid::new_v4())
    }

    /// The underlying UUID, as bound into statements
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RunId {
    fn from(uuid: Uuid) -> Self {
        RunId(uuid)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(RunId)
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0.hyphenated(), f)
    }
}

/// A workflow id within a namespace
///
/// At most one run per workflow key is current on a shard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkflowKey {
    /// Namespace identifier
    pub namespace_id: String,
    /// Workflow identifier, unique within the namespace
    pub workflow_id: String,
}

impl WorkflowKey {
    /// Create a new workflow key
    pub fn new(namespace_id: impl Into<String>, workflow_id: impl Into<String>) -> Self {
        Self {
            namespace_id: namespace_id.into(),
            workflow_id: workflow_id.into(),
        }
    }
}

impl std::fmt::Display for WorkflowKey {
    /// Display in the format: namespace/workflow
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace_id, self.workflow_id)
    }
}
