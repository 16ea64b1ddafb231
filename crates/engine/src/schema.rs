//! Persisted layout
//!
//! Tables, columns and the pure constructors that turn typed arguments into
//! [`Statement`] and [`Query`] values. Nothing here touches a session.
//!
//! | Table | Partition | Clustering |
//! |-------|-----------|------------|
//! | `shards` | `shard_id` | |
//! | `current_executions` | `shard_id` | `namespace_id`, `workflow_id` |
//! | `executions` | `shard_id` | `namespace_id`, `workflow_id`, `run_id` |
//!
//! Every blob column has a sibling `_encoding` text column.

use execstore_core::{DataBlob, RunId, ShardId};
use execstore_storage::{CqlValue, PrimaryKey, Query, Statement};
use std::collections::BTreeMap;

/// Shard lease table
pub const SHARDS: &str = "shards";
/// Current-execution pointer table
pub const CURRENT_EXECUTIONS: &str = "current_executions";
/// Execution record table
pub const EXECUTIONS: &str = "executions";

/// Column names
pub mod col {
    #![allow(missing_docs)]

    pub const SHARD_ID: &str = "shard_id";
    pub const NAMESPACE_ID: &str = "namespace_id";
    pub const WORKFLOW_ID: &str = "workflow_id";
    pub const RUN_ID: &str = "run_id";

    pub const RANGE_ID: &str = "range_id";

    pub const CURRENT_RUN_ID: &str = "current_run_id";
    pub const WORKFLOW_LAST_WRITE_VERSION: &str = "workflow_last_write_version";
    pub const WORKFLOW_STATE: &str = "workflow_state";

    pub const EXECUTION: &str = "execution";
    pub const EXECUTION_ENCODING: &str = "execution_encoding";
    pub const EXECUTION_STATE: &str = "execution_state";
    pub const EXECUTION_STATE_ENCODING: &str = "execution_state_encoding";
    pub const NEXT_EVENT_ID: &str = "next_event_id";
    pub const DB_RECORD_VERSION: &str = "db_record_version";
    pub const CHECKSUM: &str = "checksum";
    pub const CHECKSUM_ENCODING: &str = "checksum_encoding";

    pub const ACTIVITY_MAP: &str = "activity_map";
    pub const ACTIVITY_MAP_ENCODING: &str = "activity_map_encoding";
    pub const TIMER_MAP: &str = "timer_map";
    pub const TIMER_MAP_ENCODING: &str = "timer_map_encoding";
    pub const CHILD_EXECUTIONS_MAP: &str = "child_executions_map";
    pub const CHILD_EXECUTIONS_MAP_ENCODING: &str = "child_executions_map_encoding";
    pub const REQUEST_CANCEL_MAP: &str = "request_cancel_map";
    pub const REQUEST_CANCEL_MAP_ENCODING: &str = "request_cancel_map_encoding";
    pub const SIGNAL_MAP: &str = "signal_map";
    pub const SIGNAL_MAP_ENCODING: &str = "signal_map_encoding";
    pub const SIGNAL_REQUESTED: &str = "signal_requested";
    pub const BUFFERED_EVENTS_LIST: &str = "buffered_events_list";

    /// Fields of a buffered-events list element
    pub const UDT_ENCODING_TYPE: &str = "encoding_type";
    pub const UDT_VERSION: &str = "version";
    pub const UDT_DATA: &str = "data";
}

/// A sub-entity map column and its encoding column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapColumn {
    /// Map column
    pub map: &'static str,
    /// Encoding column
    pub encoding: &'static str,
}

/// Activity infos
pub const ACTIVITY: MapColumn = MapColumn {
    map: col::ACTIVITY_MAP,
    encoding: col::ACTIVITY_MAP_ENCODING,
};
/// Timer infos
pub const TIMER: MapColumn = MapColumn {
    map: col::TIMER_MAP,
    encoding: col::TIMER_MAP_ENCODING,
};
/// Child execution infos
pub const CHILD_EXECUTION: MapColumn = MapColumn {
    map: col::CHILD_EXECUTIONS_MAP,
    encoding: col::CHILD_EXECUTIONS_MAP_ENCODING,
};
/// Request-cancel infos
pub const REQUEST_CANCEL: MapColumn = MapColumn {
    map: col::REQUEST_CANCEL_MAP,
    encoding: col::REQUEST_CANCEL_MAP_ENCODING,
};
/// Signal infos
pub const SIGNAL: MapColumn = MapColumn {
    map: col::SIGNAL_MAP,
    encoding: col::SIGNAL_MAP_ENCODING,
};

// =============================================================================
// Keys
// =============================================================================

/// Key of a shard row
pub fn shard_key(shard_id: ShardId) -> PrimaryKey {
    PrimaryKey::partition(col::SHARD_ID, shard_id)
}

/// Key of a current-execution row
pub fn current_key(shard_id: ShardId, namespace_id: &str, workflow_id: &str) -> PrimaryKey {
    PrimaryKey::partition(col::SHARD_ID, shard_id)
        .clustering(col::NAMESPACE_ID, namespace_id)
        .clustering(col::WORKFLOW_ID, workflow_id)
}

/// Key of an execution row
pub fn execution_key(
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    run_id: RunId,
) -> PrimaryKey {
    PrimaryKey::partition(col::SHARD_ID, shard_id)
        .clustering(col::NAMESPACE_ID, namespace_id)
        .clustering(col::WORKFLOW_ID, workflow_id)
        .clustering(col::RUN_ID, run_id.as_uuid())
}

// =============================================================================
// Queries
// =============================================================================

/// `SELECT range_id FROM shards`
pub fn get_lease(shard_id: ShardId) -> Query {
    Query::select(SHARDS, &[col::RANGE_ID], shard_key(shard_id))
}

/// Full execution row
pub fn get_execution(
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    run_id: RunId,
) -> Query {
    Query::select(
        EXECUTIONS,
        &[
            col::EXECUTION,
            col::EXECUTION_ENCODING,
            col::EXECUTION_STATE,
            col::EXECUTION_STATE_ENCODING,
            col::NEXT_EVENT_ID,
            col::ACTIVITY_MAP,
            col::ACTIVITY_MAP_ENCODING,
            col::TIMER_MAP,
            col::TIMER_MAP_ENCODING,
            col::CHILD_EXECUTIONS_MAP,
            col::CHILD_EXECUTIONS_MAP_ENCODING,
            col::REQUEST_CANCEL_MAP,
            col::REQUEST_CANCEL_MAP_ENCODING,
            col::SIGNAL_MAP,
            col::SIGNAL_MAP_ENCODING,
            col::SIGNAL_REQUESTED,
            col::BUFFERED_EVENTS_LIST,
            col::CHECKSUM,
            col::CHECKSUM_ENCODING,
            col::DB_RECORD_VERSION,
        ],
        execution_key(shard_id, namespace_id, workflow_id, run_id),
    )
}

/// Version columns of an execution row, read during diagnosis
pub fn get_execution_versions(
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    run_id: RunId,
) -> Query {
    Query::select(
        EXECUTIONS,
        &[col::RUN_ID, col::DB_RECORD_VERSION, col::NEXT_EVENT_ID],
        execution_key(shard_id, namespace_id, workflow_id, run_id),
    )
}

/// Current-execution row
pub fn get_current(shard_id: ShardId, namespace_id: &str, workflow_id: &str) -> Query {
    Query::select(
        CURRENT_EXECUTIONS,
        &[
            col::CURRENT_RUN_ID,
            col::EXECUTION_STATE,
            col::EXECUTION_STATE_ENCODING,
            col::WORKFLOW_STATE,
            col::WORKFLOW_LAST_WRITE_VERSION,
        ],
        current_key(shard_id, namespace_id, workflow_id),
    )
}

/// Every execution row on a shard, for paging
pub fn list_executions(shard_id: ShardId) -> Query {
    Query::select(
        EXECUTIONS,
        &[
            col::NAMESPACE_ID,
            col::WORKFLOW_ID,
            col::RUN_ID,
            col::EXECUTION,
            col::EXECUTION_ENCODING,
            col::EXECUTION_STATE,
            col::EXECUTION_STATE_ENCODING,
            col::NEXT_EVENT_ID,
        ],
        shard_key(shard_id),
    )
}

// =============================================================================
// Statements
// =============================================================================

/// Delete an execution row unconditionally
pub fn delete_execution(
    shard_id: ShardId,
    namespace_id: &str,
    workflow_id: &str,
    run_id: RunId,
) -> Statement {
    Statement::delete(
        EXECUTIONS,
        execution_key(shard_id, namespace_id, workflow_id, run_id),
    )
}

/// Replace a whole sub-entity map
pub fn reset_map<K: Into<CqlValue> + Clone>(
    key: PrimaryKey,
    column: MapColumn,
    entries: &BTreeMap<K, DataBlob>,
) -> Statement {
    let encoding = map_encoding(entries.values());
    let map: BTreeMap<CqlValue, CqlValue> = entries
        .iter()
        .map(|(k, v)| (k.clone().into(), CqlValue::Blob(v.data.clone())))
        .collect();
    Statement::update(EXECUTIONS, key)
        .set(column.map, CqlValue::Map(map))
        .set(column.encoding, encoding)
}

/// Put one entry into a sub-entity map
pub fn put_map_entry(
    key: PrimaryKey,
    column: MapColumn,
    entry_key: impl Into<CqlValue>,
    blob: &DataBlob,
) -> Statement {
    Statement::update(EXECUTIONS, key)
        .map_put(column.map, entry_key, CqlValue::Blob(blob.data.clone()))
        .set(column.encoding, blob.encoding.as_str())
}

/// Remove one entry from a sub-entity map
pub fn delete_map_entry(key: PrimaryKey, column: MapColumn, entry_key: impl Into<CqlValue>) -> Statement {
    Statement::update(EXECUTIONS, key).map_remove(column.map, entry_key)
}

/// Encoding name recorded for a map: that of its first entry
fn map_encoding<'a>(mut blobs: impl Iterator<Item = &'a DataBlob>) -> String {
    blobs
        .next()
        .map(|b| b.encoding.as_str().to_string())
        .unwrap_or_else(|| execstore_core::EncodingType::Unspecified.as_str().to_string())
}

/// One buffered-events list element
pub fn buffered_events_element(blob: &DataBlob) -> CqlValue {
    let mut fields = BTreeMap::new();
    fields.insert(
        col::UDT_ENCODING_TYPE.to_string(),
        CqlValue::Text(blob.encoding.as_str().to_string()),
    );
    fields.insert(col::UDT_VERSION.to_string(), CqlValue::BigInt(0));
    fields.insert(col::UDT_DATA.to_string(), CqlValue::Blob(blob.data.clone()));
    CqlValue::Udt(fields)
}
