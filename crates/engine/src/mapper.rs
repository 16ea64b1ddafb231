//! Row to domain mapping
//!
//! Rows come back from the session as untyped column maps. Each query shape
//! has a typed view here that decodes every field it needs with an explicit
//! outcome: a value of the expected type, or a [`TypeMismatch`] naming the
//! column, the expected shape, what was found and the whole row.
//!
//! ## Lenient columns
//!
//! - `db_record_version` absent: rows written before versioning, read as `0`
//! - collection columns absent: the store drops empty collections, read as empty
//! - map encoding absent: allowed only while the map itself is empty

use crate::schema::{col, MapColumn};
use execstore_core::{
    CurrentWorkflowConflict, DataBlob, EncodingType, ExecutionState, ExecutionSummary, RunId,
    TypeMismatch, WorkflowExecutionState, WorkflowMutableState,
};
use execstore_storage::{CqlValue, Row};
use std::collections::{BTreeMap, BTreeSet};

/// Result of decoding a row
pub type DecodeResult<T> = std::result::Result<T, TypeMismatch>;

/// Typed accessors over one row
struct Fields<'a> {
    row: &'a Row,
}

impl<'a> Fields<'a> {
    fn new(row: &'a Row) -> Self {
        Self { row }
    }

    fn mismatch(&self, column: &str, expected: &'static str) -> TypeMismatch {
        let actual = match self.row.get(column) {
            Some(v) => format!("{} {}", v.type_name(), v),
            None => "<missing>".to_string(),
        };
        TypeMismatch {
            column: column.to_string(),
            expected,
            actual,
            row: self.row.to_string(),
        }
    }

    fn bigint(&self, column: &str) -> DecodeResult<i64> {
        self.row
            .get(column)
            .and_then(CqlValue::as_bigint)
            .ok_or_else(|| self.mismatch(column, "bigint"))
    }

    fn optional_bigint(&self, column: &str) -> DecodeResult<Option<i64>> {
        match self.row.get(column) {
            None => Ok(None),
            Some(v) => v
                .as_bigint()
                .map(Some)
                .ok_or_else(|| self.mismatch(column, "bigint")),
        }
    }

    fn text(&self, column: &str) -> DecodeResult<&'a str> {
        let row = self.row;
        row.get(column)
            .and_then(CqlValue::as_text)
            .ok_or_else(|| self.mismatch(column, "text"))
    }

    fn uuid(&self, column: &str) -> DecodeResult<RunId> {
        self.row
            .get(column)
            .and_then(CqlValue::as_uuid)
            .map(RunId::from)
            .ok_or_else(|| self.mismatch(column, "uuid"))
    }

    /// A blob column and its encoding column
    fn blob(&self, column: &str, encoding: &str) -> DecodeResult<DataBlob> {
        let data = self
            .row
            .get(column)
            .and_then(CqlValue::as_blob)
            .ok_or_else(|| self.mismatch(column, "blob"))?;
        let encoding = self.text(encoding)?;
        Ok(DataBlob::from_stored(data.to_vec(), encoding))
    }

    fn workflow_state(&self, column: &str) -> DecodeResult<WorkflowExecutionState> {
        match self.row.get(column) {
            None => Ok(WorkflowExecutionState::Unspecified),
            Some(v) => v
                .as_int()
                .and_then(WorkflowExecutionState::from_code)
                .ok_or_else(|| self.mismatch(column, "int workflow state")),
        }
    }

    /// A sub-entity map, keys decoded by `key`
    fn blob_map<K: Ord>(
        &self,
        column: MapColumn,
        key: impl Fn(&CqlValue) -> Option<K>,
        key_type: &'static str,
    ) -> DecodeResult<BTreeMap<K, DataBlob>> {
        let entries = match self.row.get(column.map) {
            None => return Ok(BTreeMap::new()),
            Some(CqlValue::Map(entries)) => entries,
            Some(_) => return Err(self.mismatch(column.map, key_type)),
        };
        let encoding = match self.row.get(column.encoding) {
            Some(CqlValue::Text(name)) => EncodingType::from_name(name),
            _ => return Err(self.mismatch(column.encoding, "text")),
        };

        let mut out = BTreeMap::new();
        for (k, v) in entries {
            let k = key(k).ok_or_else(|| self.mismatch(column.map, key_type))?;
            let data = v
                .as_blob()
                .ok_or_else(|| self.mismatch(column.map, key_type))?;
            out.insert(k, DataBlob::new(data.to_vec(), encoding.clone()));
        }
        Ok(out)
    }

    fn id_map(&self, column: MapColumn) -> DecodeResult<BTreeMap<i64, DataBlob>> {
        self.blob_map(column, CqlValue::as_bigint, "map<bigint, blob>")
    }

    fn named_map(&self, column: MapColumn) -> DecodeResult<BTreeMap<String, DataBlob>> {
        self.blob_map(
            column,
            |k| k.as_text().map(str::to_string),
            "map<text, blob>",
        )
    }

    fn text_set(&self, column: &str) -> DecodeResult<BTreeSet<String>> {
        match self.row.get(column) {
            None => Ok(BTreeSet::new()),
            Some(CqlValue::Set(values)) => values
                .iter()
                .map(|v| {
                    v.as_text()
                        .map(str::to_string)
                        .ok_or_else(|| self.mismatch(column, "set<text>"))
                })
                .collect(),
            Some(_) => Err(self.mismatch(column, "set<text>")),
        }
    }

    fn event_batches(&self, column: &str) -> DecodeResult<Vec<DataBlob>> {
        let elements = match self.row.get(column) {
            None => return Ok(Vec::new()),
            Some(CqlValue::List(elements)) => elements,
            Some(_) => return Err(self.mismatch(column, "list<events udt>")),
        };
        elements
            .iter()
            .map(|element| {
                let CqlValue::Udt(fields) = element else {
                    return Err(self.mismatch(column, "list<events udt>"));
                };
                let data = fields.get(col::UDT_DATA).and_then(CqlValue::as_blob);
                let encoding = fields.get(col::UDT_ENCODING_TYPE).and_then(CqlValue::as_text);
                match (data, encoding) {
                    (Some(data), Some(encoding)) => {
                        Ok(DataBlob::from_stored(data.to_vec(), encoding))
                    }
                    _ => Err(self.mismatch(column, "list<events udt>")),
                }
            })
            .collect()
    }
}

// =============================================================================
// Execution rows
// =============================================================================

/// Full execution row, as read by `GetExecution`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionRow {
    /// Decoded image
    pub state: WorkflowMutableState,
    /// Record version, `0` if the row predates versioning
    pub db_record_version: i64,
}

impl ExecutionRow {
    /// Decode a full execution row
    pub fn decode(row: &Row) -> DecodeResult<Self> {
        let f = Fields::new(row);
        let state = WorkflowMutableState {
            execution_info: f.blob(col::EXECUTION, col::EXECUTION_ENCODING)?,
            execution_state: f.blob(col::EXECUTION_STATE, col::EXECUTION_STATE_ENCODING)?,
            next_event_id: f.bigint(col::NEXT_EVENT_ID)?,
            activity_infos: f.id_map(crate::schema::ACTIVITY)?,
            timer_infos: f.named_map(crate::schema::TIMER)?,
            child_execution_infos: f.id_map(crate::schema::CHILD_EXECUTION)?,
            request_cancel_infos: f.id_map(crate::schema::REQUEST_CANCEL)?,
            signal_infos: f.id_map(crate::schema::SIGNAL)?,
            signal_requested_ids: f.text_set(col::SIGNAL_REQUESTED)?,
            buffered_events: f.event_batches(col::BUFFERED_EVENTS_LIST)?,
            checksum: f.blob(col::CHECKSUM, col::CHECKSUM_ENCODING)?,
        };
        Ok(Self {
            state,
            db_record_version: f.optional_bigint(col::DB_RECORD_VERSION)?.unwrap_or(0),
        })
    }
}

/// Version columns of an execution row, as read during diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionVersionRow {
    /// Run
    pub run_id: RunId,
    /// Record version, `0` if the row predates versioning
    pub db_record_version: i64,
    /// Next history event id
    pub next_event_id: i64,
}

impl ExecutionVersionRow {
    /// Decode the version columns
    pub fn decode(row: &Row) -> DecodeResult<Self> {
        let f = Fields::new(row);
        Ok(Self {
            run_id: f.uuid(col::RUN_ID)?,
            db_record_version: f.optional_bigint(col::DB_RECORD_VERSION)?.unwrap_or(0),
            next_event_id: f.bigint(col::NEXT_EVENT_ID)?,
        })
    }
}

/// Decode one row of a shard listing
///
/// Returns `None` for rows without an execution payload.
pub fn decode_summary(row: &Row) -> DecodeResult<Option<ExecutionSummary>> {
    if !row.contains(col::EXECUTION) {
        return Ok(None);
    }
    let f = Fields::new(row);
    Ok(Some(ExecutionSummary {
        namespace_id: f.text(col::NAMESPACE_ID)?.to_string(),
        workflow_id: f.text(col::WORKFLOW_ID)?.to_string(),
        run_id: f.uuid(col::RUN_ID)?,
        execution_info: f.blob(col::EXECUTION, col::EXECUTION_ENCODING)?,
        execution_state: f.blob(col::EXECUTION_STATE, col::EXECUTION_STATE_ENCODING)?,
        next_event_id: f.bigint(col::NEXT_EVENT_ID)?,
    }))
}

// =============================================================================
// Current-execution rows
// =============================================================================

/// Current-execution row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentExecutionRow {
    /// Run the record points at
    pub run_id: RunId,
    /// Encoded execution state of that run
    pub execution_state: DataBlob,
    /// Lifecycle state column
    pub state: WorkflowExecutionState,
    /// Last write version of that run
    pub last_write_version: i64,
}

impl CurrentExecutionRow {
    /// Decode a current-execution row
    pub fn decode(row: &Row) -> DecodeResult<Self> {
        let f = Fields::new(row);
        Ok(Self {
            run_id: f.uuid(col::CURRENT_RUN_ID)?,
            execution_state: f.blob(col::EXECUTION_STATE, col::EXECUTION_STATE_ENCODING)?,
            state: f.workflow_state(col::WORKFLOW_STATE)?,
            last_write_version: f.bigint(col::WORKFLOW_LAST_WRITE_VERSION)?,
        })
    }

    /// Conflict report carrying the stored values
    ///
    /// Request id, status and start time come from the state blob when it
    /// decodes; otherwise they are left unset.
    pub fn into_conflict(self, message: impl Into<String>) -> CurrentWorkflowConflict {
        let decoded = ExecutionState::from_blob(&self.execution_state).ok();
        let mut conflict = CurrentWorkflowConflict::missing(message);
        conflict.run_id = Some(self.run_id);
        conflict.state = self.state;
        conflict.last_write_version = self.last_write_version;
        if let Some(state) = decoded {
            conflict.create_request_id = state.create_request_id;
            conflict.status = state.status;
            conflict.start_time = state.start_time;
        }
        conflict
    }
}

// =============================================================================
// Shard rows
// =============================================================================

/// Shard row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShardRow {
    /// Lease token
    pub range_id: i64,
}

impl ShardRow {
    /// Decode a shard row
    pub fn decode(row: &Row) -> DecodeResult<Self> {
        Ok(Self {
            range_id: Fields::new(row).bigint(col::RANGE_ID)?,
        })
    }
}
