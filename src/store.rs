//! Main entry point for execstore.
//!
//! [`ExecutionStore`] wraps the engine's `MutableStateStore` over a
//! type-erased session and adds configuration defaults. Each operation comes
//! in two forms:
//!
//! | Form | Deadline |
//! |------|----------|
//! | `op(&request)` | `default_timeout_ms` from the config, starting now |
//! | `op_with_deadline(&request, &deadline)` | caller supplied |

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use execstore_core::{
    ConflictResolveRequest, CreateExecutionRequest, DeleteCurrentExecutionRequest,
    DeleteExecutionRequest, GetCurrentExecutionRequest, GetCurrentExecutionResponse,
    GetExecutionRequest, GetExecutionResponse, ListExecutionsRequest, ListExecutionsResponse,
    SetExecutionRequest, UpdateExecutionRequest,
};
use execstore_engine::MutableStateStore;
use execstore_storage::{Deadline, MemorySession, Session};
use std::sync::Arc;
use std::time::Duration;

/// Workflow-execution persistence.
///
/// Cheap to clone; clones share the session.
///
/// # Example
///
/// ```ignore
/// use execstore::prelude::*;
///
/// let store = ExecutionStore::in_memory()?;
/// store.create_execution(&CreateExecutionRequest {
///     shard_id: 1,
///     range_id: 5,
///     mode: CreateWorkflowMode::BrandNew,
///     previous_run_id: None,
///     previous_last_write_version: 0,
///     new_workflow: snapshot,
/// })?;
/// ```
#[derive(Clone)]
pub struct ExecutionStore {
    inner: Arc<MutableStateStore<dyn Session>>,
    config: Arc<StoreConfig>,
}

impl ExecutionStore {
    /// Create a builder.
    pub fn builder() -> ExecutionStoreBuilder {
        ExecutionStoreBuilder::new()
    }

    /// Store over a fresh [`MemorySession`] with default configuration.
    ///
    /// Shards are not provisioned; write a `shards` row through
    /// [`session`](Self::session) before issuing writes.
    pub fn in_memory() -> Result<Self> {
        Self::builder()
            .session(Arc::new(MemorySession::new()))
            .build()
    }

    /// The configuration in effect
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The underlying session
    pub fn session(&self) -> &Arc<dyn Session> {
        self.inner.session()
    }

    /// The engine store, for callers that manage deadlines themselves
    pub fn engine(&self) -> &MutableStateStore<dyn Session> {
        &self.inner
    }

    /// A deadline `default_timeout_ms` from now
    pub fn default_deadline(&self) -> Deadline {
        Deadline::after(self.config.default_timeout())
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Create a run. See [`MutableStateStore::create_execution`].
    pub fn create_execution(&self, request: &CreateExecutionRequest) -> Result<()> {
        self.create_execution_with_deadline(request, &self.default_deadline())
    }

    /// Create a run under an explicit deadline.
    pub fn create_execution_with_deadline(
        &self,
        request: &CreateExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        self.inner.create_execution(request, deadline)
    }

    /// Apply a mutation. See [`MutableStateStore::update_execution`].
    pub fn update_execution(&self, request: &UpdateExecutionRequest) -> Result<()> {
        self.update_execution_with_deadline(request, &self.default_deadline())
    }

    /// Apply a mutation under an explicit deadline.
    pub fn update_execution_with_deadline(
        &self,
        request: &UpdateExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        self.inner.update_execution(request, deadline)
    }

    /// Reset a run. See [`MutableStateStore::conflict_resolve`].
    pub fn conflict_resolve(&self, request: &ConflictResolveRequest) -> Result<()> {
        self.conflict_resolve_with_deadline(request, &self.default_deadline())
    }

    /// Reset a run under an explicit deadline.
    pub fn conflict_resolve_with_deadline(
        &self,
        request: &ConflictResolveRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        self.inner.conflict_resolve(request, deadline)
    }

    /// Overwrite a run. See [`MutableStateStore::set_execution`].
    pub fn set_execution(&self, request: &SetExecutionRequest) -> Result<()> {
        self.set_execution_with_deadline(request, &self.default_deadline())
    }

    /// Overwrite a run under an explicit deadline.
    pub fn set_execution_with_deadline(
        &self,
        request: &SetExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        self.inner.set_execution(request, deadline)
    }

    /// Delete a run's record; absent records are not an error.
    pub fn delete_execution(&self, request: &DeleteExecutionRequest) -> Result<()> {
        self.delete_execution_with_deadline(request, &self.default_deadline())
    }

    /// Delete a run's record under an explicit deadline.
    pub fn delete_execution_with_deadline(
        &self,
        request: &DeleteExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        self.inner.delete_execution(request, deadline)
    }

    /// Delete the current record if it points at the given run.
    pub fn delete_current_execution(&self, request: &DeleteCurrentExecutionRequest) -> Result<()> {
        self.delete_current_execution_with_deadline(request, &self.default_deadline())
    }

    /// Delete the current record under an explicit deadline.
    pub fn delete_current_execution_with_deadline(
        &self,
        request: &DeleteCurrentExecutionRequest,
        deadline: &Deadline,
    ) -> Result<()> {
        self.inner.delete_current_execution(request, deadline)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Read one run.
    pub fn get_execution(&self, request: &GetExecutionRequest) -> Result<GetExecutionResponse> {
        self.get_execution_with_deadline(request, &self.default_deadline())
    }

    /// Read one run under an explicit deadline.
    pub fn get_execution_with_deadline(
        &self,
        request: &GetExecutionRequest,
        deadline: &Deadline,
    ) -> Result<GetExecutionResponse> {
        self.inner.get_execution(request, deadline)
    }

    /// Read the current run of a workflow.
    pub fn get_current_execution(
        &self,
        request: &GetCurrentExecutionRequest,
    ) -> Result<GetCurrentExecutionResponse> {
        self.get_current_execution_with_deadline(request, &self.default_deadline())
    }

    /// Read the current run under an explicit deadline.
    pub fn get_current_execution_with_deadline(
        &self,
        request: &GetCurrentExecutionRequest,
        deadline: &Deadline,
    ) -> Result<GetCurrentExecutionResponse> {
        self.inner.get_current_execution(request, deadline)
    }

    /// Page through the runs on a shard.
    pub fn list_executions(&self, request: &ListExecutionsRequest) -> Result<ListExecutionsResponse> {
        self.list_executions_with_deadline(request, &self.default_deadline())
    }

    /// Page through the runs on a shard under an explicit deadline.
    pub fn list_executions_with_deadline(
        &self,
        request: &ListExecutionsRequest,
        deadline: &Deadline,
    ) -> Result<ListExecutionsResponse> {
        self.inner.list_executions(request, deadline)
    }
}

impl std::fmt::Debug for ExecutionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionStore")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for an [`ExecutionStore`].
///
/// # Example
///
/// ```ignore
/// let store = ExecutionStore::builder()
///     .config(StoreConfig::from_file("execstore.toml")?)
///     .session(session)
///     .build()?;
/// ```
#[derive(Default)]
pub struct ExecutionStoreBuilder {
    config: StoreConfig,
    session: Option<Arc<dyn Session>>,
}

impl ExecutionStoreBuilder {
    /// Builder with default configuration and no session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Session to persist through. Required.
    pub fn session<S: Session + 'static>(mut self, session: Arc<S>) -> Self {
        self.session = Some(session);
        self
    }

    /// Override the default deadline.
    pub fn default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Override the page-size cap.
    pub fn max_page_size(mut self, max_page_size: usize) -> Self {
        self.config.max_page_size = max_page_size;
        self
    }

    /// Permit or forbid the legacy `next_event_id` CAS.
    pub fn allow_legacy_cas(mut self, allow: bool) -> Self {
        self.config.allow_legacy_cas = allow;
        self
    }

    /// Validate the configuration and build the store.
    ///
    /// # Errors
    ///
    /// `Internal` if no session was set or the configuration is invalid.
    pub fn build(self) -> Result<ExecutionStore> {
        self.config.validate()?;
        let session = self
            .session
            .ok_or_else(|| Error::Internal("ExecutionStore requires a session".to_string()))?;
        Ok(ExecutionStore {
            inner: Arc::new(MutableStateStore::new(session, self.config.store_options())),
            config: Arc::new(self.config),
        })
    }
}
