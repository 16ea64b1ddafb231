//! Shard lease guard
//!
//! Every mutating batch carries one extra statement that rewrites the shard's
//! `range_id` to the value it already has, conditioned on that value. The
//! write is a no-op when the caller still owns the shard and rejects the
//! whole batch when ownership moved, without an extra round trip.

use crate::mapper::ShardRow;
use crate::schema::{self, col, SHARDS};
use execstore_core::{Error, Result, ShardId};
use execstore_storage::{Deadline, Session, Statement, StoreError};

/// Lease verification statement for `shard_id` held at `range_id`
pub fn lease_guard(shard_id: ShardId, range_id: i64) -> Statement {
    Statement::update(SHARDS, schema::shard_key(shard_id))
        .set(col::RANGE_ID, range_id)
        .if_equals(col::RANGE_ID, range_id)
}

/// Read the stored lease of a shard
///
/// Returns `None` if the shard row does not exist.
///
/// # Errors
///
/// - `PersistedTypeMismatch` if `range_id` is not a bigint
/// - `Store` for transport failures
pub fn read_range_id<S: Session + ?Sized>(
    session: &S,
    shard_id: ShardId,
    deadline: &Deadline,
) -> Result<Option<i64>> {
    match session.query_one(&schema::get_lease(shard_id), deadline) {
        Ok(row) => {
            let shard = ShardRow::decode(&row).map_err(|m| Error::type_mismatch("GetShard", m))?;
            Ok(Some(shard.range_id))
        }
        Err(StoreError::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Compare a stored lease with the one the caller holds
///
/// A missing shard row counts as lost ownership.
pub fn check_ownership(
    shard_id: ShardId,
    expected_range_id: i64,
    actual_range_id: Option<i64>,
) -> Result<()> {
    if actual_range_id == Some(expected_range_id) {
        Ok(())
    } else {
        Err(Error::ShardOwnershipLost {
            shard_id,
            expected_range_id,
            actual_range_id,
        })
    }
}
