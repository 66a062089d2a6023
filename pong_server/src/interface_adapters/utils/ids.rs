use crate::domain::ConnectionId;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Returns a process-unique, monotonically increasing connection identifier.
///
/// Ids are never reused for the lifetime of the process, so a stale Leave can never
/// free a slot that a later connection now holds.
pub fn next_connection_id() -> ConnectionId {
    ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
}
