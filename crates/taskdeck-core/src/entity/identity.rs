//! Temporary id allocation for entities the server has not persisted yet.

use super::model::EntityId;
use std::sync::atomic::{AtomicU64, Ordering};

/// Reserved prefix marking an id as not-yet-persisted.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Hands out temporary ids of the form `temp-<n>`.
///
/// `n` starts from the current wall clock in milliseconds and is strictly
/// increasing for the lifetime of the allocator, so rapid calls within the
/// same millisecond never collide.
#[derive(Debug, Default)]
pub struct IdentityAllocator {
    last: AtomicU64,
}

impl IdentityAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&self) -> EntityId {
        let now = chrono::Utc::now().timestamp_millis().max(0) as u64;
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        let next = now.max(previous + 1);
        EntityId::new(format!("{TEMP_ID_PREFIX}{next}"))
    }
}
