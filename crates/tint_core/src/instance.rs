//! Consumer instance identity
//!
//! Every mounted consumer of the cache is identified by an [`InstanceId`].
//! The id is what makes acquire idempotent per subscriber lifetime: acquiring
//! the same key twice with the same id does not double-count the reference.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity for one cache consumer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Allocate a fresh instance id
    pub fn next() -> Self {
        Self(NEXT_INSTANCE.fetch_add(1, Ordering::SeqCst))
    }

    /// Raw id value, for diagnostics and external bookkeeping
    pub fn to_raw(self) -> u64 {
        self.0
    }

    /// Reconstruct an id from its raw value
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}
