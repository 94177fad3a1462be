//! Deferred eviction scheduling
//!
//! Releasing the last reference to a cache entry does not evict it inline.
//! The key is queued here and swept later, so a release immediately followed
//! by a re-acquire of the same key (hot reload, list reordering, rapid
//! remount) coalesces into a no-op instead of tearing styles down and
//! rebuilding them.
//!
//! The policy is batching, not LRU: a sweep only runs once the number of
//! queued keys exceeds the retention threshold, and re-acquiring a queued key
//! cancels its pending sweep.

/// Queue of keys awaiting eviction, drained in batches
#[derive(Debug)]
pub struct SweepScheduler {
    /// Encoded keys pending eviction, in release order
    pending: Vec<String>,
    /// Retain up to this many stale keys before a flush drains the queue
    threshold: usize,
}

impl Default for SweepScheduler {
    fn default() -> Self {
        Self::new(0)
    }
}

impl SweepScheduler {
    /// Create a scheduler retaining up to `threshold` stale keys
    ///
    /// The default threshold of 0 means any queued key makes the queue
    /// flushable; the only hysteresis is re-acquire cancellation.
    pub fn new(threshold: usize) -> Self {
        Self {
            pending: Vec::new(),
            threshold,
        }
    }

    /// Queue a key for a future sweep
    ///
    /// Queuing an already-queued key is a no-op.
    pub fn schedule(&mut self, key: String) {
        if !self.pending.iter().any(|k| *k == key) {
            tracing::trace!(key = %key, "sweep scheduled");
            self.pending.push(key);
        }
    }

    /// Cancel a pending sweep for `key`, if any
    ///
    /// Called when a key is re-acquired before the sweep ran; the entry is
    /// alive again and must not be evicted.
    pub fn cancel(&mut self, key: &str) {
        if let Some(pos) = self.pending.iter().position(|k| k == key) {
            tracing::trace!(key = %key, "sweep cancelled");
            self.pending.remove(pos);
        }
    }

    /// Whether the queue has grown past the retention threshold
    pub fn should_flush(&self) -> bool {
        self.pending.len() > self.threshold
    }

    /// Number of keys currently queued
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Take every queued key, in release order
    pub fn drain(&mut self) -> Vec<String> {
        std::mem::take(&mut self.pending)
    }
}
