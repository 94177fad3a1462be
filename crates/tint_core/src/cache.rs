//! Reference-counted computation cache
//!
//! [`ComputeCache`] maps an encoded [`CacheKey`] to a computed value plus a
//! reference count. Consumers acquire a key (computing the value on first
//! use), and release it when they unmount; the last release queues the entry
//! for a deferred, batched eviction rather than removing it inline (see
//! [`crate::sweep`]).
//!
//! The cache is an owned service instance, not an ambient global: tests and
//! embedders construct as many isolated caches as they need and share one via
//! `Arc` where a process-wide cache is wanted.
//!
//! # Invariants
//!
//! - An entry's reference count equals the size of its subscriber set;
//!   acquiring twice with the same [`InstanceId`] without an intervening
//!   release does not double-count.
//! - Releasing a key that was never acquired (or by a non-subscriber) is a
//!   logged no-op; the count never underflows.
//! - `on_remove` runs exactly once, synchronously with the actual eviction.
//! - A failed compute leaves no partial entry behind.

use crate::instance::InstanceId;
use crate::key::CacheKey;
use crate::sweep::SweepScheduler;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Mutex;

/// One cached value with its subscriber bookkeeping
struct CacheEntry<V> {
    value: V,
    ref_count: u32,
    subscribers: FxHashSet<InstanceId>,
    /// Eviction callback, consumed exactly once when the entry is removed
    on_remove: Option<Box<dyn FnOnce(&V) + Send>>,
}

struct CacheInner<V> {
    entries: FxHashMap<String, CacheEntry<V>>,
    sweeps: SweepScheduler,
}

/// Reference-counted cache of computed values with deferred eviction
pub struct ComputeCache<V> {
    inner: Mutex<CacheInner<V>>,
}

impl<V> Default for ComputeCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ComputeCache<V> {
    /// Create a cache with the default sweep threshold (0)
    pub fn new() -> Self {
        Self::with_threshold(0)
    }

    /// Create a cache retaining up to `threshold` stale entries between sweeps
    pub fn with_threshold(threshold: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: FxHashMap::default(),
                sweeps: SweepScheduler::new(threshold),
            }),
        }
    }
}

impl<V: Clone> ComputeCache<V> {
    /// Resolve or create the entry for `key` on behalf of `subscriber`
    ///
    /// On first use for the key, `compute` builds the value and the entry is
    /// stored with its reference count seeded by this subscriber. On repeat
    /// use the existing value is returned and the count incremented, unless
    /// this subscriber already holds the key (idempotent per subscriber
    /// lifetime). Re-acquiring a key cancels any sweep pending for it.
    ///
    /// If `compute` fails the error propagates and nothing is cached.
    pub fn acquire<E>(
        &self,
        key: &CacheKey,
        subscriber: InstanceId,
        compute: impl FnOnce() -> Result<V, E>,
        on_remove: impl FnOnce(&V) + Send + 'static,
    ) -> Result<V, E> {
        let encoded = key.encode();

        {
            let inner = &mut *self.inner.lock().unwrap();
            if let Some(entry) = inner.entries.get_mut(&encoded) {
                inner.sweeps.cancel(&encoded);
                if entry.subscribers.insert(subscriber) {
                    entry.ref_count += 1;
                }
                tracing::trace!(key = %encoded, refs = entry.ref_count, "cache hit");
                return Ok(entry.value.clone());
            }
        }

        // Miss: compute outside the lock. Single logical writer, so nobody
        // else can insert this key in between.
        let value = compute()?;

        let inner = &mut *self.inner.lock().unwrap();
        let entry = inner.entries.entry(encoded.clone()).or_insert_with(|| {
            let mut subscribers = FxHashSet::default();
            subscribers.insert(subscriber);
            CacheEntry {
                value,
                ref_count: 1,
                subscribers,
                on_remove: Some(Box::new(on_remove)),
            }
        });
        tracing::debug!(key = %encoded, "cache miss, entry created");
        Ok(entry.value.clone())
    }

    /// Release `subscriber`'s hold on `key`
    ///
    /// When the reference count reaches zero the key is queued for a deferred
    /// sweep; the entry and its value stay live until the sweep actually
    /// runs. Releasing a key this subscriber does not hold is a logged no-op.
    pub fn release(&self, key: &CacheKey, subscriber: InstanceId) {
        let encoded = key.encode();
        let inner = &mut *self.inner.lock().unwrap();
        let released = match inner.entries.get_mut(&encoded) {
            Some(entry) if entry.subscribers.contains(&subscriber) => {
                entry.subscribers.remove(&subscriber);
                entry.ref_count = entry.ref_count.saturating_sub(1);
                tracing::trace!(key = %encoded, refs = entry.ref_count, "released");
                entry.ref_count == 0
            }
            _ => {
                tracing::debug!(key = %encoded, "release without matching acquire ignored");
                return;
            }
        };
        if released {
            inner.sweeps.schedule(encoded);
        }
    }

    /// Run a threshold-gated sweep; returns the number of entries evicted
    ///
    /// Queued keys whose entry was re-acquired in the meantime are skipped.
    /// Each evicted entry's `on_remove` runs exactly once, after the cache
    /// lock is dropped.
    pub fn sweep(&self) -> usize {
        self.flush(false)
    }

    /// Sweep every queued key regardless of the threshold
    ///
    /// Used at teardown, where coalescing no longer matters.
    pub fn sweep_now(&self) -> usize {
        self.flush(true)
    }

    fn flush(&self, force: bool) -> usize {
        let mut removed = Vec::new();
        {
            let inner = &mut *self.inner.lock().unwrap();
            if !force && !inner.sweeps.should_flush() {
                return 0;
            }
            for key in inner.sweeps.drain() {
                let dead = inner
                    .entries
                    .get(&key)
                    .map(|entry| entry.ref_count == 0)
                    .unwrap_or(false);
                if dead {
                    if let Some(mut entry) = inner.entries.remove(&key) {
                        removed.push((key, entry.value.clone(), entry.on_remove.take()));
                    }
                }
            }
        }

        let count = removed.len();
        for (key, value, on_remove) in removed {
            tracing::debug!(key = %key, "cache entry evicted");
            if let Some(callback) = on_remove {
                callback(&value);
            }
        }
        count
    }

    /// Look up the cached value for `key` without touching reference counts
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.get_encoded(&key.encode())
    }

    /// Look up by an already-encoded key
    pub fn get_encoded(&self, encoded: &str) -> Option<V> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(encoded).map(|entry| entry.value.clone())
    }

    /// Current reference count for `key`, if the entry is live
    pub fn ref_count(&self, key: &CacheKey) -> Option<u32> {
        let inner = self.inner.lock().unwrap();
        inner.entries.get(&key.encode()).map(|entry| entry.ref_count)
    }

    /// Number of keys queued for a future sweep
    pub fn pending_sweeps(&self) -> usize {
        self.inner.lock().unwrap().sweeps.pending()
    }

    /// Number of live entries (including zero-ref entries not yet swept)
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    /// Whether the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Visit every live entry as `(encoded key, value)`
    ///
    /// Used by SSR extraction to walk the cache without draining it.
    pub fn for_each(&self, mut visit: impl FnMut(&str, &V)) {
        let inner = self.inner.lock().unwrap();
        for (key, entry) in inner.entries.iter() {
            visit(key, &entry.value);
        }
    }
}
