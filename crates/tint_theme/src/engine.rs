//! Style engine
//!
//! [`StyleEngine`] is the composition root of the styling runtime. It owns
//! the reference-counted token cache, the theme-key usage counts, the commit
//! queue, and the handle to the style sink. It is an injectable service
//! instance, shared as `Arc<StyleEngine>`; tests build isolated engines per
//! case instead of reaching for a process-wide singleton.
//!
//! Two timing domains:
//!
//! - **render time**: [`StyleEngine::acquire_token`] / `release_token` run
//!   synchronously, computing values on miss and adjusting refcounts
//! - **commit time**: [`StyleEngine::commit`] runs the queued injection
//!   effects (in acquire order, once per key) and then flushes deferred
//!   evictions
//!
//! Style liveness is tracked separately from value liveness: several cache
//! entries can share one theme key, and the injected block for that key is
//! removed only when the last such entry is evicted.

use crate::derive::{derive_tokens, DerivedTokens, TokenRequest};
use crate::error::Result;
use crate::extract::{self, CSS_VAR_PRIORITY};
use crate::hash;
use crate::registry::{InsertionPolicy, StyleHandle, StyleSink, UpsertOptions};
use crate::theme::Theme;
use crate::token::merge_fragments;
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::{Arc, Mutex};
use tint_core::{CacheKey, ComputeCache, InstanceId};

/// Namespace part prefixed to every token cache key
const TOKEN_NAMESPACE: &str = "token";

/// Default owner marker attached to injected blocks
const DEFAULT_MARK: &str = "tint";

/// One live injected block: its sink handle plus the exact injected text
struct InjectedStyle {
    handle: StyleHandle,
    text: String,
}

/// State shared with eviction callbacks
struct EngineShared {
    /// Theme key -> number of live cache entries sharing that style scope.
    /// Style liveness, decoupled from per-entry reference counts.
    token_keys: Mutex<FxHashMap<String, usize>>,
    /// Theme key -> the injected block
    injected: Mutex<FxHashMap<String, InjectedStyle>>,
    /// Encoded cache keys whose injection effect already ran
    committed: Mutex<FxHashSet<String>>,
    sink: Arc<dyn StyleSink>,
    mark: String,
}

impl EngineShared {
    /// Eviction hook: runs exactly once per evicted entry, synchronously
    /// with the sweep. Drops the entry's style-scope usage and removes the
    /// injected block when this was the last entry for its theme key.
    fn on_evicted(&self, encoded: &str, value: &Arc<DerivedTokens>) {
        self.committed.lock().unwrap().remove(encoded);

        let mut counts = self.token_keys.lock().unwrap();
        let remove_style = match counts.get_mut(&value.theme_key) {
            Some(count) => {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    counts.remove(&value.theme_key);
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        drop(counts);

        if remove_style {
            if let Some(style) = self.injected.lock().unwrap().remove(&value.theme_key) {
                tracing::debug!(theme_key = %value.theme_key, "removing injected style");
                self.sink.remove(&style.handle);
            }
        }
    }
}

/// The styling runtime: token cache, injection lifecycle, SSR extraction
pub struct StyleEngine {
    cache: ComputeCache<Arc<DerivedTokens>>,
    /// Injection effects queued at render time, drained in acquire order
    commits: Mutex<Vec<String>>,
    shared: Arc<EngineShared>,
}

impl StyleEngine {
    /// Create an engine writing to `sink`, with the default sweep threshold
    pub fn new(sink: Arc<dyn StyleSink>) -> Self {
        Self::with_threshold(sink, 0)
    }

    /// Create an engine retaining up to `threshold` stale entries per sweep
    pub fn with_threshold(sink: Arc<dyn StyleSink>, threshold: usize) -> Self {
        Self {
            cache: ComputeCache::with_threshold(threshold),
            commits: Mutex::new(Vec::new()),
            shared: Arc::new(EngineShared {
                token_keys: Mutex::new(FxHashMap::default()),
                injected: Mutex::new(FxHashMap::default()),
                committed: Mutex::new(FxHashSet::default()),
                sink,
                mark: DEFAULT_MARK.to_string(),
            }),
        }
    }

    /// Cache key for a request: namespace, theme id, and content hashes of
    /// the salt, the merged fragments, the overrides, the full CSS-variable
    /// configuration when present, and the format pass's identity
    ///
    /// Inputs are hashed rather than serialized inline, since the derived
    /// value does not exist yet at lookup time; hashing also keeps
    /// caller-supplied text (salt, scope key) out of the encoded key form,
    /// where the key separator is reserved. The format pass is keyed by
    /// function identity, which is sufficient for a process-lifetime cache.
    pub fn cache_key(&self, theme: &dyn Theme, request: &TokenRequest) -> CacheKey {
        let seed = merge_fragments(request.fragments.iter());
        let mut key = CacheKey::new()
            .with(TOKEN_NAMESPACE)
            .with(theme.id())
            .with(hash::text_key(&request.salt))
            .with(hash::token_key(&seed))
            .with(hash::token_key(&request.overrides));
        if let Some(config) = &request.css_var {
            key.push(hash::css_var_config_key(config));
        }
        if let Some(format) = request.format {
            key.push(format as usize as u64);
        }
        key
    }

    /// Resolve or derive the token set for `request` on behalf of `subscriber`
    ///
    /// Queues the injection effect for the next [`commit`](Self::commit);
    /// derivation errors propagate and cache nothing.
    pub fn acquire_token(
        &self,
        subscriber: InstanceId,
        theme: &dyn Theme,
        request: &TokenRequest,
    ) -> Result<Arc<DerivedTokens>> {
        let key = self.cache_key(theme, request);
        self.acquire_token_keyed(&key, subscriber, theme, request)
    }

    pub(crate) fn acquire_token_keyed(
        &self,
        key: &CacheKey,
        subscriber: InstanceId,
        theme: &dyn Theme,
        request: &TokenRequest,
    ) -> Result<Arc<DerivedTokens>> {
        let encoded = key.encode();

        let compute_shared = Arc::clone(&self.shared);
        let evict_shared = Arc::clone(&self.shared);
        let evict_key = encoded.clone();

        let value = self.cache.acquire(
            key,
            subscriber,
            || {
                let derived = derive_tokens(theme, request)?;
                let mut counts = compute_shared.token_keys.lock().unwrap();
                *counts.entry(derived.theme_key.clone()).or_insert(0) += 1;
                Ok(Arc::new(derived))
            },
            move |value: &Arc<DerivedTokens>| {
                evict_shared.on_evicted(&evict_key, value);
            },
        )?;

        self.commits.lock().unwrap().push(encoded);
        Ok(value)
    }

    /// Release `subscriber`'s hold on a previously acquired key
    pub fn release_token(&self, key: &CacheKey, subscriber: InstanceId) {
        self.cache.release(key, subscriber);
    }

    /// Run render-committed side effects, then flush deferred evictions
    ///
    /// Effects run in acquire order, once per key the first time it is
    /// observed as committed; calling `commit` again for the same state is
    /// idempotent. Injection failures are best-effort: logged, never fatal.
    pub fn commit(&self) {
        let queued: Vec<String> = std::mem::take(&mut *self.commits.lock().unwrap());
        for encoded in queued {
            if self.shared.committed.lock().unwrap().contains(&encoded) {
                continue;
            }
            // The entry can be gone already if release + sweep beat the
            // commit; nothing to inject then.
            let value = match self.cache.get_encoded(&encoded) {
                Some(value) => value,
                None => continue,
            };
            self.shared.committed.lock().unwrap().insert(encoded);
            self.inject(&value);
        }

        let swept = self.cache.sweep();
        if swept > 0 {
            tracing::trace!(swept, "post-commit sweep");
        }
    }

    fn inject(&self, value: &Arc<DerivedTokens>) {
        let block = match &value.css_vars {
            Some(block) => block,
            None => return,
        };

        // One injected block per theme key system-wide.
        let mut injected = self.shared.injected.lock().unwrap();
        if injected.contains_key(&block.key) {
            return;
        }

        let options = UpsertOptions {
            mark: self.shared.mark.clone(),
            priority: CSS_VAR_PRIORITY,
            insertion: InsertionPolicy::PrependQueue,
            container: None,
        };
        match self.shared.sink.upsert(&block.text, &block.key, &options) {
            Ok(handle) => {
                tracing::debug!(theme_key = %block.key, "injected css variables");
                injected.insert(
                    block.key.clone(),
                    InjectedStyle {
                        handle,
                        text: block.text.clone(),
                    },
                );
            }
            Err(err) => {
                tracing::warn!(
                    theme_key = %block.key,
                    error = %err,
                    "style injection failed; tokens remain usable"
                );
            }
        }
    }

    /// Assemble the SSR style payload from every live entry
    pub fn extract(&self, plain: bool) -> String {
        extract::extract_all(self, plain)
    }

    /// Exact text of the injected block for `theme_key`, if one is live
    pub fn injected_text(&self, theme_key: &str) -> Option<String> {
        self.shared
            .injected
            .lock()
            .unwrap()
            .get(theme_key)
            .map(|style| style.text.clone())
    }

    /// Snapshot of the commit queue, in acquire order
    pub(crate) fn pending_commits(&self) -> Vec<String> {
        self.commits.lock().unwrap().clone()
    }

    /// Visit every live cache entry as `(encoded key, derived tokens)`
    pub fn for_each_entry(&self, visit: impl FnMut(&str, &Arc<DerivedTokens>)) {
        self.cache.for_each(visit);
    }

    /// Sweep every pending eviction regardless of the threshold (teardown)
    pub fn sweep_now(&self) -> usize {
        self.cache.sweep_now()
    }

    /// Number of live cache entries, swept or not
    pub fn cached_entries(&self) -> usize {
        self.cache.len()
    }

    /// Number of keys awaiting a deferred sweep
    pub fn pending_sweeps(&self) -> usize {
        self.cache.pending_sweeps()
    }

    /// Reference count for a key, if its entry is live
    pub fn ref_count(&self, key: &CacheKey) -> Option<u32> {
        self.cache.ref_count(key)
    }
}
