//! Per-consumer cache binding
//!
//! A [`TokenBinding`] is the consumer-side handle on the engine: one binding
//! per mounted consumer instance. Its lifecycle is
//! `Unmounted -> Mounted(acquired) -> Unmounted(released)`:
//!
//! - [`update`](TokenBinding::update) resolves the key for the current
//!   inputs; when the key changed since the last update, the new key is
//!   acquired and the old one released inside the same call, so there is no
//!   externally observable window where both or neither is held
//! - dropping the binding releases the held key exactly once, however the
//!   teardown happens

use crate::derive::{DerivedTokens, TokenRequest};
use crate::engine::StyleEngine;
use crate::error::Result;
use crate::theme::Theme;
use std::sync::Arc;
use tint_core::{CacheKey, InstanceId};

/// One consumer's hold on a derived token set
pub struct TokenBinding {
    engine: Arc<StyleEngine>,
    instance: InstanceId,
    current: Option<CacheKey>,
}

impl TokenBinding {
    /// Create an unmounted binding against `engine`
    pub fn new(engine: Arc<StyleEngine>) -> Self {
        Self {
            engine,
            instance: InstanceId::next(),
            current: None,
        }
    }

    /// Resolve the derived tokens for the current inputs
    ///
    /// Performs the atomic key swap when inputs changed. On derivation
    /// failure the previous key stays held and the error propagates; the
    /// binding never ends up holding nothing mid-update.
    pub fn update(
        &mut self,
        theme: &dyn Theme,
        request: &TokenRequest,
    ) -> Result<Arc<DerivedTokens>> {
        let key = self.engine.cache_key(theme, request);
        let value = self
            .engine
            .acquire_token_keyed(&key, self.instance, theme, request)?;

        if self.current.as_ref() != Some(&key) {
            if let Some(old) = self.current.replace(key) {
                self.engine.release_token(&old, self.instance);
            }
        }
        Ok(value)
    }

    /// This binding's consumer identity
    pub fn instance(&self) -> InstanceId {
        self.instance
    }

    /// Whether the binding currently holds a key
    pub fn is_mounted(&self) -> bool {
        self.current.is_some()
    }

    /// The engine this binding is attached to
    pub fn engine(&self) -> &Arc<StyleEngine> {
        &self.engine
    }
}

impl Drop for TokenBinding {
    fn drop(&mut self) {
        if let Some(key) = self.current.take() {
            self.engine.release_token(&key, self.instance);
        }
    }
}
