//! Theme collaborator
//!
//! A theme is an opaque pure derivation from seed tokens to a full derived
//! token set, identified by a stable id that participates in every cache
//! key. The engine never looks inside the derivation; it only caches its
//! output.

use crate::error::{Result, StyleError};
use crate::token::{TokenMap, TokenValue};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_THEME_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a fresh theme id
///
/// Theme implementations call this once at construction; the id must stay
/// stable for the theme instance's lifetime because it is part of every
/// cache key derived through it.
pub fn next_theme_id() -> u64 {
    NEXT_THEME_ID.fetch_add(1, Ordering::SeqCst)
}

/// An opaque token derivation with a stable identity
pub trait Theme: Send + Sync {
    /// Stable id for this theme instance
    fn id(&self) -> u64;

    /// Derive the full token set from the merged seed tokens
    ///
    /// Must be pure. Errors propagate to the consumer's update; the engine
    /// never substitutes a fallback token set.
    fn derive_tokens(&self, seed: &TokenMap) -> Result<TokenMap>;
}

/// Built-in derivation: passes seed tokens through and expands a small set
/// of conventional derived tokens
///
/// - `colorPrimary` gains `colorPrimaryHover` / `colorPrimaryActive`
///   variants when the seed does not already provide them
/// - `sizeUnit` expands into a `sizeXS` .. `sizeXL` scale
///
/// Mostly useful as a realistic fixture and an out-of-the-box default;
/// real design systems implement [`Theme`] themselves.
#[derive(Debug)]
pub struct DefaultTheme {
    id: u64,
}

impl DefaultTheme {
    pub fn new() -> Self {
        Self {
            id: next_theme_id(),
        }
    }
}

impl Default for DefaultTheme {
    fn default() -> Self {
        Self::new()
    }
}

impl Theme for DefaultTheme {
    fn id(&self) -> u64 {
        self.id
    }

    fn derive_tokens(&self, seed: &TokenMap) -> Result<TokenMap> {
        let mut derived = seed.clone();

        if let Some(primary) = seed.get("colorPrimary") {
            let primary = primary
                .as_text()
                .ok_or_else(|| {
                    StyleError::Derivation("colorPrimary must be a color string".to_string())
                })?
                .to_string();
            derived
                .entry("colorPrimaryHover".to_string())
                .or_insert_with(|| TokenValue::Text(primary.clone()));
            derived
                .entry("colorPrimaryActive".to_string())
                .or_insert_with(|| TokenValue::Text(primary.clone()));
        }

        if let Some(unit) = seed.get("sizeUnit").and_then(TokenValue::as_number) {
            let scale = [("sizeXS", 1.0), ("sizeSM", 2.0), ("sizeMD", 4.0), ("sizeLG", 6.0), ("sizeXL", 8.0)];
            for (name, factor) in scale {
                derived
                    .entry(name.to_string())
                    .or_insert_with(|| TokenValue::Number(unit * factor));
            }
        }

        Ok(derived)
    }
}
