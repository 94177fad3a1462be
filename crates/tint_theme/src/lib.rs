//! Tint Styling Engine
//!
//! A runtime styling engine for component-based UIs: derives design-token
//! sets from a theme, renders them into textual style rules, injects those
//! rules exactly once per unique input combination, and removes them when no
//! consumer remains.
//!
//! # Overview
//!
//! - **Token model**: permissive named values with a hard later-wins merge
//!   contract ([`TokenMap`], [`TokenValue`])
//! - **Derivation**: merge, theme derivation, overrides, optional format
//!   pass, optional CSS-variable materialization ([`derive_tokens`])
//! - **Caching**: one derivation per unique input combination, reference
//!   counted across consumers with deferred batched eviction
//!   ([`StyleEngine`], backed by `tint_core`)
//! - **Lifecycle**: per-consumer [`TokenBinding`]s with atomic key swaps and
//!   drop-guaranteed release
//! - **SSR**: byte-faithful extraction of injected style text
//!   ([`extract_all`])
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use tint_theme::{
//!     DefaultTheme, MemorySink, StyleEngine, TokenBinding, TokenMap, TokenRequest, TokenValue,
//! };
//!
//! let sink = Arc::new(MemorySink::new());
//! let engine = Arc::new(StyleEngine::new(sink));
//! let theme = DefaultTheme::new();
//!
//! let mut seed = TokenMap::new();
//! seed.insert("colorPrimary".into(), TokenValue::from("#1677ff"));
//!
//! let mut binding = TokenBinding::new(Arc::clone(&engine));
//! let tokens = binding
//!     .update(&theme, &TokenRequest::new(vec![seed]))
//!     .unwrap();
//! engine.commit();
//!
//! assert_eq!(tokens.payload["colorPrimaryHover"], TokenValue::from("#1677ff"));
//! ```

pub mod binding;
pub mod css_var;
pub mod derive;
pub mod engine;
pub mod error;
pub mod extract;
pub mod hash;
pub mod registry;
pub mod theme;
pub mod token;

pub use binding::TokenBinding;
pub use css_var::{css_var_name, materialize, CssVarBlock, CssVarConfig};
pub use derive::{derive_tokens, DerivedTokens, FormatFn, TokenRequest};
pub use engine::StyleEngine;
pub use error::{Result, StyleError};
pub use extract::{extract_all, extract_style, CSS_VAR_PRIORITY};
pub use registry::{
    FailingSink, InsertionPolicy, MemorySink, StyleHandle, StyleRecord, StyleSink, UpsertOptions,
};
pub use theme::{next_theme_id, DefaultTheme, Theme};
pub use token::{merge_fragments, merge_into, TokenMap, TokenValue};
