//! Token derivation pipeline
//!
//! Order of operations, each step feeding the next:
//!
//! 1. merge raw fragments left to right (later wins)
//! 2. run the theme's opaque derivation (errors propagate, no fallback)
//! 3. shallow-merge the caller's overrides on top
//! 4. apply the optional format pass
//! 5. in CSS-variable mode, rewrite values to `var()` references and render
//!    the declaration block
//!
//! The result is a [`DerivedTokens`] wrapper: the payload plus its derived
//! identifiers. Identifiers are metadata, kept beside the payload rather
//! than inside it, and never feed the content hash.

use crate::css_var::{materialize, CssVarBlock, CssVarConfig};
use crate::error::Result;
use crate::hash;
use crate::theme::Theme;
use crate::token::{merge_fragments, merge_into, TokenMap};

/// Caller-supplied reformatting pass over the derived map
pub type FormatFn = fn(TokenMap) -> TokenMap;

/// Everything a consumer supplies to request a derived token set
#[derive(Clone, Debug, Default)]
pub struct TokenRequest {
    /// Raw token fragments, merged left to right (later wins)
    pub fragments: Vec<TokenMap>,
    /// Override map, shallow-merged over the theme's derivation
    pub overrides: TokenMap,
    /// Salt mixed into the hash id (typically an app or version scope)
    pub salt: String,
    /// Optional reformatting pass applied after overrides
    pub format: Option<FormatFn>,
    /// CSS-variable mode, when requested
    pub css_var: Option<CssVarConfig>,
}

impl TokenRequest {
    pub fn new(fragments: Vec<TokenMap>) -> Self {
        Self {
            fragments,
            ..Self::default()
        }
    }
}

/// A derived token set plus its cache/attribution identifiers
///
/// Immutable once built; shared between consumers as `Arc<DerivedTokens>`.
#[derive(Clone, Debug)]
pub struct DerivedTokens {
    /// The token map consumers read (var-referenced in CSS-variable mode)
    pub payload: TokenMap,
    /// The pre-materialization map; semantic content, always literal values
    pub plain: TokenMap,
    /// Content hash of `plain`; dedup and attribution identity
    pub token_key: String,
    /// Style-scope identity: the CSS-variable scope key when present,
    /// otherwise the token key
    pub theme_key: String,
    /// Short human-distinguishable id (salted, build-prefixed)
    pub hash_id: String,
    /// Rendered declaration block, present only in CSS-variable mode
    pub css_vars: Option<CssVarBlock>,
}

/// Run the full derivation pipeline for one request
pub fn derive_tokens(theme: &dyn Theme, request: &TokenRequest) -> Result<DerivedTokens> {
    let seed = merge_fragments(request.fragments.iter());
    let mut derived = theme.derive_tokens(&seed)?;
    merge_into(&mut derived, &request.overrides);
    if let Some(format) = request.format {
        derived = format(derived);
    }

    let plain = derived.clone();
    let token_key = hash::token_key(&plain);
    let hash_id = hash::hash_id(&token_key, &request.salt);

    let (payload, css_vars) = match &request.css_var {
        Some(config) => {
            let (payload, block) = materialize(&derived, config);
            (payload, Some(block))
        }
        None => (derived, None),
    };
    let theme_key = css_vars
        .as_ref()
        .map(|block| block.key.clone())
        .unwrap_or_else(|| token_key.clone());

    Ok(DerivedTokens {
        payload,
        plain,
        token_key,
        theme_key,
        hash_id,
        css_vars,
    })
}
