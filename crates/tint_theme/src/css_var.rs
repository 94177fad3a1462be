//! CSS-variable materialization
//!
//! Rewrites a derived token map into `var(...)` references while producing
//! the matching declaration block in one pass, so the token a component
//! reads and the variable the browser resolves can never drift apart.
//!
//! Per-key behavior:
//! - `ignore` keys stay literal and emit no variable at all
//! - `preserve` keys keep their literal value in the token map but still
//!   emit a declaration
//! - numeric values get a `px` suffix unless the key is marked `unitless`

use crate::token::{TokenMap, TokenValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Configuration for CSS-variable mode
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CssVarConfig {
    /// Variable name prefix: `--{prefix}-{name}`
    pub prefix: String,
    /// Scope key: the class the declaration block attaches to. Becomes the
    /// theme key of the derived token set.
    pub key: String,
    /// Keys left fully literal (no variable emitted)
    pub ignore: BTreeSet<String>,
    /// Keys that keep their literal value but still emit a variable
    pub preserve: BTreeSet<String>,
    /// Keys whose bare numbers are never suffixed with a length unit
    pub unitless: BTreeSet<String>,
}

impl CssVarConfig {
    pub fn new(prefix: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            key: key.into(),
            ignore: BTreeSet::new(),
            preserve: BTreeSet::new(),
            unitless: BTreeSet::new(),
        }
    }
}

/// A rendered CSS-variable declaration block
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CssVarBlock {
    /// Scope key the block is attached to (the theme key)
    pub key: String,
    /// Full style text, e.g. `.scope{--tint-color-primary:#1677ff;}`
    pub text: String,
}

/// CSS custom-property name for a token key: `colorPrimary` -> `--p-color-primary`
pub fn css_var_name(prefix: &str, token: &str) -> String {
    let mut name = String::with_capacity(prefix.len() + token.len() + 4);
    name.push_str("--");
    name.push_str(prefix);
    name.push('-');
    for ch in token.chars() {
        if ch.is_ascii_uppercase() {
            name.push('-');
            name.push(ch.to_ascii_lowercase());
        } else {
            name.push(ch);
        }
    }
    name
}

/// Rewrite `payload` into variable references and render the declarations
///
/// Returns the rewritten map and the declaration block; both walk the map in
/// key order, so output is deterministic for a given payload.
pub fn materialize(payload: &TokenMap, config: &CssVarConfig) -> (TokenMap, CssVarBlock) {
    let mut rewritten = TokenMap::new();
    let mut declarations = String::new();

    for (key, value) in payload {
        if config.ignore.contains(key) {
            rewritten.insert(key.clone(), value.clone());
            continue;
        }

        let var_name = css_var_name(&config.prefix, key);
        let rendered = match value {
            TokenValue::Number(n) if !config.unitless.contains(key) => {
                format!("{}px", TokenValue::Number(*n).render())
            }
            other => other.render(),
        };
        declarations.push_str(&var_name);
        declarations.push(':');
        declarations.push_str(&rendered);
        declarations.push(';');

        if config.preserve.contains(key) {
            rewritten.insert(key.clone(), value.clone());
        } else {
            rewritten.insert(key.clone(), TokenValue::Text(format!("var({var_name})")));
        }
    }

    let block = CssVarBlock {
        key: config.key.clone(),
        text: format!(".{}{{{}}}", config.key, declarations),
    };
    (rewritten, block)
}
