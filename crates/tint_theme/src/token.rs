//! Design token model
//!
//! Tokens are the atomic values that make up a design system: colors,
//! spacing, font sizes, motion durations. The model is structurally
//! permissive: a [`TokenMap`] carries any named value, and merging follows a
//! hard "later wins" contract rather than a closed schema, because token
//! vocabularies are open-ended.
//!
//! A `BTreeMap` backs the map: content hashing and CSS-variable emission
//! both depend on deterministic iteration order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One design token value
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TokenValue {
    /// Numeric value (size, duration, line height, ...)
    Number(f64),
    /// Textual value (color, font stack, easing, ...)
    Text(String),
}

impl TokenValue {
    /// Numeric payload, if this is a number token
    pub fn as_number(&self) -> Option<f64> {
        match self {
            TokenValue::Number(n) => Some(*n),
            TokenValue::Text(_) => None,
        }
    }

    /// Textual payload, if this is a text token
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TokenValue::Text(text) => Some(text),
            TokenValue::Number(_) => None,
        }
    }

    /// Render the value as it appears in style text
    ///
    /// Whole numbers render without a fractional part (`16`, not `16.0`).
    pub fn render(&self) -> String {
        match self {
            TokenValue::Number(n) => format_number(*n),
            TokenValue::Text(text) => text.clone(),
        }
    }
}

impl fmt::Display for TokenValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<f64> for TokenValue {
    fn from(value: f64) -> Self {
        TokenValue::Number(value)
    }
}

impl From<i32> for TokenValue {
    fn from(value: i32) -> Self {
        TokenValue::Number(value as f64)
    }
}

impl From<&str> for TokenValue {
    fn from(value: &str) -> Self {
        TokenValue::Text(value.to_string())
    }
}

impl From<String> for TokenValue {
    fn from(value: String) -> Self {
        TokenValue::Text(value)
    }
}

/// Named token values, iterated in stable key order
pub type TokenMap = BTreeMap<String, TokenValue>;

/// Render a number without a trailing `.0` for whole values
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Shallow-merge `over` on top of `base`; `over` wins on key conflicts
pub fn merge_into(base: &mut TokenMap, over: &TokenMap) {
    for (key, value) in over {
        base.insert(key.clone(), value.clone());
    }
}

/// Merge fragments left to right into one map; later fragments win
pub fn merge_fragments<'a, I>(fragments: I) -> TokenMap
where
    I: IntoIterator<Item = &'a TokenMap>,
{
    let mut merged = TokenMap::new();
    for fragment in fragments {
        merge_into(&mut merged, fragment);
    }
    merged
}
