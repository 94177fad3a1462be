//! Cache key encoding
//!
//! A [`CacheKey`] is an ordered sequence of primitive parts that uniquely
//! identifies one cached computation. Encoding is deterministic: two keys
//! with equal parts in equal order always encode to the same string, and the
//! encoded form is what the cache indexes on.
//!
//! Parts are joined with [`KEY_SEPARATOR`]; text parts must not contain the
//! separator themselves. This is a hard contract, enforced by
//! [`CacheKey::try_from_parts`] and debug-asserted on [`CacheKey::push`].

use smallvec::SmallVec;
use std::fmt;
use thiserror::Error;

/// Separator used between parts in the encoded key form.
pub const KEY_SEPARATOR: char = '%';

/// Errors produced when building a cache key
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// A text part contained the reserved separator character
    #[error("key part {0:?} contains reserved separator '{KEY_SEPARATOR}'")]
    ReservedSeparator(String),
}

/// One primitive part of a cache key
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyPart {
    /// Textual part (identifier, salt, serialized hash, ...)
    Text(String),
    /// Numeric part (theme id, version, ...)
    Num(u64),
}

impl KeyPart {
    fn is_valid(&self) -> bool {
        match self {
            KeyPart::Text(text) => !text.contains(KEY_SEPARATOR),
            KeyPart::Num(_) => true,
        }
    }
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Text(text) => f.write_str(text),
            KeyPart::Num(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Text(value.to_string())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Text(value)
    }
}

impl From<u64> for KeyPart {
    fn from(value: u64) -> Self {
        KeyPart::Num(value)
    }
}

/// Ordered sequence of key parts identifying a cached computation
///
/// Order is significant: `["a", "b"]` and `["b", "a"]` are different keys.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CacheKey {
    parts: SmallVec<[KeyPart; 8]>,
}

impl CacheKey {
    /// Create an empty key
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a key from parts, validating the separator contract
    pub fn try_from_parts<I, P>(parts: I) -> Result<Self, KeyError>
    where
        I: IntoIterator<Item = P>,
        P: Into<KeyPart>,
    {
        let mut key = Self::new();
        for part in parts {
            match part.into() {
                KeyPart::Text(text) if text.contains(KEY_SEPARATOR) => {
                    return Err(KeyError::ReservedSeparator(text));
                }
                part => key.parts.push(part),
            }
        }
        Ok(key)
    }

    /// Append a part to the key
    pub fn push(&mut self, part: impl Into<KeyPart>) {
        let part = part.into();
        debug_assert!(part.is_valid(), "key part contains reserved separator");
        self.parts.push(part);
    }

    /// Builder-style append
    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.push(part);
        self
    }

    /// Number of parts
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether the key has no parts
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Iterate over the parts in order
    pub fn parts(&self) -> impl Iterator<Item = &KeyPart> {
        self.parts.iter()
    }

    /// Encode the key into its stable string form
    ///
    /// Deterministic over the parts and their order; this is the form the
    /// cache indexes on and the form sweep scheduling refers to.
    pub fn encode(&self) -> String {
        let mut out = String::new();
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push(KEY_SEPARATOR);
            }
            match part {
                // '#' tags numeric parts; double it in text so the type
                // distinction survives encoding.
                KeyPart::Text(text) => out.push_str(&text.replace('#', "##")),
                KeyPart::Num(n) => {
                    out.push('#');
                    out.push_str(&n.to_string());
                }
            }
        }
        out
    }
}

impl<P: Into<KeyPart>> FromIterator<P> for CacheKey {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        let mut key = Self::new();
        for part in iter {
            key.push(part);
        }
        key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_parts_equal_encoding() {
        let a: CacheKey = ["token", "light", "v1"].into_iter().collect();
        let b: CacheKey = ["token", "light", "v1"].into_iter().collect();
        assert_eq!(a.encode(), b.encode());
    }

    #[test]
    fn test_order_sensitive() {
        let a: CacheKey = ["a", "b"].into_iter().collect();
        let b: CacheKey = ["b", "a"].into_iter().collect();
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_numeric_and_text_parts_distinct() {
        let text: CacheKey = CacheKey::new().with("7");
        let num: CacheKey = CacheKey::new().with(7u64);
        assert_ne!(text.encode(), num.encode());

        // Text that imitates the numeric tag must not collide either.
        let tagged_text: CacheKey = CacheKey::new().with("#7");
        assert_ne!(tagged_text.encode(), num.encode());
        assert_eq!(tagged_text.encode(), "##7");
    }

    #[test]
    fn test_corpus_collision_freedom() {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        let prefixes = ["token", "style", "cssvar"];
        let themes = ["light", "dark", "compact"];
        for prefix in prefixes {
            for theme in themes {
                for version in 0..50u64 {
                    let key = CacheKey::new().with(prefix).with(theme).with(version);
                    assert!(seen.insert(key.encode()), "collision for {key}");
                }
            }
        }
        assert_eq!(seen.len(), 3 * 3 * 50);
    }

    #[test]
    fn test_separator_rejected() {
        let result = CacheKey::try_from_parts(["ok", "bad%part"]);
        assert_eq!(
            result,
            Err(KeyError::ReservedSeparator("bad%part".to_string()))
        );
    }
}
