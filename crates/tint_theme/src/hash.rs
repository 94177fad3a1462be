//! Content hashing for token maps
//!
//! Two identifiers come out of here:
//!
//! - the **token key**: a content hash over a token map's entries, used for
//!   cache deduplication and style attribution. Only semantic token content
//!   feeds the hash; derived metadata (theme key, hash id) never does.
//! - the **hash id**: a short, human-distinguishable class-name-safe id
//!   hashed from the token key plus a caller salt. Debug builds use a
//!   visibly different prefix than release builds so accidental reliance on
//!   the id's stability is caught early.

use crate::css_var::CssVarConfig;
use crate::token::TokenMap;
use rustc_hash::FxHasher;
use std::hash::Hasher;

/// Prefix for hash ids; differs between debug and release builds on purpose
pub fn hash_prefix() -> &'static str {
    if cfg!(debug_assertions) {
        "tint-dev"
    } else {
        "tint"
    }
}

/// Content hash of a token map, as a short base36 string
///
/// Deterministic over entries in key order; independent of how the map was
/// built up.
pub fn token_key(map: &TokenMap) -> String {
    let mut hasher = FxHasher::default();
    for (key, value) in map {
        hasher.write(key.as_bytes());
        hasher.write_u8(0);
        hasher.write(value.render().as_bytes());
        hasher.write_u8(0);
    }
    base36(hasher.finish())
}

/// Content hash of arbitrary key material, as a short base36 string
///
/// Used wherever caller-supplied text (salts, scope keys) feeds a cache key,
/// so reserved characters can never leak into the encoded key form.
pub fn text_key(text: &str) -> String {
    let mut hasher = FxHasher::default();
    hasher.write(text.as_bytes());
    base36(hasher.finish())
}

/// Content hash of a CSS-variable configuration
///
/// Covers every field that changes materialization output (prefix, scope
/// key, and the ignore/preserve/unitless markers), so requests differing in
/// any of them cache separately.
pub fn css_var_config_key(config: &CssVarConfig) -> String {
    let mut hasher = FxHasher::default();
    hasher.write(config.prefix.as_bytes());
    hasher.write_u8(0);
    hasher.write(config.key.as_bytes());
    hasher.write_u8(0);
    for set in [&config.ignore, &config.preserve, &config.unitless] {
        for key in set {
            hasher.write(key.as_bytes());
            hasher.write_u8(0);
        }
        hasher.write_u8(1);
    }
    base36(hasher.finish())
}

/// Short stable identifier for a derived token set
///
/// Hashes `token_key` together with `salt`; changing only the salt changes
/// the id but not the underlying token content.
pub fn hash_id(token_key: &str, salt: &str) -> String {
    let mut hasher = FxHasher::default();
    hasher.write(salt.as_bytes());
    hasher.write_u8(0);
    hasher.write(token_key.as_bytes());
    format!("{}-{}", hash_prefix(), base36(hasher.finish()))
}

fn base36(mut n: u64) -> String {
    const DIGITS: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).expect("base36 digits are ascii")
}
