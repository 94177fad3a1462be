//! Styling engine error types

use thiserror::Error;

/// Errors surfaced by token derivation and style injection
#[derive(Error, Debug)]
pub enum StyleError {
    /// Theme derivation or the caller's format pass failed
    ///
    /// Propagated synchronously; no cache entry is created and no partial
    /// state is left behind. Recovery is the caller's responsibility.
    #[error("token derivation failed: {0}")]
    Derivation(String),

    /// The style sink rejected an upsert or removal
    ///
    /// Best-effort: the engine logs this and keeps going, since the computed
    /// token values stay valid for consumers that only need the numbers.
    #[error("style injection failed: {0}")]
    Injection(String),
}

/// Result type for styling operations
pub type Result<T> = std::result::Result<T, StyleError>;
