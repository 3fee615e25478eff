//! Error types for session store operations.

use thiserror::Error;

/// Errors that can occur in the session store.
#[derive(Debug, Error)]
pub enum Error {
    /// A token failed authentication or decoding.
    ///
    /// Callers inside the lifecycle treat this as "no session"; it is never
    /// surfaced from [`Store::get`](crate::Store::get).
    #[error("Token failed verification or decoding")]
    Tampered,

    /// Requested record not found (possibly swept concurrently).
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Sealed session payload exceeds the configured maximum.
    #[error("Session payload too large: {len} bytes (max {max})")]
    TooLarge { len: usize, max: usize },

    /// Secret key material is empty or unusable.
    #[error("Invalid secret key material")]
    InvalidKey,

    /// Error from the backing record store.
    #[error("Backend error: {0}")]
    Backend(String),

    /// Session value (de)serialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Cryptographic operation failed.
    #[error("Crypto error: {0}")]
    Crypto(String),
}

/// Result type alias for session store operations.
pub type Result<T> = std::result::Result<T, Error>;
