//! Error types for fillcache.
//!
//! The cache itself has no error kinds: whatever a filler returns is cached and
//! replayed verbatim. The variants here belong to the collaborator utilities
//! (streaming cipher, shutdown coordinator, configuration).

use thiserror::Error;

/// Result type alias using `FillcacheError`.
pub type Result<T> = std::result::Result<T, FillcacheError>;

/// Boxed, thread-safe error used where callers hand us arbitrary errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Main error type for fillcache utilities.
#[derive(Debug, Error)]
pub enum FillcacheError {
    // ═══════════════════════════════════════════════════════════════════════════
    // CIPHER ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Key is not a valid AES key size.
    #[error("Invalid key: expected 16, 24 or 32 bytes, got {actual}")]
    InvalidKeyLength { actual: usize },

    /// IV is not exactly one block.
    #[error("Invalid IV: expected {expected} bytes, got {actual}")]
    InvalidIvLength { expected: usize, actual: usize },

    /// An action was attempted on a closed reader or writer.
    #[error("cannot perform an action on a closed instance")]
    Closed,

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// I/O error from the wrapped reader or writer.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl FillcacheError {
    /// Returns true if this error reports use of a closed instance.
    pub fn is_closed(&self) -> bool {
        matches!(self, FillcacheError::Closed)
    }

    /// Returns true if this is a cipher setup error.
    pub fn is_crypto_error(&self) -> bool {
        matches!(
            self,
            FillcacheError::InvalidKeyLength { .. } | FillcacheError::InvalidIvLength { .. }
        )
    }
}

impl From<FillcacheError> for std::io::Error {
    fn from(err: FillcacheError) -> Self {
        match err {
            FillcacheError::IoError(inner) => inner,
            other => std::io::Error::other(other),
        }
    }
}
