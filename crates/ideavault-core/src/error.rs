//! Error types for IdeaVault core operations.
//!
//! Every failure the core can produce is a typed variant so callers can tell
//! "ask the user again" (`UserCancelled`, `PermissionDenied`) apart from
//! "this file is unusable" (`Authentication`, `Format`). The CLI layer maps
//! these to exit codes and user-friendly messages.

use thiserror::Error;

/// Result type alias for IdeaVault operations.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Core error type for IdeaVault operations.
#[derive(Debug, Error)]
pub enum VaultError {
    /// The user closed a file picker or declined a prompt
    #[error("Cancelled by user")]
    UserCancelled,

    /// The platform refused access to a key file
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Ciphertext failed authentication (wrong key or tampered data)
    #[error("Decryption failed: wrong key or corrupted data")]
    Authentication,

    /// Malformed JSON, unknown version, or bad encoding
    #[error("Format error: {0}")]
    Format(String),

    /// Cipher or random number generator failure
    #[error("Encryption error: {0}")]
    Crypto(String),

    /// Handle store or file storage error (generic)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// I/O error
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// JSON serialization error
    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}
