//! Error types for the Peervault core primitives.

use thiserror::Error;

/// Errors that can occur during low-level cryptographic operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("malformed wrapped key: {0}")]
    MalformedWrappedKey(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
