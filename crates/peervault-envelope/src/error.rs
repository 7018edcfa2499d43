//! Error types for the envelope module.

use peervault_agent::AgentError;
use thiserror::Error;

/// Errors that can occur during envelope operations.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    /// Crypto or serialization failure while sealing content or wrapping a
    /// key for a reader.
    #[error("encoding failed: {0}")]
    EncodingFailed(String),

    /// A key is present but unusable, or sealed content could not be
    /// recovered.
    #[error("decoding failed: {0}")]
    DecodingFailed(String),

    /// The agent holds no reader entry, or is locked.
    #[error("access denied: {0}")]
    AccessDenied(String),

    /// A state-machine, overwrite or signature precondition was violated.
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// A signature is missing or cryptographically invalid.
    #[error("verification failed: {0}")]
    VerificationFailed(String),

    /// The wire form could not be parsed.
    #[error("malformed envelope: {0}")]
    MalformedFormat(String),
}

impl From<AgentError> for EnvelopeError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::Locked => EnvelopeError::AccessDenied("agent is locked".into()),
            other => EnvelopeError::SecurityViolation(other.to_string()),
        }
    }
}

/// Result type for envelope operations.
pub type Result<T> = std::result::Result<T, EnvelopeError>;
