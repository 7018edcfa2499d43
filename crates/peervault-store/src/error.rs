//! Error types for the store module.

use peervault_core::{AgentId, EnvelopeId};
use peervault_envelope::EnvelopeError;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No artifact with the given id is stored.
    #[error("artifact not found: {0}")]
    ArtifactNotFound(EnvelopeId),

    /// No agent with the given id is stored.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Envelope encode/decode or overwrite-check failure.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Agent serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A background database task failed to complete.
    #[error("background task failed: {0}")]
    Task(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
