//! Aggregate error type for context-level operations.

use peervault_agent::{AgentError, AgentStorageError};
use peervault_core::AgentId;
use peervault_envelope::EnvelopeError;
use peervault_store::StoreError;
use thiserror::Error;

/// Errors surfaced by [`Context`](crate::Context) operations.
#[derive(Debug, Error)]
pub enum ContextError {
    /// Envelope operation failed.
    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// Agent operation failed.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Agent lookup failed.
    #[error(transparent)]
    AgentStorage(#[from] AgentStorageError),

    /// Storage operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The requested agent exists but is not a group.
    #[error("agent {0} is not a group")]
    NotAGroup(AgentId),

    /// Passphrase unlock applies only to individual agents.
    #[error("the acting agent is a group; unlock it via one of its members")]
    NotAnIndividual,
}

/// Result type for context operations.
pub type Result<T> = std::result::Result<T, ContextError>;
