//! Error types for the agent module.

use peervault_core::{AgentId, CoreError};
use thiserror::Error;

/// Errors that can occur during agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent's private key has not been unlocked.
    #[error("agent is locked")]
    Locked,

    /// Unlocking with a passphrase failed.
    #[error("wrong passphrase")]
    BadPassphrase,

    /// The given agent holds no wrapped copy of the group's key.
    #[error("agent {0} is not a member of this group")]
    NotAMember(AgentId),

    /// A group needs at least one member to be unlockable at all.
    #[error("a group needs at least one member")]
    NoMembers,

    /// Recovered key material does not reproduce the stored public keys.
    #[error("recovered key material does not match the stored public keys")]
    KeyMismatch,

    /// Low-level cryptographic failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CoreError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Errors surfaced by an [`AgentStorage`](crate::AgentStorage) collaborator.
#[derive(Debug, Error)]
pub enum AgentStorageError {
    /// No agent with the given id is known.
    #[error("agent not found: {0}")]
    NotFound(AgentId),

    /// The agent exists but could not be produced.
    #[error("agent error: {0}")]
    Agent(#[from] AgentError),

    /// Backend failure.
    #[error("agent storage error: {0}")]
    Storage(String),
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
