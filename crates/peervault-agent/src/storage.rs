//! Agent lookup abstraction.

use async_trait::async_trait;
use peervault_core::AgentId;

use crate::agent::Agent;
use crate::error::AgentStorageError;

/// A source of agents by id.
///
/// Implementations return agents in their locked, persisted form; callers
/// unlock them as needed. Lookups are async because real backends hit a
/// database or the network.
#[async_trait]
pub trait AgentStorage: Send + Sync {
    /// Fetch the agent with the given id.
    async fn get_agent(&self, id: AgentId) -> Result<Agent, AgentStorageError>;

    /// Does this storage know the given agent?
    async fn has_agent(&self, id: AgentId) -> Result<bool, AgentStorageError>;
}
