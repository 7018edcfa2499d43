//! In-memory implementation of the Node trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite but
//! keeps everything in memory with no persistence.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use tracing::debug;

use peervault_agent::{Agent, AgentError, AgentStorage, AgentStorageError};
use peervault_core::{AgentId, EnvelopeId};
use peervault_envelope::Envelope;

use crate::error::{Result, StoreError};
use crate::traits::Node;

/// In-memory node implementation.
///
/// Artifacts are held in their wire form and agents in their serialized
/// form, so fetching always yields a closed envelope or a locked agent —
/// the same observable behavior a persistent backend has. All data is lost
/// when the node is dropped. Thread-safe via RwLock.
pub struct MemoryNode {
    inner: RwLock<MemoryNodeInner>,
}

struct MemoryNodeInner {
    /// Artifact wire bytes by envelope id.
    artifacts: HashMap<EnvelopeId, Vec<u8>>,

    /// Serialized agents by id.
    agents: HashMap<AgentId, Vec<u8>>,
}

impl MemoryNode {
    /// Create a new empty in-memory node.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryNodeInner {
                artifacts: HashMap::new(),
                agents: HashMap::new(),
            }),
        }
    }

    /// Persist an agent in its locked, serialized form.
    pub fn store_agent(&self, agent: &Agent) -> Result<()> {
        let bytes = encode_agent(agent)?;
        let mut inner = self.inner.write().unwrap();
        inner.agents.insert(agent.id(), bytes);
        Ok(())
    }
}

impl Default for MemoryNode {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Node for MemoryNode {
    async fn store_artifact(&self, envelope: &Envelope) -> Result<()> {
        let bytes = envelope.to_bytes()?;
        let mut inner = self.inner.write().unwrap();

        if let Some(existing) = inner.artifacts.get(&envelope.id()) {
            let stored = Envelope::from_bytes(existing)?;
            stored.check_overwrite(envelope)?;
        }

        debug!(id = %envelope.id(), size = bytes.len(), "storing artifact");
        inner.artifacts.insert(envelope.id(), bytes);
        Ok(())
    }

    async fn fetch_artifact(&self, id: EnvelopeId) -> Result<Envelope> {
        let inner = self.inner.read().unwrap();
        let bytes = inner
            .artifacts
            .get(&id)
            .ok_or(StoreError::ArtifactNotFound(id))?;
        Ok(Envelope::from_bytes(bytes)?)
    }

    async fn has_artifact(&self, id: EnvelopeId) -> Result<bool> {
        let inner = self.inner.read().unwrap();
        Ok(inner.artifacts.contains_key(&id))
    }
}

#[async_trait]
impl AgentStorage for MemoryNode {
    async fn get_agent(&self, id: AgentId) -> std::result::Result<Agent, AgentStorageError> {
        let inner = self.inner.read().unwrap();
        let bytes = inner
            .agents
            .get(&id)
            .ok_or(AgentStorageError::NotFound(id))?;
        decode_agent(bytes)
    }

    async fn has_agent(&self, id: AgentId) -> std::result::Result<bool, AgentStorageError> {
        let inner = self.inner.read().unwrap();
        Ok(inner.agents.contains_key(&id))
    }
}

pub(crate) fn encode_agent(agent: &Agent) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(agent, &mut bytes)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(bytes)
}

pub(crate) fn decode_agent(bytes: &[u8]) -> std::result::Result<Agent, AgentStorageError> {
    // a present-but-undecodable record is an agent problem, not a backend one
    ciborium::from_reader(bytes)
        .map_err(|e| AgentStorageError::Agent(AgentError::Serialization(e.to_string())))
}
