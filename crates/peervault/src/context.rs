//! Per-execution security sessions.
//!
//! A [`Context`] binds one acting agent to a single logical execution. Its
//! job is resolving "open this envelope" requests: try the acting agent
//! directly, then fall back to any group the envelope entitles that the
//! acting agent can unlock. Unlocked groups are cached for the lifetime of
//! the context, so repeated opens skip the directory round trip.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tracing::debug;

use peervault_agent::{Agent, AgentStorage, AgentStorageError, GroupAgent};
use peervault_core::AgentId;
use peervault_envelope::{Envelope, EnvelopeError};

use crate::error::{ContextError, Result};

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

/// A security session bound to one acting agent.
///
/// Contexts are explicit values passed to every operation; there is no
/// ambient or thread-local session state. One context serves one logical
/// execution and is discarded afterwards — an idle-eviction policy, if any,
/// belongs to the caller and reads [`last_used`](Context::last_used).
pub struct Context {
    main_agent: Agent,
    /// Groups unlocked on behalf of the acting agent. Grows only.
    group_cache: HashMap<AgentId, GroupAgent>,
    directory: Arc<dyn AgentStorage>,
    last_used: i64,
}

impl Context {
    /// Create a context for the given acting agent.
    pub fn new(main_agent: Agent, directory: Arc<dyn AgentStorage>) -> Self {
        Self {
            main_agent,
            group_cache: HashMap::new(),
            directory,
            last_used: now_millis(),
        }
    }

    /// The acting agent.
    pub fn main_agent(&self) -> &Agent {
        &self.main_agent
    }

    /// Unlock an individual acting agent with its passphrase.
    pub fn unlock_main_agent(&mut self, passphrase: &str) -> Result<()> {
        self.touch();
        match &mut self.main_agent {
            Agent::Individual(agent) => {
                agent.unlock(passphrase)?;
                Ok(())
            }
            Agent::Group(_) => Err(ContextError::NotAnIndividual),
        }
    }

    /// Stamp the last-used time.
    pub fn touch(&mut self) {
        self.last_used = now_millis();
    }

    /// Epoch millis of the last operation on this context.
    pub fn last_used(&self) -> i64 {
        self.last_used
    }

    /// Open an envelope on behalf of the acting agent.
    ///
    /// Tries the acting agent directly first. On access denial, walks the
    /// envelope's group readers: each candidate group is taken from the
    /// cache or fetched from the directory and unlocked with the acting
    /// agent. Per-candidate failures are discarded and the walk continues;
    /// only total exhaustion surfaces the original denial.
    pub async fn open_envelope(&mut self, envelope: &mut Envelope) -> Result<()> {
        self.touch();

        let denied = match envelope.open(&self.main_agent) {
            Ok(()) => return Ok(()),
            Err(err @ EnvelopeError::AccessDenied(_)) => err,
            Err(err) => return Err(err.into()),
        };

        for group_id in envelope.group_reader_ids() {
            let group = match self.request_group(group_id).await {
                Ok(group) => group,
                Err(err) => {
                    debug!(group = %group_id, error = %err, "group candidate not usable");
                    continue;
                }
            };
            match envelope.open(&Agent::Group(group)) {
                Ok(()) => return Ok(()),
                Err(err) => {
                    debug!(group = %group_id, error = %err, "group could not open envelope");
                }
            }
        }

        Err(denied.into())
    }

    /// Fetch and unlock a group on behalf of the acting agent, caching it.
    ///
    /// A cached unlocked group is returned without touching the directory.
    pub async fn request_group(&mut self, id: AgentId) -> Result<GroupAgent> {
        if let Some(group) = self.group_cache.get(&id) {
            return Ok(group.clone());
        }

        let agent = self.directory.get_agent(id).await?;
        let Agent::Group(mut group) = agent else {
            return Err(ContextError::NotAGroup(id));
        };
        group.unlock_for(&self.main_agent)?;
        self.group_cache.insert(id, group.clone());
        Ok(group)
    }

    /// Is the given group already unlocked in this context?
    pub fn has_cached_group(&self, id: AgentId) -> bool {
        self.group_cache.contains_key(&id)
    }
}

/// A context is itself an agent source: it prefers its own already-unlocked
/// identities over a directory round trip.
#[async_trait]
impl AgentStorage for Context {
    async fn get_agent(&self, id: AgentId) -> std::result::Result<Agent, AgentStorageError> {
        if self.main_agent.id() == id {
            return Ok(self.main_agent.clone());
        }
        if let Some(group) = self.group_cache.get(&id) {
            return Ok(Agent::Group(group.clone()));
        }
        self.directory.get_agent(id).await
    }

    /// Checks local knowledge only, never the delegate directory.
    async fn has_agent(&self, id: AgentId) -> std::result::Result<bool, AgentStorageError> {
        Ok(self.main_agent.id() == id || self.group_cache.contains_key(&id))
    }
}
