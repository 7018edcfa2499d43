//! Test fixtures and helpers.
//!
//! Common setup code for integration tests: a pair of unlocked individual
//! agents, a group containing both, and an in-memory node that already
//! knows all of them in their locked, persisted form.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use peervault::Context;
use peervault_agent::{Agent, GroupAgent, IndividualAgent};
use peervault_envelope::{ContentSchema, Envelope};
use peervault_store::MemoryNode;

/// Passphrase of the fixture's first agent.
pub const ALICE_PASSPHRASE: &str = "alice-pw";
/// Passphrase of the fixture's second agent.
pub const BOB_PASSPHRASE: &str = "bob-pw";

/// A simple tagged content type for typed-envelope tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteBook {
    pub notes: Vec<String>,
}

impl ContentSchema for NoteBook {
    const TAG: &'static str = "note-book";
}

/// A test fixture with two agents, a shared group and a memory node.
pub struct TestFixture {
    /// Unlocked individual agent.
    pub alice: Agent,
    /// Unlocked individual agent.
    pub bob: Agent,
    /// Group containing alice and bob, unlocked.
    pub group: GroupAgent,
    /// Node that knows all three agents in locked form.
    pub node: Arc<MemoryNode>,
}

impl TestFixture {
    /// Create a fresh fixture.
    pub fn new() -> Self {
        let alice = Agent::Individual(
            IndividualAgent::create(ALICE_PASSPHRASE).expect("agent creation"),
        );
        let bob =
            Agent::Individual(IndividualAgent::create(BOB_PASSPHRASE).expect("agent creation"));
        let group = GroupAgent::create(&[&alice, &bob]).expect("group creation");

        let node = Arc::new(MemoryNode::new());
        node.store_agent(&alice).expect("store agent");
        node.store_agent(&bob).expect("store agent");
        node.store_agent(&Agent::Group(group.clone()))
            .expect("store agent");

        Self {
            alice,
            bob,
            group,
            node,
        }
    }

    /// A context acting as the given agent, backed by the fixture's node.
    pub fn context_for(&self, agent: &Agent) -> Context {
        Context::new(agent.clone(), self.node.clone())
    }

    /// A sealed text envelope readable by the given agents.
    pub fn text_envelope(&self, content: &str, readers: &[&Agent]) -> Envelope {
        let mut builder = Envelope::builder().text(content);
        for reader in readers {
            builder = builder.reader(reader);
        }
        builder.seal().expect("seal")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create several unlocked individual agents for multi-party tests.
pub fn individuals(count: usize) -> Vec<Agent> {
    (0..count)
        .map(|i| {
            Agent::Individual(
                IndividualAgent::create(&format!("agent-{i}-pw")).expect("agent creation"),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use peervault_agent::{AgentStorage, Lockable};

    #[tokio::test]
    async fn test_fixture_agents_are_known_and_locked_at_rest() {
        let fixture = TestFixture::new();

        assert!(!fixture.alice.is_locked());
        let stored = fixture.node.get_agent(fixture.alice.id()).await.unwrap();
        assert!(stored.is_locked());
    }

    #[test]
    fn test_text_envelope_readable() {
        let fixture = TestFixture::new();
        let mut envelope = fixture.text_envelope("fixture text", &[&fixture.alice]);
        envelope.open(&fixture.alice).unwrap();
        assert_eq!(envelope.content_text().unwrap(), "fixture text");
    }
}
