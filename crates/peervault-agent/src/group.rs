//! Group agents.
//!
//! A group agent owns its own keypair like any other agent, but its secret
//! is not passphrase-protected: it is wrapped once per member under the
//! member's key-agreement public key. Any single unlocked member can
//! therefore unlock the group.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use peervault_core::{
    AgentId, Ed25519PublicKey, Ed25519Signature, WrappedKey, X25519PublicKey,
};

use crate::agent::{Agent, AgentSecret, KeyUnwrapper, Lockable, Signer};
use crate::error::{AgentError, Result};

/// An agent representing a group of other agents.
#[derive(Clone, Serialize, Deserialize)]
pub struct GroupAgent {
    id: AgentId,
    signing_public: Ed25519PublicKey,
    exchange_public: X25519PublicKey,
    /// The group secret, wrapped once per member.
    member_keys: HashMap<AgentId, WrappedKey>,
    #[serde(skip)]
    secret: Option<AgentSecret>,
}

impl GroupAgent {
    /// Create a new group with the given initial members.
    ///
    /// Wrapping only needs each member's public key, so members may be
    /// locked. The returned group is unlocked.
    pub fn create(members: &[&Agent]) -> Result<Self> {
        if members.is_empty() {
            return Err(AgentError::NoMembers);
        }

        let secret = AgentSecret::generate();
        let secret_bytes = secret.to_bytes();

        let mut member_keys = HashMap::new();
        for member in members {
            let wrapped = WrappedKey::wrap(
                &secret_bytes,
                &member.exchange_public(),
                &member.id().as_raw().to_le_bytes(),
            )?;
            member_keys.insert(member.id(), wrapped);
        }

        Ok(Self {
            id: AgentId::random(),
            signing_public: secret.signing_public(),
            exchange_public: secret.exchange_public(),
            member_keys,
            secret: Some(secret),
        })
    }

    /// The group's id.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Unlock the group via one of its members.
    ///
    /// The member must itself be unlocked. Fails with
    /// [`AgentError::NotAMember`] if the group holds no wrapped key for the
    /// member, and [`AgentError::KeyMismatch`] if the recovered material
    /// does not reproduce the group's public keys.
    pub fn unlock_for(&mut self, member: &Agent) -> Result<()> {
        if self.secret.is_some() {
            return Ok(());
        }

        let wrapped = self
            .member_keys
            .get(&member.id())
            .ok_or(AgentError::NotAMember(member.id()))?;

        let bytes = member.unwrap_key(wrapped)?;
        let secret = AgentSecret::from_slice(&bytes)?;

        if secret.signing_public() != self.signing_public
            || secret.exchange_public() != self.exchange_public
        {
            return Err(AgentError::KeyMismatch);
        }

        self.secret = Some(secret);
        Ok(())
    }

    /// Is the given agent a direct member of this group?
    pub fn is_member(&self, id: AgentId) -> bool {
        self.member_keys.contains_key(&id)
    }

    /// The ids of all direct members.
    pub fn members(&self) -> Vec<AgentId> {
        self.member_keys.keys().copied().collect()
    }

    /// Number of direct members.
    pub fn size(&self) -> usize {
        self.member_keys.len()
    }

    /// Add a member, wrapping the group secret for them.
    ///
    /// Requires the group to be unlocked.
    pub fn add_member(&mut self, member: &Agent) -> Result<()> {
        let secret = self.secret.as_ref().ok_or(AgentError::Locked)?;
        let wrapped = WrappedKey::wrap(
            &secret.to_bytes(),
            &member.exchange_public(),
            &member.id().as_raw().to_le_bytes(),
        )?;
        self.member_keys.insert(member.id(), wrapped);
        Ok(())
    }

    /// Remove a member's wrapped key. Returns whether the member was present.
    ///
    /// Requires the group to be unlocked.
    pub fn remove_member(&mut self, id: AgentId) -> Result<bool> {
        if self.secret.is_none() {
            return Err(AgentError::Locked);
        }
        Ok(self.member_keys.remove(&id).is_some())
    }
}

impl Lockable for GroupAgent {
    fn is_locked(&self) -> bool {
        self.secret.is_none()
    }

    fn lock(&mut self) {
        self.secret = None;
    }
}

impl Signer for GroupAgent {
    fn signing_public(&self) -> Ed25519PublicKey {
        self.signing_public
    }

    fn sign(&self, message: &[u8]) -> Result<Ed25519Signature> {
        let secret = self.secret.as_ref().ok_or(AgentError::Locked)?;
        Ok(secret.signing.sign(message))
    }
}

impl KeyUnwrapper for GroupAgent {
    fn exchange_public(&self) -> X25519PublicKey {
        self.exchange_public
    }

    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<Vec<u8>> {
        let secret = self.secret.as_ref().ok_or(AgentError::Locked)?;
        Ok(wrapped.unwrap(&secret.exchange, &self.id.as_raw().to_le_bytes())?)
    }
}

impl fmt::Debug for GroupAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupAgent")
            .field("id", &self.id)
            .field("members", &self.member_keys.len())
            .field("locked", &self.is_locked())
            .finish()
    }
}
