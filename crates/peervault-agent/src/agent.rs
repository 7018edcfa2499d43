//! Individual agents and the common agent surface.
//!
//! An agent is a cryptographic identity: an Ed25519 keypair for signing and
//! an X25519 keypair for key agreement. The secret half is sealed at rest —
//! for an individual agent under a passphrase-derived key — and must be
//! unlocked before any private-key operation.

use serde::{Deserialize, Serialize};
use std::fmt;

use peervault_core::{
    AgentId, Ed25519PublicKey, Ed25519Signature, EncryptedBlob, EncryptionKey, Keypair,
    WrappedKey, X25519PublicKey, X25519StaticSecret,
};

use crate::error::{AgentError, Result};
use crate::group::GroupAgent;

/// Whether an agent is an individual or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentKind {
    Individual,
    Group,
}

/// An agent that can be locked and unlocked.
pub trait Lockable {
    /// Is the private key currently unavailable?
    fn is_locked(&self) -> bool;

    /// Drop the in-memory private key, returning the agent to locked state.
    fn lock(&mut self);
}

/// An agent that can sign and verify content.
pub trait Signer {
    /// The agent's signing public key.
    fn signing_public(&self) -> Ed25519PublicKey;

    /// Sign a message. Fails with [`AgentError::Locked`] if locked.
    fn sign(&self, message: &[u8]) -> Result<Ed25519Signature>;

    /// Verify a signature against this agent's public key.
    fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<()> {
        self.signing_public()
            .verify(message, signature)
            .map_err(AgentError::Crypto)
    }
}

/// An agent that can recover secrets wrapped under its public key.
pub trait KeyUnwrapper {
    /// The agent's key-agreement public key.
    fn exchange_public(&self) -> X25519PublicKey;

    /// Unwrap a secret wrapped for this agent.
    /// Fails with [`AgentError::Locked`] if locked.
    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<Vec<u8>>;
}

/// The full private key material of an agent.
#[derive(Clone)]
pub(crate) struct AgentSecret {
    pub(crate) signing: Keypair,
    pub(crate) exchange: X25519StaticSecret,
}

impl AgentSecret {
    pub(crate) fn generate() -> Self {
        Self {
            signing: Keypair::generate(),
            exchange: X25519StaticSecret::generate(),
        }
    }

    /// Flat layout: signing seed (32 bytes) followed by exchange seed (32 bytes).
    pub(crate) fn to_bytes(&self) -> [u8; 64] {
        let mut buf = [0u8; 64];
        buf[..32].copy_from_slice(&self.signing.seed());
        buf[32..].copy_from_slice(&self.exchange.to_bytes());
        buf
    }

    pub(crate) fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != 64 {
            return Err(AgentError::Serialization(format!(
                "agent secret must be 64 bytes, got {}",
                bytes.len()
            )));
        }
        let mut signing_seed = [0u8; 32];
        signing_seed.copy_from_slice(&bytes[..32]);
        let mut exchange_seed = [0u8; 32];
        exchange_seed.copy_from_slice(&bytes[32..]);

        Ok(Self {
            signing: Keypair::from_seed(&signing_seed),
            exchange: X25519StaticSecret::from_bytes(exchange_seed),
        })
    }

    pub(crate) fn signing_public(&self) -> Ed25519PublicKey {
        self.signing.public_key()
    }

    pub(crate) fn exchange_public(&self) -> X25519PublicKey {
        self.exchange.public_key()
    }
}

/// Derive the sealing key for an agent secret from a passphrase and salt.
fn passphrase_key(passphrase: &str, salt: &[u8; 16]) -> EncryptionKey {
    let mut hasher = blake3::Hasher::new_derive_key("peervault-v0-passphrase");
    hasher.update(salt);
    hasher.update(passphrase.as_bytes());
    EncryptionKey::from_bytes(*hasher.finalize().as_bytes())
}

/// An individual agent whose secret is sealed under a passphrase.
///
/// A freshly created agent is unlocked. The serialized form carries only the
/// public keys and the sealed secret, so a stored or transmitted agent is
/// always locked until [`unlock`](IndividualAgent::unlock) succeeds.
#[derive(Clone, Serialize, Deserialize)]
pub struct IndividualAgent {
    id: AgentId,
    signing_public: Ed25519PublicKey,
    exchange_public: X25519PublicKey,
    salt: [u8; 16],
    sealed_secret: EncryptedBlob,
    #[serde(skip)]
    secret: Option<AgentSecret>,
}

impl IndividualAgent {
    /// Create a new agent protected by the given passphrase.
    pub fn create(passphrase: &str) -> Result<Self> {
        let secret = AgentSecret::generate();
        let salt: [u8; 16] = rand_salt();
        let key = passphrase_key(passphrase, &salt);
        let sealed_secret = EncryptedBlob::encrypt(&secret.to_bytes(), &key)?;

        Ok(Self {
            id: AgentId::random(),
            signing_public: secret.signing_public(),
            exchange_public: secret.exchange_public(),
            salt,
            sealed_secret,
            secret: Some(secret),
        })
    }

    /// The agent's id.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Unlock the private key with the passphrase.
    ///
    /// Fails with [`AgentError::BadPassphrase`] if the passphrase does not
    /// match. Unlocking an already-unlocked agent is a no-op.
    pub fn unlock(&mut self, passphrase: &str) -> Result<()> {
        if self.secret.is_some() {
            return Ok(());
        }

        let key = passphrase_key(passphrase, &self.salt);
        let bytes = self
            .sealed_secret
            .decrypt(&key)
            .map_err(|_| AgentError::BadPassphrase)?;
        let secret = AgentSecret::from_slice(&bytes)?;

        if secret.signing_public() != self.signing_public
            || secret.exchange_public() != self.exchange_public
        {
            return Err(AgentError::KeyMismatch);
        }

        self.secret = Some(secret);
        Ok(())
    }

    pub(crate) fn secret(&self) -> Result<&AgentSecret> {
        self.secret.as_ref().ok_or(AgentError::Locked)
    }
}

impl Lockable for IndividualAgent {
    fn is_locked(&self) -> bool {
        self.secret.is_none()
    }

    fn lock(&mut self) {
        self.secret = None;
    }
}

impl Signer for IndividualAgent {
    fn signing_public(&self) -> Ed25519PublicKey {
        self.signing_public
    }

    fn sign(&self, message: &[u8]) -> Result<Ed25519Signature> {
        Ok(self.secret()?.signing.sign(message))
    }
}

impl KeyUnwrapper for IndividualAgent {
    fn exchange_public(&self) -> X25519PublicKey {
        self.exchange_public
    }

    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<Vec<u8>> {
        let secret = self.secret()?;
        Ok(wrapped.unwrap(&secret.exchange, &self.id.as_raw().to_le_bytes())?)
    }
}

impl fmt::Debug for IndividualAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IndividualAgent")
            .field("id", &self.id)
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// An agent of either kind.
///
/// Envelope reader tables and agent storage deal in this tagged variant;
/// group-specific behavior lives on [`GroupAgent`] only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Agent {
    Individual(IndividualAgent),
    Group(GroupAgent),
}

impl Agent {
    /// The agent's id.
    pub fn id(&self) -> AgentId {
        match self {
            Agent::Individual(a) => a.id(),
            Agent::Group(g) => g.id(),
        }
    }

    /// The agent's kind.
    pub fn kind(&self) -> AgentKind {
        match self {
            Agent::Individual(_) => AgentKind::Individual,
            Agent::Group(_) => AgentKind::Group,
        }
    }

    /// Borrow as a group agent, if this is one.
    pub fn as_group(&self) -> Option<&GroupAgent> {
        match self {
            Agent::Group(g) => Some(g),
            Agent::Individual(_) => None,
        }
    }

    /// Borrow as an individual agent, if this is one.
    pub fn as_individual(&self) -> Option<&IndividualAgent> {
        match self {
            Agent::Individual(a) => Some(a),
            Agent::Group(_) => None,
        }
    }
}

impl From<IndividualAgent> for Agent {
    fn from(agent: IndividualAgent) -> Self {
        Agent::Individual(agent)
    }
}

impl From<GroupAgent> for Agent {
    fn from(group: GroupAgent) -> Self {
        Agent::Group(group)
    }
}

impl Lockable for Agent {
    fn is_locked(&self) -> bool {
        match self {
            Agent::Individual(a) => a.is_locked(),
            Agent::Group(g) => g.is_locked(),
        }
    }

    fn lock(&mut self) {
        match self {
            Agent::Individual(a) => a.lock(),
            Agent::Group(g) => g.lock(),
        }
    }
}

impl Signer for Agent {
    fn signing_public(&self) -> Ed25519PublicKey {
        match self {
            Agent::Individual(a) => a.signing_public(),
            Agent::Group(g) => g.signing_public(),
        }
    }

    fn sign(&self, message: &[u8]) -> Result<Ed25519Signature> {
        match self {
            Agent::Individual(a) => a.sign(message),
            Agent::Group(g) => g.sign(message),
        }
    }
}

impl KeyUnwrapper for Agent {
    fn exchange_public(&self) -> X25519PublicKey {
        match self {
            Agent::Individual(a) => a.exchange_public(),
            Agent::Group(g) => g.exchange_public(),
        }
    }

    fn unwrap_key(&self, wrapped: &WrappedKey) -> Result<Vec<u8>> {
        match self {
            Agent::Individual(a) => a.unwrap_key(wrapped),
            Agent::Group(g) => g.unwrap_key(wrapped),
        }
    }
}

fn rand_salt() -> [u8; 16] {
    use rand::RngCore;
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_is_unlocked() {
        let agent = IndividualAgent::create("hunter2").unwrap();
        assert!(!agent.is_locked());
    }

    #[test]
    fn test_lock_unlock_roundtrip() {
        let mut agent = IndividualAgent::create("hunter2").unwrap();
        agent.lock();
        assert!(agent.is_locked());
        assert!(matches!(agent.sign(b"msg"), Err(AgentError::Locked)));

        agent.unlock("hunter2").unwrap();
        assert!(!agent.is_locked());
        agent.sign(b"msg").unwrap();
    }

    #[test]
    fn test_wrong_passphrase_rejected() {
        let mut agent = IndividualAgent::create("hunter2").unwrap();
        agent.lock();
        assert!(matches!(
            agent.unlock("*******"),
            Err(AgentError::BadPassphrase)
        ));
        assert!(agent.is_locked());
    }

    #[test]
    fn test_sign_verify() {
        let agent = IndividualAgent::create("pw").unwrap();
        let sig = agent.sign(b"content").unwrap();
        agent.verify(b"content", &sig).unwrap();
        assert!(agent.verify(b"tampered", &sig).is_err());
    }

    #[test]
    fn test_unwrap_own_wrapped_key() {
        let agent = IndividualAgent::create("pw").unwrap();
        let wrapped = WrappedKey::wrap(
            b"secret payload",
            &agent.exchange_public(),
            &agent.id().as_raw().to_le_bytes(),
        )
        .unwrap();

        assert_eq!(agent.unwrap_key(&wrapped).unwrap(), b"secret payload");
    }

    #[test]
    fn test_serialized_agent_is_locked() {
        let agent = IndividualAgent::create("pw").unwrap();
        let mut buf = Vec::new();
        ciborium::into_writer(&agent, &mut buf).unwrap();
        let mut restored: IndividualAgent = ciborium::from_reader(buf.as_slice()).unwrap();

        assert!(restored.is_locked());
        restored.unlock("pw").unwrap();
        assert_eq!(restored.id(), agent.id());
    }
}
