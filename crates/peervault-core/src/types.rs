//! Strong type definitions for Peervault.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 64-bit agent identifier.
///
/// Assigned randomly when an agent is created and stable for the lifetime
/// of the agent.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(pub u64);

impl AgentId {
    /// Create from a raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(rand::random())
    }
}

impl fmt::Debug for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentId({:016x})", self.0)
    }
}

impl fmt::Display for AgentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for AgentId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// A 64-bit envelope identifier.
///
/// Either caller-supplied, random (anonymous envelopes), or derived
/// deterministically from a content tag and an identifier string via
/// [`EnvelopeId::for_class`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EnvelopeId(pub u64);

impl EnvelopeId {
    /// Create from a raw value.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw value.
    pub const fn as_raw(&self) -> u64 {
        self.0
    }

    /// Generate a fresh random id.
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Derive a stable id for a (content tag, identifier) pair.
    ///
    /// The same pair always maps to the same id, so callers can rediscover
    /// well-known singleton envelopes without a registry. Collisions between
    /// different pairs are not detected.
    pub fn for_class(tag: &str, identifier: &str) -> Self {
        let hash = blake3::hash(format!("cls-{tag}-{identifier}").as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&hash.as_bytes()[..8]);
        Self(u64::from_le_bytes(raw))
    }
}

impl fmt::Debug for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EnvelopeId({:016x})", self.0)
    }
}

impl fmt::Display for EnvelopeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl From<u64> for EnvelopeId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_id_deterministic() {
        let a = EnvelopeId::for_class("user-list", "main");
        let b = EnvelopeId::for_class("user-list", "main");
        assert_eq!(a, b);
    }

    #[test]
    fn test_class_id_varies_with_inputs() {
        let a = EnvelopeId::for_class("user-list", "main");
        let b = EnvelopeId::for_class("user-list", "other");
        let c = EnvelopeId::for_class("group-list", "main");
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_agent_id_display() {
        let id = AgentId::from_raw(0xab);
        assert_eq!(format!("{}", id), "00000000000000ab");
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(EnvelopeId::random(), EnvelopeId::random());
    }
}
