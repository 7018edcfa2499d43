//! Agent security model for Peervault.
//!
//! Agents are the principals of the system. An [`IndividualAgent`] holds a
//! signing keypair and a key-agreement keypair, sealed at rest under a
//! passphrase-derived key. A [`GroupAgent`] holds its own keypair whose
//! secret is wrapped once per member, so any single unlocked member can
//! unlock the group.
//!
//! The [`AgentStorage`] trait abstracts where locked agents live.

pub mod agent;
pub mod error;
pub mod group;
pub mod storage;

pub use agent::{Agent, AgentKind, IndividualAgent, KeyUnwrapper, Lockable, Signer};
pub use error::{AgentError, AgentStorageError};
pub use group::GroupAgent;
pub use storage::AgentStorage;
