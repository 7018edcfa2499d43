//! # Peervault Store
//!
//! Storage collaborators for Peervault. Artifacts (sealed envelopes) and
//! agents are persisted behind narrow async traits, keeping the container
//! layer storage-agnostic.
//!
//! ## Key Types
//!
//! - [`Node`] - durable artifact storage keyed by envelope id
//! - [`SqliteNode`] - SQLite-based persistent storage for artifacts and agents
//! - [`MemoryNode`] - in-memory storage for tests
//!
//! ## Design Notes
//!
//! - **Overwrite protocol**: `store_artifact` runs the stored version's
//!   overwrite check against the replacement, so stale or unauthorized
//!   writes are rejected at the storage boundary.
//! - **Locked at rest**: agents are persisted in their serialized form and
//!   always come back locked; both node types also implement the
//!   [`AgentStorage`](peervault_agent::AgentStorage) lookup trait.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryNode;
pub use sqlite::SqliteNode;
pub use traits::Node;
