//! SQLite implementation of the Node trait.
//!
//! This is the persistent storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking. Both artifacts and
//! agents live in the same database, so a node restart loses nothing.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use peervault_agent::{Agent, AgentStorage, AgentStorageError};
use peervault_core::{AgentId, EnvelopeId};
use peervault_envelope::Envelope;

use crate::error::{Result, StoreError};
use crate::memory::{decode_agent, encode_agent};
use crate::migration;
use crate::traits::Node;

/// SQLite-based node implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking to
/// avoid blocking the async runtime.
pub struct SqliteNode {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteNode {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Persist an agent in its locked, serialized form.
    pub async fn store_agent(&self, agent: &Agent) -> Result<()> {
        let bytes = encode_agent(agent)?;
        let id = agent.id();
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            conn.execute(
                "INSERT INTO agents (agent_id, data, stored_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(agent_id) DO UPDATE SET
                    data = excluded.data,
                    stored_at = excluded.stored_at",
                params![id.as_raw() as i64, bytes, now_millis()],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

fn lock(conn: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>> {
    conn.lock()
        .map_err(|e| StoreError::Task(format!("connection mutex poisoned: {e}")))
}

#[async_trait]
impl Node for SqliteNode {
    async fn store_artifact(&self, envelope: &Envelope) -> Result<()> {
        let bytes = envelope.to_bytes()?;
        // independent snapshot so the overwrite check can run off-thread
        let candidate = envelope.clone_locked()?;
        let id = envelope.id();
        let conn = self.conn.clone();

        debug!(id = %id, size = bytes.len(), "storing artifact");
        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;

            let existing: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM artifacts WHERE artifact_id = ?1",
                    params![id.as_raw() as i64],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing) = existing {
                let stored = Envelope::from_bytes(&existing)?;
                stored.check_overwrite(&candidate)?;
            }

            conn.execute(
                "INSERT INTO artifacts (artifact_id, data, stored_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(artifact_id) DO UPDATE SET
                    data = excluded.data,
                    stored_at = excluded.stored_at",
                params![id.as_raw() as i64, bytes, now_millis()],
            )?;
            Ok(())
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn fetch_artifact(&self, id: EnvelopeId) -> Result<Envelope> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM artifacts WHERE artifact_id = ?1",
                    params![id.as_raw() as i64],
                    |row| row.get(0),
                )
                .optional()?;

            let bytes = bytes.ok_or(StoreError::ArtifactNotFound(id))?;
            Ok(Envelope::from_bytes(&bytes)?)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    async fn has_artifact(&self, id: EnvelopeId) -> Result<bool> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = lock(&conn)?;
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM artifacts WHERE artifact_id = ?1)",
                params![id.as_raw() as i64],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }
}

#[async_trait]
impl AgentStorage for SqliteNode {
    async fn get_agent(&self, id: AgentId) -> std::result::Result<Agent, AgentStorageError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| AgentStorageError::Storage(format!("mutex poisoned: {e}")))?;

            let bytes: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT data FROM agents WHERE agent_id = ?1",
                    params![id.as_raw() as i64],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| AgentStorageError::Storage(e.to_string()))?;

            let bytes = bytes.ok_or(AgentStorageError::NotFound(id))?;
            decode_agent(&bytes)
        })
        .await
        .map_err(|e| AgentStorageError::Storage(e.to_string()))?
    }

    async fn has_agent(&self, id: AgentId) -> std::result::Result<bool, AgentStorageError> {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| AgentStorageError::Storage(format!("mutex poisoned: {e}")))?;

            conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM agents WHERE agent_id = ?1)",
                params![id.as_raw() as i64],
                |row| row.get(0),
            )
            .map_err(|e| AgentStorageError::Storage(e.to_string()))
        })
        .await
        .map_err(|e| AgentStorageError::Storage(e.to_string()))?
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use peervault_agent::{IndividualAgent, Lockable};

    fn agent(passphrase: &str) -> Agent {
        Agent::Individual(IndividualAgent::create(passphrase).unwrap())
    }

    #[tokio::test]
    async fn test_store_and_fetch_artifact() {
        let node = SqliteNode::open_memory().unwrap();
        let alice = agent("pw");
        let envelope = Envelope::builder()
            .text("durable")
            .reader(&alice)
            .seal()
            .unwrap();

        node.store_artifact(&envelope).await.unwrap();
        assert!(node.has_artifact(envelope.id()).await.unwrap());

        let mut fetched = node.fetch_artifact(envelope.id()).await.unwrap();
        fetched.open(&alice).unwrap();
        assert_eq!(fetched.content_text().unwrap(), "durable");
    }

    #[tokio::test]
    async fn test_fetch_missing_artifact() {
        let node = SqliteNode::open_memory().unwrap();
        assert!(matches!(
            node.fetch_artifact(EnvelopeId::random()).await,
            Err(StoreError::ArtifactNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_overwrite_protocol_enforced() {
        let node = SqliteNode::open_memory().unwrap();
        let alice = agent("pw");
        let envelope = Envelope::builder()
            .text("v1")
            .reader(&alice)
            .seal()
            .unwrap();
        let id = envelope.id();
        node.store_artifact(&envelope).await.unwrap();

        let stale = Envelope::builder()
            .id(id)
            .text("stale")
            .reader(&alice)
            .seal()
            .unwrap();
        assert!(node.store_artifact(&stale).await.is_err());

        let mut current = node.fetch_artifact(id).await.unwrap();
        current.open(&alice).unwrap();
        current.update_text("v2").unwrap();
        current.close().unwrap();
        node.store_artifact(&current).await.unwrap();

        let mut fetched = node.fetch_artifact(id).await.unwrap();
        fetched.open(&alice).unwrap();
        assert_eq!(fetched.content_text().unwrap(), "v2");
    }

    #[tokio::test]
    async fn test_artifacts_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.db");

        let alice = agent("pw");
        let envelope = Envelope::builder()
            .text("still here")
            .reader(&alice)
            .seal()
            .unwrap();
        let id = envelope.id();

        {
            let node = SqliteNode::open(&path).unwrap();
            node.store_artifact(&envelope).await.unwrap();
            node.store_agent(&alice).await.unwrap();
        }

        let node = SqliteNode::open(&path).unwrap();
        let mut fetched = node.fetch_artifact(id).await.unwrap();
        fetched.open(&alice).unwrap();
        assert_eq!(fetched.content_text().unwrap(), "still here");

        let restored = node.get_agent(alice.id()).await.unwrap();
        assert_eq!(restored.id(), alice.id());
        assert!(restored.is_locked());
    }

    #[tokio::test]
    async fn test_agent_lookup() {
        let node = SqliteNode::open_memory().unwrap();
        let alice = agent("pw");

        assert!(!node.has_agent(alice.id()).await.unwrap());
        node.store_agent(&alice).await.unwrap();
        assert!(node.has_agent(alice.id()).await.unwrap());

        assert!(matches!(
            node.get_agent(AgentId::random()).await,
            Err(AgentStorageError::NotFound(_))
        ));
    }
}
