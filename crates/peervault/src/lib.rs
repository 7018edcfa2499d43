//! # Peervault
//!
//! Encrypted, multi-reader, access-controlled content containers for
//! untrusted peer-to-peer storage.
//!
//! A [`Envelope`] seals content under a fresh symmetric key wrapped once
//! per entitled reader; [`Agent`]s (individual or group) are the principals
//! that hold the unwrapping keys; a [`Context`] is the per-execution
//! security session that resolves opens through the acting agent or any
//! group it can unlock. Storage is delegated to [`Node`] collaborators,
//! which enforce the optimistic overwrite protocol on replacement.
//!
//! ```no_run
//! use std::sync::Arc;
//! use peervault::{Agent, Context, Envelope, IndividualAgent, MemoryNode, Node};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let alice = Agent::Individual(IndividualAgent::create("passphrase")?);
//! let node = Arc::new(MemoryNode::new());
//!
//! let envelope = Envelope::builder()
//!     .text("shared state")
//!     .reader(&alice)
//!     .seal()?;
//! node.store_artifact(&envelope).await?;
//!
//! let mut ctx = Context::new(alice, node.clone());
//! let mut fetched = node.fetch_artifact(envelope.id()).await?;
//! ctx.open_envelope(&mut fetched).await?;
//! assert_eq!(fetched.content_text()?, "shared state");
//! # Ok(())
//! # }
//! ```

pub mod context;
pub mod error;

pub use context::Context;
pub use error::{ContextError, Result};

pub use peervault_agent::{
    Agent, AgentError, AgentKind, AgentStorage, AgentStorageError, GroupAgent, IndividualAgent,
    KeyUnwrapper, Lockable, Signer,
};
pub use peervault_core::{AgentId, CoreError, EnvelopeId};
pub use peervault_envelope::{ContentSchema, ContentType, Envelope, EnvelopeBuilder, EnvelopeError};
pub use peervault_store::{MemoryNode, Node, SqliteNode, StoreError};
