//! Storage abstraction for persisted envelopes.

use async_trait::async_trait;

use peervault_core::EnvelopeId;
use peervault_envelope::Envelope;

use crate::error::Result;

/// Durable storage keyed by envelope id.
///
/// A node stores whatever wire bytes were last accepted for an id and
/// returns them on fetch; it performs no replication or routing of its own.
/// Implementations enforce the optimistic overwrite protocol: replacing a
/// stored artifact runs [`Envelope::check_overwrite`] on the stored version
/// first, so a stale or unauthorized replacement never lands.
#[async_trait]
pub trait Node: Send + Sync {
    /// Persist a closed envelope, subject to the overwrite check against
    /// any previously stored version.
    async fn store_artifact(&self, envelope: &Envelope) -> Result<()>;

    /// Fetch and decode the artifact with the given id.
    async fn fetch_artifact(&self, id: EnvelopeId) -> Result<Envelope>;

    /// Is an artifact with the given id stored?
    async fn has_artifact(&self, id: EnvelopeId) -> Result<bool>;
}
