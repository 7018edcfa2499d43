//! The encrypted, multi-reader content container.
//!
//! An envelope seals a payload under a fresh symmetric key and wraps that
//! key once per entitled reader, individual or group. Closed envelopes hold
//! only ciphertext and can be persisted or shipped anywhere; any reader can
//! open their own copy, mutate the plaintext, sign it, and close it again.
//!
//! Cross-replica conflicts are resolved optimistically via
//! [`check_overwrite`](Envelope::check_overwrite) rather than by locking:
//! a replacement must refer to the version it was derived from, and a signed
//! envelope may only be replaced by a version carrying a signature from one
//! of its signers.

use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use peervault_agent::{Agent, AgentError, AgentKind, KeyUnwrapper, Signer};
use peervault_core::{
    AgentId, Ed25519Signature, EncryptedBlob, EncryptionKey, EnvelopeId, WrappedKey,
    X25519PublicKey,
};

use crate::content::{ContentSchema, ContentType, TypedContent};
use crate::error::{EnvelopeError, Result};
use crate::wire;

/// Current time in epoch milliseconds.
pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

/// An encrypted, access-controlled content container.
///
/// Envelopes are plain mutable values with no internal synchronization; a
/// single instance must not be shared across concurrent operations.
pub struct Envelope {
    pub(crate) id: EnvelopeId,
    pub(crate) content_type: ContentType,
    /// Schema tag for structured/serialized content.
    pub(crate) content_tag: Option<String>,
    /// Sealed payload; populated exactly when the envelope is closed.
    pub(crate) cipher: Option<EncryptedBlob>,
    /// Plaintext payload; populated exactly when the envelope is open.
    pub(crate) plain: Option<Bytes>,
    pub(crate) reader_keys: HashMap<AgentId, WrappedKey>,
    pub(crate) group_reader_keys: HashMap<AgentId, WrappedKey>,
    pub(crate) signatures: HashMap<AgentId, Ed25519Signature>,
    pub(crate) overwrite_blindly: bool,
    pub(crate) content_mutable: bool,
    /// Epoch millis of the last content mutation.
    pub(crate) last_change: i64,
    /// `last_change` of the version this envelope was decoded from, or -1
    /// for a version that was never persisted.
    pub(crate) referral: i64,
    pub(crate) content_key: Option<EncryptionKey>,
    pub(crate) opened_by: Option<AgentId>,
    pub(crate) typed: Option<Box<dyn TypedContent>>,
}

impl Envelope {
    /// Start building a new envelope.
    pub fn builder() -> EnvelopeBuilder {
        EnvelopeBuilder::new()
    }

    /// Parse an envelope from its wire form.
    ///
    /// The decoded envelope is closed, and its referral timestamp records
    /// the decoded version's last change for later overwrite checks.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        wire::decode(bytes)
    }

    /// Serialize to the wire form. The envelope must be closed.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        wire::encode(self)
    }

    /// The envelope's id.
    pub fn id(&self) -> EnvelopeId {
        self.id
    }

    /// The shape of the payload.
    pub fn content_type(&self) -> ContentType {
        self.content_type
    }

    /// Schema tag of structured/serialized content.
    pub fn content_tag(&self) -> Option<&str> {
        self.content_tag.as_deref()
    }

    /// Is the plaintext currently accessible?
    pub fn is_open(&self) -> bool {
        self.plain.is_some()
    }

    /// Is the payload currently sealed?
    pub fn is_closed(&self) -> bool {
        !self.is_open()
    }

    /// The agent that opened this envelope, while open.
    pub fn opened_by(&self) -> Option<AgentId> {
        self.opened_by
    }

    /// Epoch millis of the last content mutation.
    pub fn last_change(&self) -> i64 {
        self.last_change
    }

    /// The version this envelope refers to, for overwrite checks.
    pub fn referral_timestamp(&self) -> i64 {
        self.referral
    }

    /// May this envelope be replaced without referring to it?
    pub fn is_overwrite_blindly(&self) -> bool {
        self.overwrite_blindly
    }

    /// Allow or forbid blind replacement.
    pub fn set_overwrite_blindly(&mut self, blindly: bool) {
        self.overwrite_blindly = blindly;
    }

    /// May the payload be replaced through the raw byte setters?
    pub fn is_content_mutable(&self) -> bool {
        self.content_mutable
    }

    /// Forbid raw byte-level content updates.
    ///
    /// After locking, the payload may only change through the typed handle
    /// returned by [`content_mut`](Envelope::content_mut). Only serialized
    /// content can be locked.
    pub fn lock_content(&mut self) -> Result<()> {
        if self.content_type != ContentType::Serialized {
            return Err(EnvelopeError::SecurityViolation(
                "only serialized content can be locked".into(),
            ));
        }
        self.content_mutable = false;
        Ok(())
    }

    fn require_open(&self) -> Result<&Bytes> {
        self.plain
            .as_ref()
            .ok_or_else(|| EnvelopeError::SecurityViolation("envelope is closed".into()))
    }

    /// Open the envelope for the given agent.
    ///
    /// Looks up the agent's wrapped key (individual and group tables are
    /// never conflated), unwraps it with the agent's secret and decrypts the
    /// payload. Fails with [`EnvelopeError::AccessDenied`] if the agent has
    /// no reader entry or is locked, and [`EnvelopeError::DecodingFailed`]
    /// if a key is present but unusable.
    pub fn open(&mut self, agent: &Agent) -> Result<()> {
        if let Some(owner) = self.opened_by {
            if owner == agent.id() {
                return Ok(());
            }
            return Err(EnvelopeError::SecurityViolation(format!(
                "envelope is already open by agent {owner}"
            )));
        }

        let table = match agent.kind() {
            AgentKind::Group => &self.group_reader_keys,
            AgentKind::Individual => &self.reader_keys,
        };
        let wrapped = table.get(&agent.id()).ok_or_else(|| {
            EnvelopeError::AccessDenied(format!("agent {} is not a reader", agent.id()))
        })?;

        let key_bytes = agent.unwrap_key(wrapped).map_err(|e| match e {
            AgentError::Locked => EnvelopeError::AccessDenied("agent is locked".into()),
            other => EnvelopeError::DecodingFailed(other.to_string()),
        })?;
        let key = EncryptionKey::from_slice(&key_bytes)
            .map_err(|e| EnvelopeError::DecodingFailed(e.to_string()))?;

        let cipher = self
            .cipher
            .as_ref()
            .ok_or_else(|| EnvelopeError::DecodingFailed("envelope has no ciphertext".into()))?;
        let plain = cipher
            .decrypt(&key)
            .map_err(|e| EnvelopeError::DecodingFailed(e.to_string()))?;

        self.plain = Some(Bytes::from(plain));
        self.cipher = None;
        self.content_key = Some(key);
        self.opened_by = Some(agent.id());
        Ok(())
    }

    /// Seal the envelope. Idempotent if already closed.
    ///
    /// A pending typed content value is serialized back first; if its bytes
    /// differ from the stored plaintext this counts as a content mutation.
    /// Fails with [`EnvelopeError::EncodingFailed`] if no reader entry
    /// remains — a sealed envelope nobody can read is useless.
    pub fn close(&mut self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        self.flush_content()?;

        if self.reader_keys.is_empty() && self.group_reader_keys.is_empty() {
            return Err(EnvelopeError::EncodingFailed(
                "cannot seal an envelope without any reader".into(),
            ));
        }

        let key = self
            .content_key
            .as_ref()
            .ok_or_else(|| EnvelopeError::EncodingFailed("no content key".into()))?;
        let plain = self
            .plain
            .as_ref()
            .ok_or_else(|| EnvelopeError::EncodingFailed("no plaintext to seal".into()))?;
        let cipher = EncryptedBlob::encrypt(plain, key)
            .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?;

        self.cipher = Some(cipher);
        self.plain = None;
        self.content_key = None;
        self.opened_by = None;
        self.typed = None;
        Ok(())
    }

    /// Produce an independent, forced-closed copy.
    ///
    /// The live envelope keeps its open state; the snapshot can be handed
    /// out or persisted without exposing plaintext or the content key.
    pub fn clone_locked(&self) -> Result<Self> {
        let mut plain = self.plain.clone();
        let mut signatures = self.signatures.clone();
        let mut last_change = self.last_change;

        if let Some(typed) = &self.typed {
            let bytes = typed.encode(self.content_type)?;
            if plain.as_deref() != Some(bytes.as_slice()) {
                plain = Some(Bytes::from(bytes));
                signatures.clear();
                last_change = now_millis();
            }
        }

        let cipher = match (&self.cipher, plain) {
            (Some(cipher), _) => cipher.clone(),
            (None, Some(plain)) => {
                if self.reader_keys.is_empty() && self.group_reader_keys.is_empty() {
                    return Err(EnvelopeError::EncodingFailed(
                        "cannot seal an envelope without any reader".into(),
                    ));
                }
                let key = self.content_key.as_ref().ok_or_else(|| {
                    EnvelopeError::EncodingFailed("open envelope without a content key".into())
                })?;
                EncryptedBlob::encrypt(&plain, key)
                    .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?
            }
            (None, None) => {
                return Err(EnvelopeError::EncodingFailed("envelope has no payload".into()))
            }
        };

        Ok(Self {
            id: self.id,
            content_type: self.content_type,
            content_tag: self.content_tag.clone(),
            cipher: Some(cipher),
            plain: None,
            reader_keys: self.reader_keys.clone(),
            group_reader_keys: self.group_reader_keys.clone(),
            signatures,
            overwrite_blindly: self.overwrite_blindly,
            content_mutable: self.content_mutable,
            last_change,
            referral: self.referral,
            content_key: None,
            opened_by: None,
            typed: None,
        })
    }

    /// Serialize a pending typed content value back into the plaintext.
    ///
    /// A byte difference counts as a content mutation: signatures over the
    /// old plaintext are cleared and the change timestamp is bumped.
    fn flush_content(&mut self) -> Result<()> {
        let Some(typed) = &self.typed else {
            return Ok(());
        };
        let bytes = typed.encode(self.content_type)?;
        if self.plain.as_deref() != Some(bytes.as_slice()) {
            self.plain = Some(Bytes::from(bytes));
            self.mark_changed();
        }
        Ok(())
    }

    fn mark_changed(&mut self) {
        self.last_change = now_millis();
        self.signatures.clear();
    }

    fn require_mutable(&self) -> Result<()> {
        if !self.content_mutable {
            return Err(EnvelopeError::SecurityViolation(
                "content may only be altered through the typed handle".into(),
            ));
        }
        Ok(())
    }

    /// Replace the payload with raw bytes.
    pub fn update_binary(&mut self, content: impl Into<Bytes>) -> Result<()> {
        self.require_open()?;
        self.require_mutable()?;
        self.typed = None;
        self.content_type = ContentType::Binary;
        self.content_tag = None;
        self.plain = Some(content.into());
        self.mark_changed();
        Ok(())
    }

    /// Replace the payload with UTF-8 text.
    pub fn update_text(&mut self, text: &str) -> Result<()> {
        self.require_open()?;
        self.require_mutable()?;
        self.typed = None;
        self.content_type = ContentType::Text;
        self.content_tag = None;
        self.plain = Some(Bytes::copy_from_slice(text.as_bytes()));
        self.mark_changed();
        Ok(())
    }

    /// Replace the payload with a tagged JSON value.
    pub fn update_structured<T: ContentSchema>(&mut self, value: T) -> Result<()> {
        self.require_open()?;
        self.require_mutable()?;
        let bytes = serde_json::to_vec(&value)
            .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?;
        self.content_type = ContentType::Structured;
        self.content_tag = Some(T::TAG.to_string());
        self.typed = Some(Box::new(value));
        self.plain = Some(Bytes::from(bytes));
        self.mark_changed();
        Ok(())
    }

    /// Replace the payload with a tagged CBOR value.
    pub fn update_serialized<T: ContentSchema>(&mut self, value: T) -> Result<()> {
        self.require_open()?;
        self.require_mutable()?;
        let mut bytes = Vec::new();
        ciborium::into_writer(&value, &mut bytes)
            .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?;
        self.content_type = ContentType::Serialized;
        self.content_tag = Some(T::TAG.to_string());
        self.typed = Some(Box::new(value));
        self.plain = Some(Bytes::from(bytes));
        self.mark_changed();
        Ok(())
    }

    /// Stamp the change timestamp without altering content.
    pub fn touch(&mut self) -> Result<()> {
        self.require_open()?;
        self.last_change = now_millis();
        Ok(())
    }

    /// The raw plaintext bytes. Valid only while open.
    pub fn content_binary(&self) -> Result<&[u8]> {
        Ok(self.require_open()?.as_ref())
    }

    /// The plaintext as UTF-8 text.
    pub fn content_text(&self) -> Result<String> {
        let plain = self.require_open()?;
        if self.content_type != ContentType::Text {
            return Err(EnvelopeError::DecodingFailed(format!(
                "content is {:?}, not text",
                self.content_type
            )));
        }
        String::from_utf8(plain.to_vec())
            .map_err(|e| EnvelopeError::DecodingFailed(e.to_string()))
    }

    /// Decode structured (JSON) content as `T`.
    pub fn content_structured<T: ContentSchema>(&self) -> Result<T> {
        let plain = self.require_open()?;
        self.check_tag::<T>(ContentType::Structured)?;
        serde_json::from_slice(plain).map_err(|e| EnvelopeError::DecodingFailed(e.to_string()))
    }

    /// Decode serialized (CBOR) content as `T`.
    pub fn content_serialized<T: ContentSchema>(&self) -> Result<T> {
        let plain = self.require_open()?;
        self.check_tag::<T>(ContentType::Serialized)?;
        ciborium::from_reader(plain.as_ref())
            .map_err(|e| EnvelopeError::DecodingFailed(e.to_string()))
    }

    fn check_tag<T: ContentSchema>(&self, expected: ContentType) -> Result<()> {
        if self.content_type != expected {
            return Err(EnvelopeError::DecodingFailed(format!(
                "content is {:?}, not {expected:?}",
                self.content_type
            )));
        }
        if self.content_tag.as_deref() != Some(T::TAG) {
            return Err(EnvelopeError::DecodingFailed(format!(
                "schema tag mismatch: envelope carries {:?}, requested {:?}",
                self.content_tag, T::TAG
            )));
        }
        Ok(())
    }

    /// Mutable typed handle to structured/serialized content.
    ///
    /// The handle is cached; mutations through it are written back (and
    /// detected as content changes) when the envelope is closed or signed.
    /// This is the only mutation path left once content is locked.
    pub fn content_mut<T: ContentSchema>(&mut self) -> Result<&mut T> {
        self.require_open()?;
        if !self.content_type.is_tagged() {
            return Err(EnvelopeError::DecodingFailed(format!(
                "content is {:?}, which carries no typed value",
                self.content_type
            )));
        }
        self.check_tag::<T>(self.content_type)?;

        if self.typed.is_none() {
            let plain = self.require_open()?;
            let value: T = match self.content_type {
                ContentType::Structured => serde_json::from_slice(plain)
                    .map_err(|e| EnvelopeError::DecodingFailed(e.to_string()))?,
                _ => ciborium::from_reader(plain.as_ref())
                    .map_err(|e| EnvelopeError::DecodingFailed(e.to_string()))?,
            };
            self.typed = Some(Box::new(value));
        }

        self.typed
            .as_mut()
            .and_then(|typed| typed.as_any_mut().downcast_mut::<T>())
            .ok_or_else(|| {
                EnvelopeError::DecodingFailed("cached typed content has a different schema".into())
            })
    }

    /// Grant a new reader access by wrapping the content key for them.
    /// Requires the envelope to be open.
    pub fn add_reader(&mut self, agent: &Agent) -> Result<()> {
        self.require_open()?;
        let key = self
            .content_key
            .as_ref()
            .ok_or_else(|| EnvelopeError::EncodingFailed("no content key".into()))?;
        let wrapped = wrap_for(key, agent.id(), &agent.exchange_public())?;
        match agent.kind() {
            AgentKind::Individual => self.reader_keys.insert(agent.id(), wrapped),
            AgentKind::Group => self.group_reader_keys.insert(agent.id(), wrapped),
        };
        Ok(())
    }

    /// Revoke a reader's entry. Returns whether the reader was present.
    /// Requires the envelope to be open.
    pub fn remove_reader(&mut self, agent: &Agent) -> Result<bool> {
        self.require_open()?;
        let removed = match agent.kind() {
            AgentKind::Individual => self.reader_keys.remove(&agent.id()),
            AgentKind::Group => self.group_reader_keys.remove(&agent.id()),
        };
        Ok(removed.is_some())
    }

    /// Does the agent hold a reader entry in its own table?
    pub fn has_reader(&self, agent: &Agent) -> bool {
        match agent.kind() {
            AgentKind::Individual => self.reader_keys.contains_key(&agent.id()),
            AgentKind::Group => self.group_reader_keys.contains_key(&agent.id()),
        }
    }

    /// Ids of all individual readers.
    pub fn reader_ids(&self) -> Vec<AgentId> {
        self.reader_keys.keys().copied().collect()
    }

    /// Ids of all group readers.
    pub fn group_reader_ids(&self) -> Vec<AgentId> {
        self.group_reader_keys.keys().copied().collect()
    }

    /// Ids of all agents whose signatures are attached.
    pub fn signer_ids(&self) -> Vec<AgentId> {
        self.signatures.keys().copied().collect()
    }

    /// Sign the current plaintext.
    ///
    /// Only the agent that opened the envelope may sign it. A pending typed
    /// content value is flushed first, so the signature always covers what
    /// will be sealed.
    pub fn add_signature(&mut self, agent: &Agent) -> Result<()> {
        self.require_opener(agent)?;
        self.flush_content()?;
        let plain = self.require_open()?.clone();
        let signature = agent.sign(&plain)?;
        self.signatures.insert(agent.id(), signature);
        Ok(())
    }

    /// Remove the agent's own signature.
    ///
    /// Only the agent that opened the envelope may remove its signature;
    /// fails with [`EnvelopeError::VerificationFailed`] if none is attached.
    pub fn remove_signature(&mut self, agent: &Agent) -> Result<()> {
        self.require_opener(agent)?;
        self.signatures
            .remove(&agent.id())
            .map(|_| ())
            .ok_or_else(|| {
                EnvelopeError::VerificationFailed(format!(
                    "no signature from agent {} to remove",
                    agent.id()
                ))
            })
    }

    /// Verify the agent's stored signature against the current plaintext.
    pub fn verify_signature(&self, agent: &Agent) -> Result<()> {
        let plain = self.require_open()?;
        let signature = self.signatures.get(&agent.id()).ok_or_else(|| {
            EnvelopeError::VerificationFailed(format!("no signature from agent {}", agent.id()))
        })?;
        agent.verify(plain, signature).map_err(|_| {
            EnvelopeError::VerificationFailed("signature does not match the content".into())
        })
    }

    /// Has the given agent signed the current content?
    pub fn is_signed_by(&self, id: AgentId) -> bool {
        self.signatures.contains_key(&id)
    }

    fn require_opener(&self, agent: &Agent) -> Result<()> {
        self.require_open()?;
        if self.opened_by != Some(agent.id()) {
            return Err(EnvelopeError::SecurityViolation(
                "only the agent that opened the envelope may manage its signature".into(),
            ));
        }
        Ok(())
    }

    /// Decide whether `candidate` may replace this envelope.
    ///
    /// Unless this envelope allows blind overwriting, the candidate must
    /// refer to the same version this envelope refers to. A signed envelope
    /// additionally requires the candidate to carry a signature from at
    /// least one of its signers, so any one of several co-signers can
    /// authorize a follow-up write.
    pub fn check_overwrite(&self, candidate: &Envelope) -> Result<()> {
        if !self.overwrite_blindly && self.referral != candidate.referral {
            return Err(EnvelopeError::SecurityViolation(
                "replacement does not refer to the stored version".into(),
            ));
        }

        if self.signatures.is_empty() {
            return Ok(());
        }
        if self
            .signatures
            .keys()
            .any(|id| candidate.signatures.contains_key(id))
        {
            return Ok(());
        }
        Err(EnvelopeError::SecurityViolation(
            "replacement is not signed by any signer of the stored version".into(),
        ))
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Envelope")
            .field("id", &self.id)
            .field("content_type", &self.content_type)
            .field("open", &self.is_open())
            .field("readers", &self.reader_keys.len())
            .field("group_readers", &self.group_reader_keys.len())
            .field("signatures", &self.signatures.len())
            .finish()
    }
}

fn wrap_for(key: &EncryptionKey, id: AgentId, public: &X25519PublicKey) -> Result<WrappedKey> {
    WrappedKey::wrap(key.as_bytes(), public, &id.as_raw().to_le_bytes())
        .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))
}

/// Builder for new envelopes.
///
/// An envelope leaves the builder already sealed; callers never observe a
/// half-constructed container.
pub struct EnvelopeBuilder {
    id: Option<EnvelopeId>,
    content: Option<Content>,
    readers: Vec<Reader>,
    overwrite_blindly: bool,
}

struct Content {
    content_type: ContentType,
    tag: Option<String>,
    bytes: Bytes,
}

struct Reader {
    id: AgentId,
    public: X25519PublicKey,
    group: bool,
}

impl EnvelopeBuilder {
    /// Start a new builder. The id is random unless set.
    pub fn new() -> Self {
        Self {
            id: None,
            content: None,
            readers: Vec::new(),
            overwrite_blindly: false,
        }
    }

    /// Use an explicit id.
    pub fn id(mut self, id: EnvelopeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Derive a deterministic id from a content tag and identifier, for
    /// well-known singleton envelopes.
    pub fn for_class(mut self, tag: &str, identifier: &str) -> Self {
        self.id = Some(EnvelopeId::for_class(tag, identifier));
        self
    }

    /// Use UTF-8 text as the payload.
    pub fn text(mut self, text: &str) -> Self {
        self.content = Some(Content {
            content_type: ContentType::Text,
            tag: None,
            bytes: Bytes::copy_from_slice(text.as_bytes()),
        });
        self
    }

    /// Use raw bytes as the payload.
    pub fn binary(mut self, content: impl Into<Bytes>) -> Self {
        self.content = Some(Content {
            content_type: ContentType::Binary,
            tag: None,
            bytes: content.into(),
        });
        self
    }

    /// Use a tagged JSON value as the payload.
    pub fn structured<T: ContentSchema>(mut self, value: &T) -> Result<Self> {
        let bytes =
            serde_json::to_vec(value).map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?;
        self.content = Some(Content {
            content_type: ContentType::Structured,
            tag: Some(T::TAG.to_string()),
            bytes: Bytes::from(bytes),
        });
        Ok(self)
    }

    /// Use a tagged CBOR value as the payload.
    pub fn serialized<T: ContentSchema>(mut self, value: &T) -> Result<Self> {
        let mut bytes = Vec::new();
        ciborium::into_writer(value, &mut bytes)
            .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?;
        self.content = Some(Content {
            content_type: ContentType::Serialized,
            tag: Some(T::TAG.to_string()),
            bytes: Bytes::from(bytes),
        });
        Ok(self)
    }

    /// Entitle an agent (individual or group) to open the envelope.
    pub fn reader(mut self, agent: &Agent) -> Self {
        self.readers.push(Reader {
            id: agent.id(),
            public: agent.exchange_public(),
            group: agent.kind() == AgentKind::Group,
        });
        self
    }

    /// Permit replacement without referring to a prior version.
    pub fn overwrite_blindly(mut self, blindly: bool) -> Self {
        self.overwrite_blindly = blindly;
        self
    }

    /// Seal the envelope: generate a content key, wrap it for every reader
    /// and encrypt the payload. Fails with
    /// [`EnvelopeError::EncodingFailed`] without content or readers, or if
    /// any key wrap fails — never partially.
    pub fn seal(self) -> Result<Envelope> {
        let content = self
            .content
            .ok_or_else(|| EnvelopeError::EncodingFailed("envelope has no content".into()))?;
        if self.readers.is_empty() {
            return Err(EnvelopeError::EncodingFailed(
                "cannot seal an envelope without any reader".into(),
            ));
        }

        let key = EncryptionKey::generate();
        let mut reader_keys = HashMap::new();
        let mut group_reader_keys = HashMap::new();
        for reader in &self.readers {
            let wrapped = wrap_for(&key, reader.id, &reader.public)?;
            if reader.group {
                group_reader_keys.insert(reader.id, wrapped);
            } else {
                reader_keys.insert(reader.id, wrapped);
            }
        }

        let cipher = EncryptedBlob::encrypt(&content.bytes, &key)
            .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?;

        Ok(Envelope {
            id: self.id.unwrap_or_else(EnvelopeId::random),
            content_type: content.content_type,
            content_tag: content.tag,
            cipher: Some(cipher),
            plain: None,
            reader_keys,
            group_reader_keys,
            signatures: HashMap::new(),
            overwrite_blindly: self.overwrite_blindly,
            content_mutable: true,
            last_change: now_millis(),
            referral: -1,
            content_key: None,
            opened_by: None,
            typed: None,
        })
    }
}

impl Default for EnvelopeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
