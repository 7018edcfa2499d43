//! Textual wire form of an envelope.
//!
//! Envelopes travel as JSON with base64-encoded binary fields. The layout
//! carries everything needed to reconstruct the closed container: id,
//! timestamps, policy flags, the sealed payload, per-reader wrapped keys
//! (tagged individual or group) and any attached signatures. Parsing is
//! strict: a missing field, a wrong encoding tag or an unknown algorithm id
//! is a [`EnvelopeError::MalformedFormat`], never a guess.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use peervault_core::{
    AgentId, Ed25519Signature, EncryptedBlob, EncryptionNonce, EnvelopeId, SealFormat, WrappedKey,
};

use crate::content::ContentType;
use crate::envelope::Envelope;
use crate::error::{EnvelopeError, Result};

/// Encoding tag for binary fields.
const ENCODING_BASE64: &str = "base64";
/// Algorithm id for the asymmetric key wrap.
const KEY_WRAP_ALGORITHM: &str = "x25519-chacha20poly1305";
/// Algorithm id for content signatures.
const SIGNATURE_METHOD: &str = "ed25519";

#[derive(Serialize, Deserialize)]
struct EnvelopeWire {
    id: u64,
    lastchange: i64,
    #[serde(rename = "blindOverwrite")]
    blind_overwrite: bool,
    update: bool,
    content: ContentWire,
    keys: KeysWire,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signatures: Option<SignaturesWire>,
}

#[derive(Serialize, Deserialize)]
struct ContentWire {
    encoding: String,
    #[serde(rename = "type")]
    content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    class: Option<String>,
    data: String,
}

#[derive(Serialize, Deserialize)]
struct KeysWire {
    encoding: String,
    encryption: String,
    keys: Vec<KeyWire>,
}

#[derive(Serialize, Deserialize)]
struct KeyWire {
    id: u64,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    data: String,
}

#[derive(Serialize, Deserialize)]
struct SignaturesWire {
    encoding: String,
    method: String,
    signatures: Vec<SignatureWire>,
}

#[derive(Serialize, Deserialize)]
struct SignatureWire {
    id: u64,
    data: String,
}

/// Serialize a closed envelope to wire bytes.
pub(crate) fn encode(envelope: &Envelope) -> Result<Vec<u8>> {
    let cipher = envelope.cipher.as_ref().ok_or_else(|| {
        EnvelopeError::EncodingFailed("an open envelope cannot be serialized; close it first".into())
    })?;

    let mut content_data = Vec::with_capacity(12 + cipher.ciphertext.len());
    content_data.extend_from_slice(cipher.nonce.as_bytes());
    content_data.extend_from_slice(&cipher.ciphertext);

    let mut keys = Vec::new();
    for (id, wrapped) in &envelope.reader_keys {
        keys.push(KeyWire {
            id: id.as_raw(),
            kind: None,
            data: BASE64.encode(wrapped.to_wire_bytes()),
        });
    }
    for (id, wrapped) in &envelope.group_reader_keys {
        keys.push(KeyWire {
            id: id.as_raw(),
            kind: Some("group".into()),
            data: BASE64.encode(wrapped.to_wire_bytes()),
        });
    }
    keys.sort_by_key(|k| k.id);

    let signatures = if envelope.signatures.is_empty() {
        None
    } else {
        let mut entries: Vec<SignatureWire> = envelope
            .signatures
            .iter()
            .map(|(id, sig)| SignatureWire {
                id: id.as_raw(),
                data: BASE64.encode(sig.as_bytes()),
            })
            .collect();
        entries.sort_by_key(|s| s.id);
        Some(SignaturesWire {
            encoding: ENCODING_BASE64.into(),
            method: SIGNATURE_METHOD.into(),
            signatures: entries,
        })
    };

    let wire = EnvelopeWire {
        id: envelope.id.as_raw(),
        lastchange: envelope.last_change,
        blind_overwrite: envelope.overwrite_blindly,
        update: envelope.content_mutable,
        content: ContentWire {
            encoding: ENCODING_BASE64.into(),
            content_type: envelope.content_type.wire_name().into(),
            class: envelope.content_tag.clone(),
            data: BASE64.encode(content_data),
        },
        keys: KeysWire {
            encoding: ENCODING_BASE64.into(),
            encryption: KEY_WRAP_ALGORITHM.into(),
            keys,
        },
        signatures,
    };

    serde_json::to_vec(&wire).map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))
}

/// Parse an envelope from wire bytes. The result is closed, with its
/// referral timestamp set to the decoded version's last change.
pub(crate) fn decode(bytes: &[u8]) -> Result<Envelope> {
    let wire: EnvelopeWire =
        serde_json::from_slice(bytes).map_err(|e| EnvelopeError::MalformedFormat(e.to_string()))?;

    check_encoding(&wire.content.encoding)?;
    check_encoding(&wire.keys.encoding)?;
    if wire.keys.encryption != KEY_WRAP_ALGORITHM {
        return Err(EnvelopeError::MalformedFormat(format!(
            "unknown key encryption {:?}",
            wire.keys.encryption
        )));
    }

    let content_type = ContentType::from_wire_name(&wire.content.content_type)?;
    if content_type.is_tagged() && wire.content.class.is_none() {
        return Err(EnvelopeError::MalformedFormat(format!(
            "{} content requires a class tag",
            wire.content.content_type
        )));
    }

    let content_data = decode_base64(&wire.content.data)?;
    if content_data.len() < 12 {
        return Err(EnvelopeError::MalformedFormat(
            "content blob shorter than a nonce".into(),
        ));
    }
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&content_data[..12]);
    let cipher = EncryptedBlob {
        format: SealFormat::ChaCha20Poly1305,
        nonce: EncryptionNonce::from_bytes(nonce),
        ciphertext: content_data[12..].to_vec(),
    };

    let mut reader_keys = HashMap::new();
    let mut group_reader_keys = HashMap::new();
    for key in &wire.keys.keys {
        let wrapped = WrappedKey::from_wire_bytes(&decode_base64(&key.data)?)
            .map_err(|e| EnvelopeError::MalformedFormat(e.to_string()))?;
        match key.kind.as_deref() {
            None => reader_keys.insert(AgentId::from_raw(key.id), wrapped),
            Some("group") => group_reader_keys.insert(AgentId::from_raw(key.id), wrapped),
            Some(other) => {
                return Err(EnvelopeError::MalformedFormat(format!(
                    "unknown key type {other:?}"
                )))
            }
        };
    }
    if reader_keys.is_empty() && group_reader_keys.is_empty() {
        return Err(EnvelopeError::MalformedFormat(
            "envelope carries no reader keys".into(),
        ));
    }

    let mut signatures = HashMap::new();
    if let Some(block) = &wire.signatures {
        check_encoding(&block.encoding)?;
        if block.method != SIGNATURE_METHOD {
            return Err(EnvelopeError::MalformedFormat(format!(
                "unknown signature method {:?}",
                block.method
            )));
        }
        for entry in &block.signatures {
            let raw = decode_base64(&entry.data)?;
            let arr: [u8; 64] = raw.try_into().map_err(|_| {
                EnvelopeError::MalformedFormat("signature must be 64 bytes".into())
            })?;
            signatures.insert(AgentId::from_raw(entry.id), Ed25519Signature::from_bytes(arr));
        }
    }

    Ok(Envelope {
        id: EnvelopeId::from_raw(wire.id),
        content_type,
        content_tag: wire.content.class,
        cipher: Some(cipher),
        plain: None,
        reader_keys,
        group_reader_keys,
        signatures,
        overwrite_blindly: wire.blind_overwrite,
        content_mutable: wire.update,
        last_change: wire.lastchange,
        referral: wire.lastchange,
        content_key: None,
        opened_by: None,
        typed: None,
    })
}

fn check_encoding(encoding: &str) -> Result<()> {
    if encoding.eq_ignore_ascii_case(ENCODING_BASE64) {
        Ok(())
    } else {
        Err(EnvelopeError::MalformedFormat(format!(
            "unknown encoding {encoding:?}"
        )))
    }
}

fn decode_base64(data: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(data.trim())
        .map_err(|e| EnvelopeError::MalformedFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use peervault_agent::{Agent, GroupAgent, IndividualAgent};

    fn agent(passphrase: &str) -> Agent {
        Agent::Individual(IndividualAgent::create(passphrase).unwrap())
    }

    #[test]
    fn test_wire_roundtrip() {
        let alice = agent("a");
        let group = Agent::Group(GroupAgent::create(&[&alice]).unwrap());

        let mut envelope = Envelope::builder()
            .text("over the wire")
            .reader(&alice)
            .reader(&group)
            .seal()
            .unwrap();
        envelope.open(&alice).unwrap();
        envelope.add_signature(&alice).unwrap();
        envelope.close().unwrap();

        let bytes = envelope.to_bytes().unwrap();
        let mut restored = Envelope::from_bytes(&bytes).unwrap();

        assert_eq!(restored.id(), envelope.id());
        assert_eq!(restored.last_change(), envelope.last_change());
        assert_eq!(restored.referral_timestamp(), envelope.last_change());
        assert!(restored.has_reader(&alice));
        assert!(restored.has_reader(&group));
        assert!(restored.is_signed_by(alice.id()));

        restored.open(&alice).unwrap();
        assert_eq!(restored.content_text().unwrap(), "over the wire");
        restored.verify_signature(&alice).unwrap();
    }

    #[test]
    fn test_open_envelope_cannot_be_encoded() {
        let alice = agent("a");
        let mut envelope = Envelope::builder()
            .text("still open")
            .reader(&alice)
            .seal()
            .unwrap();
        envelope.open(&alice).unwrap();

        assert!(matches!(
            envelope.to_bytes(),
            Err(EnvelopeError::EncodingFailed(_))
        ));
    }

    #[test]
    fn test_missing_signature_block_means_unsigned() {
        let alice = agent("a");
        let envelope = Envelope::builder()
            .text("unsigned")
            .reader(&alice)
            .seal()
            .unwrap();

        let bytes = envelope.to_bytes().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(!text.contains("signatures"));

        let restored = Envelope::from_bytes(&bytes).unwrap();
        assert!(restored.signer_ids().is_empty());
    }

    #[test]
    fn test_unknown_algorithm_rejected() {
        let alice = agent("a");
        let envelope = Envelope::builder()
            .text("tagged")
            .reader(&alice)
            .seal()
            .unwrap();

        let text = String::from_utf8(envelope.to_bytes().unwrap()).unwrap();
        let tampered = text.replace(KEY_WRAP_ALGORITHM, "rsa-oaep");

        assert!(matches!(
            Envelope::from_bytes(tampered.as_bytes()),
            Err(EnvelopeError::MalformedFormat(_))
        ));
    }

    #[test]
    fn test_unknown_content_type_rejected() {
        let alice = agent("a");
        let envelope = Envelope::builder()
            .text("typed")
            .reader(&alice)
            .seal()
            .unwrap();

        let text = String::from_utf8(envelope.to_bytes().unwrap()).unwrap();
        let tampered = text.replace("\"String\"", "\"XmlObject\"");

        assert!(matches!(
            Envelope::from_bytes(tampered.as_bytes()),
            Err(EnvelopeError::MalformedFormat(_))
        ));
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(matches!(
            Envelope::from_bytes(b"not even json"),
            Err(EnvelopeError::MalformedFormat(_))
        ));
        assert!(matches!(
            Envelope::from_bytes(b"{\"id\": 1}"),
            Err(EnvelopeError::MalformedFormat(_))
        ));
    }

    #[test]
    fn test_wire_preserves_policy_flags() {
        let alice = agent("a");
        let envelope = Envelope::builder()
            .text("flagged")
            .reader(&alice)
            .overwrite_blindly(true)
            .seal()
            .unwrap();

        let restored = Envelope::from_bytes(&envelope.to_bytes().unwrap()).unwrap();
        assert!(restored.is_overwrite_blindly());
        assert!(restored.is_content_mutable());
    }
}
