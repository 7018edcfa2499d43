//! # Peervault Core
//!
//! Strong-typed identifiers and cryptographic primitives for Peervault:
//!
//! - [`AgentId`] / [`EnvelopeId`] newtype identifiers
//! - Ed25519 signing ([`Keypair`], [`Ed25519PublicKey`], [`Ed25519Signature`])
//! - ChaCha20-Poly1305 sealing ([`EncryptionKey`], [`EncryptedBlob`])
//! - X25519 key wrapping ([`WrappedKey`])
//!
//! The wrap primitive is the building block for multi-reader access: a
//! symmetric content key is wrapped once per entitled recipient, so each of
//! them can independently recover it with their own secret.

pub mod crypto;
pub mod error;
pub mod seal;
pub mod types;

pub use crypto::{Ed25519PublicKey, Ed25519Signature, Keypair};
pub use error::{CoreError, Result};
pub use seal::{
    EncryptedBlob, EncryptionKey, EncryptionNonce, EphemeralKeyPair, SealFormat, SharedKey,
    WrappedKey, X25519PublicKey, X25519StaticSecret,
};
pub use types::{AgentId, EnvelopeId};
