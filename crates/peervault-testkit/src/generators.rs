//! Proptest generators for property-based testing.

use proptest::prelude::*;

use peervault_core::{AgentId, EnvelopeId};

/// Generate a passphrase.
pub fn passphrase() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{4,32}".prop_map(String::from)
}

/// Generate text content, including the empty string.
pub fn text_content() -> impl Strategy<Value = String> {
    prop::string::string_regex(".{0,256}").expect("valid regex")
}

/// Generate payload bytes of specified max length.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..=max_len)
}

/// Generate a random agent id.
pub fn agent_id() -> impl Strategy<Value = AgentId> {
    any::<u64>().prop_map(AgentId::from_raw)
}

/// Generate a random envelope id.
pub fn envelope_id() -> impl Strategy<Value = EnvelopeId> {
    any::<u64>().prop_map(EnvelopeId::from_raw)
}

/// Generate a class tag for deterministic envelope ids.
pub fn class_tag() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,31}".prop_map(String::from)
}

/// Generate a number of readers for multi-reader tests.
pub fn reader_count() -> impl Strategy<Value = usize> {
    1usize..=4
}
