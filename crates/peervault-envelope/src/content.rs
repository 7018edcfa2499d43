//! Content typing for envelopes.
//!
//! An envelope carries one of four payload shapes. Plain text and raw bytes
//! need no extra metadata; structured (JSON) and serialized (CBOR) payloads
//! additionally carry a schema tag so readers can reconstruct the value
//! without any dynamic type resolution.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;

use crate::error::{EnvelopeError, Result};

/// The shape of an envelope's payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    /// UTF-8 text.
    Text,
    /// A tagged value serialized as JSON.
    Structured,
    /// A tagged value serialized as CBOR.
    Serialized,
    /// Raw bytes.
    Binary,
}

impl ContentType {
    /// The name used in the wire form.
    pub fn wire_name(&self) -> &'static str {
        match self {
            ContentType::Text => "String",
            ContentType::Structured => "StructuredObject",
            ContentType::Serialized => "SerializedObject",
            ContentType::Binary => "Binary",
        }
    }

    /// Parse a wire name.
    pub fn from_wire_name(name: &str) -> Result<Self> {
        match name {
            "String" => Ok(ContentType::Text),
            "StructuredObject" => Ok(ContentType::Structured),
            "SerializedObject" => Ok(ContentType::Serialized),
            "Binary" => Ok(ContentType::Binary),
            other => Err(EnvelopeError::MalformedFormat(format!(
                "unknown content type {other:?}"
            ))),
        }
    }

    /// Does this type carry a schema tag?
    pub fn is_tagged(&self) -> bool {
        matches!(self, ContentType::Structured | ContentType::Serialized)
    }
}

/// A value that can travel as structured or serialized envelope content.
///
/// The tag stands in for the original's class name: it is stored alongside
/// the payload and checked on every typed read, so an envelope is never
/// silently decoded as the wrong schema.
pub trait ContentSchema: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Stable schema tag, unique per content type.
    const TAG: &'static str;
}

/// Object-safe view of a cached typed content value.
///
/// The envelope holds at most one of these while open; it is re-serialized
/// and compared against the stored plaintext when the envelope is closed or
/// signed, so in-place mutations are detected.
pub(crate) trait TypedContent: Send + Sync {
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn encode(&self, content_type: ContentType) -> Result<Vec<u8>>;
}

impl<T: ContentSchema> TypedContent for T {
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn encode(&self, content_type: ContentType) -> Result<Vec<u8>> {
        match content_type {
            ContentType::Structured => serde_json::to_vec(self)
                .map_err(|e| EnvelopeError::EncodingFailed(e.to_string())),
            ContentType::Serialized => {
                let mut buf = Vec::new();
                ciborium::into_writer(self, &mut buf)
                    .map_err(|e| EnvelopeError::EncodingFailed(e.to_string()))?;
                Ok(buf)
            }
            other => Err(EnvelopeError::EncodingFailed(format!(
                "content type {other:?} carries no typed value"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct UserList {
        users: Vec<String>,
    }

    impl ContentSchema for UserList {
        const TAG: &'static str = "user-list";
    }

    #[test]
    fn test_wire_names_roundtrip() {
        for ty in [
            ContentType::Text,
            ContentType::Structured,
            ContentType::Serialized,
            ContentType::Binary,
        ] {
            assert_eq!(ContentType::from_wire_name(ty.wire_name()).unwrap(), ty);
        }
    }

    #[test]
    fn test_unknown_wire_name_rejected() {
        assert!(matches!(
            ContentType::from_wire_name("XmlObject"),
            Err(EnvelopeError::MalformedFormat(_))
        ));
    }

    #[test]
    fn test_typed_encode_json_and_cbor_differ() {
        let value = UserList { users: vec!["alice".into()] };
        let json = TypedContent::encode(&value, ContentType::Structured).unwrap();
        let cbor = TypedContent::encode(&value, ContentType::Serialized).unwrap();

        assert_eq!(serde_json::from_slice::<UserList>(&json).unwrap(), value);
        assert_eq!(ciborium::from_reader::<UserList, _>(cbor.as_slice()).unwrap(), value);
    }

    #[test]
    fn test_typed_encode_rejects_untyped_shapes() {
        let value = UserList { users: vec![] };
        assert!(TypedContent::encode(&value, ContentType::Binary).is_err());
    }
}
