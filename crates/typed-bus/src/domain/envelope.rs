//! # Envelope
//!
//! The record shape placed on the broker: serialized payload, the tag that
//! selects its deserializer, and an optional property bag readable without
//! touching the payload.

use serde::{Deserialize, Serialize};
use serde_with::{serde_as, Bytes};
use std::collections::BTreeMap;

/// Out-of-band key/value metadata attached by the producer.
pub type Properties = BTreeMap<String, String>;

/// Wire record wrapping one serialized application message.
///
/// Built once per outgoing message and never mutated afterwards. On the
/// consuming side it lives only as long as filter and dispatch need it.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Tag identifying the message shape; the dispatch key for consumers.
    payload_type: String,

    /// `None` when the publisher had no property provider. An empty map is
    /// a different value and survives the codec as such.
    properties: Option<Properties>,

    /// Output of exactly one serializer invocation.
    #[serde_as(as = "Bytes")]
    payload: Vec<u8>,
}

impl Envelope {
    pub fn new(
        payload_type: impl Into<String>,
        properties: Option<Properties>,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            payload_type: payload_type.into(),
            properties,
            payload,
        }
    }

    #[must_use]
    pub fn payload_type(&self) -> &str {
        &self.payload_type
    }

    #[must_use]
    pub fn properties(&self) -> Option<&Properties> {
        self.properties.as_ref()
    }

    /// Look up a single property; `None` if absent or no bag was attached.
    #[must_use]
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .as_ref()
            .and_then(|props| props.get(key))
            .map(String::as_str)
    }

    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Consume the envelope, returning `(payload_type, properties, payload)`.
    pub fn into_parts(self) -> (String, Option<Properties>, Vec<u8>) {
        (self.payload_type, self.properties, self.payload)
    }
}
