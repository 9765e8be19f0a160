//! # Deserializer Registry
//!
//! Maps a payload-type tag to the deserializer that turns the envelope
//! payload back into an application message. Built once when a source is
//! constructed and read-only afterwards, so lookups take no lock.

use crate::domain::envelope::Envelope;
use crate::error::BusError;
use crate::ports::serialization::MessageDeserializer;
use std::collections::HashMap;
use std::sync::Arc;

/// Immutable tag → deserializer map.
pub struct DeserializerRegistry<M> {
    by_type: HashMap<String, Arc<dyn MessageDeserializer<M>>>,
}

impl<M> DeserializerRegistry<M> {
    /// Key every deserializer by its own [`MessageDeserializer::payload_type`].
    ///
    /// # Errors
    ///
    /// `BusError::DuplicatePayloadType` if two deserializers report the
    /// same tag.
    pub fn new<I>(deserializers: I) -> Result<Self, BusError>
    where
        I: IntoIterator<Item = Arc<dyn MessageDeserializer<M>>>,
    {
        let mut by_type = HashMap::new();
        for deserializer in deserializers {
            let tag = deserializer.payload_type().to_string();
            if by_type.contains_key(&tag) {
                return Err(BusError::DuplicatePayloadType { payload_type: tag });
            }
            by_type.insert(tag, deserializer);
        }
        Ok(Self { by_type })
    }

    #[must_use]
    pub fn get(&self, payload_type: &str) -> Option<&Arc<dyn MessageDeserializer<M>>> {
        self.by_type.get(payload_type)
    }

    /// Route an envelope to its deserializer.
    ///
    /// # Errors
    ///
    /// - `BusError::UnknownPayloadType` - no deserializer for the tag
    /// - `BusError::Serialization` - the deserializer rejected the payload
    pub fn deserialize(&self, envelope: &Envelope) -> Result<M, BusError> {
        let deserializer =
            self.get(envelope.payload_type())
                .ok_or_else(|| BusError::UnknownPayloadType {
                    payload_type: envelope.payload_type().to_string(),
                })?;
        Ok(deserializer.deserialize(envelope.payload())?)
    }

    /// Registered tags, sorted.
    #[must_use]
    pub fn payload_types(&self) -> Vec<String> {
        let mut tags: Vec<String> = self.by_type.keys().cloned().collect();
        tags.sort();
        tags
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }
}

impl<M> std::fmt::Debug for DeserializerRegistry<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeserializerRegistry")
            .field("payload_types", &self.payload_types())
            .finish()
    }
}
