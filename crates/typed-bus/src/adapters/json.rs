//! JSON payload codec backed by `serde_json`.

use crate::domain::message::{Message, PayloadType};
use crate::error::SerializationError;
use crate::ports::serialization::{MessageDeserializer, MessageSerializer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

/// Serializes any `Serialize` message as JSON.
///
/// For enums covering several payload kinds use `#[serde(untagged)]` so the
/// payload is the bare variant body and the envelope tag does the routing.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl<M> MessageSerializer<M> for JsonSerializer
where
    M: Serialize + Message,
{
    fn serialize(&self, message: &M) -> Result<Vec<u8>, SerializationError> {
        serde_json::to_vec(message).map_err(|e| SerializationError::Encode {
            payload_type: message.payload_type().to_string(),
            reason: e.to_string(),
        })
    }
}

/// Deserializes JSON payloads tagged `T::PAYLOAD_TYPE` into `T`, then
/// converts into the stream's message type.
pub struct JsonDeserializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonDeserializer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonDeserializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M> MessageDeserializer<M> for JsonDeserializer<T>
where
    T: DeserializeOwned + PayloadType + Into<M>,
{
    fn payload_type(&self) -> &str {
        T::PAYLOAD_TYPE
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<M, SerializationError> {
        serde_json::from_slice::<T>(bytes)
            .map(Into::into)
            .map_err(|e| SerializationError::Decode {
                payload_type: T::PAYLOAD_TYPE.to_string(),
                reason: e.to_string(),
            })
    }
}
