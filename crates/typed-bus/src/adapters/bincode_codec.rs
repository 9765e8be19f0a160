//! Compact binary payload codec backed by `bincode`.
//!
//! Not self-describing: producer and consumer must agree on the exact type
//! layout. Prefer [`JsonSerializer`](super::json::JsonSerializer) when
//! schemas evolve independently.

use crate::domain::message::{Message, PayloadType};
use crate::error::SerializationError;
use crate::ports::serialization::{MessageDeserializer, MessageSerializer};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;

#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeSerializer;

impl<M> MessageSerializer<M> for BincodeSerializer
where
    M: Serialize + Message,
{
    fn serialize(&self, message: &M) -> Result<Vec<u8>, SerializationError> {
        bincode::serialize(message).map_err(|e| SerializationError::Encode {
            payload_type: message.payload_type().to_string(),
            reason: e.to_string(),
        })
    }
}

pub struct BincodeDeserializer<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> BincodeDeserializer<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for BincodeDeserializer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T, M> MessageDeserializer<M> for BincodeDeserializer<T>
where
    T: DeserializeOwned + PayloadType + Into<M>,
{
    fn payload_type(&self) -> &str {
        T::PAYLOAD_TYPE
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<M, SerializationError> {
        bincode::deserialize::<T>(bytes)
            .map(Into::into)
            .map_err(|e| SerializationError::Decode {
                payload_type: T::PAYLOAD_TYPE.to_string(),
                reason: e.to_string(),
            })
    }
}
