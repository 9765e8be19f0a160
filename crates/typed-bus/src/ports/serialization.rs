//! Payload serialization contracts and property hooks.

use crate::domain::envelope::Properties;
use crate::error::SerializationError;
use std::sync::Arc;

/// Serializes application messages of type `M` into payload bytes.
pub trait MessageSerializer<M>: Send + Sync {
    fn serialize(&self, message: &M) -> Result<Vec<u8>, SerializationError>;
}

/// Deserializes one payload shape into an `M`.
pub trait MessageDeserializer<M>: Send + Sync {
    /// Tag this deserializer handles; used as the registry key.
    fn payload_type(&self) -> &str;

    fn deserialize(&self, bytes: &[u8]) -> Result<M, SerializationError>;
}

/// Publisher-side hook producing the property bag for a message.
pub type PropertyProvider<M> = Arc<dyn Fn(&M) -> Properties + Send + Sync>;

/// Consumer-side predicate over an envelope's property bag.
///
/// Receives `None` when the envelope carried no properties.
pub type PropertyFilter = Arc<dyn Fn(Option<&Properties>) -> bool + Send + Sync>;
