//! Adapters: broker clients and payload codecs plugged into the ports.

pub mod bincode_codec;
pub mod in_memory;
pub mod json;
#[cfg(feature = "kafka")]
pub mod kafka;

pub use bincode_codec::{BincodeDeserializer, BincodeSerializer};
pub use in_memory::InMemoryBroker;
pub use json::{JsonDeserializer, JsonSerializer};
#[cfg(feature = "kafka")]
pub use kafka::KafkaConnector;
