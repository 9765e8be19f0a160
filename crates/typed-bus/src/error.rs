//! Error types for the typed bus.

use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by publishers and sources.
#[derive(Debug, Error)]
pub enum BusError {
    #[error("Publisher has been disposed already")]
    AlreadyDisposed,

    #[error("Not connected to the broker")]
    NotConnected,

    #[error("Malformed envelope: {0}")]
    MalformedEnvelope(#[from] EnvelopeError),

    #[error("No deserializer registered for payload type '{payload_type}'")]
    UnknownPayloadType { payload_type: String },

    #[error("More than one deserializer registered for payload type '{payload_type}'")]
    DuplicatePayloadType { payload_type: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Send to topic '{topic}' failed: {source}")]
    SendFailure {
        topic: String,
        #[source]
        source: BrokerError,
    },

    #[error("Failed to connect to broker: {0}")]
    ConnectFailure(#[source] BrokerError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Envelope framing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("Envelope truncated after {len} bytes")]
    Truncated { len: usize },

    #[error("Bad envelope magic: {found:02x?}")]
    BadMagic { found: [u8; 2] },

    #[error("Unsupported envelope version {version} (supported: {supported})")]
    UnsupportedVersion { version: u8, supported: u8 },

    #[error("Envelope exceeds {max} bytes")]
    TooLarge { max: u64 },

    #[error("Envelope body is malformed: {0}")]
    Malformed(String),
}

/// Application payload (de)serialization errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializationError {
    #[error("Failed to encode payload '{payload_type}': {reason}")]
    Encode {
        payload_type: String,
        reason: String,
    },

    #[error("Failed to decode payload '{payload_type}': {reason}")]
    Decode {
        payload_type: String,
        reason: String,
    },
}

/// Errors reported by broker client adapters.
#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("Connection error: {0}")]
    Connect(String),

    #[error("Send error: {0}")]
    Send(String),

    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    #[error("Broker client closed")]
    Closed,

    #[error("Record error: {0}")]
    Record(String),

    #[cfg(feature = "kafka")]
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),
}

/// Configuration validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Seed address list is empty")]
    EmptySeedAddresses,

    #[error("Invalid seed address '{0}' (expected host:port)")]
    InvalidSeedAddress(String),

    #[error("Consumer group id is empty")]
    EmptyGroupId,

    #[error("Topic name is empty")]
    EmptyTopic,

    #[error("{field} must be greater than zero")]
    ZeroValue { field: &'static str },

    #[error("Invalid value for {field}: {value}")]
    InvalidValue { field: &'static str, value: String },
}
