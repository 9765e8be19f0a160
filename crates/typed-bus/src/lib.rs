//! # Typed Bus - Typed Publish/Subscribe over a Partitioned Log Broker
//!
//! Lets application code publish strongly-typed messages to a named topic and
//! consume them back as a stream of typed values, with several message shapes
//! sharing one topic.
//!
//! ## Envelope
//!
//! Every record on the broker is an [`Envelope`]:
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `payload_type` | Stable tag selecting the consumer-side deserializer |
//! | `properties` | Optional string map, readable without decoding the payload |
//! | `payload` | Bytes from the payload serializer |
//!
//! Wire layout: `"TB"` magic, one version byte, then a bincode body
//! (see [`domain::codec`]).
//!
//! ## Flow
//!
//! ```text
//!  Publisher<M>                                   Source<M>
//!  ───────────                                    ─────────
//!  M ──serialize──→ payload                       record bytes
//!  M ──provider───→ properties                        │ decode
//!  Envelope ──encode──→ bytes ──send──→ [topic] ──→ Envelope
//!                                                     │ property filter
//!                                                     │ registry lookup (payload_type)
//!                                                     ▼ deserialize
//!                                                     M ──→ MessageStream
//! ```
//!
//! A record that fails any consumer step is logged, counted in
//! `typed_bus_records_dropped_total` and skipped; the stream keeps going.
//!
//! ## Module Structure (Hexagonal Architecture)
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  adapters/ - InMemoryBroker, KafkaConnector, JSON/bincode codecs │
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ implements ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  ports/inbound.rs       - MessagePublisher, MessageSource       │
//! │  ports/outbound.rs      - ProducerConnector, ConsumerConnector  │
//! │  ports/serialization.rs - MessageSerializer, MessageDeserializer│
//! └─────────────────────────────────────────────────────────────────┘
//!                          ↑ uses ↑
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  service/ - Publisher, Source, DeserializerRegistry             │
//! │  domain/  - Envelope, EnvelopeCodec, PayloadType, StateCell     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{
    BincodeDeserializer, BincodeSerializer, InMemoryBroker, JsonDeserializer, JsonSerializer,
};
#[cfg(feature = "kafka")]
pub use adapters::KafkaConnector;
pub use config::{
    Acks, BrokerConfig, BusConfig, Compression, ConsumerConfig, OffsetReset, ProducerConfig,
};
pub use domain::{ConnectionState, Envelope, EnvelopeCodec, Message, PayloadType, Properties};
pub use error::{BrokerError, BusError, ConfigError, EnvelopeError, SerializationError};
pub use ports::{
    ConsumerConnector, MessageDeserializer, MessagePublisher, MessageSerializer, MessageSource,
    ProducerClient, ProducerConnector, PropertyFilter, PropertyProvider, Record, RecordStream,
    TypedStream,
};
pub use service::{
    DeserializerRegistry, MessageStream, Publisher, PublisherBuilder, Source, SourceBuilder,
};

/// Records buffered between a broker client and one subscription.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
