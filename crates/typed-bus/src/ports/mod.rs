//! Ports: the contracts between the envelope/dispatch core and the outside.
//!
//! - `inbound` - what application code calls (`MessagePublisher`, `MessageSource`)
//! - `outbound` - what the core needs from a broker client
//! - `serialization` - per-type payload codecs injected by the application

pub mod inbound;
pub mod outbound;
pub mod serialization;

pub use inbound::{MessagePublisher, MessageSource, TypedStream};
pub use outbound::{ConsumerConnector, ProducerClient, ProducerConnector, Record, RecordStream};
pub use serialization::{MessageDeserializer, MessageSerializer, PropertyFilter, PropertyProvider};
