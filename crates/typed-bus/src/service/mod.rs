//! Application services: the publisher, the source and the registry that
//! routes envelopes to deserializers.

pub mod publisher;
pub mod registry;
pub mod source;

pub use publisher::{Publisher, PublisherBuilder};
pub use registry::DeserializerRegistry;
pub use source::{MessageStream, Source, SourceBuilder};
