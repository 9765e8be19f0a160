//! Inbound (Driving) ports: what application code depends on.

use crate::domain::message::Message;
use crate::error::BusError;
use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

/// Typed messages of one subscription, as handed to application code.
pub type TypedStream<M> = Pin<Box<dyn Stream<Item = M> + Send>>;

/// Publishes messages of type `M` to one fixed topic.
#[async_trait]
pub trait MessagePublisher<M: Message>: Send + Sync {
    /// Publish one message; resolves when the broker acknowledged it.
    ///
    /// # Errors
    ///
    /// - `BusError::AlreadyDisposed` - called after `dispose`
    /// - `BusError::Serialization` - the payload serializer failed
    /// - `BusError::SendFailure` - the broker rejected or timed out the send
    async fn publish(&self, message: &M) -> Result<(), BusError>;

    /// Flush buffered sends (bounded) and release the producer. Idempotent.
    async fn dispose(&self);
}

/// Exposes one topic as a stream of typed messages.
pub trait MessageSource<M: Message>: Send + Sync {
    /// Open an independent subscription.
    fn messages(&self) -> Result<TypedStream<M>, BusError>;

    /// End every live subscription and refuse new ones. Idempotent.
    fn dispose(&self);
}
