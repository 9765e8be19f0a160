//! Outbound (Driven) ports: the broker client.
//!
//! The core only needs "send one record to a topic" and "deliver a stream of
//! records from a topic". Partition assignment, offset management and
//! rebalancing stay inside the adapter.

use crate::config::{BrokerConfig, ConsumerConfig, ProducerConfig};
use crate::error::BrokerError;
use async_trait::async_trait;
use std::pin::Pin;
use std::time::Duration;
use tokio_stream::Stream;

/// One record as delivered by the broker client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<Vec<u8>>,
    /// Envelope-encoded bytes.
    pub value: Vec<u8>,
}

/// Push stream of records for one consumer session.
///
/// Dropping the stream ends the session and releases its broker resources.
pub type RecordStream = Pin<Box<dyn Stream<Item = Result<Record, BrokerError>> + Send>>;

/// A connected producer handle.
#[async_trait]
pub trait ProducerClient: Send + Sync {
    /// Send one record and resolve once the broker acknowledged it.
    ///
    /// Order is preserved per `key`.
    async fn send(&self, topic: &str, key: &str, record: Vec<u8>) -> Result<(), BrokerError>;

    /// Wait up to `timeout` for buffered records to be delivered.
    async fn flush(&self, timeout: Duration) -> Result<(), BrokerError>;
}

/// Creates producer handles.
pub trait ProducerConnector: Send + Sync {
    /// Acquire a producer handle.
    ///
    /// # Errors
    ///
    /// `BrokerError::Connect` (or an adapter-specific variant) when the
    /// handle cannot be created.
    fn connect(
        &self,
        broker: &BrokerConfig,
        producer: &ProducerConfig,
    ) -> Result<Box<dyn ProducerClient>, BrokerError>;
}

/// Opens consumer sessions.
///
/// Sessions join `broker.group_id` and commit offsets on receipt: a record
/// whose dispatch later fails is still considered consumed.
pub trait ConsumerConnector: Send + Sync {
    /// Open a session on `topic`. Must be called within a Tokio runtime.
    fn subscribe(
        &self,
        broker: &BrokerConfig,
        consumer: &ConsumerConfig,
        topic: &str,
    ) -> Result<RecordStream, BrokerError>;
}
