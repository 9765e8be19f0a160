//! # Publisher
//!
//! Owns exactly one producer handle and publishes messages of type `M` to a
//! single topic.
//!
//! ```text
//! publish(&M)
//!   ├─ state check ─── Disposed → AlreadyDisposed, not Connected → NotConnected
//!   ├─ property provider (only if configured)
//!   ├─ serializer → payload
//!   ├─ Envelope { payload_type, properties, payload } → EnvelopeCodec
//!   ├─ re-check handle ─── disposed meanwhile → abandoned, Ok(())
//!   └─ ProducerClient::send(topic, key = "", bytes)
//! ```
//!
//! The handle is read lock-free through an [`ArcSwapOption`]; concurrent
//! publishes share it without any per-call lock.

use crate::config::{BrokerConfig, ProducerConfig};
use crate::domain::codec::EnvelopeCodec;
use crate::domain::envelope::Envelope;
use crate::domain::message::Message;
use crate::domain::state::{ConnectionState, StateCell};
use crate::domain::Properties;
use crate::error::{BusError, ConfigError, SerializationError};
use crate::ports::inbound::MessagePublisher;
use crate::ports::outbound::{ProducerClient, ProducerConnector};
use crate::ports::serialization::{MessageSerializer, PropertyProvider};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use bus_telemetry::{ENVELOPES_PUBLISHED, PUBLISH_FAILURES};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Partition key used for every record.
const PARTITION_KEY: &str = "";

/// Typed publisher bound to one topic.
pub struct Publisher<M: Message> {
    topic: String,
    broker: BrokerConfig,
    producer_config: ProducerConfig,
    connector: Arc<dyn ProducerConnector>,
    serializer: Arc<dyn MessageSerializer<M>>,
    property_provider: Option<PropertyProvider<M>>,
    state: StateCell,
    producer: ArcSwapOption<Box<dyn ProducerClient>>,
}

impl<M: Message> Publisher<M> {
    /// Start building a publisher for `topic`.
    pub fn builder(
        connector: Arc<dyn ProducerConnector>,
        broker: BrokerConfig,
        topic: impl Into<String>,
        serializer: Arc<dyn MessageSerializer<M>>,
    ) -> PublisherBuilder<M> {
        PublisherBuilder {
            topic: topic.into(),
            broker,
            producer_config: ProducerConfig::default(),
            connector,
            serializer,
            property_provider: None,
        }
    }

    /// Create the producer handle. Idempotent.
    ///
    /// Concurrent callers race on a compare-and-swap; exactly one of them
    /// calls the connector and the others return immediately.
    ///
    /// # Errors
    ///
    /// - `BusError::AlreadyDisposed` - the publisher was disposed
    /// - `BusError::ConnectFailure` - the connector failed; the publisher
    ///   stays unconnected and `connect` may be retried
    pub fn connect(&self) -> Result<(), BusError> {
        match self
            .state
            .transition(ConnectionState::Unconnected, ConnectionState::Connecting)
        {
            Ok(()) => {}
            Err(ConnectionState::Disposed) => return Err(BusError::AlreadyDisposed),
            Err(observed) => {
                debug!(topic = %self.topic, state = ?observed, "Connect skipped");
                return Ok(());
            }
        }

        let producer = match self.connector.connect(&self.broker, &self.producer_config) {
            Ok(producer) => producer,
            Err(e) => {
                let _ = self
                    .state
                    .transition(ConnectionState::Connecting, ConnectionState::Unconnected);
                warn!(topic = %self.topic, error = %e, "Producer connect failed");
                return Err(BusError::ConnectFailure(e));
            }
        };

        self.producer.store(Some(Arc::new(producer)));

        if self
            .state
            .transition(ConnectionState::Connecting, ConnectionState::Connected)
            .is_err()
        {
            // dispose() ran while the connector was working
            self.producer.store(None);
            return Err(BusError::AlreadyDisposed);
        }

        info!(
            topic = %self.topic,
            seeds = %self.broker.seed_addresses,
            "Publisher connected"
        );
        Ok(())
    }

    /// Publish one message and wait for the broker acknowledgement.
    ///
    /// # Errors
    ///
    /// - `BusError::AlreadyDisposed` - disposed before the call
    /// - `BusError::NotConnected` - `connect` has not succeeded yet
    /// - `BusError::Serialization` - the serializer failed or the envelope
    ///   exceeds [`MAX_ENVELOPE_BYTES`](crate::domain::codec::MAX_ENVELOPE_BYTES)
    /// - `BusError::SendFailure` - the broker rejected or timed out the record
    pub async fn publish(&self, message: &M) -> Result<(), BusError> {
        match self.state.load() {
            ConnectionState::Connected => {}
            ConnectionState::Disposed => return Err(BusError::AlreadyDisposed),
            ConnectionState::Unconnected | ConnectionState::Connecting => {
                return Err(BusError::NotConnected)
            }
        }

        let payload_type = message.payload_type();
        let properties: Option<Properties> =
            self.property_provider.as_ref().map(|provide| provide(message));

        let record = match self.encode(message, payload_type, properties) {
            Ok(record) => record,
            Err(e) => {
                PUBLISH_FAILURES.with_label_values(&[self.topic.as_str()]).inc();
                warn!(topic = %self.topic, payload_type, error = %e, "Publish failed before send");
                return Err(e);
            }
        };

        let Some(producer) = self.producer.load_full() else {
            debug!(topic = %self.topic, payload_type, "Publish abandoned, publisher disposed");
            return Ok(());
        };
        if self.state.is_disposed() {
            debug!(topic = %self.topic, payload_type, "Publish abandoned, publisher disposed");
            return Ok(());
        }

        match producer.send(&self.topic, PARTITION_KEY, record).await {
            Ok(()) => {
                ENVELOPES_PUBLISHED.with_label_values(&[self.topic.as_str()]).inc();
                debug!(topic = %self.topic, payload_type, "Envelope published");
                Ok(())
            }
            Err(source) => {
                PUBLISH_FAILURES.with_label_values(&[self.topic.as_str()]).inc();
                warn!(topic = %self.topic, payload_type, error = %source, "Broker send failed");
                Err(BusError::SendFailure {
                    topic: self.topic.clone(),
                    source,
                })
            }
        }
    }

    fn encode(
        &self,
        message: &M,
        payload_type: &str,
        properties: Option<Properties>,
    ) -> Result<Vec<u8>, BusError> {
        let payload = self.serializer.serialize(message)?;
        let envelope = Envelope::new(payload_type, properties, payload);
        EnvelopeCodec::encode(&envelope).map_err(|e| {
            BusError::Serialization(SerializationError::Encode {
                payload_type: payload_type.to_string(),
                reason: e.to_string(),
            })
        })
    }

    /// Flush buffered sends (bounded by the configured flush timeout) and
    /// release the producer handle. Repeat calls are no-ops.
    pub async fn dispose(&self) {
        if self.state.dispose() == ConnectionState::Disposed {
            return;
        }

        let Some(producer) = self.producer.swap(None) else {
            debug!(topic = %self.topic, "Publisher disposed before connecting");
            return;
        };

        let timeout = self.producer_config.flush_timeout();
        if let Err(e) = producer.flush(timeout).await {
            warn!(
                topic = %self.topic,
                timeout_ms = timeout.as_millis() as u64,
                error = %e,
                "Flush on dispose did not complete"
            );
        }
        drop(producer);

        info!(topic = %self.topic, "Publisher disposed");
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.state.load()
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state.load() == ConnectionState::Connected
    }
}

impl<M: Message> Drop for Publisher<M> {
    fn drop(&mut self) {
        if !self.state.is_disposed() && self.producer.load().is_some() {
            debug!(topic = %self.topic, "Publisher dropped without dispose, skipping flush");
        }
    }
}

#[async_trait]
impl<M: Message> MessagePublisher<M> for Publisher<M> {
    async fn publish(&self, message: &M) -> Result<(), BusError> {
        Publisher::publish(self, message).await
    }

    async fn dispose(&self) {
        Publisher::dispose(self).await;
    }
}

/// Builder for [`Publisher`].
pub struct PublisherBuilder<M: Message> {
    topic: String,
    broker: BrokerConfig,
    producer_config: ProducerConfig,
    connector: Arc<dyn ProducerConnector>,
    serializer: Arc<dyn MessageSerializer<M>>,
    property_provider: Option<PropertyProvider<M>>,
}

impl<M: Message> PublisherBuilder<M> {
    #[must_use]
    pub fn producer_config(mut self, config: ProducerConfig) -> Self {
        self.producer_config = config;
        self
    }

    /// Attach properties to every envelope. Without a provider envelopes
    /// carry no property bag at all.
    #[must_use]
    pub fn property_provider<F>(mut self, provider: F) -> Self
    where
        F: Fn(&M) -> Properties + Send + Sync + 'static,
    {
        self.property_provider = Some(Arc::new(provider));
        self
    }

    /// Build and connect.
    ///
    /// # Errors
    ///
    /// `BusError::InvalidConfig` or `BusError::ConnectFailure`.
    pub fn build(self) -> Result<Publisher<M>, BusError> {
        let publisher = self.build_unconnected()?;
        publisher.connect()?;
        Ok(publisher)
    }

    /// Build without creating the producer handle; call
    /// [`Publisher::connect`] before publishing.
    pub fn build_unconnected(self) -> Result<Publisher<M>, BusError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic.into());
        }
        self.broker.validate()?;
        self.producer_config.validate()?;

        Ok(Publisher {
            topic: self.topic,
            broker: self.broker,
            producer_config: self.producer_config,
            connector: self.connector,
            serializer: self.serializer,
            property_provider: self.property_provider,
            state: StateCell::new(),
            producer: ArcSwapOption::empty(),
        })
    }
}
