//! # Shared Fixtures
//!
//! Order-domain message types, broker doubles and stream helpers used by the
//! scenario modules.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{Stream, StreamExt};
use typed_bus::{
    impl_payload_type, BrokerConfig, BrokerError, InMemoryBroker, JsonDeserializer,
    JsonSerializer, Message, MessageDeserializer, PayloadType, ProducerClient, ProducerConfig,
    ProducerConnector, Properties, Publisher, PublisherBuilder, SerializationError, Source,
    SourceBuilder,
};

pub const ORDERS_TOPIC: &str = "orders";

// =============================================================================
// MESSAGE TYPES
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPlaced {
    pub order_id: u64,
    pub region: String,
    pub amount_cents: u64,
}
impl_payload_type!(OrderPlaced => "orders.placed.v1");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderCancelled {
    pub order_id: u64,
    pub reason: String,
}
impl_payload_type!(OrderCancelled => "orders.cancelled.v1");

/// Shape no order source registers a deserializer for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundIssued {
    pub order_id: u64,
}
impl_payload_type!(RefundIssued => "orders.refunded.v1");

/// Everything that travels on the orders topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OrderEvent {
    Placed(OrderPlaced),
    Cancelled(OrderCancelled),
}

impl Message for OrderEvent {
    fn payload_type(&self) -> &'static str {
        match self {
            Self::Placed(_) => OrderPlaced::PAYLOAD_TYPE,
            Self::Cancelled(_) => OrderCancelled::PAYLOAD_TYPE,
        }
    }
}

impl From<OrderPlaced> for OrderEvent {
    fn from(placed: OrderPlaced) -> Self {
        Self::Placed(placed)
    }
}

impl From<OrderCancelled> for OrderEvent {
    fn from(cancelled: OrderCancelled) -> Self {
        Self::Cancelled(cancelled)
    }
}

pub fn placed(order_id: u64, region: &str) -> OrderEvent {
    OrderEvent::Placed(OrderPlaced {
        order_id,
        region: region.to_string(),
        amount_cents: order_id * 100,
    })
}

pub fn cancelled(order_id: u64) -> OrderEvent {
    OrderEvent::Cancelled(OrderCancelled {
        order_id,
        reason: "customer request".to_string(),
    })
}

/// `region` for placed orders, an empty bag otherwise.
pub fn region_properties(event: &OrderEvent) -> Properties {
    match event {
        OrderEvent::Placed(p) => Properties::from([("region".to_string(), p.region.clone())]),
        OrderEvent::Cancelled(_) => Properties::new(),
    }
}

pub fn region_is(region: &'static str) -> impl Fn(Option<&Properties>) -> bool + Send + Sync {
    move |props| {
        props
            .and_then(|p| p.get("region"))
            .is_some_and(|r| r == region)
    }
}

// =============================================================================
// WIRING
// =============================================================================

pub fn broker_config(group_id: &str) -> BrokerConfig {
    BrokerConfig::new("127.0.0.1:9092", group_id)
}

/// JSON publisher on the orders topic with the region property provider.
pub fn order_publisher(connector: Arc<dyn ProducerConnector>) -> PublisherBuilder<OrderEvent> {
    Publisher::builder(
        connector,
        broker_config("order-writers"),
        ORDERS_TOPIC,
        Arc::new(JsonSerializer),
    )
    .property_provider(region_properties)
}

/// JSON source on the orders topic knowing both order shapes.
pub fn order_source(broker: &InMemoryBroker, group_id: &str) -> SourceBuilder<OrderEvent> {
    Source::builder(Arc::new(broker.clone()), broker_config(group_id), ORDERS_TOPIC)
        .deserializer(JsonDeserializer::<OrderPlaced>::new())
        .deserializer(JsonDeserializer::<OrderCancelled>::new())
}

// =============================================================================
// DOUBLES
// =============================================================================

/// Wraps an [`InMemoryBroker`] and counts producer connects.
pub struct CountingConnector {
    inner: InMemoryBroker,
    connects: AtomicUsize,
    delay: Duration,
}

impl CountingConnector {
    pub fn new(inner: InMemoryBroker, delay: Duration) -> Self {
        Self {
            inner,
            connects: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl ProducerConnector for CountingConnector {
    fn connect(
        &self,
        broker: &BrokerConfig,
        producer: &ProducerConfig,
    ) -> Result<Box<dyn ProducerClient>, BrokerError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.connect(broker, producer)
    }
}

/// Connector whose producers reject every record.
#[derive(Default)]
pub struct RejectingConnector {
    sends: Arc<AtomicUsize>,
    flushes: Arc<AtomicUsize>,
}

impl RejectingConnector {
    pub fn sends(&self) -> usize {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn flushes(&self) -> usize {
        self.flushes.load(Ordering::SeqCst)
    }
}

impl ProducerConnector for RejectingConnector {
    fn connect(
        &self,
        _broker: &BrokerConfig,
        _producer: &ProducerConfig,
    ) -> Result<Box<dyn ProducerClient>, BrokerError> {
        Ok(Box::new(RejectingProducer {
            sends: self.sends.clone(),
            flushes: self.flushes.clone(),
        }))
    }
}

struct RejectingProducer {
    sends: Arc<AtomicUsize>,
    flushes: Arc<AtomicUsize>,
}

#[async_trait]
impl ProducerClient for RejectingProducer {
    async fn send(&self, _topic: &str, _key: &str, _record: Vec<u8>) -> Result<(), BrokerError> {
        self.sends.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::Send("leader not available".to_string()))
    }

    async fn flush(&self, timeout: Duration) -> Result<(), BrokerError> {
        self.flushes.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::Timeout(timeout))
    }
}

/// Counts how often the wrapped deserializer runs.
pub struct CountingDeserializer<D> {
    inner: D,
    calls: Arc<AtomicUsize>,
}

impl<D> CountingDeserializer<D> {
    pub fn new(inner: D, calls: Arc<AtomicUsize>) -> Self {
        Self { inner, calls }
    }
}

impl<M, D> MessageDeserializer<M> for CountingDeserializer<D>
where
    D: MessageDeserializer<M>,
{
    fn payload_type(&self) -> &str {
        self.inner.payload_type()
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<M, SerializationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.deserialize(bytes)
    }
}

// =============================================================================
// STREAM HELPERS
// =============================================================================

/// Next item, panicking if nothing arrives within a second.
pub async fn next_item<S>(stream: &mut S) -> Option<S::Item>
where
    S: Stream + Unpin,
{
    tokio::time::timeout(Duration::from_secs(1), stream.next())
        .await
        .expect("timed out waiting for the stream")
}

/// Assert nothing arrives for `window`.
pub async fn assert_silent<S>(stream: &mut S, window: Duration)
where
    S: Stream + Unpin,
    S::Item: std::fmt::Debug,
{
    if let Ok(item) = tokio::time::timeout(window, stream.next()).await {
        panic!("expected no item, got {item:?}");
    }
}
