//! # Kafka Broker Adapter
//!
//! `rdkafka`-backed implementation of the connector ports.
//!
//! - Producer: one `FutureProducer` per publisher; sends await the delivery
//!   report, flush runs on a blocking thread bounded by the flush timeout.
//! - Consumer: one `StreamConsumer` per subscription, driven by a session
//!   task that forwards records into a bounded channel. The task stops, and
//!   the consumer leaves its group, once the receiving end is dropped: when
//!   the subscription's stream is dropped or its source is disposed.
//!
//! Offsets are committed automatically on receipt (`enable.auto.commit`).

use crate::config::{BrokerConfig, ConsumerConfig, ProducerConfig};
use crate::error::BrokerError;
use crate::ports::outbound::{
    ConsumerConnector, ProducerClient, ProducerConnector, Record, RecordStream,
};
use async_trait::async_trait;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use rdkafka::{ClientConfig, Message as _};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

const DEFAULT_CLIENT_ID: &str = "typed-bus";

/// Connector creating rdkafka producers and consumer sessions.
#[derive(Debug, Clone)]
pub struct KafkaConnector {
    client_id: String,
}

impl KafkaConnector {
    #[must_use]
    pub fn new() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
        }
    }

    /// `client.id` reported to the broker.
    #[must_use]
    pub fn with_client_id(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }

    fn base_config(&self, broker: &BrokerConfig) -> ClientConfig {
        let mut cfg = ClientConfig::new();
        cfg.set("bootstrap.servers", broker.seeds().join(","));
        cfg.set("client.id", self.client_id.as_str());
        cfg
    }

    fn producer_config(&self, broker: &BrokerConfig, producer: &ProducerConfig) -> ClientConfig {
        let mut cfg = self.base_config(broker);
        cfg.set("acks", producer.acks.as_str());
        cfg.set("compression.type", producer.compression.as_str());
        cfg.set("linger.ms", producer.linger_ms.to_string());
        cfg.set("message.timeout.ms", producer.message_timeout_ms.to_string());
        cfg.set(
            "enable.idempotence",
            if producer.enable_idempotence {
                "true"
            } else {
                "false"
            },
        );
        cfg
    }

    fn consumer_config(&self, broker: &BrokerConfig, consumer: &ConsumerConfig) -> ClientConfig {
        let mut cfg = self.base_config(broker);
        cfg.set("group.id", broker.group_id.as_str());
        cfg.set("enable.auto.commit", "true");
        cfg.set(
            "auto.commit.interval.ms",
            consumer.auto_commit_interval_ms.to_string(),
        );
        cfg.set("auto.offset.reset", consumer.auto_offset_reset.as_str());
        cfg.set("session.timeout.ms", consumer.session_timeout_ms.to_string());
        cfg.set("enable.partition.eof", "false");
        cfg
    }
}

impl Default for KafkaConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducerConnector for KafkaConnector {
    fn connect(
        &self,
        broker: &BrokerConfig,
        producer: &ProducerConfig,
    ) -> Result<Box<dyn ProducerClient>, BrokerError> {
        let client: FutureProducer = self.producer_config(broker, producer).create()?;
        info!(
            seeds = %broker.seed_addresses,
            client_id = %self.client_id,
            "Kafka producer created"
        );
        Ok(Box::new(KafkaProducer {
            producer: client,
            queue_timeout: producer.message_timeout(),
        }))
    }
}

impl ConsumerConnector for KafkaConnector {
    fn subscribe(
        &self,
        broker: &BrokerConfig,
        consumer: &ConsumerConfig,
        topic: &str,
    ) -> Result<RecordStream, BrokerError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| BrokerError::Connect(format!("no tokio runtime: {e}")))?;

        let client: StreamConsumer = self.consumer_config(broker, consumer).create()?;
        client.subscribe(&[topic])?;

        let (tx, rx) = mpsc::channel(consumer.channel_capacity);
        let topic_name = topic.to_string();
        debug!(topic, group_id = %broker.group_id, "Kafka consumer session opened");

        runtime.spawn(async move {
            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    received = client.recv() => {
                        let item = received
                            .map(|msg| Record {
                                topic: msg.topic().to_string(),
                                partition: msg.partition(),
                                offset: msg.offset(),
                                key: msg.key().map(<[u8]>::to_vec),
                                value: msg.payload().unwrap_or_default().to_vec(),
                            })
                            .map_err(BrokerError::from);
                        if tx.send(item).await.is_err() {
                            break;
                        }
                    }
                }
            }
            debug!(topic = %topic_name, "Kafka consumer session closed");
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

struct KafkaProducer {
    producer: FutureProducer,
    queue_timeout: Duration,
}

#[async_trait]
impl ProducerClient for KafkaProducer {
    async fn send(&self, topic: &str, key: &str, record: Vec<u8>) -> Result<(), BrokerError> {
        let kafka_record = FutureRecord::to(topic).key(key).payload(&record);
        self.producer
            .send(kafka_record, Timeout::After(self.queue_timeout))
            .await
            .map(|_| ())
            .map_err(|(e, _)| BrokerError::Kafka(e))
    }

    async fn flush(&self, timeout: Duration) -> Result<(), BrokerError> {
        let producer = self.producer.clone();
        let flushed = tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout)))
            .await
            .map_err(|e| BrokerError::Send(format!("flush task failed: {e}")))?;

        match flushed {
            Ok(()) => Ok(()),
            Err(KafkaError::Flush(RDKafkaErrorCode::OperationTimedOut)) => {
                warn!(
                    in_flight = self.producer.in_flight_count(),
                    "Kafka flush timed out"
                );
                Err(BrokerError::Timeout(timeout))
            }
            Err(e) => Err(e.into()),
        }
    }
}
