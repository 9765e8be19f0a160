//! # In-Memory Broker
//!
//! Topic-addressed log held in process memory. Implements both connector
//! ports so publishers and sources can be wired without a real broker.
//!
//! Each topic keeps its full record history plus a `tokio::sync::broadcast`
//! channel for live delivery. A session opened with
//! [`OffsetReset::Earliest`] replays the history first; with
//! [`OffsetReset::Latest`] it only sees records appended after it opened.
//! A session that falls more than the channel capacity behind gets a
//! `BrokerError::Record` for the skipped range and resumes.

use crate::config::{BrokerConfig, ConsumerConfig, OffsetReset, ProducerConfig};
use crate::error::BrokerError;
use crate::ports::outbound::{
    ConsumerConnector, ProducerClient, ProducerConnector, Record, RecordStream,
};
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, trace};

/// Shared in-process broker. Cloning shares the same topics.
#[derive(Clone)]
pub struct InMemoryBroker {
    inner: Arc<Inner>,
}

struct Inner {
    topics: Mutex<HashMap<String, TopicLog>>,
    capacity: usize,
    producers_created: AtomicU64,
    producers_released: AtomicU64,
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    records_sent: AtomicU64,
    flushes: AtomicU64,
}

struct TopicLog {
    sender: broadcast::Sender<Record>,
    history: Vec<Record>,
}

impl TopicLog {
    fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            history: Vec::new(),
        }
    }
}

impl InMemoryBroker {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// `capacity` bounds how far a live session may lag before records are
    /// skipped.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
                producers_created: AtomicU64::new(0),
                producers_released: AtomicU64::new(0),
                sessions_opened: AtomicU64::new(0),
                sessions_closed: AtomicU64::new(0),
                records_sent: AtomicU64::new(0),
                flushes: AtomicU64::new(0),
            }),
        }
    }

    /// Append raw record bytes to `topic`, bypassing any producer.
    ///
    /// Returns the offset assigned to the record.
    ///
    /// # Errors
    ///
    /// `BrokerError::Closed` if the topic table is unusable after a panic.
    pub fn append(&self, topic: &str, value: Vec<u8>) -> Result<i64, BrokerError> {
        self.inner.append(topic, None, value)
    }

    /// Every record appended to `topic` so far.
    #[must_use]
    pub fn records(&self, topic: &str) -> Vec<Record> {
        self.inner
            .topics
            .lock()
            .map(|topics| {
                topics
                    .get(topic)
                    .map(|log| log.history.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    #[must_use]
    pub fn producers_created(&self) -> u64 {
        self.inner.producers_created.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn producers_released(&self) -> u64 {
        self.inner.producers_released.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sessions_opened(&self) -> u64 {
        self.inner.sessions_opened.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn sessions_closed(&self) -> u64 {
        self.inner.sessions_closed.load(Ordering::Relaxed)
    }

    /// Records sent through producer handles (not counting [`append`](Self::append)).
    #[must_use]
    pub fn records_sent(&self) -> u64 {
        self.inner.records_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn flushes(&self) -> u64 {
        self.inner.flushes.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl Inner {
    fn append(
        &self,
        topic: &str,
        key: Option<Vec<u8>>,
        value: Vec<u8>,
    ) -> Result<i64, BrokerError> {
        let mut topics = self.topics.lock().map_err(|_| BrokerError::Closed)?;
        let log = topics
            .entry(topic.to_string())
            .or_insert_with(|| TopicLog::new(self.capacity));

        let record = Record {
            topic: topic.to_string(),
            partition: 0,
            offset: log.history.len() as i64,
            key,
            value,
        };
        let offset = record.offset;
        log.history.push(record.clone());

        // No live sessions is not an error; the record stays in history.
        let receivers = log.sender.send(record).unwrap_or(0);
        trace!(topic, offset, receivers, "Record appended");
        Ok(offset)
    }
}

impl ProducerConnector for InMemoryBroker {
    fn connect(
        &self,
        broker: &BrokerConfig,
        _producer: &ProducerConfig,
    ) -> Result<Box<dyn ProducerClient>, BrokerError> {
        self.inner.producers_created.fetch_add(1, Ordering::Relaxed);
        debug!(seeds = %broker.seed_addresses, "In-memory producer created");
        Ok(Box::new(InMemoryProducer {
            inner: self.inner.clone(),
        }))
    }
}

impl ConsumerConnector for InMemoryBroker {
    fn subscribe(
        &self,
        broker: &BrokerConfig,
        consumer: &ConsumerConfig,
        topic: &str,
    ) -> Result<RecordStream, BrokerError> {
        let (replay, receiver) = {
            let mut topics = self
                .inner
                .topics
                .lock()
                .map_err(|_| BrokerError::Connect("in-memory broker lock poisoned".into()))?;
            let log = topics
                .entry(topic.to_string())
                .or_insert_with(|| TopicLog::new(self.inner.capacity));
            let replay = match consumer.auto_offset_reset {
                OffsetReset::Earliest => log.history.clone(),
                OffsetReset::Latest => Vec::new(),
            };
            (replay, log.sender.subscribe())
        };

        self.inner.sessions_opened.fetch_add(1, Ordering::Relaxed);
        debug!(
            topic,
            group_id = %broker.group_id,
            replayed = replay.len(),
            "In-memory consumer session opened"
        );

        let live = BroadcastStream::new(receiver)
            .map(|item| item.map_err(|e| BrokerError::Record(e.to_string())));
        let records = tokio_stream::iter(replay.into_iter().map(Ok)).chain(live);

        Ok(Box::pin(SessionStream {
            records: Box::pin(records),
            inner: self.inner.clone(),
        }))
    }
}

struct InMemoryProducer {
    inner: Arc<Inner>,
}

#[async_trait]
impl ProducerClient for InMemoryProducer {
    async fn send(&self, topic: &str, key: &str, record: Vec<u8>) -> Result<(), BrokerError> {
        let key = (!key.is_empty()).then(|| key.as_bytes().to_vec());
        self.inner.append(topic, key, record)?;
        self.inner.records_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn flush(&self, _timeout: Duration) -> Result<(), BrokerError> {
        self.inner.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Drop for InMemoryProducer {
    fn drop(&mut self) {
        self.inner.producers_released.fetch_add(1, Ordering::Relaxed);
    }
}

/// Record stream that reports its own closing to the broker.
struct SessionStream {
    records: RecordStream,
    inner: Arc<Inner>,
}

impl Stream for SessionStream {
    type Item = Result<Record, BrokerError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.records.as_mut().poll_next(cx)
    }
}

impl Drop for SessionStream {
    fn drop(&mut self) {
        self.inner.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }
}
