//! # Source
//!
//! Exposes one topic as a stream of typed messages. Each call to
//! [`Source::messages`] opens its own consumer session; every record of that
//! session goes through the same pipeline on the polling task:
//!
//! ```text
//! Record ─decode─→ Envelope ─filter─→ registry lookup ─deserialize─→ M
//!    │               │                  │                    │
//!    └ malformed     └ rejected         └ unknown tag        └ failed
//!         (each: warn/debug log, drop counter, continue with the next record)
//! ```
//!
//! ## Cancellation
//!
//! The source keeps a weak handle on every live session. [`Source::dispose`]
//! drops each session's record stream on the spot, so broker consumers are
//! released even when nobody polls their stream again, then cancels the
//! parent [`CancellationToken`] to wake streams parked on an empty session.
//! Dropping a stream releases its session.

use crate::config::{BrokerConfig, ConsumerConfig};
use crate::domain::codec::EnvelopeCodec;
use crate::domain::envelope::Properties;
use crate::domain::message::Message;
use crate::error::{BusError, ConfigError};
use crate::ports::inbound::{MessageSource, TypedStream};
use crate::ports::outbound::{ConsumerConnector, Record, RecordStream};
use crate::ports::serialization::{MessageDeserializer, PropertyFilter};
use crate::service::registry::DeserializerRegistry;
use bus_telemetry::{record_dropped, DropReason, CONSUMER_SESSIONS_OPENED, MESSAGES_DELIVERED};
use parking_lot::Mutex;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Typed source bound to one topic.
pub struct Source<M: Message> {
    topic: String,
    broker: BrokerConfig,
    consumer_config: ConsumerConfig,
    connector: Arc<dyn ConsumerConnector>,
    dispatcher: Arc<Dispatcher<M>>,
    shutdown: CancellationToken,
    active: Arc<AtomicUsize>,
    sessions: Mutex<Vec<Weak<SessionSlot>>>,
}

impl<M: Message> Source<M> {
    /// Start building a source for `topic`.
    pub fn builder(
        connector: Arc<dyn ConsumerConnector>,
        broker: BrokerConfig,
        topic: impl Into<String>,
    ) -> SourceBuilder<M> {
        SourceBuilder {
            topic: topic.into(),
            broker,
            consumer_config: ConsumerConfig::default(),
            connector,
            deserializers: Vec::new(),
            filter: None,
        }
    }

    /// Open a new subscription.
    ///
    /// The returned stream is lazy: records are processed only while it is
    /// polled.
    ///
    /// # Errors
    ///
    /// - `BusError::AlreadyDisposed` - the source was disposed
    /// - `BusError::ConnectFailure` - the consumer session could not be opened
    pub fn messages(&self) -> Result<MessageStream<M>, BusError> {
        if self.shutdown.is_cancelled() {
            return Err(BusError::AlreadyDisposed);
        }

        let records = self
            .connector
            .subscribe(&self.broker, &self.consumer_config, &self.topic)
            .map_err(|e| {
                warn!(topic = %self.topic, error = %e, "Consumer session failed to open");
                BusError::ConnectFailure(e)
            })?;

        CONSUMER_SESSIONS_OPENED
            .with_label_values(&[self.topic.as_str()])
            .inc();
        let slot: Arc<SessionSlot> = Arc::new(Mutex::new(Some(LiveSession {
            records,
            _guard: SessionGuard::open(&self.topic, self.active.clone()),
        })));
        {
            let mut sessions = self.sessions.lock();
            sessions.retain(|session| session.strong_count() > 0);
            sessions.push(Arc::downgrade(&slot));
        }
        if self.shutdown.is_cancelled() {
            // dispose() ran while the session was opening
            drop(slot.lock().take());
            return Err(BusError::AlreadyDisposed);
        }
        debug!(
            topic = %self.topic,
            group_id = %self.broker.group_id,
            active = self.active.load(Ordering::Relaxed),
            "Consumer session opened"
        );

        Ok(MessageStream::new(
            slot,
            self.dispatcher.clone(),
            self.shutdown.child_token(),
        ))
    }

    /// End every live subscription and refuse new ones. Idempotent.
    ///
    /// Consumer sessions are released before this returns; streams observe
    /// the end at their next poll.
    pub fn dispose(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();
        let released = self.release_sessions();
        info!(
            topic = %self.topic,
            released,
            active = self.active.load(Ordering::Relaxed),
            "Source disposed"
        );
    }

    /// Drop the record stream of every live session. Returns how many were
    /// still open.
    fn release_sessions(&self) -> usize {
        let slots: Vec<Weak<SessionSlot>> = std::mem::take(&mut *self.sessions.lock());
        let mut released = 0;
        for slot in slots.iter().filter_map(Weak::upgrade) {
            // Taken under the slot lock, dropped after it is released.
            let live = slot.lock().take();
            if live.is_some() {
                released += 1;
            }
            drop(live);
        }
        released
    }

    #[must_use]
    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    /// Subscriptions whose session has not yet ended, been dropped or been
    /// released by [`dispose`](Self::dispose).
    #[must_use]
    pub fn active_subscriptions(&self) -> usize {
        self.active.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn registered_payload_types(&self) -> Vec<String> {
        self.dispatcher.registry.payload_types()
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl<M: Message> Drop for Source<M> {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.release_sessions();
    }
}

impl<M: Message> MessageSource<M> for Source<M> {
    fn messages(&self) -> Result<TypedStream<M>, BusError> {
        Ok(Box::pin(Source::messages(self)?))
    }

    fn dispose(&self) {
        Source::dispose(self);
    }
}

/// Builder for [`Source`].
pub struct SourceBuilder<M: Message> {
    topic: String,
    broker: BrokerConfig,
    consumer_config: ConsumerConfig,
    connector: Arc<dyn ConsumerConnector>,
    deserializers: Vec<Arc<dyn MessageDeserializer<M>>>,
    filter: Option<PropertyFilter>,
}

impl<M: Message> SourceBuilder<M> {
    /// Register a deserializer under its own payload-type tag.
    #[must_use]
    pub fn deserializer<D>(mut self, deserializer: D) -> Self
    where
        D: MessageDeserializer<M> + 'static,
    {
        self.deserializers.push(Arc::new(deserializer));
        self
    }

    #[must_use]
    pub fn deserializers<I>(mut self, deserializers: I) -> Self
    where
        I: IntoIterator<Item = Arc<dyn MessageDeserializer<M>>>,
    {
        self.deserializers.extend(deserializers);
        self
    }

    /// Only records whose property bag satisfies `filter` are dispatched.
    /// The predicate sees `None` for envelopes without properties.
    #[must_use]
    pub fn property_filter<F>(mut self, filter: F) -> Self
    where
        F: Fn(Option<&Properties>) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Arc::new(filter));
        self
    }

    #[must_use]
    pub fn consumer_config(mut self, config: ConsumerConfig) -> Self {
        self.consumer_config = config;
        self
    }

    /// # Errors
    ///
    /// - `BusError::InvalidConfig` - empty topic or invalid broker/consumer config
    /// - `BusError::DuplicatePayloadType` - two deserializers share a tag
    pub fn build(self) -> Result<Source<M>, BusError> {
        if self.topic.trim().is_empty() {
            return Err(ConfigError::EmptyTopic.into());
        }
        self.broker.validate()?;
        self.consumer_config.validate()?;

        let registry = DeserializerRegistry::new(self.deserializers)?;
        debug!(
            topic = %self.topic,
            payload_types = ?registry.payload_types(),
            filtered = self.filter.is_some(),
            "Source built"
        );

        Ok(Source {
            dispatcher: Arc::new(Dispatcher {
                topic: self.topic.clone(),
                registry,
                filter: self.filter,
            }),
            topic: self.topic,
            broker: self.broker,
            consumer_config: self.consumer_config,
            connector: self.connector,
            shutdown: CancellationToken::new(),
            active: Arc::new(AtomicUsize::new(0)),
            sessions: Mutex::new(Vec::new()),
        })
    }
}

/// Decode → filter → dispatch, shared by every stream of one source.
struct Dispatcher<M> {
    topic: String,
    registry: DeserializerRegistry<M>,
    filter: Option<PropertyFilter>,
}

impl<M> Dispatcher<M> {
    fn process(&self, record: &Record) -> Option<M> {
        let envelope = match EnvelopeCodec::decode(&record.value) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(
                    topic = %self.topic,
                    partition = record.partition,
                    offset = record.offset,
                    error = %e,
                    "Dropping malformed envelope"
                );
                record_dropped(&self.topic, DropReason::MalformedEnvelope);
                return None;
            }
        };

        if let Some(filter) = &self.filter {
            if !filter(envelope.properties()) {
                debug!(
                    topic = %self.topic,
                    offset = record.offset,
                    payload_type = envelope.payload_type(),
                    "Record filtered out"
                );
                record_dropped(&self.topic, DropReason::Filtered);
                return None;
            }
        }

        match self.registry.deserialize(&envelope) {
            Ok(message) => {
                MESSAGES_DELIVERED
                    .with_label_values(&[self.topic.as_str()])
                    .inc();
                Some(message)
            }
            Err(BusError::UnknownPayloadType { payload_type }) => {
                warn!(
                    topic = %self.topic,
                    offset = record.offset,
                    payload_type = %payload_type,
                    "Dropping record with unknown payload type"
                );
                record_dropped(&self.topic, DropReason::UnknownPayloadType);
                None
            }
            Err(e) => {
                warn!(
                    topic = %self.topic,
                    offset = record.offset,
                    payload_type = envelope.payload_type(),
                    error = %e,
                    "Dropping record that failed to deserialize"
                );
                record_dropped(&self.topic, DropReason::DeserializeFailed);
                None
            }
        }
    }
}

/// Counts a live consumer session.
struct SessionGuard {
    topic: String,
    active: Arc<AtomicUsize>,
}

impl SessionGuard {
    fn open(topic: &str, active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::AcqRel);
        Self {
            topic: topic.to_string(),
            active,
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::AcqRel);
        debug!(topic = %self.topic, "Consumer session closed");
    }
}

/// An open consumer session: the broker record stream plus its live count.
struct LiveSession {
    records: RecordStream,
    _guard: SessionGuard,
}

/// Shared between a [`MessageStream`] and its [`Source`]; `None` once the
/// session is released by either side.
type SessionSlot = Mutex<Option<LiveSession>>;

/// Stream of typed messages for one subscription.
///
/// Ends when the owning [`Source`] is disposed or the broker record stream
/// ends. Dropping it closes the consumer session.
pub struct MessageStream<M> {
    session: Arc<SessionSlot>,
    dispatcher: Arc<Dispatcher<M>>,
    cancelled: Pin<Box<dyn Future<Output = ()> + Send>>,
}

impl<M> MessageStream<M> {
    fn new(
        session: Arc<SessionSlot>,
        dispatcher: Arc<Dispatcher<M>>,
        token: CancellationToken,
    ) -> Self {
        Self {
            session,
            dispatcher,
            cancelled: Box::pin(async move { token.cancelled().await }),
        }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.dispatcher.topic
    }

    /// `true` once the stream has ended and released its session.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.session.lock().is_none()
    }

    fn release(&self) {
        let live = self.session.lock().take();
        drop(live);
    }
}

impl<M> Stream for MessageStream<M> {
    type Item = M;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<M>> {
        let this = self.get_mut();
        if this.is_terminated() {
            return Poll::Ready(None);
        }

        if this.cancelled.as_mut().poll(cx).is_ready() {
            debug!(topic = %this.dispatcher.topic, "Subscription cancelled");
            this.release();
            return Poll::Ready(None);
        }

        loop {
            // The slot lock is not held while user filters and deserializers run.
            let polled = {
                let mut slot = this.session.lock();
                let Some(live) = slot.as_mut() else {
                    return Poll::Ready(None);
                };
                live.records.as_mut().poll_next(cx)
            };
            match polled {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(None) => {
                    debug!(topic = %this.dispatcher.topic, "Record stream ended");
                    this.release();
                    return Poll::Ready(None);
                }
                Poll::Ready(Some(Err(e))) => {
                    warn!(topic = %this.dispatcher.topic, error = %e, "Broker record error");
                    record_dropped(&this.dispatcher.topic, DropReason::BrokerError);
                }
                Poll::Ready(Some(Ok(record))) => {
                    if let Some(message) = this.dispatcher.process(&record) {
                        return Poll::Ready(Some(message));
                    }
                }
            }
        }
    }
}
