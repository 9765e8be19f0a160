//! Prometheus metrics for the typed bus.
//!
//! All metrics follow the naming convention: `typed_bus_<path>_<metric>_total`
//! and carry a `topic` label.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

use crate::TelemetryError;

lazy_static! {
    /// Metrics registry for bus counters
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // PUBLISH PATH
    // =========================================================================

    /// Envelopes handed to the broker and acknowledged
    pub static ref ENVELOPES_PUBLISHED: IntCounterVec = IntCounterVec::new(
        Opts::new("typed_bus_envelopes_published_total", "Envelopes acknowledged by the broker"),
        &["topic"]
    ).expect("metric creation failed");

    /// Publish calls that failed at serialization or broker send
    pub static ref PUBLISH_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new("typed_bus_publish_failures_total", "Failed publish calls"),
        &["topic"]
    ).expect("metric creation failed");

    // =========================================================================
    // CONSUME PATH
    // =========================================================================

    /// Typed messages emitted downstream by a source
    pub static ref MESSAGES_DELIVERED: IntCounterVec = IntCounterVec::new(
        Opts::new("typed_bus_messages_delivered_total", "Typed messages emitted by sources"),
        &["topic"]
    ).expect("metric creation failed");

    /// Records dropped before reaching the consumer
    pub static ref RECORDS_DROPPED: IntCounterVec = IntCounterVec::new(
        Opts::new("typed_bus_records_dropped_total", "Records dropped by sources"),
        &["topic", "reason"]
    ).expect("metric creation failed");

    /// Broker consumer sessions opened by subscriptions
    pub static ref CONSUMER_SESSIONS_OPENED: IntCounterVec = IntCounterVec::new(
        Opts::new("typed_bus_consumer_sessions_opened_total", "Consumer sessions opened"),
        &["topic"]
    ).expect("metric creation failed");
}

/// Why a consumed record never became a typed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DropReason {
    /// The property predicate rejected it.
    Filtered,
    /// The record bytes were not a valid envelope.
    MalformedEnvelope,
    /// No deserializer was registered for the payload type.
    UnknownPayloadType,
    /// The registered deserializer failed on the payload.
    DeserializeFailed,
    /// The broker client reported an error for the record.
    BrokerError,
}

impl DropReason {
    /// Label value used in `typed_bus_records_dropped_total`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Filtered => "filtered",
            Self::MalformedEnvelope => "malformed_envelope",
            Self::UnknownPayloadType => "unknown_payload_type",
            Self::DeserializeFailed => "deserialize_failed",
            Self::BrokerError => "broker_error",
        }
    }
}

/// Handle for the registered metrics
pub struct MetricsHandle {
    _registry: Arc<Registry>,
}

/// Register all metrics with the bus registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<MetricsHandle, TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(ENVELOPES_PUBLISHED.clone()),
        Box::new(PUBLISH_FAILURES.clone()),
        Box::new(MESSAGES_DELIVERED.clone()),
        Box::new(RECORDS_DROPPED.clone()),
        Box::new(CONSUMER_SESSIONS_OPENED.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(MetricsHandle {
        _registry: Arc::new(REGISTRY.clone()),
    })
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> Result<String, TelemetryError> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
    String::from_utf8(buffer).map_err(|e| TelemetryError::MetricsInit(e.to_string()))
}

/// Count one dropped record.
pub fn record_dropped(topic: &str, reason: DropReason) {
    RECORDS_DROPPED
        .with_label_values(&[topic, reason.as_str()])
        .inc();
}
