//! # Bus Telemetry
//!
//! Observability for the typed bus.
//!
//! ## Components
//!
//! - **Logging**: `tracing-subscriber` installation with env filter and
//!   optional JSON output
//! - **Metrics**: Prometheus counters for publish and consume paths
//!
//! ## Usage
//!
//! ```rust,ignore
//! use bus_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let _guard = init_telemetry(TelemetryConfig::from_env()).expect("telemetry");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `OTEL_SERVICE_NAME` | `typed-bus` | Service name attached to logs |
//! | `BUS_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `BUS_CONSOLE_OUTPUT` | `true` | Emit logs to stdout |
//! | `BUS_JSON_LOGS` | `false` (`true` in containers) | JSON log lines |

mod config;
mod logging;
pub mod metrics;

pub use config::TelemetryConfig;
pub use logging::init_logging;
pub use metrics::{
    encode_metrics, record_dropped, register_metrics, DropReason, MetricsHandle,
    CONSUMER_SESSIONS_OPENED, ENVELOPES_PUBLISHED, MESSAGES_DELIVERED, PUBLISH_FAILURES,
    RECORDS_DROPPED,
};

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Initialize logging and register metrics.
///
/// Returns a guard that should be held for the lifetime of the application.
pub fn init_telemetry(config: TelemetryConfig) -> Result<TelemetryGuard, TelemetryError> {
    let metrics_handle = register_metrics()?;
    init_logging(&config)?;

    Ok(TelemetryGuard {
        _metrics: metrics_handle,
    })
}

/// Guard that keeps telemetry active.
pub struct TelemetryGuard {
    _metrics: MetricsHandle,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        tracing::info!("Shutting down telemetry...");
    }
}
