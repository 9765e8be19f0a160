//! Configuration value objects.
//!
//! These are plain data: broker seeds and group identity, plus producer and
//! consumer tuning knobs that broker adapters map onto client options.
//!
//! # Example
//!
//! ```ignore
//! use typed_bus::config::BrokerConfig;
//!
//! let broker = BrokerConfig::new("kafka-1:9092,kafka-2:9092", "billing");
//! broker.validate()?;
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Broker seed addresses and consumer group identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BrokerConfig {
    /// Comma-separated `host:port` list.
    ///
    /// Example: `127.0.0.1:9092` or `kafka-1:9092,kafka-2:9092`.
    pub seed_addresses: String,
    /// Consumer group this process joins when subscribing.
    pub group_id: String,
}

impl BrokerConfig {
    /// Build from a connection string (`host:port[,host:port...]`).
    pub fn new(connection_string: impl Into<String>, group_id: impl Into<String>) -> Self {
        Self {
            seed_addresses: connection_string.into(),
            group_id: group_id.into(),
        }
    }

    /// Build from a list of endpoints, joined with `,`.
    pub fn from_endpoints(group_id: impl Into<String>, endpoints: &[SocketAddr]) -> Self {
        let seed_addresses = endpoints
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        Self::new(seed_addresses, group_id)
    }

    /// Individual seed entries, trimmed, empty entries skipped.
    #[must_use]
    pub fn seeds(&self) -> Vec<&str> {
        self.seed_addresses
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check that every seed is `host:port` and the group id is set.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seeds = self.seeds();
        if seeds.is_empty() {
            return Err(ConfigError::EmptySeedAddresses);
        }

        for seed in seeds {
            let valid = seed
                .rsplit_once(':')
                .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
                .unwrap_or(false);
            if !valid {
                return Err(ConfigError::InvalidSeedAddress(seed.to_string()));
            }
        }

        if self.group_id.trim().is_empty() {
            return Err(ConfigError::EmptyGroupId);
        }

        Ok(())
    }
}

/// Producer tuning (mapped to broker client producer options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerConfig {
    /// Upper bound on the flush performed at disposal (ms).
    #[serde(default = "ProducerConfig::default_flush_timeout_ms")]
    pub flush_timeout_ms: u64,
    /// Time a record may wait for delivery before failing (ms).
    #[serde(default = "ProducerConfig::default_message_timeout_ms")]
    pub message_timeout_ms: u64,
    /// Linger time for batching (ms).
    #[serde(default = "ProducerConfig::default_linger_ms")]
    pub linger_ms: u32,
    /// Acks policy.
    #[serde(default)]
    pub acks: Acks,
    /// Compression algorithm.
    #[serde(default)]
    pub compression: Compression,
    /// Enable the idempotent producer.
    #[serde(default)]
    pub enable_idempotence: bool,
}

impl ProducerConfig {
    #[inline]
    fn default_flush_timeout_ms() -> u64 {
        5_000
    }

    #[inline]
    fn default_message_timeout_ms() -> u64 {
        30_000
    }

    #[inline]
    fn default_linger_ms() -> u32 {
        5
    }

    /// Bounded wait used when flushing at disposal.
    #[must_use]
    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    /// Delivery timeout per record.
    #[must_use]
    pub fn message_timeout(&self) -> Duration {
        Duration::from_millis(self.message_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "flush_timeout_ms",
            });
        }
        if self.message_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "message_timeout_ms",
            });
        }
        Ok(())
    }

    /// Builder-style method to set the flush timeout
    pub fn with_flush_timeout(mut self, timeout: Duration) -> Self {
        self.flush_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            flush_timeout_ms: ProducerConfig::default_flush_timeout_ms(),
            message_timeout_ms: ProducerConfig::default_message_timeout_ms(),
            linger_ms: ProducerConfig::default_linger_ms(),
            acks: Acks::default(),
            compression: Compression::default(),
            enable_idempotence: false,
        }
    }
}

/// Acks policy for the producer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Acks {
    /// `acks=0`
    None,
    /// `acks=1`
    One,
    /// `acks=all`
    #[default]
    All,
}

impl Acks {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "0",
            Self::One => "1",
            Self::All => "all",
        }
    }
}

/// Record batch compression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    None,
    Gzip,
    Snappy,
    Lz4,
    Zstd,
}

impl Compression {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Snappy => "snappy",
            Self::Lz4 => "lz4",
            Self::Zstd => "zstd",
        }
    }
}

/// Consumer tuning (mapped to broker client consumer options).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumerConfig {
    /// Where a new group starts reading.
    #[serde(default)]
    pub auto_offset_reset: OffsetReset,
    /// Group session timeout (ms).
    #[serde(default = "ConsumerConfig::default_session_timeout_ms")]
    pub session_timeout_ms: u32,
    /// Interval between automatic offset commits (ms).
    #[serde(default = "ConsumerConfig::default_auto_commit_interval_ms")]
    pub auto_commit_interval_ms: u32,
    /// Records buffered between the broker client and a subscription.
    #[serde(default = "ConsumerConfig::default_channel_capacity")]
    pub channel_capacity: usize,
}

impl ConsumerConfig {
    #[inline]
    fn default_session_timeout_ms() -> u32 {
        10_000
    }

    #[inline]
    fn default_auto_commit_interval_ms() -> u32 {
        5_000
    }

    #[inline]
    fn default_channel_capacity() -> usize {
        crate::DEFAULT_CHANNEL_CAPACITY
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session_timeout_ms == 0 {
            return Err(ConfigError::ZeroValue {
                field: "session_timeout_ms",
            });
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroValue {
                field: "channel_capacity",
            });
        }
        Ok(())
    }

    /// Builder-style method to set the offset reset policy
    pub fn with_offset_reset(mut self, reset: OffsetReset) -> Self {
        self.auto_offset_reset = reset;
        self
    }
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            auto_offset_reset: OffsetReset::default(),
            session_timeout_ms: ConsumerConfig::default_session_timeout_ms(),
            auto_commit_interval_ms: ConsumerConfig::default_auto_commit_interval_ms(),
            channel_capacity: ConsumerConfig::default_channel_capacity(),
        }
    }
}

/// Starting position for a group with no committed offset.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OffsetReset {
    Earliest,
    #[default]
    Latest,
}

impl OffsetReset {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Earliest => "earliest",
            Self::Latest => "latest",
        }
    }
}

impl std::str::FromStr for OffsetReset {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "earliest" => Ok(Self::Earliest),
            "latest" => Ok(Self::Latest),
            other => Err(ConfigError::InvalidValue {
                field: "auto_offset_reset",
                value: other.to_string(),
            }),
        }
    }
}

/// Everything a process needs to publish and subscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusConfig {
    pub broker: BrokerConfig,
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

impl BusConfig {
    pub fn new(broker: BrokerConfig) -> Self {
        Self {
            broker,
            producer: ProducerConfig::default(),
            consumer: ConsumerConfig::default(),
        }
    }

    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BUS_SEED_ADDRESSES`: Broker seeds (default: localhost:9092)
    /// - `BUS_GROUP_ID`: Consumer group (default: typed-bus)
    /// - `BUS_FLUSH_TIMEOUT_MS`: Disposal flush bound (default: 5000)
    /// - `BUS_MESSAGE_TIMEOUT_MS`: Delivery timeout (default: 30000)
    /// - `BUS_AUTO_OFFSET_RESET`: earliest | latest (default: latest)
    pub fn from_env() -> Result<Self, ConfigError> {
        let broker = BrokerConfig::new(
            env::var("BUS_SEED_ADDRESSES").unwrap_or_else(|_| "localhost:9092".to_string()),
            env::var("BUS_GROUP_ID").unwrap_or_else(|_| "typed-bus".to_string()),
        );

        let mut config = Self::new(broker);

        if let Some(v) = env_u64("BUS_FLUSH_TIMEOUT_MS")? {
            config.producer.flush_timeout_ms = v;
        }
        if let Some(v) = env_u64("BUS_MESSAGE_TIMEOUT_MS")? {
            config.producer.message_timeout_ms = v;
        }
        if let Ok(v) = env::var("BUS_AUTO_OFFSET_RESET") {
            config.consumer.auto_offset_reset = v.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.broker.validate()?;
        self.producer.validate()?;
        self.consumer.validate()
    }
}

fn env_u64(name: &'static str) -> Result<Option<u64>, ConfigError> {
    match env::var(name) {
        Ok(v) => v
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { field: name, value: v }),
        Err(_) => Ok(None),
    }
}
