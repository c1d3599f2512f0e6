//! Tuner configuration
//!
//! Check thresholds and capture bounds, overridable through `NBT_*`
//! environment variables (e.g. `NBT_CAPACITY_FLOOR=200`).

use anyhow::Result;
use serde::Deserialize;
use std::time::Duration;
use tuner_lib::{CaptureConfig, Thresholds};

/// Tuner configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TunerConfig {
    /// Per-read timeout for parameter and telemetry reads, in milliseconds
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Upper bound on sampled connections
    #[serde(default = "default_connection_sample_limit")]
    pub connection_sample_limit: usize,

    /// Smallest sane per-socket buffer minimum, in bytes
    #[serde(default = "default_min_floor")]
    pub min_floor: i64,

    /// Assumed typical message size, in bytes
    #[serde(default = "default_assumed_message_size")]
    pub assumed_message_size: i64,

    /// Fewest connections the host should sustain at full buffer use
    #[serde(default = "default_capacity_floor")]
    pub capacity_floor: i64,

    /// Page size used to convert tcp_mem pages to bytes
    #[serde(default = "default_page_size")]
    pub page_size: i64,
}

fn default_read_timeout_ms() -> u64 {
    250
}

fn default_connection_sample_limit() -> usize {
    50
}

fn default_min_floor() -> i64 {
    Thresholds::default().min_floor
}

fn default_assumed_message_size() -> i64 {
    Thresholds::default().assumed_message_size
}

fn default_capacity_floor() -> i64 {
    Thresholds::default().capacity_floor
}

fn default_page_size() -> i64 {
    Thresholds::default().page_size
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            read_timeout_ms: default_read_timeout_ms(),
            connection_sample_limit: default_connection_sample_limit(),
            min_floor: default_min_floor(),
            assumed_message_size: default_assumed_message_size(),
            capacity_floor: default_capacity_floor(),
            page_size: default_page_size(),
        }
    }
}

impl TunerConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("NBT"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_default())
    }

    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            read_timeout: Duration::from_millis(self.read_timeout_ms),
            connection_sample_limit: self.connection_sample_limit,
        }
    }

    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            min_floor: self.min_floor,
            assumed_message_size: self.assumed_message_size,
            capacity_floor: self.capacity_floor,
            page_size: self.page_size,
            ..Thresholds::default()
        }
    }
}
