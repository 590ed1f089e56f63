//! # Node Configuration
//!
//! Unified configuration for the services and runtime parameters.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. A JSON file (`SHARD_NODE_CONFIG`), if set
//! 3. `SHARD_NODE_*` environment variables

use std::path::Path;

use serde::{Deserialize, Serialize};
use shard_sync::config::{DEFAULT_ERROR_CAPACITY, DEFAULT_PERIOD_LENGTH, DEFAULT_TX_PAYLOAD_SIZE};
use shard_sync::{SimulatorConfig, SyncerConfig};
use shared_bus::DEFAULT_INBOX_CAPACITY;
use shared_types::ShardId;
use thiserror::Error;

/// Environment variable naming a JSON config file.
pub const CONFIG_PATH_ENV: &str = "SHARD_NODE_CONFIG";

/// Default number of extra interrupts tolerated before a forced exit.
pub const DEFAULT_INTERRUPT_BUDGET: u32 = 10;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid value {value:?} for {key}")]
    InvalidEnv {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },

    /// A value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// The config file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The config file is not valid JSON for `NodeConfig`.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Complete node configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Shard served by this node.
    pub sharding: ShardingConfig,
    /// Traffic simulator.
    pub simulator: SimulatorSettings,
    /// Runtime lifecycle.
    pub runtime: RuntimeConfig,
    /// Log output.
    pub logging: LoggingConfig,
}

/// Shard and synchronizer configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShardingConfig {
    /// Shard id this node serves.
    pub shard_id: ShardId,
    /// Main-chain blocks per period.
    pub period_length: u64,
    /// Synchronizer inbox capacity.
    pub inbox_capacity: usize,
    /// Synchronizer error queue capacity.
    pub error_capacity: usize,
}

impl Default for ShardingConfig {
    fn default() -> Self {
        Self {
            shard_id: 0,
            period_length: DEFAULT_PERIOD_LENGTH,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }
}

/// Simulator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Register the simulator service.
    pub enabled: bool,
    /// Tick interval in milliseconds.
    pub delay_ms: u64,
    /// Random payload size of simulated transactions.
    pub tx_payload_size: usize,
}

impl Default for SimulatorSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: 1000,
            tx_payload_size: DEFAULT_TX_PAYLOAD_SIZE,
        }
    }
}

/// Runtime lifecycle configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interrupts tolerated after the first one before the process is
    /// forcibly terminated.
    pub interrupt_budget: u32,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interrupt_budget: DEFAULT_INTERRUPT_BUDGET,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl NodeConfig {
    /// Load from defaults, the optional config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Apply `SHARD_NODE_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "SHARD_NODE_SHARD_ID")? {
            self.sharding.shard_id = v;
        }
        if let Some(v) = parse_var(&lookup, "SHARD_NODE_PERIOD_LENGTH")? {
            self.sharding.period_length = v;
        }
        if let Some(v) = parse_flag(&lookup, "SHARD_NODE_SIMULATOR")? {
            self.simulator.enabled = v;
        }
        if let Some(v) = parse_var(&lookup, "SHARD_NODE_SIMULATOR_DELAY_MS")? {
            self.simulator.delay_ms = v;
        }
        if let Some(v) = parse_var(&lookup, "SHARD_NODE_INTERRUPT_BUDGET")? {
            self.runtime.interrupt_budget = v;
        }
        if let Some(v) = lookup("SHARD_NODE_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Some(v) = parse_flag(&lookup, "SHARD_NODE_LOG_JSON")? {
            self.logging.json = v;
        }
        Ok(())
    }

    /// Reject values the services cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sharding.period_length == 0 {
            return Err(ConfigError::Invalid {
                field: "sharding.period_length",
                reason: "must be non-zero",
            });
        }
        if self.sharding.inbox_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "sharding.inbox_capacity",
                reason: "must be non-zero",
            });
        }
        if self.sharding.error_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "sharding.error_capacity",
                reason: "must be non-zero",
            });
        }
        if self.simulator.enabled && self.simulator.delay_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "simulator.delay_ms",
                reason: "must be non-zero when the simulator is enabled",
            });
        }
        Ok(())
    }

    /// Synchronizer settings derived from this config.
    pub fn syncer(&self) -> SyncerConfig {
        SyncerConfig {
            shard_id: self.sharding.shard_id,
            inbox_capacity: self.sharding.inbox_capacity,
            error_capacity: self.sharding.error_capacity,
        }
    }

    /// Simulator settings derived from this config.
    pub fn simulator(&self) -> SimulatorConfig {
        SimulatorConfig {
            shard_id: self.sharding.shard_id,
            period_length: self.sharding.period_length,
            delay_ms: self.simulator.delay_ms,
            tx_payload_size: self.simulator.tx_payload_size,
        }
    }
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => match value.trim().parse() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => Err(ConfigError::InvalidEnv { key, value }),
        },
    }
}

fn parse_flag<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(value) => match value.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(Some(true)),
            "0" | "false" | "no" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidEnv { key, value }),
        },
    }
}
