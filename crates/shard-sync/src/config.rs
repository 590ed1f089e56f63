//! # Service Configuration
//!
//! Configuration for the Synchronizer and Simulator services.

use serde::{Deserialize, Serialize};
use shared_bus::DEFAULT_INBOX_CAPACITY;
use shared_types::ShardId;
use std::time::Duration;

/// Default length of a period in main-chain blocks.
pub const DEFAULT_PERIOD_LENGTH: u64 = 5;

/// Default capacity of a service's error queue.
pub const DEFAULT_ERROR_CAPACITY: usize = 64;

/// Default size of simulated transaction payloads.
pub const DEFAULT_TX_PAYLOAD_SIZE: usize = 1024;

/// Synchronizer configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SyncerConfig {
    /// Shard whose collations this node serves.
    pub shard_id: ShardId,

    /// Capacity of the request inbox.
    pub inbox_capacity: usize,

    /// Capacity of the error queue. Reports block when it is full.
    pub error_capacity: usize,
}

impl Default for SyncerConfig {
    fn default() -> Self {
        Self {
            shard_id: 0,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
            error_capacity: DEFAULT_ERROR_CAPACITY,
        }
    }
}

impl SyncerConfig {
    /// Create a config for testing (smaller queues).
    pub fn for_testing(shard_id: ShardId) -> Self {
        Self {
            shard_id,
            inbox_capacity: 8,
            error_capacity: 8,
        }
    }
}

/// Simulator configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Shard the simulated requests target.
    pub shard_id: ShardId,

    /// Main-chain blocks per period. Must be non-zero.
    pub period_length: u64,

    /// Interval between simulated requests and broadcasts, in milliseconds.
    pub delay_ms: u64,

    /// Size of the random payload of each simulated transaction.
    pub tx_payload_size: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            shard_id: 0,
            period_length: DEFAULT_PERIOD_LENGTH,
            delay_ms: 1000,
            tx_payload_size: DEFAULT_TX_PAYLOAD_SIZE,
        }
    }
}

impl SimulatorConfig {
    /// Create a config for testing (fast ticks, small payloads).
    pub fn for_testing(shard_id: ShardId, period_length: u64) -> Self {
        Self {
            shard_id,
            period_length,
            delay_ms: 10,
            tx_payload_size: 32,
        }
    }

    /// Tick interval.
    #[must_use]
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}
