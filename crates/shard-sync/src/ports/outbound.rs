//! # Outbound Ports
//!
//! Traits for external dependencies (main chain, shard database).

use async_trait::async_trait;
use shared_types::{BlockHeader, Collation, CollationRecord, FetchError, Period, ShardId};

/// Main-chain reader - outbound port.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Header of the current head block.
    async fn current_block(&self) -> Result<BlockHeader, FetchError>;
}

/// Collation lookup - outbound port.
#[async_trait]
pub trait CollationFetcher: Send + Sync {
    /// The collation for exactly `(shard_id, period)`.
    ///
    /// Returns `FetchError::NotFound` when none exists.
    async fn fetch(&self, shard_id: ShardId, period: Period) -> Result<Collation, FetchError>;
}

/// Main-chain collation records - outbound port.
#[async_trait]
pub trait CollationRecords: Send + Sync {
    /// The record of the collation proposed for `(shard_id, period)`, if any.
    async fn collation_record(
        &self,
        shard_id: ShardId,
        period: Period,
    ) -> Result<Option<CollationRecord>, FetchError>;
}
