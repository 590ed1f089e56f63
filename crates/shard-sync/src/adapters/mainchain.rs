//! # In-Memory Main Chain
//!
//! A settable main-chain head plus a table of collation records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use sha3::{Digest, Keccak256};
use shared_types::{BlockHeader, CollationRecord, FetchError, Period, ShardId};

use crate::ports::{ChainReader, CollationRecords};

/// Main chain driven by tests and the node's development mode.
#[derive(Default)]
pub struct MockMainchain {
    /// Current head height.
    height: AtomicU64,
    /// Collation records by `(shard_id, period)`.
    records: RwLock<HashMap<(ShardId, Period), CollationRecord>>,
    /// When set, every lookup fails with `Unavailable`.
    unavailable: AtomicBool,
}

impl MockMainchain {
    /// Create a chain whose head is at `height`.
    #[must_use]
    pub fn new(height: u64) -> Self {
        Self {
            height: AtomicU64::new(height),
            ..Default::default()
        }
    }

    /// Current head height.
    #[must_use]
    pub fn height(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    /// Move the head to `height`.
    pub fn set_height(&self, height: u64) {
        self.height.store(height, Ordering::SeqCst);
    }

    /// Advance the head by one block and return the new height.
    pub fn advance(&self) -> u64 {
        self.height.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Record a collation for `(shard_id, period)`.
    pub fn add_record(&self, shard_id: ShardId, period: Period, record: CollationRecord) {
        self.records.write().insert((shard_id, period), record);
    }

    /// Toggle simulated unavailability.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), FetchError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(FetchError::Unavailable("main chain unreachable".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainReader for MockMainchain {
    async fn current_block(&self) -> Result<BlockHeader, FetchError> {
        self.check_available()?;
        let number = self.height.load(Ordering::SeqCst);
        Ok(BlockHeader {
            number,
            hash: Keccak256::digest(number.to_be_bytes()).into(),
            timestamp: number,
        })
    }
}

#[async_trait]
impl CollationRecords for MockMainchain {
    async fn collation_record(
        &self,
        shard_id: ShardId,
        period: Period,
    ) -> Result<Option<CollationRecord>, FetchError> {
        self.check_available()?;
        Ok(self.records.read().get(&(shard_id, period)).copied())
    }
}
