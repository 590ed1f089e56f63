//! # Shard Store
//!
//! In-memory collation storage and the per-shard view served by the
//! Synchronizer.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{Collation, FetchError, Period, ShardId};

use crate::ports::CollationFetcher;

/// Collations keyed by `(shard_id, period)`.
#[derive(Default)]
pub struct InMemoryShardStore {
    collations: RwLock<HashMap<(ShardId, Period), Collation>>,
}

impl InMemoryShardStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a collation, replacing any previous one for the same pair.
    pub fn insert(&self, collation: Collation) {
        let key = (collation.header.shard_id, collation.header.period);
        self.collations.write().insert(key, collation);
    }

    /// Number of stored collations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.collations.read().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.collations.read().is_empty()
    }
}

#[async_trait]
impl CollationFetcher for InMemoryShardStore {
    async fn fetch(&self, shard_id: ShardId, period: Period) -> Result<Collation, FetchError> {
        self.collations
            .read()
            .get(&(shard_id, period))
            .cloned()
            .ok_or(FetchError::NotFound { shard_id, period })
    }
}

/// A store seen through one shard.
///
/// Lookups for any other shard fail with `NotFound`: a node only serves
/// collations of the shard it tracks.
#[derive(Clone)]
pub struct ShardView {
    shard_id: ShardId,
    store: Arc<dyn CollationFetcher>,
}

impl ShardView {
    /// Bind `store` to `shard_id`.
    pub fn new(shard_id: ShardId, store: Arc<dyn CollationFetcher>) -> Self {
        Self { shard_id, store }
    }

    /// The tracked shard.
    #[must_use]
    pub fn shard_id(&self) -> ShardId {
        self.shard_id
    }
}

#[async_trait]
impl CollationFetcher for ShardView {
    async fn fetch(&self, shard_id: ShardId, period: Period) -> Result<Collation, FetchError> {
        if shard_id != self.shard_id {
            return Err(FetchError::NotFound { shard_id, period });
        }
        self.store.fetch(shard_id, period).await
    }
}
