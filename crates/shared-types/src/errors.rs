//! # Error Types
//!
//! Errors raised by the chain-data capabilities consumed by services.

use thiserror::Error;

use crate::entities::{Period, ShardId};

/// Errors from chain or collation lookups. Always transient from the
/// caller's point of view: the request or tick is skipped, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// No collation is known for the pair.
    #[error("collation not found: shard {shard_id}, period {period}")]
    NotFound { shard_id: ShardId, period: Period },

    /// The backing chain or database could not be reached.
    #[error("chain data unavailable: {0}")]
    Unavailable(String),
}

impl FetchError {
    /// Whether the lookup failed because nothing exists for the key.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
