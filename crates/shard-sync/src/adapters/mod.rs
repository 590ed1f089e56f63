//! # Adapters
//!
//! In-memory implementations of the outbound ports. Used by the node binary
//! until a main-chain client and shard database are wired in, and by tests.

pub mod mainchain;
pub mod shard_store;

pub use mainchain::MockMainchain;
pub use shard_store::{InMemoryShardStore, ShardView};
