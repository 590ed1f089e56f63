//! # Ports
//!
//! Chain-data capabilities the services consume. Implementations live in
//! `adapters` (in-memory) or in the main-chain client and shard database.

pub mod outbound;

pub use outbound::{ChainReader, CollationFetcher, CollationRecords};
