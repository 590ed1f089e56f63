//! # Shard Sync
//!
//! Background services that keep a shard node in step with its peers.
//!
//! ## Services
//!
//! - **Synchronizer** (`syncer`): answers `CollationBodyRequest`s arriving on
//!   the peer feed with a `CollationBodyResponse` sent only to the asking peer.
//! - **Simulator** (`simulator`): emits synthetic notary requests and random
//!   transaction broadcasts on a timer. Bootstrap and test aid.
//!
//! Both implement `shared_types::Service` and are owned by the node runtime's
//! service registry.
//!
//! ## Module Structure
//!
//! ```text
//! shard-sync/
//! ├── ports/       # Chain-data capabilities consumed by the services
//! ├── adapters/    # In-memory shard store and main chain
//! └── service/     # Synchronizer, Simulator, per-service error sink
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod config;
pub mod error;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{InMemoryShardStore, MockMainchain, ShardView};
pub use config::{SimulatorConfig, SyncerConfig};
pub use error::{SimulatorError, SyncError};
pub use ports::{ChainReader, CollationFetcher, CollationRecords};
pub use service::{
    error_channel, period_for_height, respond_collation_body, ErrorSink, Simulator, Synchronizer,
};
