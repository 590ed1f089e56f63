//! # Service Container
//!
//! Holds the shared peer feed, the chain-data adapters and the service
//! instances built on top of them.
//!
//! ## Wiring
//!
//! ```text
//! InMemoryPeerFeed ◄──── Synchronizer ────► ShardView(InMemoryShardStore)
//!        ▲
//!        └────────────── Simulator ───────► MockMainchain
//! ```

pub mod config;
pub mod services;

pub use config::{ConfigError, LoggingConfig, NodeConfig, RuntimeConfig};
pub use services::ServiceContainer;
