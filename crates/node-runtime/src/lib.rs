//! # Node Runtime Library
//!
//! This library exposes the internal modules of the node runtime for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `registry/` - Ordered service registry (start/stop as one unit)
//! - `runtime/` - Node lifecycle, shutdown gate, interrupt escalation
//! - `container/` - Configuration and service wiring
//! - `logging` - Subscriber setup for the binary

#![warn(missing_docs)]

pub mod container;
pub mod logging;
pub mod registry;
pub mod runtime;

// Re-export the lifecycle types for easy access
pub use container::{ConfigError, NodeConfig, ServiceContainer};
pub use registry::ServiceRegistry;
pub use runtime::interrupts::{
    AbortProcess, ChannelInterrupts, ForcedExit, InterruptSource, InterruptTrigger, OsSignals,
};
pub use runtime::{NodeRuntime, NodeState, RuntimeError};
