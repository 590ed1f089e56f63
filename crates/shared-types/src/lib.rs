//! # Shared Types Crate
//!
//! Domain entities, peer wire messages and the `Service` contract used by
//! every crate in the shard node.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: All cross-crate types are defined here.
//! - **Envelope Identity**: The `PeerMessage` envelope carries the peer a
//!   message came from (or goes to). Payloads never repeat it.
//! - **Narrow Capabilities**: Services only see the `Service` trait; the
//!   runtime never needs to know what a service does.

pub mod entities;
pub mod errors;
pub mod messages;
pub mod service;

pub use entities::*;
pub use errors::*;
pub use messages::*;
pub use service::{Service, ServiceError, ServiceErrorKind, ServiceStatus};
