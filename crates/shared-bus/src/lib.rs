//! # Shared Bus - Peer Feed
//!
//! Typed publish/subscribe transport connecting node services to remote
//! peers, keyed by message type.
//!
//! ## Feed Model
//!
//! ```text
//!  ┌────────────┐  publish(kind, msg)  ┌──────────────┐   Inbox   ┌────────────┐
//!  │ Simulator  │ ───────────────────→ │   PeerFeed   │ ────────→ │  Syncer    │
//!  └────────────┘                      │              │           └─────┬──────┘
//!                                      │  subscriber  │                 │
//!                                      │    table     │ ←───────────────┘
//!                                      └──────┬───────┘  send_direct(res, peer)
//!                                             │
//!                                             ▼ Outbound (transport adapters)
//! ```
//!
//! ## Guarantees
//!
//! - Delivery to every live subscriber of a kind; no ordering across subscribers.
//! - `SubscriptionHandle::unsubscribe` takes effect at most once.
//! - A failed subscription is reported through `SubscriptionHandle::error_signal`.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod feed;
pub mod subscription;

// Re-export main types
pub use feed::{FeedError, InMemoryPeerFeed, Outbound, PeerFeed};
pub use subscription::{Inbox, SubscriptionError, SubscriptionHandle};

/// Inbox capacity used by services that do not configure one.
pub const DEFAULT_INBOX_CAPACITY: usize = 100;

/// Buffered outbound messages per transport observer before it lags.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 1000;
