//! # Peer Feed
//!
//! Defines the publishing side of the feed and the in-memory implementation
//! used by a single node process.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{MessageKind, Payload, Peer, PeerMessage};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, warn};

use crate::subscription::{Inbox, SubscriptionError, SubscriptionHandle, SubscriptionState};
use crate::DEFAULT_OUTBOUND_CAPACITY;

/// Errors from feed operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FeedError {
    /// The feed no longer accepts subscriptions.
    #[error("peer feed closed")]
    Closed,

    /// An inbox needs room for at least one message.
    #[error("inbox capacity must be non-zero")]
    ZeroCapacity,
}

/// Message leaving this node, as handed to the transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Unicast to exactly one peer.
    Direct { peer: Peer, payload: Payload },
    /// Gossip to every connected peer.
    Broadcast(Payload),
}

/// Trait services use to talk to the shard p2p network.
#[async_trait]
pub trait PeerFeed: Send + Sync {
    /// Register for messages of `kind`, buffered in an inbox of `capacity`.
    fn subscribe(
        &self,
        kind: MessageKind,
        capacity: usize,
    ) -> Result<(Inbox, SubscriptionHandle), FeedError>;

    /// Deliver `message` to every local subscriber of `kind`.
    ///
    /// Waits for room in each subscriber's inbox. Returns the number of
    /// subscribers that received the message.
    async fn publish(&self, kind: MessageKind, message: PeerMessage) -> usize;

    /// Send `payload` to `peer` only.
    async fn send_direct(&self, payload: Payload, peer: &Peer);

    /// Send `payload` to every peer.
    async fn broadcast(&self, payload: Payload);
}

#[derive(Debug)]
pub(crate) struct SubscriberEntry {
    id: u64,
    sender: mpsc::Sender<PeerMessage>,
    state: watch::Sender<SubscriptionState>,
}

/// Feed-side registrations, keyed by message kind.
#[derive(Debug, Default)]
pub(crate) struct SubscriberTable {
    entries: HashMap<MessageKind, Vec<SubscriberEntry>>,
    closed: bool,
}

impl SubscriberTable {
    /// Remove one registration, returning its state channel.
    pub(crate) fn remove(
        &mut self,
        kind: MessageKind,
        id: u64,
    ) -> Option<watch::Sender<SubscriptionState>> {
        let list = self.entries.get_mut(&kind)?;
        let position = list.iter().position(|entry| entry.id == id)?;
        let entry = list.swap_remove(position);
        if list.is_empty() {
            self.entries.remove(&kind);
        }
        Some(entry.state)
    }

    fn senders(&self, kind: MessageKind) -> Vec<(u64, mpsc::Sender<PeerMessage>)> {
        self.entries
            .get(&kind)
            .map(|list| {
                list.iter()
                    .map(|entry| (entry.id, entry.sender.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn fail_kind(&mut self, kind: MessageKind, error: &SubscriptionError) -> usize {
        let Some(list) = self.entries.remove(&kind) else {
            return 0;
        };
        let count = list.len();
        for entry in list {
            entry
                .state
                .send_replace(SubscriptionState::Failed(error.clone()));
        }
        count
    }
}

/// In-memory peer feed.
///
/// Local subscribers are served from a subscriber table; unicast and
/// broadcast traffic is emitted as [`Outbound`] for transport adapters
/// listening on [`InMemoryPeerFeed::outbound`].
pub struct InMemoryPeerFeed {
    /// Registrations by message kind.
    table: Arc<RwLock<SubscriberTable>>,

    /// Next subscription id.
    next_id: AtomicU64,

    /// Outbound traffic for the transport layer.
    outbound: broadcast::Sender<Outbound>,

    /// Total messages published to local subscribers.
    messages_published: AtomicU64,

    /// Total unicast sends.
    direct_sends: AtomicU64,

    /// Total broadcasts.
    broadcasts: AtomicU64,
}

impl InMemoryPeerFeed {
    /// Create a feed with the default outbound buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::with_outbound_capacity(DEFAULT_OUTBOUND_CAPACITY)
    }

    /// Create a feed with a specific outbound buffer.
    #[must_use]
    pub fn with_outbound_capacity(capacity: usize) -> Self {
        let (outbound, _) = broadcast::channel(capacity.max(1));
        Self {
            table: Arc::new(RwLock::new(SubscriberTable::default())),
            next_id: AtomicU64::new(1),
            outbound,
            messages_published: AtomicU64::new(0),
            direct_sends: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
        }
    }

    /// Observe traffic leaving this node.
    #[must_use]
    pub fn outbound(&self) -> broadcast::Receiver<Outbound> {
        self.outbound.subscribe()
    }

    /// Number of live subscriptions for `kind`.
    #[must_use]
    pub fn subscriber_count(&self, kind: MessageKind) -> usize {
        self.table
            .read()
            .entries
            .get(&kind)
            .map_or(0, Vec::len)
    }

    /// Report every subscription of `kind` as failed and drop it.
    ///
    /// Returns the number of subscriptions affected.
    pub fn fail_subscriptions(&self, kind: MessageKind, reason: &str) -> usize {
        let error = SubscriptionError::Failed(reason.to_string());
        let failed = self.table.write().fail_kind(kind, &error);
        warn!(kind = kind.name(), failed, reason, "Failing feed subscriptions");
        failed
    }

    /// Close the feed: fail every subscription and refuse new ones.
    pub fn close(&self) {
        let mut table = self.table.write();
        if table.closed {
            return;
        }
        table.closed = true;
        let kinds: Vec<MessageKind> = table.entries.keys().copied().collect();
        for kind in kinds {
            table.fail_kind(kind, &SubscriptionError::FeedClosed);
        }
        debug!("Peer feed closed");
    }

    /// Whether `close` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.table.read().closed
    }

    /// Total messages published.
    #[must_use]
    pub fn messages_published(&self) -> u64 {
        self.messages_published.load(Ordering::Relaxed)
    }

    /// Total unicast sends.
    #[must_use]
    pub fn direct_sends(&self) -> u64 {
        self.direct_sends.load(Ordering::Relaxed)
    }

    /// Total broadcasts.
    #[must_use]
    pub fn broadcasts(&self) -> u64 {
        self.broadcasts.load(Ordering::Relaxed)
    }

    fn emit(&self, outbound: Outbound) {
        if let Err(e) = self.outbound.send(outbound) {
            debug!(error = %e, "Outbound message dropped (no transport attached)");
        }
    }
}

impl Default for InMemoryPeerFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PeerFeed for InMemoryPeerFeed {
    fn subscribe(
        &self,
        kind: MessageKind,
        capacity: usize,
    ) -> Result<(Inbox, SubscriptionHandle), FeedError> {
        if capacity == 0 {
            return Err(FeedError::ZeroCapacity);
        }

        let mut table = self.table.write();
        if table.closed {
            return Err(FeedError::Closed);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(capacity);
        let (state, state_rx) = watch::channel(SubscriptionState::Active);
        table
            .entries
            .entry(kind)
            .or_default()
            .push(SubscriberEntry { id, sender, state });
        drop(table);

        debug!(kind = kind.name(), id, capacity, "New feed subscription");

        Ok((
            Inbox::new(kind, receiver),
            SubscriptionHandle::new(id, kind, Arc::downgrade(&self.table), state_rx),
        ))
    }

    async fn publish(&self, kind: MessageKind, message: PeerMessage) -> usize {
        if let Some(actual) = message.kind() {
            if actual != kind {
                warn!(
                    expected = kind.name(),
                    actual = actual.name(),
                    "Refusing to publish payload on a feed of another kind"
                );
                return 0;
            }
        }

        self.messages_published.fetch_add(1, Ordering::Relaxed);

        // Never hold the table lock across a delivery.
        let senders = self.table.read().senders(kind);

        let mut delivered = 0;
        for (id, sender) in senders {
            match sender.send(message.clone()).await {
                Ok(()) => delivered += 1,
                Err(_) => debug!(kind = kind.name(), id, "Subscriber inbox closed, skipping"),
            }
        }

        debug!(kind = kind.name(), receivers = delivered, "Message published");
        delivered
    }

    async fn send_direct(&self, payload: Payload, peer: &Peer) {
        self.direct_sends.fetch_add(1, Ordering::Relaxed);
        debug!(kind = payload.kind().name(), %peer, "Direct send");
        self.emit(Outbound::Direct {
            peer: *peer,
            payload,
        });
    }

    async fn broadcast(&self, payload: Payload) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        debug!(kind = payload.kind().name(), "Broadcast");
        self.emit(Outbound::Broadcast(payload));
    }
}
