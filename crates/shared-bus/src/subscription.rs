//! # Subscriptions
//!
//! The receiving side of the feed: a bounded `Inbox` plus a
//! `SubscriptionHandle` that owns the feed-side registration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Weak;

use parking_lot::RwLock;
use shared_types::{MessageKind, PeerMessage};
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::{debug, warn};

use crate::feed::SubscriberTable;

/// Reasons a subscription can fail from the feed side.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The feed was closed.
    #[error("peer feed closed")]
    FeedClosed,

    /// The feed dropped the subscription.
    #[error("subscription failed: {0}")]
    Failed(String),
}

/// Lifecycle of one registration, as published by the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SubscriptionState {
    Active,
    Failed(SubscriptionError),
    Unsubscribed,
}

/// Bounded queue of messages delivered to one subscriber.
#[derive(Debug)]
pub struct Inbox {
    kind: MessageKind,
    receiver: mpsc::Receiver<PeerMessage>,
}

impl Inbox {
    pub(crate) fn new(kind: MessageKind, receiver: mpsc::Receiver<PeerMessage>) -> Self {
        Self { kind, receiver }
    }

    /// Receive the next message.
    ///
    /// Returns `None` once the inbox is closed and drained.
    pub async fn recv(&mut self) -> Option<PeerMessage> {
        self.receiver.recv().await
    }

    /// Receive a message if one is buffered.
    pub fn try_recv(&mut self) -> Option<PeerMessage> {
        self.receiver.try_recv().ok()
    }

    /// Stop accepting new messages. Buffered messages stay readable.
    pub fn close(&mut self) {
        self.receiver.close();
    }

    /// The message kind this inbox receives.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }
}

/// Handle to an active registration on the feed.
///
/// Must be released with [`SubscriptionHandle::unsubscribe`]. Dropping an
/// unreleased handle releases it too, but logs a warning.
#[derive(Debug)]
pub struct SubscriptionHandle {
    id: u64,
    kind: MessageKind,
    table: Weak<RwLock<SubscriberTable>>,
    state: watch::Receiver<SubscriptionState>,
    released: AtomicBool,
}

impl SubscriptionHandle {
    pub(crate) fn new(
        id: u64,
        kind: MessageKind,
        table: Weak<RwLock<SubscriberTable>>,
        state: watch::Receiver<SubscriptionState>,
    ) -> Self {
        Self {
            id,
            kind,
            table,
            state,
            released: AtomicBool::new(false),
        }
    }

    /// Release the feed-side registration.
    ///
    /// Only the first call has an effect and returns `true`.
    pub fn unsubscribe(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }

        if let Some(table) = self.table.upgrade() {
            if let Some(state) = table.write().remove(self.kind, self.id) {
                state.send_replace(SubscriptionState::Unsubscribed);
            }
        }

        debug!(kind = self.kind.name(), id = self.id, "Unsubscribed from peer feed");
        true
    }

    /// Wait until the subscription ends.
    ///
    /// - `Some(error)` - the feed reported the subscription broken
    /// - `None` - the owner released it with `unsubscribe`
    pub async fn error_signal(&self) -> Option<SubscriptionError> {
        let mut state = self.state.clone();
        let outcome = match state
            .wait_for(|s| !matches!(s, SubscriptionState::Active))
            .await
        {
            Ok(current) => match &*current {
                SubscriptionState::Failed(err) => Some(err.clone()),
                _ => None,
            },
            // Sender gone without a final state: the feed itself was dropped.
            Err(_) => Some(SubscriptionError::FeedClosed),
        };

        if self.is_released() {
            return None;
        }
        outcome
    }

    /// Whether `unsubscribe` has been called.
    #[must_use]
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// The message kind of this subscription.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        if self.is_released() {
            return;
        }
        warn!(
            kind = self.kind.name(),
            id = self.id,
            "Subscription dropped without unsubscribe"
        );
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{InMemoryPeerFeed, PeerFeed};
    use shared_types::{Peer, TransactionBroadcast};
    use std::time::Duration;
    use tokio::time::timeout;

    fn tx_message() -> PeerMessage {
        PeerMessage::new(
            Peer::anonymous(),
            TransactionBroadcast {
                payload: vec![1, 2, 3],
            },
        )
    }

    #[tokio::test]
    async fn test_inbox_recv() {
        let feed = InMemoryPeerFeed::new();
        let (mut inbox, handle) = feed.subscribe(MessageKind::TransactionBroadcast, 4).unwrap();

        feed.publish(MessageKind::TransactionBroadcast, tx_message())
            .await;

        let received = timeout(Duration::from_millis(100), inbox.recv())
            .await
            .expect("timeout")
            .expect("message");
        assert_eq!(received, tx_message());
        assert!(handle.unsubscribe());
    }

    #[tokio::test]
    async fn test_unsubscribe_is_at_most_once() {
        let feed = InMemoryPeerFeed::new();
        let (_inbox, handle) = feed.subscribe(MessageKind::TransactionBroadcast, 4).unwrap();
        assert_eq!(feed.subscriber_count(MessageKind::TransactionBroadcast), 1);

        assert!(handle.unsubscribe());
        assert!(!handle.unsubscribe());
        assert!(!handle.unsubscribe());
        assert_eq!(feed.subscriber_count(MessageKind::TransactionBroadcast), 0);
    }

    #[tokio::test]
    async fn test_error_signal_none_after_unsubscribe() {
        let feed = InMemoryPeerFeed::new();
        let (_inbox, handle) = feed.subscribe(MessageKind::CollationBodyRequest, 4).unwrap();

        handle.unsubscribe();

        let signal = timeout(Duration::from_millis(100), handle.error_signal())
            .await
            .expect("signal should resolve once released");
        assert_eq!(signal, None);
    }

    #[tokio::test]
    async fn test_error_signal_reports_failure() {
        let feed = InMemoryPeerFeed::new();
        let (_inbox, handle) = feed.subscribe(MessageKind::CollationBodyRequest, 4).unwrap();

        feed.fail_subscriptions(MessageKind::CollationBodyRequest, "upstream closed");

        let signal = timeout(Duration::from_millis(100), handle.error_signal())
            .await
            .expect("timeout");
        assert_eq!(
            signal,
            Some(SubscriptionError::Failed("upstream closed".to_string()))
        );
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_error_signal_pending_while_active() {
        let feed = InMemoryPeerFeed::new();
        let (_inbox, handle) = feed.subscribe(MessageKind::CollationBodyRequest, 4).unwrap();

        let pending = timeout(Duration::from_millis(20), handle.error_signal()).await;
        assert!(pending.is_err());
        handle.unsubscribe();
    }

    #[tokio::test]
    async fn test_drop_releases_registration() {
        let feed = InMemoryPeerFeed::new();
        {
            let (_inbox, _handle) = feed.subscribe(MessageKind::TransactionBroadcast, 4).unwrap();
            assert_eq!(feed.subscriber_count(MessageKind::TransactionBroadcast), 1);
        }
        assert_eq!(feed.subscriber_count(MessageKind::TransactionBroadcast), 0);
    }

    #[tokio::test]
    async fn test_closed_inbox_keeps_buffered_messages() {
        let feed = InMemoryPeerFeed::new();
        let (mut inbox, handle) = feed.subscribe(MessageKind::TransactionBroadcast, 4).unwrap();

        feed.publish(MessageKind::TransactionBroadcast, tx_message())
            .await;
        inbox.close();

        assert_eq!(inbox.try_recv(), Some(tx_message()));
        assert_eq!(inbox.try_recv(), None);
        handle.unsubscribe();
    }
}
