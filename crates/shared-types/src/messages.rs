//! # Peer Messages
//!
//! Wire-level message shapes exchanged over the shard p2p feed, and the
//! `PeerMessage` envelope pairing a payload with a peer.
//!
//! The byte encoding of these payloads belongs to the transport layer.

use serde::{Deserialize, Serialize};

use crate::entities::{Address, Hash, Peer, Period, ShardId};

/// Request for the body of the collation proposed for `(shard_id, period)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollationBodyRequest {
    /// Shard of the requested collation.
    pub shard_id: ShardId,
    /// Period of the requested collation.
    pub period: Period,
    /// Chunk root from the main-chain collation record.
    pub chunk_root: Hash,
    /// Proposer from the main-chain collation record.
    pub proposer: Address,
}

/// Response carrying a collation body and the hash of its header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollationBodyResponse {
    /// Hash of the collation header the body belongs to.
    pub header_hash: Hash,
    /// The collation body.
    pub body: Vec<u8>,
}

/// A transaction gossiped to every peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionBroadcast {
    /// Opaque transaction bytes.
    pub payload: Vec<u8>,
}

/// Message type key used to route payloads to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// `CollationBodyRequest`
    CollationBodyRequest,
    /// `CollationBodyResponse`
    CollationBodyResponse,
    /// `TransactionBroadcast`
    TransactionBroadcast,
}

impl MessageKind {
    /// Name used in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollationBodyRequest => "collation-body-request",
            Self::CollationBodyResponse => "collation-body-response",
            Self::TransactionBroadcast => "transaction-broadcast",
        }
    }
}

/// Any payload that can travel over the feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// A notary asking for a collation body.
    CollationBodyRequest(CollationBodyRequest),
    /// A collation body sent back to the peer that asked.
    CollationBodyResponse(CollationBodyResponse),
    /// A transaction gossiped to every peer.
    TransactionBroadcast(TransactionBroadcast),
}

impl Payload {
    /// The routing key of this payload.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::CollationBodyRequest(_) => MessageKind::CollationBodyRequest,
            Self::CollationBodyResponse(_) => MessageKind::CollationBodyResponse,
            Self::TransactionBroadcast(_) => MessageKind::TransactionBroadcast,
        }
    }
}

impl From<CollationBodyRequest> for Payload {
    fn from(req: CollationBodyRequest) -> Self {
        Self::CollationBodyRequest(req)
    }
}

impl From<CollationBodyResponse> for Payload {
    fn from(res: CollationBodyResponse) -> Self {
        Self::CollationBodyResponse(res)
    }
}

impl From<TransactionBroadcast> for Payload {
    fn from(tx: TransactionBroadcast) -> Self {
        Self::TransactionBroadcast(tx)
    }
}

/// Envelope pairing a payload with the peer it came from or goes to.
///
/// `data == None` is an empty envelope; responders skip it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerMessage {
    /// Originating (inbound) or destination (outbound) peer.
    pub peer: Peer,
    /// The payload, if any.
    pub data: Option<Payload>,
}

impl PeerMessage {
    /// Envelope for a payload from or to `peer`.
    pub fn new(peer: Peer, data: impl Into<Payload>) -> Self {
        Self {
            peer,
            data: Some(data.into()),
        }
    }

    /// An envelope without payload.
    #[must_use]
    pub fn empty(peer: Peer) -> Self {
        Self { peer, data: None }
    }

    /// Routing key of the payload, if present.
    #[must_use]
    pub fn kind(&self) -> Option<MessageKind> {
        self.data.as_ref().map(Payload::kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::PeerId;

    fn request() -> CollationBodyRequest {
        CollationBodyRequest {
            shard_id: 1,
            period: 2,
            chunk_root: [3u8; 32],
            proposer: [4u8; 20],
        }
    }

    #[test]
    fn test_payload_kind() {
        assert_eq!(
            Payload::from(request()).kind(),
            MessageKind::CollationBodyRequest
        );
        let tx = TransactionBroadcast { payload: vec![1] };
        assert_eq!(Payload::from(tx).kind(), MessageKind::TransactionBroadcast);
    }

    #[test]
    fn test_empty_envelope_has_no_kind() {
        let msg = PeerMessage::empty(Peer::new(PeerId([9u8; 32])));
        assert!(msg.data.is_none());
        assert_eq!(msg.kind(), None);
    }

    #[test]
    fn test_envelope_serializes() {
        let msg = PeerMessage::new(Peer::anonymous(), request());
        let json = serde_json::to_string(&msg).unwrap();
        let back: PeerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }
}
