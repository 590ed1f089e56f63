//! # Core Domain Entities
//!
//! ## Clusters
//!
//! - **Main chain**: `BlockHeader`, `CollationRecord`
//! - **Shard chain**: `CollationHeader`, `Collation`
//! - **Networking**: `PeerId`, `Peer`

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use std::fmt;

// =============================================================================
// PRIMITIVES
// =============================================================================

/// A 32-byte Keccak-256 hash.
pub type Hash = [u8; 32];

/// A 20-byte Ethereum-style address.
pub type Address = [u8; 20];

/// Identifier of a shard.
pub type ShardId = u64;

/// A period number: `block_number / period_length`.
pub type Period = u64;

// =============================================================================
// MAIN CHAIN
// =============================================================================

/// Header of a main-chain block, as seen through the chain reader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BlockHeader {
    /// Block height. Monotonically increasing.
    pub number: u64,
    /// Block hash.
    pub hash: Hash,
    /// Unix timestamp of the block.
    pub timestamp: u64,
}

/// Main-chain record stating that a collation was proposed for a
/// `(shard_id, period)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CollationRecord {
    /// Root of the collation body chunks.
    pub chunk_root: Hash,
    /// Proposer that submitted the collation header.
    pub proposer: Address,
}

// =============================================================================
// SHARD CHAIN
// =============================================================================

/// Header of a collation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct CollationHeader {
    /// Shard the collation belongs to.
    pub shard_id: ShardId,
    /// Period the collation was proposed in.
    pub period: Period,
    /// Root of the body chunks.
    pub chunk_root: Hash,
    /// Address of the proposer.
    pub proposer: Address,
}

impl CollationHeader {
    /// Keccak-256 over the big-endian encoding of
    /// `shard_id || period || chunk_root || proposer`.
    #[must_use]
    pub fn hash(&self) -> Hash {
        let mut hasher = Keccak256::new();
        hasher.update(self.shard_id.to_be_bytes());
        hasher.update(self.period.to_be_bytes());
        hasher.update(self.chunk_root);
        hasher.update(self.proposer);
        hasher.finalize().into()
    }
}

/// A batch of shard transactions bundled for one shard at one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Collation {
    /// The collation header.
    pub header: CollationHeader,
    /// Raw collation body.
    pub body: Vec<u8>,
}

impl Collation {
    /// Create a collation from its parts.
    pub fn new(header: CollationHeader, body: Vec<u8>) -> Self {
        Self { header, body }
    }

    /// Hash of the collation header.
    #[must_use]
    pub fn header_hash(&self) -> Hash {
        self.header.hash()
    }
}

// =============================================================================
// NETWORKING
// =============================================================================

/// Unique identifier of a remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct PeerId(pub [u8; 32]);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0[..8]))
    }
}

/// A peer on the shard p2p network.
///
/// `id == None` is the anonymous peer: messages originated locally and
/// addressed to nobody in particular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct Peer {
    /// Identity of the peer, if known.
    pub id: Option<PeerId>,
}

impl Peer {
    /// A peer with a known identity.
    #[must_use]
    pub fn new(id: PeerId) -> Self {
        Self { id: Some(id) }
    }

    /// The anonymous peer.
    #[must_use]
    pub fn anonymous() -> Self {
        Self { id: None }
    }

    /// Whether this is the anonymous peer.
    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.id.is_none()
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            Some(id) => write!(f, "{id}"),
            None => write!(f, "anonymous"),
        }
    }
}
