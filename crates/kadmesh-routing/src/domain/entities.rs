//! Core domain entities: node identifiers and peer descriptors.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// 256-bit node identifier, `BLAKE3(public_key)`.
///
/// # Security
///
/// Equality is constant-time so identifiers cannot be recovered byte by
/// byte through comparison timing.
// Hash over the raw bytes agrees with the manual PartialEq: equal ids have
// equal bytes.
#[allow(clippy::derived_hash_with_manual_eq)]
#[derive(Clone, Copy, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 32]);

impl PartialEq for NodeId {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        let mut result = 0u8;
        for (a, b) in self.0.iter().zip(other.0.iter()) {
            result |= a ^ b;
        }
        result == 0
    }
}

impl Eq for NodeId {}

impl PartialOrd for NodeId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Byte-lexicographic order, the tie-break used by closest-peer queries.
impl Ord for NodeId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl NodeId {
    /// Create a NodeId from raw 32-byte array.
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Identifier bound to an Ed25519 public key.
    pub fn from_public_key(public_key: &[u8; 32]) -> Self {
        Self(kadmesh_crypto::node_id_for(public_key))
    }

    /// Get the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// All-zero identifier.
    pub fn zero() -> Self {
        Self([0u8; 32])
    }
}

impl AsRef<[u8]> for NodeId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", hex::encode(self.0))
    }
}

/// Abbreviated hex, enough to tell peers apart in logs.
impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0[..8]))
    }
}

/// Material proving that a node identifier was legitimately minted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProof {
    /// Ed25519 public key the identifier is derived from.
    pub public_key: [u8; 32],
    /// Dynamic puzzle solution.
    pub nonce: [u8; 32],
}

impl IdentityProof {
    /// Check that `node_id` is derived from this key and that both puzzles hold.
    pub fn verifies(&self, node_id: &NodeId, c1: u32, c2: u32) -> bool {
        NodeId::from_public_key(&self.public_key) == *node_id
            && kadmesh_crypto::verify_puzzle(&self.public_key, &self.nonce, c1, c2)
    }
}

/// Peer descriptor: routing endpoint plus identifier.
///
/// Equality and hashing use the identifier only; the address is the
/// informational dial endpoint. Entries learned through the handshake or
/// from a `Nodes` reply carry the [`IdentityProof`] so they can be forwarded
/// and re-verified by other nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerId {
    /// Dialable address, `host:port`.
    pub address: String,
    /// Node identifier.
    pub node_id: NodeId,
    /// Identity proof, absent for locally constructed descriptors.
    pub proof: Option<IdentityProof>,
}

impl PeerId {
    /// Descriptor without identity proof.
    pub fn new(address: impl Into<String>, node_id: NodeId) -> Self {
        Self {
            address: address.into(),
            node_id,
            proof: None,
        }
    }

    /// Descriptor for an authenticated identity.
    pub fn with_proof(address: impl Into<String>, proof: IdentityProof) -> Self {
        Self {
            address: address.into(),
            node_id: NodeId::from_public_key(&proof.public_key),
            proof: Some(proof),
        }
    }

    /// Descriptor for the local identity.
    pub fn from_keys(address: impl Into<String>, keys: &kadmesh_crypto::Keys) -> Self {
        Self::with_proof(
            address,
            IdentityProof {
                public_key: *keys.public_key().as_bytes(),
                nonce: *keys.nonce(),
            },
        )
    }
}

impl PartialEq for PeerId {
    fn eq(&self, other: &Self) -> bool {
        self.node_id == other.node_id
    }
}

impl Eq for PeerId {}

impl Hash for PeerId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node_id.hash(state);
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.node_id, self.address)
    }
}
