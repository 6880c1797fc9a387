//! Main RoutingTable implementation.

use crate::domain::{bucket_index, find_k_closest, NodeId, PeerId};

use super::bucket::Bucket;
use super::config::NUM_BUCKETS;

/// Result of the locked first phase of an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Insertion {
    /// Stored at the front of a bucket with spare capacity.
    Inserted,
    /// Already present; moved to the front.
    Refreshed,
    /// The local identity; ignored.
    SelfIgnored,
    /// Identifier present under a different address; nothing changed.
    AddressConflict {
        /// The entry already in the table.
        existing: PeerId,
    },
    /// Bucket full. The tail must be probed before anything changes.
    Full {
        /// Least recently active entry of the bucket.
        tail: PeerId,
    },
}

/// Result of the locked final phase of a ping-before-evict insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvictionCommit {
    /// The probed tail was removed and the new peer stored at the front.
    Replaced {
        /// The removed tail.
        evicted: PeerId,
    },
    /// The bucket changed while unlocked; retry from the first phase.
    Stale,
}

/// Kademlia routing table: 256 buckets indexed by distance class.
///
/// # Invariants
///
/// - A peer lives in exactly the bucket given by `bucket_index(local, peer)`.
/// - The local identity is never stored.
/// - No bucket grows beyond `bucket_size` through insertion. Shrinking
///   `bucket_size` tolerates existing overflow.
#[derive(Debug)]
pub struct RoutingTable {
    local: PeerId,
    buckets: Vec<Bucket>,
    bucket_size: usize,
}

impl RoutingTable {
    /// Create an empty routing table
    pub fn new(local: PeerId, bucket_size: usize) -> Self {
        Self {
            local,
            buckets: (0..NUM_BUCKETS).map(|_| Bucket::new()).collect(),
            bucket_size: bucket_size.max(1),
        }
    }

    /// Local identity
    pub fn local(&self) -> &PeerId {
        &self.local
    }

    /// Capacity applied to future insertions
    pub fn bucket_size(&self) -> usize {
        self.bucket_size
    }

    /// Change the capacity for future insertions; existing entries stay.
    /// A capacity of zero is raised to one.
    pub fn set_bucket_size(&mut self, bucket_size: usize) {
        self.bucket_size = bucket_size.max(1);
    }

    /// Total number of stored peers
    pub fn len(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    /// Check if the table holds no peers
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Bucket::is_empty)
    }

    /// Bucket by index (0 = farthest)
    pub fn bucket(&self, index: usize) -> Option<&Bucket> {
        self.buckets.get(index)
    }

    /// Bucket a remote identifier belongs to, `None` for the local identity
    pub fn bucket_index_of(&self, node_id: &NodeId) -> Option<usize> {
        bucket_index(&self.local.node_id, node_id)
    }

    /// Look up a peer by identifier
    pub fn get(&self, node_id: &NodeId) -> Option<&PeerId> {
        self.bucket_index_of(node_id)
            .and_then(|idx| self.buckets[idx].get(node_id))
    }

    /// Check if the table contains a peer
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.get(node_id).is_some()
    }

    /// First phase of an update: refresh, insert, or report the tail to probe.
    pub fn try_insert(&mut self, peer: PeerId) -> Insertion {
        let Some(idx) = self.bucket_index_of(&peer.node_id) else {
            return Insertion::SelfIgnored;
        };
        let bucket = &mut self.buckets[idx];

        if let Some(existing) = bucket.get(&peer.node_id) {
            if existing.address != peer.address {
                return Insertion::AddressConflict {
                    existing: existing.clone(),
                };
            }
            bucket.move_to_front(&peer.node_id);
            return Insertion::Refreshed;
        }

        if bucket.is_full(self.bucket_size) {
            if let Some(tail) = bucket.tail() {
                return Insertion::Full { tail: tail.clone() };
            }
        }

        bucket.push_front(peer);
        Insertion::Inserted
    }

    /// Whether `peer` is still kept out by a full bucket that holds
    /// `candidate`.
    ///
    /// Re-checked after a live probe: if `candidate` left, the bucket has
    /// room again, or `peer` got in concurrently, the insertion must be
    /// retried instead of rejected.
    pub fn still_blocked_by(&self, candidate: &PeerId, peer: &NodeId) -> bool {
        self.bucket_index_of(peer)
            .map(|idx| &self.buckets[idx])
            .is_some_and(|bucket| {
                bucket.is_full(self.bucket_size)
                    && bucket.contains(&candidate.node_id)
                    && !bucket.contains(peer)
            })
    }

    /// Final phase of an update after `candidate` failed its probe.
    ///
    /// Commits only if the bucket is still full, `candidate` is still its
    /// tail, and `peer` has not been inserted concurrently.
    pub fn commit_eviction(&mut self, candidate: &PeerId, peer: PeerId) -> EvictionCommit {
        let Some(idx) = self.bucket_index_of(&peer.node_id) else {
            return EvictionCommit::Stale;
        };
        let capacity = self.bucket_size;
        let bucket = &mut self.buckets[idx];

        let tail_unchanged = bucket
            .tail()
            .map(|t| t.node_id == candidate.node_id)
            .unwrap_or(false);
        if !tail_unchanged || !bucket.is_full(capacity) || bucket.contains(&peer.node_id) {
            return EvictionCommit::Stale;
        }

        match bucket.pop_tail() {
            Some(evicted) => {
                bucket.push_front(peer);
                EvictionCommit::Replaced { evicted }
            }
            None => EvictionCommit::Stale,
        }
    }

    /// Remove a peer wherever it is stored. Idempotent.
    pub fn remove(&mut self, node_id: &NodeId) -> Option<PeerId> {
        let idx = self.bucket_index_of(node_id)?;
        self.buckets[idx].remove(node_id)
    }

    /// Every stored peer, farthest bucket first, each bucket front to tail
    pub fn all_peers(&self) -> Vec<PeerId> {
        self.buckets
            .iter()
            .flat_map(|b| b.iter().cloned())
            .collect()
    }

    /// The `k` stored peers closest to `target`, never including `target`.
    ///
    /// Scans every bucket; the table is bounded by 256 × bucket_size.
    pub fn find_closest(&self, target: &NodeId, k: usize) -> Vec<PeerId> {
        find_k_closest(
            self.buckets.iter().flat_map(|b| b.iter().cloned()),
            target,
            k,
        )
    }
}
