//! Bucket implementation for Kademlia routing.

use std::collections::VecDeque;

use crate::domain::{NodeId, PeerId};

/// Capacity-bounded recency list of peers sharing one distance class.
///
/// The front holds the most recently active peer, the tail the eviction
/// candidate. Capacity is owned by the table so that resizing never touches
/// existing entries.
#[derive(Debug, Clone, Default)]
pub struct Bucket {
    pub(crate) entries: VecDeque<PeerId>,
}

impl Bucket {
    /// Create a new empty bucket
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of peers in this bucket
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the bucket is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Check if the bucket has reached `capacity`
    pub fn is_full(&self, capacity: usize) -> bool {
        self.entries.len() >= capacity
    }

    /// Most recently active peer
    pub fn front(&self) -> Option<&PeerId> {
        self.entries.front()
    }

    /// Least recently active peer (eviction candidate)
    pub fn tail(&self) -> Option<&PeerId> {
        self.entries.back()
    }

    /// Peers from most to least recently active
    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.entries.iter()
    }

    /// Look up a peer by identifier
    pub fn get(&self, node_id: &NodeId) -> Option<&PeerId> {
        self.entries.iter().find(|p| &p.node_id == node_id)
    }

    /// Check if bucket contains a peer
    pub fn contains(&self, node_id: &NodeId) -> bool {
        self.get(node_id).is_some()
    }

    /// Insert a new peer at the front (caller checks capacity and duplicates)
    pub(crate) fn push_front(&mut self, peer: PeerId) {
        self.entries.push_front(peer);
    }

    /// Move an existing peer to the front. Returns false if absent.
    pub(crate) fn move_to_front(&mut self, node_id: &NodeId) -> bool {
        match self.entries.iter().position(|p| &p.node_id == node_id) {
            Some(0) => true,
            Some(pos) => {
                if let Some(peer) = self.entries.remove(pos) {
                    self.entries.push_front(peer);
                }
                true
            }
            None => false,
        }
    }

    /// Remove a peer by identifier
    pub(crate) fn remove(&mut self, node_id: &NodeId) -> Option<PeerId> {
        self.entries
            .iter()
            .position(|p| &p.node_id == node_id)
            .and_then(|pos| self.entries.remove(pos))
    }

    /// Remove the tail peer
    pub(crate) fn pop_tail(&mut self) -> Option<PeerId> {
        self.entries.pop_back()
    }
}
