//! Peer sorting and selection.

use super::distance::cmp_by_distance;
use crate::domain::{NodeId, PeerId};

/// Sort peers by XOR distance to `target` (closest first).
pub fn sort_by_distance(peers: &mut [PeerId], target: &NodeId) {
    peers.sort_by(|a, b| cmp_by_distance(target, &a.node_id, &b.node_id));
}

/// The `k` peers closest to `target`, excluding `target` itself.
///
/// Linear in the number of candidates; duplicates by identifier are
/// collapsed.
pub fn find_k_closest<I>(peers: I, target: &NodeId, k: usize) -> Vec<PeerId>
where
    I: IntoIterator<Item = PeerId>,
{
    let mut candidates: Vec<PeerId> = peers
        .into_iter()
        .filter(|p| &p.node_id != target)
        .collect();
    sort_by_distance(&mut candidates, target);
    candidates.dedup_by(|a, b| a.node_id == b.node_id);
    candidates.truncate(k);
    candidates
}
