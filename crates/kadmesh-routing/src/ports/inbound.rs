//! # Driving Ports (Inbound API)

use crate::domain::{NodeId, PeerId};

/// Read-only view of the routing table.
///
/// Implementations take a consistent snapshot and never wait on the network,
/// so these are safe to call concurrently with updates.
///
/// # Example
///
/// ```rust,ignore
/// use kadmesh_routing::ports::PeerDirectory;
///
/// fn log_neighbourhood<D: PeerDirectory>(directory: &D, target: NodeId) {
///     for peer in directory.closest_to(&target, directory.bucket_size()) {
///         tracing::info!(peer = %peer, "neighbour");
///     }
/// }
/// ```
pub trait PeerDirectory {
    /// The `k` known peers closest to `target`, excluding `target`.
    fn closest_to(&self, target: &NodeId, k: usize) -> Vec<PeerId>;

    /// Every known peer.
    fn all_peers(&self) -> Vec<PeerId>;

    /// Current bucket capacity.
    fn bucket_size(&self) -> usize;

    /// Whether `node_id` is a table member.
    fn contains(&self, node_id: &NodeId) -> bool;
}
