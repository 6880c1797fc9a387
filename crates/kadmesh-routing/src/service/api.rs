use crate::domain::{NodeId, PeerId};
use crate::ports::PeerDirectory;
use crate::service::RoutingService;

impl RoutingService {
    /// Local identity.
    pub fn local(&self) -> PeerId {
        self.with_table(|t| t.local().clone())
    }

    /// The `k` known peers closest to `target`, excluding `target`.
    pub fn find_closest(&self, target: &NodeId, k: usize) -> Vec<PeerId> {
        self.with_table(|t| t.find_closest(target, k))
    }

    /// Every known peer.
    pub fn all_peers(&self) -> Vec<PeerId> {
        self.with_table(|t| t.all_peers())
    }

    /// Current bucket capacity.
    pub fn bucket_size(&self) -> usize {
        self.with_table(|t| t.bucket_size())
    }

    /// Number of known peers.
    pub fn len(&self) -> usize {
        self.with_table(|t| t.len())
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.with_table(|t| t.is_empty())
    }

    /// Look up a member by identifier.
    pub fn get(&self, node_id: &NodeId) -> Option<PeerId> {
        self.with_table(|t| t.get(node_id).cloned())
    }

    /// Entries of one bucket, most recent first.
    pub fn bucket_entries(&self, index: usize) -> Vec<PeerId> {
        self.with_table(|t| {
            t.bucket(index)
                .map(|b| b.iter().cloned().collect())
                .unwrap_or_default()
        })
    }
}

impl PeerDirectory for RoutingService {
    fn closest_to(&self, target: &NodeId, k: usize) -> Vec<PeerId> {
        self.find_closest(target, k)
    }

    fn all_peers(&self) -> Vec<PeerId> {
        RoutingService::all_peers(self)
    }

    fn bucket_size(&self) -> usize {
        RoutingService::bucket_size(self)
    }

    fn contains(&self, node_id: &NodeId) -> bool {
        self.with_table(|t| t.contains(node_id))
    }
}
