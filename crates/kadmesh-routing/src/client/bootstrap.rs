//! Iterative closest-peer discovery.
//!
//! Each round asks up to `alpha` not-yet-queried peers, nearest to the
//! local identifier first, for their closest peers to us. Answers are merged
//! through the normal update path, so eviction rules apply. The walk ends
//! once every one of the `bucket_size` closest known peers has been queried
//! or the round limit is hit.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{find_k_closest, MembershipError, NodeId, PeerId, UpdateOutcome};

use super::core::{Client, ClientInner};

impl Client {
    /// Populate the table from the current connections (or the configured
    /// bootstrap contacts when there are none) and return the closest
    /// known peers afterwards.
    ///
    /// Bounded by the configured bootstrap timeout; on expiry the progress
    /// made so far is kept.
    pub async fn bootstrap(&self) -> Vec<PeerId> {
        match self
            .bootstrap_with_timeout(self.inner.config.bootstrap_timeout)
            .await
        {
            Ok(closest) => closest,
            Err(e) => {
                warn!(error = %e, "bootstrap incomplete");
                self.closest_peers()
            }
        }
    }

    /// [`bootstrap`](Self::bootstrap) with a caller-supplied bound.
    ///
    /// # Errors
    ///
    /// `MembershipError::Timeout` when `timeout` expires first. Peers
    /// discovered before that stay in the table.
    pub async fn bootstrap_with_timeout(
        &self,
        timeout: Duration,
    ) -> Result<Vec<PeerId>, MembershipError> {
        tokio::time::timeout(timeout, Arc::clone(&self.inner).bootstrap())
            .await
            .map_err(|_| MembershipError::Timeout {
                operation: "bootstrap",
            })
    }
}

impl ClientInner {
    async fn bootstrap(self: Arc<Self>) -> Vec<PeerId> {
        let target = self.local.node_id;

        if self.connections.read().is_empty() {
            for address in &self.config.bootstrap_nodes {
                if let Err(e) = self.dial(address, self.config.dial_timeout).await {
                    debug!(addr = %address, error = %e, "bootstrap contact unreachable");
                }
            }
        }

        let mut seeds: Vec<PeerId> = self
            .connections
            .read()
            .values()
            .map(|c| c.remote().clone())
            .collect();
        let mut queried: HashSet<NodeId> = HashSet::new();

        for round in 1..=self.config.kademlia.max_bootstrap_rounds {
            let k = self.routing.bucket_size();
            let known = self.routing.find_closest(&target, k);
            let candidates = find_k_closest(
                known
                    .into_iter()
                    .chain(seeds.drain(..))
                    .filter(|p| !queried.contains(&p.node_id)),
                &target,
                self.config.kademlia.alpha,
            );
            if candidates.is_empty() {
                debug!(round, "bootstrap converged");
                break;
            }

            let mut queries = JoinSet::new();
            for peer in candidates {
                queried.insert(peer.node_id);
                let inner = Arc::clone(&self);
                queries.spawn(async move {
                    let result = inner.query(&peer, target).await;
                    (peer, result)
                });
            }

            let mut discovered = 0usize;
            while let Some(joined) = queries.join_next().await {
                let Ok((peer, result)) = joined else { continue };
                match result {
                    Ok(found) => {
                        for record in found {
                            if self.admit(record).await {
                                discovered += 1;
                            }
                        }
                    }
                    Err(e) => debug!(peer = %peer, error = %e, "bootstrap query failed"),
                }
            }
            debug!(round, discovered, known = self.routing.len(), "bootstrap round finished");
        }

        self.routing.find_closest(&target, self.routing.bucket_size())
    }

    async fn query(
        self: &Arc<Self>,
        peer: &PeerId,
        target: NodeId,
    ) -> Result<Vec<PeerId>, MembershipError> {
        let connection = match self.registered(&peer.node_id) {
            Some(connection) => connection,
            None => self.dial(&peer.address, self.config.dial_timeout).await?,
        };
        if connection.remote().node_id != peer.node_id {
            return Err(MembershipError::UnexpectedResponse(format!(
                "{} now serves {}",
                peer.address,
                connection.remote().node_id
            )));
        }
        self.find_node(&connection, target).await
    }

    /// Merge one discovered record; true if it entered the table.
    async fn admit(&self, record: PeerId) -> bool {
        if record.node_id == self.local.node_id {
            return false;
        }
        let verified = record
            .proof
            .as_ref()
            .is_some_and(|proof| proof.verifies(&record.node_id, self.config.c1, self.config.c2));
        if !verified {
            warn!(peer = %record, "discarding peer record without a valid identity proof");
            return false;
        }
        matches!(
            self.routing.update(record).await,
            UpdateOutcome::Inserted | UpdateOutcome::Replaced { .. }
        )
    }
}
