use parking_lot::{Mutex, ReentrantMutex, RwLock};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

use crate::domain::{
    EvictionCommit, Insertion, KademliaConfig, MembershipError, NodeId, PeerId, RoutingTable,
    UpdateOutcome,
};
use crate::ports::LivenessProbe;

use super::events::PeerEvents;

/// Outcome of the first locked phase.
enum Phase {
    Done(UpdateOutcome),
    Probe(PeerId),
}

/// Thread-safe routing table with ping-before-evict.
///
/// # Example
///
/// ```rust,ignore
/// let service = Arc::new(RoutingService::new(local, &KademliaConfig::default(), probe)?);
/// service.events().on_join(|peer| tracing::info!(peer = %peer, "joined"));
///
/// // Full update (may probe a tail, bounded by the probe timeout)
/// service.update(peer).await;
///
/// // Hot path: never waits on the network
/// service.observe(other_peer);
/// ```
pub struct RoutingService {
    table: RwLock<RoutingTable>,
    probe: Arc<dyn LivenessProbe>,
    events: PeerEvents,
    probe_timeout: Duration,
    max_update_attempts: usize,
    /// New peers whose ping-before-evict runs on a background task.
    pending_probes: Mutex<HashSet<NodeId>>,
    /// Held from a membership change through its handler dispatch, so
    /// handlers observe changes in table order. Reentrant for handlers that
    /// call back into the service.
    dispatch: ReentrantMutex<()>,
}

impl RoutingService {
    /// Create a service for `local`.
    ///
    /// # Errors
    ///
    /// `MembershipError::Configuration` if `config` does not validate.
    pub fn new(
        local: PeerId,
        config: &KademliaConfig,
        probe: Arc<dyn LivenessProbe>,
    ) -> Result<Self, MembershipError> {
        config.validate()?;
        Ok(Self {
            table: RwLock::new(RoutingTable::new(local, config.bucket_size)),
            probe,
            events: PeerEvents::default(),
            probe_timeout: config.probe_timeout,
            max_update_attempts: config.max_update_attempts,
            pending_probes: Mutex::new(HashSet::new()),
            dispatch: ReentrantMutex::new(()),
        })
    }

    /// Join/leave handler registration.
    pub fn events(&self) -> &PeerEvents {
        &self.events
    }

    /// Record activity for `peer`, probing the bucket tail if the bucket is full.
    ///
    /// Never holds the table lock across the probe. If the bucket changed
    /// while the probe was in flight the insertion is retried against the
    /// current state, up to the configured attempt limit.
    pub async fn update(&self, peer: PeerId) -> UpdateOutcome {
        for attempt in 1..=self.max_update_attempts {
            let tail = match self.first_phase(&peer) {
                Phase::Done(outcome) => return outcome,
                Phase::Probe(tail) => tail,
            };

            if self.probe_alive(&tail).await {
                if self.still_blocked(&tail, &peer) {
                    debug!(peer = %peer, tail = %tail, "bucket full, tail alive; rejecting");
                    return UpdateOutcome::Rejected;
                }
                debug!(peer = %peer, tail = %tail, attempt, "tail left during probe; retrying");
                continue;
            }

            if let Some(outcome) = self.commit_replacement(&tail, &peer) {
                return outcome;
            }
            debug!(peer = %peer, tail = %tail, attempt, "bucket changed during probe; retrying");
        }

        debug!(peer = %peer, "insertion abandoned after repeated contention");
        UpdateOutcome::Rejected
    }

    /// Non-blocking update for the RPC hot path.
    ///
    /// Refreshes or inserts immediately. If the bucket is full, the
    /// ping-before-evict flow is moved to a background task (one per new
    /// peer) and `ProbeScheduled` is returned. Outside a Tokio runtime a
    /// full bucket simply rejects the peer.
    pub fn observe(self: &Arc<Self>, peer: PeerId) -> UpdateOutcome {
        match self.first_phase(&peer) {
            Phase::Done(outcome) => outcome,
            Phase::Probe(_) => {
                if !self.pending_probes.lock().insert(peer.node_id) {
                    return UpdateOutcome::ProbeScheduled;
                }
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    self.pending_probes.lock().remove(&peer.node_id);
                    return UpdateOutcome::Rejected;
                };

                let this = Arc::clone(self);
                runtime.spawn(async move {
                    let node_id = peer.node_id;
                    let outcome = this.update(peer).await;
                    trace!(peer = %node_id, ?outcome, "background insertion finished");
                    this.pending_probes.lock().remove(&node_id);
                });
                UpdateOutcome::ProbeScheduled
            }
        }
    }

    /// Remove `node_id` unconditionally. Idempotent; fires peer-leave only
    /// if the peer was present.
    pub fn evict(&self, node_id: &NodeId) -> Option<PeerId> {
        let _order = self.dispatch.lock();
        let removed = self.table.write().remove(node_id);
        if let Some(peer) = &removed {
            info!(peer = %peer, "peer left");
            self.events.fire_leave(peer);
        }
        removed
    }

    /// Change bucket capacity for future insertions.
    ///
    /// # Errors
    ///
    /// `MembershipError::Configuration` for zero.
    pub fn set_bucket_size(&self, bucket_size: usize) -> Result<(), MembershipError> {
        if bucket_size == 0 {
            return Err(MembershipError::Configuration(
                "bucket_size must be at least 1".into(),
            ));
        }
        self.table.write().set_bucket_size(bucket_size);
        Ok(())
    }

    /// Run `f` against a consistent snapshot of the table.
    pub fn with_table<R>(&self, f: impl FnOnce(&RoutingTable) -> R) -> R {
        f(&self.table.read())
    }

    fn still_blocked(&self, tail: &PeerId, peer: &PeerId) -> bool {
        self.table.read().still_blocked_by(tail, &peer.node_id)
    }

    /// Swap the dead `tail` for `peer`; `None` if the bucket moved on.
    fn commit_replacement(&self, tail: &PeerId, peer: &PeerId) -> Option<UpdateOutcome> {
        let _order = self.dispatch.lock();
        let commit = self.table.write().commit_eviction(tail, peer.clone());
        match commit {
            EvictionCommit::Replaced { evicted } => {
                info!(peer = %peer, evicted = %evicted, "replaced unresponsive peer");
                self.events.fire_leave(&evicted);
                self.events.fire_join(peer);
                Some(UpdateOutcome::Replaced { evicted })
            }
            EvictionCommit::Stale => None,
        }
    }

    fn first_phase(&self, peer: &PeerId) -> Phase {
        let _order = self.dispatch.lock();
        let insertion = self.table.write().try_insert(peer.clone());
        match insertion {
            Insertion::Inserted => {
                info!(peer = %peer, "peer joined");
                self.events.fire_join(peer);
                Phase::Done(UpdateOutcome::Inserted)
            }
            Insertion::Refreshed => {
                trace!(peer = %peer, "peer refreshed");
                Phase::Done(UpdateOutcome::Refreshed)
            }
            Insertion::SelfIgnored => Phase::Done(UpdateOutcome::SelfIgnored),
            Insertion::AddressConflict { existing } => {
                warn!(
                    peer = %peer.node_id,
                    known = %existing.address,
                    claimed = %peer.address,
                    "identifier already known under another address"
                );
                Phase::Done(UpdateOutcome::AddressConflict)
            }
            Insertion::Full { tail } => Phase::Probe(tail),
        }
    }

    async fn probe_alive(&self, tail: &PeerId) -> bool {
        match tokio::time::timeout(self.probe_timeout, self.probe.probe(tail)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(peer = %tail, error = %e, "liveness probe failed");
                false
            }
            Err(_) => {
                debug!(
                    peer = %tail,
                    timeout_ms = self.probe_timeout.as_millis() as u64,
                    "liveness probe timed out"
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for RoutingService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let table = self.table.read();
        f.debug_struct("RoutingService")
            .field("local", &table.local().node_id)
            .field("peers", &table.len())
            .field("probe_timeout", &self.probe_timeout)
            .finish_non_exhaustive()
    }
}
