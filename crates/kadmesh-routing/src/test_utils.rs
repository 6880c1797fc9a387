//! Test utilities for the routing layer.
//!
//! Scripted and in-memory implementations of the outbound ports, so the
//! routing service and interceptors can be exercised without sockets.
//! Enable with the `test-utils` feature flag.
//!
//! # Example
//!
//! ```rust,ignore
//! use kadmesh_routing::test_utils::{peer_with_prefix, ScriptedProbe};
//!
//! let probe = ScriptedProbe::new();
//! let peer = peer_with_prefix(0x80);
//! probe.kill(peer.node_id);
//! assert!(probe.is_dead(&peer.node_id));
//! ```

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::domain::{NodeId, PeerId};
use crate::ports::{LivenessProbe, MessageStream, ProbeError};
use crate::transport::{Message, TransportError};

/// Peer whose identifier starts with `prefix` and is zero elsewhere.
pub fn peer_with_prefix(prefix: u8) -> PeerId {
    let mut bytes = [0u8; 32];
    bytes[0] = prefix;
    PeerId::new(format!("10.0.0.{prefix}:4000"), NodeId::new(bytes))
}

/// Peer with an explicit identifier.
pub fn peer_with_id(bytes: [u8; 32]) -> PeerId {
    PeerId::new(format!("10.1.{}.{}:4000", bytes[0], bytes[31]), NodeId::new(bytes))
}

/// Liveness probe answering from a script.
///
/// Every peer is alive unless [`kill`](Self::kill)ed. An optional delay is
/// applied before answering, which pairs with a paused Tokio clock to test
/// probe timeouts.
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    dead: Mutex<HashSet<NodeId>>,
    calls: Mutex<Vec<NodeId>>,
    delay: Option<Duration>,
}

impl ScriptedProbe {
    /// All peers alive, answering immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer only after `delay`.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Make probes of `node_id` fail.
    pub fn kill(&self, node_id: NodeId) {
        self.dead.lock().insert(node_id);
    }

    /// Make probes of `node_id` succeed again.
    pub fn revive(&self, node_id: &NodeId) {
        self.dead.lock().remove(node_id);
    }

    /// Whether probes of `node_id` currently fail.
    pub fn is_dead(&self, node_id: &NodeId) -> bool {
        self.dead.lock().contains(node_id)
    }

    /// Identifiers probed so far, in order.
    pub fn calls(&self) -> Vec<NodeId> {
        self.calls.lock().clone()
    }

    /// Number of probes issued so far.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

#[async_trait]
impl LivenessProbe for ScriptedProbe {
    async fn probe(&self, peer: &PeerId) -> Result<(), ProbeError> {
        self.calls.lock().push(peer.node_id);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.is_dead(&peer.node_id) {
            return Err(ProbeError::Unreachable(peer.address.clone()));
        }
        Ok(())
    }
}

/// One half of an in-memory [`MessageStream`] pair.
#[derive(Debug)]
pub struct MemoryStream {
    tx: mpsc::UnboundedSender<Message>,
    rx: mpsc::UnboundedReceiver<Message>,
}

impl MemoryStream {
    /// Two connected halves; dropping one ends the other's receive side.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();
        (
            Self { tx: a_tx, rx: b_rx },
            Self { tx: b_tx, rx: a_rx },
        )
    }
}

#[async_trait]
impl MessageStream for MemoryStream {
    async fn send_msg(&mut self, message: Message) -> Result<(), TransportError> {
        self.tx
            .send(message)
            .map_err(|_| TransportError::ConnectionClosed)
    }

    async fn recv_msg(&mut self) -> Result<Option<Message>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

/// Membership change observed through the join/leave handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// Peer-join fired.
    Joined(NodeId),
    /// Peer-leave fired.
    Left(NodeId),
}

/// Shared, ordered record of join/leave events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<PeerEvent>>>,
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler appending `Joined` events.
    pub fn join_recorder(&self) -> impl Fn(&PeerId) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |peer: &PeerId| events.lock().push(PeerEvent::Joined(peer.node_id))
    }

    /// Handler appending `Left` events.
    pub fn leave_recorder(&self) -> impl Fn(&PeerId) + Send + Sync + 'static {
        let events = Arc::clone(&self.events);
        move |peer: &PeerId| events.lock().push(PeerEvent::Left(peer.node_id))
    }

    /// Events so far, in firing order.
    pub fn snapshot(&self) -> Vec<PeerEvent> {
        self.events.lock().clone()
    }

    /// Identifiers that joined, in order.
    pub fn joined(&self) -> Vec<NodeId> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                PeerEvent::Joined(id) => Some(id),
                PeerEvent::Left(_) => None,
            })
            .collect()
    }

    /// Identifiers that left, in order.
    pub fn left(&self) -> Vec<NodeId> {
        self.snapshot()
            .into_iter()
            .filter_map(|e| match e {
                PeerEvent::Left(id) => Some(id),
                PeerEvent::Joined(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_probe_follows_script() {
        let probe = ScriptedProbe::new();
        let peer = peer_with_prefix(7);

        assert!(probe.probe(&peer).await.is_ok());
        probe.kill(peer.node_id);
        assert!(probe.probe(&peer).await.is_err());
        probe.revive(&peer.node_id);
        assert!(probe.probe(&peer).await.is_ok());
        assert_eq!(probe.call_count(), 3);
    }

    #[tokio::test]
    async fn test_memory_stream_pair_is_connected() {
        let (mut a, mut b) = MemoryStream::pair();
        a.send_msg(Message::Ping { nonce: 1 }).await.unwrap();
        assert_eq!(b.recv_msg().await.unwrap(), Some(Message::Ping { nonce: 1 }));

        drop(a);
        assert_eq!(b.recv_msg().await.unwrap(), None);
    }
}
