//! Membership RPCs carried on `StreamKind::Membership` streams.
//!
//! | Request | Reply |
//! |---------|-------|
//! | `Ping { nonce }` | `Pong { nonce }` |
//! | `FindNode { target }` | `Nodes { peers }` (up to bucket size, closest first) |
//!
//! Anything else is answered with `Error`.

use async_trait::async_trait;
use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock, Weak};
use tracing::{debug, trace, warn};

use crate::domain::{MembershipError, NodeId, PeerId};
use crate::ports::{LivenessProbe, MessageStream, ProbeError};
use crate::service::RoutingService;
use crate::transport::{Connection, Message, StreamKind, TransportError};

use super::core::{ClientInner, PeerStream};
use super::interceptor::InterceptedStream;

/// Ping-before-evict over the client's connections.
///
/// Bound to the client after construction since the routing service needs
/// the probe before the client exists.
pub(super) struct ClientProbe {
    inner: OnceLock<Weak<ClientInner>>,
}

impl ClientProbe {
    pub(super) fn new() -> Self {
        Self {
            inner: OnceLock::new(),
        }
    }

    pub(super) fn bind(&self, inner: &Arc<ClientInner>) {
        let _ = self.inner.set(Arc::downgrade(inner));
    }
}

#[async_trait]
impl LivenessProbe for ClientProbe {
    async fn probe(&self, peer: &PeerId) -> Result<(), ProbeError> {
        let inner = self
            .inner
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ProbeError::Unreachable("client shut down".into()))?;
        inner.ping(peer).await
    }
}

fn unreachable(err: impl std::fmt::Display) -> ProbeError {
    ProbeError::Unreachable(err.to_string())
}

impl ClientInner {
    /// Ping `peer`, dialing it first if no connection is registered.
    pub(super) async fn ping(self: &Arc<Self>, peer: &PeerId) -> Result<(), ProbeError> {
        let connection = match self.registered(&peer.node_id) {
            Some(connection) => connection,
            None => self
                .dial(&peer.address, self.config.dial_timeout)
                .await
                .map_err(unreachable)?,
        };
        if connection.remote().node_id != peer.node_id {
            return Err(ProbeError::UnexpectedResponse(format!(
                "{} now serves {}",
                peer.address,
                connection.remote().node_id
            )));
        }

        // Not intercepted: sending the ping must not count as activity of
        // the peer under test.
        let mut stream = connection
            .open_stream(StreamKind::Membership)
            .map_err(unreachable)?;
        let nonce = self.ping_nonce.fetch_add(1, Ordering::Relaxed);
        stream
            .send_msg(Message::Ping { nonce })
            .await
            .map_err(unreachable)?;

        match stream.recv_msg().await.map_err(unreachable)? {
            Some(Message::Pong { nonce: echoed }) if echoed == nonce => {
                trace!(peer = %peer, nonce, "pong");
                self.routing.observe(connection.remote().clone());
                Ok(())
            }
            Some(other) => Err(ProbeError::UnexpectedResponse(format!("{other:?}"))),
            None => Err(ProbeError::Unreachable("stream closed before pong".into())),
        }
    }

    /// Ask the peer behind `connection` for its closest peers to `target`.
    pub(super) async fn find_node(
        &self,
        connection: &Connection,
        target: NodeId,
    ) -> Result<Vec<PeerId>, MembershipError> {
        let mut stream = self.membership_stream(connection)?;
        stream.send_msg(Message::FindNode { target }).await?;

        match stream.recv_msg().await? {
            Some(Message::Nodes { peers }) => Ok(peers),
            Some(Message::Error { reason }) => Err(MembershipError::UnexpectedResponse(reason)),
            Some(other) => Err(MembershipError::UnexpectedResponse(format!("{other:?}"))),
            None => Err(TransportError::ConnectionClosed.into()),
        }
    }

    fn membership_stream(&self, connection: &Connection) -> Result<PeerStream, TransportError> {
        let stream = connection.open_stream(StreamKind::Membership)?;
        Ok(InterceptedStream::new(
            stream,
            Arc::clone(&self.routing),
            connection.remote().clone(),
        ))
    }
}

/// Answer membership requests on one incoming stream until it closes.
pub(super) async fn serve_membership<S: MessageStream>(
    routing: Arc<RoutingService>,
    mut stream: InterceptedStream<S>,
) {
    loop {
        let request = match stream.recv_msg().await {
            Ok(Some(request)) => request,
            Ok(None) => break,
            Err(e) => {
                debug!(peer = %stream.remote(), error = %e, "membership stream failed");
                break;
            }
        };

        let reply = match request {
            Message::Ping { nonce } => Message::Pong { nonce },
            Message::FindNode { target } => Message::Nodes {
                peers: routing.find_closest(&target, routing.bucket_size()),
            },
            other => {
                warn!(peer = %stream.remote(), request = ?other, "unsupported membership request");
                Message::Error {
                    reason: "unsupported membership request".into(),
                }
            }
        };

        if let Err(e) = stream.send_msg(reply).await {
            debug!(peer = %stream.remote(), error = %e, "membership reply failed");
            break;
        }
    }
}
