//! Passive refresh: every message on a peer's stream counts as activity.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::trace;

use crate::domain::PeerId;
use crate::ports::MessageStream;
use crate::service::RoutingService;
use crate::transport::{Message, TransportError};

/// Decorates a stream so that each send and each received message records
/// activity for the remote peer.
///
/// Uses [`RoutingService::observe`], so a send or receive never waits on a
/// liveness probe.
pub struct InterceptedStream<S> {
    inner: S,
    routing: Arc<RoutingService>,
    remote: PeerId,
}

impl<S: MessageStream> InterceptedStream<S> {
    /// Wrap `inner`, attributing its traffic to `remote`.
    pub fn new(inner: S, routing: Arc<RoutingService>, remote: PeerId) -> Self {
        Self {
            inner,
            routing,
            remote,
        }
    }

    /// Peer on the other end.
    pub fn remote(&self) -> &PeerId {
        &self.remote
    }

    /// Unwrap, dropping the interception.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn touch(&self, direction: &'static str) {
        let outcome = self.routing.observe(self.remote.clone());
        trace!(peer = %self.remote, direction, ?outcome, "stream activity");
    }
}

#[async_trait]
impl<S: MessageStream> MessageStream for InterceptedStream<S> {
    async fn send_msg(&mut self, message: Message) -> Result<(), TransportError> {
        self.touch("send");
        self.inner.send_msg(message).await
    }

    async fn recv_msg(&mut self) -> Result<Option<Message>, TransportError> {
        let received = self.inner.recv_msg().await?;
        if received.is_some() {
            self.touch("recv");
        }
        Ok(received)
    }
}

impl<S> std::fmt::Debug for InterceptedStream<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterceptedStream")
            .field("remote", &self.remote)
            .finish_non_exhaustive()
    }
}
