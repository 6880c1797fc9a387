//! Connection lifecycle: dial, accept, registration and loss.

use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::domain::{MembershipError, UpdateOutcome};
use crate::transport::{
    Connection, ConnectionDirection, IncomingStream, Role, StreamKind, TransportError,
};

use super::core::{Client, ClientInner};
use super::interceptor::InterceptedStream;
use super::protocol::serve_membership;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

type AcceptedConnections = Arc<Mutex<Vec<Weak<Connection>>>>;

/// Running accept loop started by [`Client::listen`].
#[derive(Debug)]
pub struct ServerHandle {
    local_addr: SocketAddr,
    accept_task: JoinHandle<()>,
    accepted: AcceptedConnections,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting and close every connection this listener accepted.
    ///
    /// Remote peers observe the closure and fire peer-leave for this node.
    pub fn stop(&self) {
        self.accept_task.abort();
        let accepted: Vec<_> = self.accepted.lock().drain(..).collect();
        for connection in accepted.iter().filter_map(Weak::upgrade) {
            connection.close();
        }
        info!(addr = %self.local_addr, "listener stopped");
    }
}

impl Client {
    /// Connect to `address`, authenticate and register the peer.
    ///
    /// Bounded by the configured dial timeout. A concurrent dial to the
    /// same address waits for the first and reuses its connection.
    ///
    /// # Errors
    ///
    /// `DialFailed` for connect, timeout or transport failures,
    /// `AuthenticationFailed` when the remote identity does not verify.
    /// Neither touches the routing table.
    pub async fn dial(&self, address: &str) -> Result<Arc<Connection>, MembershipError> {
        self.inner.dial(address, self.inner.config.dial_timeout).await
    }

    /// [`dial`](Self::dial) with a caller-supplied bound.
    ///
    /// # Errors
    ///
    /// As for [`dial`](Self::dial).
    pub async fn dial_with_timeout(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Arc<Connection>, MembershipError> {
        self.inner.dial(address, timeout).await
    }

    /// Accept connections on `listener` in the background.
    ///
    /// Every accepted connection is authenticated and registered exactly
    /// like a dialed one; failed handshakes are dropped without touching
    /// the table.
    ///
    /// # Errors
    ///
    /// `Transport` if the listener has no local address.
    pub fn listen(&self, listener: TcpListener) -> Result<ServerHandle, MembershipError> {
        let local_addr = listener.local_addr().map_err(TransportError::from)?;
        let accepted = AcceptedConnections::default();
        let accept_task = tokio::spawn(accept_loop(
            Arc::downgrade(&self.inner),
            listener,
            Arc::clone(&accepted),
        ));
        info!(addr = %local_addr, local = %self.inner.local.node_id, "listening");
        Ok(ServerHandle {
            local_addr,
            accept_task,
            accepted,
        })
    }
}

async fn accept_loop(inner: Weak<ClientInner>, listener: TcpListener, accepted: AcceptedConnections) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                warn!(error = %e, "accept failed");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        let Some(inner) = inner.upgrade() else { break };
        let accepted = Arc::clone(&accepted);
        tokio::spawn(async move {
            inner.accept(stream, remote_addr, accepted).await;
        });
    }
}

impl ClientInner {
    pub(super) async fn dial(
        self: &Arc<Self>,
        address: &str,
        timeout: Duration,
    ) -> Result<Arc<Connection>, MembershipError> {
        let slot = DialSlot::acquire(self, address);
        let result = {
            let _guard = slot.lock.lock().await;
            match self.registered_at(address) {
                Some(existing) => {
                    debug!(addr = address, peer = %existing.remote(), "reusing registered connection");
                    self.routing.update(existing.remote().clone()).await;
                    Ok(existing)
                }
                None => match tokio::time::timeout(timeout, self.establish(address)).await {
                    Ok(result) => result,
                    Err(_) => Err(MembershipError::DialFailed {
                        address: address.to_string(),
                        reason: format!("timed out after {}ms", timeout.as_millis()),
                    }),
                },
            }
        };
        drop(slot);

        if let Err(e) = &result {
            debug!(addr = address, error = %e, "dial failed");
        }
        result
    }

    async fn establish(self: &Arc<Self>, address: &str) -> Result<Arc<Connection>, MembershipError> {
        let dial_failed = |reason: String| MembershipError::DialFailed {
            address: address.to_string(),
            reason,
        };

        let stream = TcpStream::connect(address)
            .await
            .map_err(|e| dial_failed(e.to_string()))?;
        let _ = stream.set_nodelay(true);

        let credentials = self.credentials.read().clone();
        let (remote, channel) = credentials
            .authenticate(stream, Role::Initiator)
            .await
            .map_err(|e| {
                if e.is_authentication_failure() {
                    MembershipError::AuthenticationFailed(e.to_string())
                } else {
                    dial_failed(e.to_string())
                }
            })?;

        let (connection, incoming) =
            Connection::spawn(remote.clone(), ConnectionDirection::Outbound, channel);
        self.adopt(&connection, incoming);

        let outcome = self.routing.update(remote.clone()).await;
        if outcome == UpdateOutcome::AddressConflict {
            self.discard(&connection);
            return Err(dial_failed(format!(
                "{} is already known under another address",
                remote.node_id
            )));
        }
        debug!(peer = %remote, ?outcome, "dialed");
        Ok(connection)
    }

    async fn accept(
        self: Arc<Self>,
        stream: TcpStream,
        remote_addr: SocketAddr,
        accepted: AcceptedConnections,
    ) {
        let _ = stream.set_nodelay(true);
        let credentials = self.credentials.read().clone();
        let (remote, channel) = match credentials.authenticate(stream, Role::Responder).await {
            Ok(authenticated) => authenticated,
            Err(e) if e.is_authentication_failure() => {
                warn!(addr = %remote_addr, error = %e, "inbound authentication failed");
                return;
            }
            Err(e) => {
                debug!(addr = %remote_addr, error = %e, "inbound handshake failed");
                return;
            }
        };

        let (connection, incoming) =
            Connection::spawn(remote.clone(), ConnectionDirection::Inbound, channel);
        {
            let mut accepted = accepted.lock();
            accepted.retain(|c| c.strong_count() > 0);
            accepted.push(Arc::downgrade(&connection));
        }
        self.adopt(&connection, incoming);

        let outcome = self.routing.update(remote.clone()).await;
        if outcome == UpdateOutcome::AddressConflict {
            self.discard(&connection);
            return;
        }
        debug!(peer = %remote, addr = %remote_addr, ?outcome, "accepted");
    }

    /// Register `connection` unless the peer already has a live one, then
    /// serve its incoming streams until it closes.
    fn adopt(
        self: &Arc<Self>,
        connection: &Arc<Connection>,
        incoming: mpsc::UnboundedReceiver<IncomingStream>,
    ) {
        let node_id = connection.remote().node_id;
        let registered = {
            let mut connections = self.connections.write();
            match connections.get(&node_id) {
                Some(existing) if !existing.is_closed() => false,
                _ => {
                    connections.insert(node_id, Arc::clone(connection));
                    true
                }
            }
        };
        if !registered {
            debug!(peer = %connection.remote(), "duplicate connection served unregistered");
        }

        tokio::spawn(serve_connection(
            Arc::downgrade(self),
            Arc::clone(connection),
            incoming,
        ));
    }

    /// Drop the registration of a lost connection and evict its peer, if
    /// it was the registered one.
    fn forget(&self, connection: &Arc<Connection>) {
        if self.unregister(connection) {
            debug!(peer = %connection.remote(), "connection lost");
            self.routing.evict(&connection.remote().node_id);
        }
    }

    /// Drop a connection whose identity the table refused, leaving the
    /// table entry for that identifier alone.
    fn discard(&self, connection: &Arc<Connection>) {
        warn!(
            peer = %connection.remote().node_id,
            claimed = %connection.remote().address,
            "identifier already known under another address; dropping connection"
        );
        self.unregister(connection);
        connection.close();
    }

    /// Remove `connection` from the registry if it is the registered one.
    fn unregister(&self, connection: &Arc<Connection>) -> bool {
        let node_id = connection.remote().node_id;
        let mut connections = self.connections.write();
        match connections.get(&node_id) {
            Some(registered) if Arc::ptr_eq(registered, connection) => {
                connections.remove(&node_id);
                true
            }
            _ => false,
        }
    }
}

/// Per-address dial lock, removed from the map once its last user is gone.
///
/// Released on drop, so a dial cancelled by an outer timeout cleans up too.
struct DialSlot<'a> {
    inner: &'a ClientInner,
    address: &'a str,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl<'a> DialSlot<'a> {
    fn acquire(inner: &'a ClientInner, address: &'a str) -> Self {
        let lock = Arc::clone(inner.dial_locks.lock().entry(address.to_string()).or_default());
        Self {
            inner,
            address,
            lock,
        }
    }
}

impl Drop for DialSlot<'_> {
    fn drop(&mut self) {
        let mut locks = self.inner.dial_locks.lock();
        // Map entry plus ours: nobody else is waiting.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.address);
        }
    }
}

async fn serve_connection(
    inner: Weak<ClientInner>,
    connection: Arc<Connection>,
    mut incoming: mpsc::UnboundedReceiver<IncomingStream>,
) {
    while let Some(IncomingStream { kind, stream }) = incoming.recv().await {
        let Some(client) = inner.upgrade() else { break };
        let stream = InterceptedStream::new(
            stream,
            Arc::clone(&client.routing),
            connection.remote().clone(),
        );
        match kind {
            StreamKind::Membership => {
                tokio::spawn(serve_membership(Arc::clone(&client.routing), stream));
            }
            StreamKind::Application => {
                // The receiver is still parked in the client until taken.
                let unclaimed = client.inbound_rx.lock().is_some();
                if unclaimed || client.inbound_tx.send(stream).is_err() {
                    trace!(peer = %connection.remote(), "no consumer for application stream");
                }
            }
        }
    }

    connection.closed().await;
    if let Some(client) = inner.upgrade() {
        client.forget(&connection);
    }
}
