use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use kadmesh_crypto::{verify_puzzle, Keys};

use crate::domain::{MembershipError, NodeId, PeerId};
use crate::ports::PeerDirectory;
use crate::service::RoutingService;
use crate::transport::{Connection, HandshakeCredentials, MuxStream, StreamKind};

use super::config::ClientConfig;
use super::interceptor::InterceptedStream;
use super::protocol::ClientProbe;

/// Application stream with passive refresh applied.
pub type PeerStream = InterceptedStream<MuxStream>;

/// Node-level façade: local identity, routing table and connections.
///
/// Cloning is cheap and every clone drives the same node.
///
/// # Example
///
/// ```rust,ignore
/// let listener = TcpListener::bind("127.0.0.1:0").await?;
/// let address = listener.local_addr()?.to_string();
/// let client = Client::generate(address, ClientConfig::default())?;
/// client.on_peer_join(|peer| tracing::info!(peer = %peer, "joined"));
///
/// let server = client.listen(listener)?;
/// client.dial("10.0.0.1:7000").await?;
/// let closest = client.bootstrap().await;
/// ```
#[derive(Clone)]
pub struct Client {
    pub(super) inner: Arc<ClientInner>,
}

pub(super) struct ClientInner {
    pub(super) keys: Arc<Keys>,
    pub(super) local: PeerId,
    pub(super) config: ClientConfig,
    pub(super) routing: Arc<RoutingService>,
    pub(super) credentials: RwLock<HandshakeCredentials>,
    /// Registered connection per peer; only this one drives eviction.
    pub(super) connections: RwLock<HashMap<NodeId, Arc<Connection>>>,
    /// Serializes dials per address.
    pub(super) dial_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    pub(super) inbound_tx: mpsc::UnboundedSender<PeerStream>,
    pub(super) inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<PeerStream>>>,
    pub(super) ping_nonce: AtomicU64,
}

impl Client {
    /// Create a client advertising `address` for the identity `keys`.
    ///
    /// # Errors
    ///
    /// `MembershipError::Configuration` if `config` does not validate or
    /// `keys` does not meet the configured difficulties.
    pub fn new(
        address: impl Into<String>,
        keys: Keys,
        config: ClientConfig,
    ) -> Result<Self, MembershipError> {
        config.validate()?;
        if !verify_puzzle(keys.public_key().as_bytes(), keys.nonce(), config.c1, config.c2) {
            return Err(MembershipError::Configuration(format!(
                "local identity does not satisfy c1={} c2={}",
                config.c1, config.c2
            )));
        }

        let keys = Arc::new(keys);
        let address = address.into();
        let local = PeerId::from_keys(address.clone(), &keys);

        let probe = Arc::new(ClientProbe::new());
        let routing = Arc::new(RoutingService::new(
            local.clone(),
            &config.kademlia,
            probe.clone(),
        )?);
        let credentials = HandshakeCredentials::new(address, Arc::clone(&keys))
            .with_difficulty(config.c1, config.c2)
            .with_timeout(config.handshake_timeout);
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();

        let inner = Arc::new(ClientInner {
            keys,
            local,
            config,
            routing,
            credentials: RwLock::new(credentials),
            connections: RwLock::new(HashMap::new()),
            dial_locks: Mutex::new(HashMap::new()),
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            ping_nonce: AtomicU64::new(0),
        });
        probe.bind(&inner);

        debug!(local = %inner.local, "client created");
        Ok(Self { inner })
    }

    /// Mint a fresh identity at the configured difficulties and create a
    /// client for it.
    ///
    /// # Errors
    ///
    /// `MembershipError::Configuration` for invalid settings or when no
    /// qualifying identity was found within the attempt budget.
    pub fn generate(
        address: impl Into<String>,
        config: ClientConfig,
    ) -> Result<Self, MembershipError> {
        config.validate()?;
        let keys = Keys::generate(config.c1, config.c2)
            .map_err(|e| MembershipError::Configuration(e.to_string()))?;
        Self::new(address, keys, config)
    }

    /// Local identity.
    pub fn id(&self) -> &PeerId {
        &self.inner.local
    }

    /// Local key material.
    pub fn keys(&self) -> &Keys {
        &self.inner.keys
    }

    /// Configuration in force.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Routing table service backing this client.
    pub fn routing(&self) -> &Arc<RoutingService> {
        &self.inner.routing
    }

    /// Current bucket capacity.
    pub fn bucket_size(&self) -> usize {
        self.inner.routing.bucket_size()
    }

    /// Change bucket capacity for future insertions.
    ///
    /// # Errors
    ///
    /// `MembershipError::Configuration` for zero.
    pub fn set_bucket_size(&self, bucket_size: usize) -> Result<(), MembershipError> {
        self.inner.routing.set_bucket_size(bucket_size)
    }

    /// Replace the handshake credentials used for future dials and accepts.
    ///
    /// Connections already established keep the credentials they were
    /// authenticated with.
    pub fn set_credentials(&self, credentials: HandshakeCredentials) {
        *self.inner.credentials.write() = credentials;
    }

    /// Credentials used for the next handshake.
    pub fn credentials(&self) -> HandshakeCredentials {
        self.inner.credentials.read().clone()
    }

    /// Register the peer-join handler, replacing any previous one.
    ///
    /// Runs inline on the task that inserted the peer; blocking work should
    /// be handed to a separate task.
    pub fn on_peer_join<F>(&self, handler: F)
    where
        F: Fn(&PeerId) + Send + Sync + 'static,
    {
        self.inner.routing.events().on_join(handler);
    }

    /// Register the peer-leave handler, replacing any previous one.
    ///
    /// Same execution rules as [`on_peer_join`](Self::on_peer_join).
    pub fn on_peer_leave<F>(&self, handler: F)
    where
        F: Fn(&PeerId) + Send + Sync + 'static,
    {
        self.inner.routing.events().on_leave(handler);
    }

    /// The `bucket_size` known peers closest to the local node.
    pub fn closest_peers(&self) -> Vec<PeerId> {
        self.closest_peers_to(&self.inner.local.node_id, self.bucket_size())
    }

    /// The `k` known peers closest to `target`, excluding `target`.
    pub fn closest_peers_to(&self, target: &NodeId, k: usize) -> Vec<PeerId> {
        self.inner.routing.find_closest(target, k)
    }

    /// Identifiers of [`closest_peers`](Self::closest_peers).
    pub fn closest_peer_ids(&self) -> Vec<NodeId> {
        self.closest_peers().into_iter().map(|p| p.node_id).collect()
    }

    /// Every peer in the routing table.
    pub fn all_peers(&self) -> Vec<PeerId> {
        self.inner.routing.all_peers()
    }

    /// Number of registered connections.
    pub fn connection_count(&self) -> usize {
        self.inner.connections.read().len()
    }

    /// Registered connection to `node_id`, if any.
    pub fn peer_connection(&self, node_id: &NodeId) -> Option<Arc<Connection>> {
        self.inner.registered(node_id)
    }

    /// Open an application stream to a connected peer.
    ///
    /// # Errors
    ///
    /// `PeerNotConnected` without a registered connection, `Transport` if
    /// the connection is closing.
    pub fn open_stream(&self, node_id: &NodeId) -> Result<PeerStream, MembershipError> {
        let connection = self
            .inner
            .registered(node_id)
            .ok_or_else(|| MembershipError::PeerNotConnected(node_id.to_string()))?;
        let stream = connection.open_stream(StreamKind::Application)?;
        Ok(InterceptedStream::new(
            stream,
            Arc::clone(&self.inner.routing),
            connection.remote().clone(),
        ))
    }

    /// Application streams opened by remote peers.
    ///
    /// Returns `None` after the first call. Until it is taken, incoming
    /// application streams are refused.
    pub fn take_inbound_streams(&self) -> Option<mpsc::UnboundedReceiver<PeerStream>> {
        self.inner.inbound_rx.lock().take()
    }

    /// Close every connection. Each lost peer is evicted with peer-leave
    /// once its connection task notices.
    pub fn shutdown(&self) {
        let connections: Vec<_> = self.inner.connections.read().values().cloned().collect();
        for connection in connections {
            connection.close();
        }
    }
}

impl ClientInner {
    pub(super) fn registered(&self, node_id: &NodeId) -> Option<Arc<Connection>> {
        self.connections
            .read()
            .get(node_id)
            .filter(|c| !c.is_closed())
            .cloned()
    }

    pub(super) fn registered_at(&self, address: &str) -> Option<Arc<Connection>> {
        self.connections
            .read()
            .values()
            .find(|c| c.remote().address == address && !c.is_closed())
            .cloned()
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        for connection in self.connections.get_mut().values() {
            connection.close();
        }
    }
}

impl PeerDirectory for Client {
    fn closest_to(&self, target: &NodeId, k: usize) -> Vec<PeerId> {
        self.closest_peers_to(target, k)
    }

    fn all_peers(&self) -> Vec<PeerId> {
        Client::all_peers(self)
    }

    fn bucket_size(&self) -> usize {
        Client::bucket_size(self)
    }

    fn contains(&self, node_id: &NodeId) -> bool {
        self.inner.routing.get(node_id).is_some()
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("local", &self.inner.local)
            .field("peers", &self.inner.routing.len())
            .field("connections", &self.connection_count())
            .finish_non_exhaustive()
    }
}
