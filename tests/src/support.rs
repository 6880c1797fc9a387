//! Shared fixtures for multi-node scenarios.

use anyhow::{bail, Context};
use kadmesh_crypto::Keys;
use kadmesh_routing::{bucket_index, Client, ClientConfig, NodeId, ServerHandle};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

/// Attempts before giving up on finding an identity in a given bucket.
const MAX_IDENTITY_ATTEMPTS: usize = 4096;

/// Install a test-friendly subscriber once per process, filtered by
/// `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// A listening client.
pub struct TestNode {
    /// The node.
    pub client: Client,
    /// Its accept loop.
    pub server: ServerHandle,
}

impl TestNode {
    /// Node identifier.
    pub fn node_id(&self) -> NodeId {
        self.client.id().node_id
    }

    /// Advertised address.
    pub fn address(&self) -> &str {
        &self.client.id().address
    }

    /// Stop listening and drop every connection, as if the process died.
    pub fn kill(self) {
        self.server.stop();
        self.client.shutdown();
    }
}

/// Spawn a node with a fresh identity.
pub async fn spawn_node(config: ClientConfig) -> anyhow::Result<TestNode> {
    let keys = Keys::generate(config.c1, config.c2)?;
    spawn_node_with_keys(keys, config).await
}

/// Spawn a node for the given identity on an ephemeral loopback port.
pub async fn spawn_node_with_keys(keys: Keys, config: ClientConfig) -> anyhow::Result<TestNode> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?.to_string();
    let client = Client::new(address, keys, config)?;
    let server = client.listen(listener)?;
    tracing::debug!(node = %client.id(), "test node listening");
    Ok(TestNode { client, server })
}

/// Identity (difficulty 1) that lands in bucket `bucket` of `local`.
pub fn keys_in_bucket(local: &NodeId, bucket: usize) -> anyhow::Result<Keys> {
    for _ in 0..MAX_IDENTITY_ATTEMPTS {
        let keys = Keys::generate(1, 1)?;
        if bucket_index(local, &NodeId::new(*keys.node_id())) == Some(bucket) {
            return Ok(keys);
        }
    }
    bail!("no identity found for bucket {bucket}")
}

/// The `k` identifiers in `ids` closest to `target`, excluding `target`.
pub fn true_closest(ids: &[NodeId], target: &NodeId, k: usize) -> Vec<NodeId> {
    let mut others: Vec<NodeId> = ids.iter().copied().filter(|id| id != target).collect();
    others.sort_by(|a, b| kadmesh_routing::cmp_by_distance(target, a, b));
    others.truncate(k);
    others
}

/// Wait up to `timeout` for `condition`, polling every 10ms.
pub async fn eventually(
    timeout: std::time::Duration,
    mut condition: impl FnMut() -> bool,
) -> anyhow::Result<()> {
    tokio::time::timeout(timeout, async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    })
    .await
    .context("condition not reached in time")
}
