//! Connection lifecycle: join on dial, leave on listener shutdown.

#[cfg(test)]
mod tests {
    use crate::support::{init_tracing, spawn_node};
    use kadmesh_routing::{ClientConfig, NodeId};
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_join_then_leave_on_server_stop() {
        init_tracing();
        let listener = spawn_node(ClientConfig::for_testing()).await.unwrap();
        let dialer = spawn_node(ClientConfig::for_testing()).await.unwrap();

        let (join_tx, mut joins) = mpsc::unbounded_channel::<NodeId>();
        listener.client.on_peer_join(move |peer| {
            let _ = join_tx.send(peer.node_id);
        });
        let (leave_tx, mut leaves) = mpsc::unbounded_channel::<NodeId>();
        dialer.client.on_peer_leave(move |peer| {
            let _ = leave_tx.send(peer.node_id);
        });

        let connection = dialer.client.dial(listener.address()).await.unwrap();
        assert_eq!(connection.remote().node_id, listener.node_id());

        assert_eq!(dialer.client.bootstrap().await.len(), 1);
        assert_eq!(dialer.client.all_peers().len(), 1);
        assert_eq!(dialer.client.closest_peers().len(), 1);
        assert_eq!(dialer.client.closest_peer_ids(), vec![listener.node_id()]);

        let joined = timeout(WAIT, joins.recv()).await.unwrap().unwrap();
        assert_eq!(joined, dialer.node_id());

        listener.server.stop();

        let left = timeout(WAIT, leaves.recv()).await.unwrap().unwrap();
        assert_eq!(left, listener.node_id());
        assert!(dialer.client.all_peers().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_peer_shutdown_evicts_on_both_sides() {
        init_tracing();
        let a = spawn_node(ClientConfig::for_testing()).await.unwrap();
        let b = spawn_node(ClientConfig::for_testing()).await.unwrap();
        let (leave_tx, mut leaves) = mpsc::unbounded_channel::<NodeId>();
        b.client.on_peer_leave(move |peer| {
            let _ = leave_tx.send(peer.node_id);
        });

        a.client.dial(b.address()).await.unwrap();
        crate::support::eventually(WAIT, || b.client.all_peers().len() == 1)
            .await
            .unwrap();

        let a_id = a.node_id();
        a.kill();

        let left = timeout(WAIT, leaves.recv()).await.unwrap().unwrap();
        assert_eq!(left, a_id);
        assert_eq!(b.client.connection_count(), 0);
    }
}
