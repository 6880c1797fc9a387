//! Ping-before-evict across real connections.
//!
//! Every scenario fills bucket 0 of a server with capacity 2 using
//! identities ground for that bucket, then lets a third peer arrive.

#[cfg(test)]
mod tests {
    use crate::support::{eventually, init_tracing, keys_in_bucket, spawn_node, spawn_node_with_keys, TestNode};
    use kadmesh_routing::test_utils::{EventLog, PeerEvent};
    use kadmesh_routing::{ClientConfig, NodeId, UpdateOutcome};
    use std::collections::HashSet;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);
    /// Time for the server to finish the accept-side update, probe included.
    const SETTLE: Duration = Duration::from_millis(300);

    fn server_config() -> ClientConfig {
        ClientConfig::for_testing()
            .with_bucket_size(2)
            .with_probe_timeout(Duration::from_secs(1))
    }

    struct Cluster {
        server: TestNode,
        a: TestNode,
        b: TestNode,
        c: TestNode,
    }

    async fn cluster() -> Cluster {
        let server = spawn_node(server_config()).await.unwrap();
        let local = server.node_id();
        let mut nodes = Vec::with_capacity(3);
        for _ in 0..3 {
            let keys = keys_in_bucket(&local, 0).unwrap();
            nodes.push(
                spawn_node_with_keys(keys, ClientConfig::for_testing())
                    .await
                    .unwrap(),
            );
        }
        let c = nodes.pop().unwrap();
        let b = nodes.pop().unwrap();
        let a = nodes.pop().unwrap();
        Cluster { server, a, b, c }
    }

    fn members(node: &TestNode) -> HashSet<NodeId> {
        node.client.all_peers().iter().map(|p| p.node_id).collect()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_live_tail_keeps_its_slot() {
        init_tracing();
        let Cluster { server, a, b, c } = cluster().await;

        let outcome = server.client.routing().update(a.client.id().clone()).await;
        assert_eq!(outcome, UpdateOutcome::Inserted);
        b.client.dial(server.address()).await.unwrap();
        eventually(WAIT, || members(&server).len() == 2).await.unwrap();

        // the connection itself succeeds; only the table refuses c
        c.client.dial(server.address()).await.unwrap();
        tokio::time::sleep(SETTLE).await;

        let expected: HashSet<NodeId> = [a.node_id(), b.node_id()].into();
        assert_eq!(members(&server), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dead_tail_is_replaced() {
        init_tracing();
        let Cluster { server, a, b, c } = cluster().await;
        let log = EventLog::new();
        server.client.on_peer_join(log.join_recorder());
        server.client.on_peer_leave(log.leave_recorder());

        server.client.routing().update(a.client.id().clone()).await;
        b.client.dial(server.address()).await.unwrap();
        eventually(WAIT, || members(&server).len() == 2).await.unwrap();

        let a_id = a.node_id();
        a.kill();
        c.client.dial(server.address()).await.unwrap();
        eventually(WAIT, || members(&server).contains(&c.node_id()))
            .await
            .unwrap();

        assert_eq!(
            log.snapshot(),
            vec![
                PeerEvent::Joined(a_id),
                PeerEvent::Joined(b.node_id()),
                PeerEvent::Left(a_id),
                PeerEvent::Joined(c.node_id()),
            ]
        );
        let expected: HashSet<NodeId> = [b.node_id(), c.node_id()].into();
        assert_eq!(members(&server), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_refresh_moves_eviction_to_other_peer() {
        init_tracing();
        let Cluster { server, a, b, c } = cluster().await;
        let routing = server.client.routing();

        routing.update(a.client.id().clone()).await;
        routing.update(b.client.id().clone()).await;
        assert_eq!(
            routing.update(a.client.id().clone()).await,
            UpdateOutcome::Refreshed
        );
        assert_eq!(routing.bucket_entries(0)[0].node_id, a.node_id());

        let b_id = b.node_id();
        b.kill();
        c.client.dial(server.address()).await.unwrap();
        eventually(WAIT, || members(&server).contains(&c.node_id()))
            .await
            .unwrap();

        let expected: HashSet<NodeId> = [a.node_id(), c.node_id()].into();
        assert_eq!(members(&server), expected);
        assert!(!members(&server).contains(&b_id));
    }
}
