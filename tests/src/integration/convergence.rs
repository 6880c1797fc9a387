//! Bootstrap convergence: after joining through a single contact, every
//! node's view of its own neighbourhood matches the true XOR ordering.

#[cfg(test)]
mod tests {
    use crate::support::{eventually, init_tracing, spawn_node, true_closest, TestNode};
    use kadmesh_routing::{ClientConfig, NodeId};
    use std::time::Duration;

    const NODES: usize = 8;
    const NEIGHBOURS: usize = 3;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bootstrap_converges_to_true_closest() {
        init_tracing();
        let config = ClientConfig::for_testing().with_bucket_size(16);
        let mut nodes: Vec<TestNode> = Vec::with_capacity(NODES);
        for _ in 0..NODES {
            nodes.push(spawn_node(config.clone()).await.unwrap());
        }
        let ids: Vec<NodeId> = nodes.iter().map(TestNode::node_id).collect();

        let contact = nodes[0].address().to_string();
        for node in &nodes[1..] {
            node.client.dial(&contact).await.unwrap();
        }
        eventually(Duration::from_secs(5), || {
            nodes[0].client.all_peers().len() == NODES - 1
        })
        .await
        .unwrap();

        for _ in 0..2 {
            for node in &nodes {
                node.client.bootstrap().await;
            }
        }

        for node in &nodes {
            let id = node.node_id();
            let found: Vec<NodeId> = node
                .client
                .closest_peers_to(&id, NEIGHBOURS)
                .iter()
                .map(|p| p.node_id)
                .collect();
            assert_eq!(found, true_closest(&ids, &id, NEIGHBOURS), "node {id}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bootstrap_through_configured_contact() {
        init_tracing();
        let seed = spawn_node(ClientConfig::for_testing()).await.unwrap();
        let first = spawn_node(ClientConfig::for_testing()).await.unwrap();
        first.client.dial(seed.address()).await.unwrap();
        eventually(Duration::from_secs(5), || seed.client.all_peers().len() == 1)
            .await
            .unwrap();

        let config = ClientConfig::for_testing().with_bootstrap_nodes([seed.address().to_string()]);
        let newcomer = spawn_node(config).await.unwrap();
        let found: Vec<NodeId> = newcomer
            .client
            .bootstrap()
            .await
            .iter()
            .map(|p| p.node_id)
            .collect();

        assert_eq!(found.len(), 2);
        assert!(found.contains(&seed.node_id()));
        assert!(found.contains(&first.node_id()));
    }
}
