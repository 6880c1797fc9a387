//! Stream traffic counts as liveness: a chatty peer is never the one
//! probed for eviction.

#[cfg(test)]
mod tests {
    use crate::support::{eventually, init_tracing, keys_in_bucket, spawn_node, spawn_node_with_keys};
    use kadmesh_routing::{ClientConfig, Message, MessageStream, NodeId};
    use std::collections::HashSet;
    use std::time::Duration;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_application_traffic_protects_sender() {
        init_tracing();
        let server = spawn_node(
            ClientConfig::for_testing()
                .with_bucket_size(2)
                .with_probe_timeout(Duration::from_secs(1)),
        )
        .await
        .unwrap();
        let local = server.node_id();
        let mut inbound = server.client.take_inbound_streams().unwrap();

        let chatty = spawn_node_with_keys(keys_in_bucket(&local, 0).unwrap(), ClientConfig::for_testing())
            .await
            .unwrap();
        let quiet = spawn_node_with_keys(keys_in_bucket(&local, 0).unwrap(), ClientConfig::for_testing())
            .await
            .unwrap();
        let late = spawn_node_with_keys(keys_in_bucket(&local, 0).unwrap(), ClientConfig::for_testing())
            .await
            .unwrap();

        chatty.client.dial(server.address()).await.unwrap();
        let routing = server.client.routing();
        eventually(WAIT, || routing.get(&chatty.node_id()).is_some())
            .await
            .unwrap();
        routing.update(quiet.client.id().clone()).await;
        assert_eq!(routing.bucket_entries(0)[1].node_id, chatty.node_id());

        let mut outgoing = chatty.client.open_stream(&local).unwrap();
        for i in 0..3u8 {
            outgoing
                .send_msg(Message::Application(vec![i]))
                .await
                .unwrap();
        }
        let mut incoming = tokio::time::timeout(WAIT, inbound.recv())
            .await
            .unwrap()
            .unwrap();
        for i in 0..3u8 {
            assert_eq!(
                incoming.recv_msg().await.unwrap(),
                Some(Message::Application(vec![i]))
            );
        }
        assert_eq!(routing.bucket_entries(0)[0].node_id, chatty.node_id());

        let quiet_id = quiet.node_id();
        quiet.kill();
        late.client.dial(server.address()).await.unwrap();
        eventually(WAIT, || routing.get(&late.node_id()).is_some())
            .await
            .unwrap();

        let members: HashSet<NodeId> = routing.all_peers().iter().map(|p| p.node_id).collect();
        let expected: HashSet<NodeId> = [chatty.node_id(), late.node_id()].into();
        assert_eq!(members, expected);
        assert!(!members.contains(&quiet_id));
    }
}
