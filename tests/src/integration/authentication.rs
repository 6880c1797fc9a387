//! Identities that do not meet the network difficulty never enter a table.

#[cfg(test)]
mod tests {
    use crate::support::{init_tracing, spawn_node, spawn_node_with_keys};
    use kadmesh_crypto::{blake3_hash, leading_zero_bits, Keys};
    use kadmesh_routing::{ClientConfig, MembershipError};
    use std::time::Duration;

    const NETWORK_DIFFICULTY: u32 = 8;

    /// Identity that passes difficulty 1 but not the network's static puzzle.
    fn weak_keys() -> Keys {
        loop {
            let keys = Keys::generate(1, 1).unwrap();
            if leading_zero_bits(&blake3_hash(keys.node_id())) < NETWORK_DIFFICULTY {
                return keys;
            }
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_weak_identity_is_refused() {
        init_tracing();
        let strict = ClientConfig::for_testing()
            .with_c1(NETWORK_DIFFICULTY)
            .with_c2(NETWORK_DIFFICULTY);
        let server = spawn_node(strict).await.unwrap();
        let rogue = spawn_node_with_keys(weak_keys(), ClientConfig::for_testing())
            .await
            .unwrap();

        let result = rogue.client.dial(server.address()).await;

        assert!(matches!(
            result,
            Err(MembershipError::DialFailed { .. } | MembershipError::AuthenticationFailed(_))
        ));
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(server.client.all_peers().is_empty());
        assert_eq!(server.client.connection_count(), 0);
        assert!(rogue.client.all_peers().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dialer_refuses_weak_server() {
        init_tracing();
        let weak = spawn_node_with_keys(weak_keys(), ClientConfig::for_testing())
            .await
            .unwrap();
        let strict = ClientConfig::for_testing()
            .with_c1(NETWORK_DIFFICULTY)
            .with_c2(NETWORK_DIFFICULTY);
        let dialer = spawn_node(strict).await.unwrap();

        let result = dialer.client.dial(weak.address()).await;

        assert!(matches!(
            result,
            Err(MembershipError::AuthenticationFailed(_))
        ));
        assert!(dialer.client.all_peers().is_empty());
    }
}
