//! Tests for Domain Services - XOR metric and closest-peer selection

use super::*;
use crate::domain::{Distance, NodeId, PeerId};

fn make_node_id(last_byte: u8) -> NodeId {
    let mut bytes = [0u8; 32];
    bytes[31] = last_byte;
    NodeId::new(bytes)
}

fn make_peer(last_byte: u8) -> PeerId {
    PeerId::new(format!("127.0.0.1:{}", 9000 + last_byte as u16), make_node_id(last_byte))
}

// =============================================================================
// Test Group 1: XOR Distance Calculation
// =============================================================================

#[test]
fn test_xor_distance_is_symmetric() {
    let a = make_node_id(0b1010_0000);
    let b = make_node_id(0b0101_0000);

    assert_eq!(xor_distance(&a, &b), xor_distance(&b, &a));
}

#[test]
fn test_xor_distance_to_self_is_zero() {
    let a = make_node_id(0b1010_1010);
    assert_eq!(xor_distance(&a, &a), Distance::zero());
}

#[test]
fn test_bucket_index_counts_from_most_significant_bit() {
    let local = NodeId::zero();

    let mut remote = [0u8; 32];
    remote[0] = 0b1000_0000;
    assert_eq!(bucket_index(&local, &NodeId::new(remote)), Some(0));

    let mut remote = [0u8; 32];
    remote[0] = 0b0100_0000;
    assert_eq!(bucket_index(&local, &NodeId::new(remote)), Some(1));

    let mut remote = [0u8; 32];
    remote[1] = 0b1000_0000;
    assert_eq!(bucket_index(&local, &NodeId::new(remote)), Some(8));

    assert_eq!(bucket_index(&local, &make_node_id(1)), Some(255));
    assert_eq!(bucket_index(&local, &local), None);
}

#[test]
fn test_bucket_index_matches_distance_class() {
    let local = make_node_id(0x5A);
    for b in 0u8..=255 {
        let remote = make_node_id(b);
        assert_eq!(
            bucket_index(&local, &remote),
            xor_distance(&local, &remote).bucket_index()
        );
    }
}

// =============================================================================
// Test Group 2: Closest-Peer Selection
// =============================================================================

#[test]
fn test_find_k_closest_orders_by_ascending_distance() {
    let peers = vec![make_peer(0x04), make_peer(0x01), make_peer(0x02)];

    let closest = find_k_closest(peers, &NodeId::zero(), 2);

    let ids: Vec<_> = closest.iter().map(|p| p.node_id).collect();
    assert_eq!(ids, vec![make_node_id(0x01), make_node_id(0x02)]);
}

#[test]
fn test_find_k_closest_excludes_target() {
    let peers = vec![make_peer(0x01), make_peer(0x02), make_peer(0x03)];

    let closest = find_k_closest(peers, &make_node_id(0x02), 5);

    assert_eq!(closest.len(), 2);
    assert!(closest.iter().all(|p| p.node_id != make_node_id(0x02)));
    // 0x02 ^ 0x03 = 1 < 0x02 ^ 0x01 = 3
    assert_eq!(closest[0].node_id, make_node_id(0x03));
}

#[test]
fn test_find_k_closest_returns_fewer_when_short() {
    let closest = find_k_closest(vec![make_peer(7)], &NodeId::zero(), 16);
    assert_eq!(closest.len(), 1);
}

#[test]
fn test_cmp_by_distance_is_total_order() {
    let target = NodeId::zero();
    let a = make_node_id(3);
    let b = make_node_id(3);
    assert_eq!(cmp_by_distance(&target, &a, &b), std::cmp::Ordering::Equal);

    // Distinct ids never tie under XOR, so ordering is total.
    let c = make_node_id(5);
    assert_eq!(cmp_by_distance(&target, &a, &c), std::cmp::Ordering::Less);
}
