//! Kademlia distance calculations.

use std::cmp::Ordering;

use crate::domain::{Distance, NodeId};

/// XOR distance between two identifiers.
///
/// Symmetric, and zero exactly when `a == b`.
pub fn xor_distance(a: &NodeId, b: &NodeId) -> Distance {
    let mut out = [0u8; 32];
    for (o, (x, y)) in out.iter_mut().zip(a.as_bytes().iter().zip(b.as_bytes())) {
        *o = x ^ y;
    }
    Distance(out)
}

/// Bucket for `remote` relative to `local`: index of the highest-order
/// differing bit, 0 for the farthest half of the space.
///
/// `None` when the identifiers are equal (the local node has no bucket).
#[inline]
pub fn bucket_index(local: &NodeId, remote: &NodeId) -> Option<usize> {
    let local_bytes = local.as_bytes();
    let remote_bytes = remote.as_bytes();

    for i in 0..32 {
        let xor = local_bytes[i] ^ remote_bytes[i];
        if xor != 0 {
            return Some(i * 8 + xor.leading_zeros() as usize);
        }
    }
    None
}

/// Order `a` and `b` by distance to `target`, ties broken by identifier bytes.
pub fn cmp_by_distance(target: &NodeId, a: &NodeId, b: &NodeId) -> Ordering {
    xor_distance(target, a)
        .cmp(&xor_distance(target, b))
        .then_with(|| a.cmp(b))
}
