//! Domain Services - Pure functions for Kademlia operations
//!
//! All functions in this module are pure (no I/O, no state mutation)
//! and deterministic (same inputs → same outputs).

mod distance;
mod sorting;

pub use distance::{bucket_index, cmp_by_distance, xor_distance};
pub use sorting::{find_k_closest, sort_by_distance};

#[cfg(test)]
mod tests;
