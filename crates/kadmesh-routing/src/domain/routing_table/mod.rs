//! Routing Table Implementation
//!
//! The table is synchronous and lock-free by itself; the routing service
//! wraps it in a lock and runs liveness probes between the two locked
//! phases of an insertion.

mod bucket;
mod config;
mod table;

pub use bucket::Bucket;
pub use config::{DEFAULT_BUCKET_SIZE, NUM_BUCKETS};
pub use table::{EvictionCommit, Insertion, RoutingTable};
