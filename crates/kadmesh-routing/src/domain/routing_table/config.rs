//! Routing table constants.

/// Number of buckets (one per bit of NodeId)
pub const NUM_BUCKETS: usize = 256;

/// Default bucket capacity
pub const DEFAULT_BUCKET_SIZE: usize = 16;
