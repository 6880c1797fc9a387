//! Domain Layer - Pure routing logic with no I/O
//!
//! - Node identifiers, peer descriptors and the XOR metric
//! - Buckets ordered by recency and the routing table built from them
//! - The error taxonomy shared by every layer

pub mod entities;
pub mod errors;
pub mod routing_table;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use routing_table::*;
pub use services::*;
pub use value_objects::*;
