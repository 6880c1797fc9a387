//! # Kadmesh Routing
//!
//! Kademlia-style membership layer: a routing table kept fresh passively by
//! the traffic of an authenticated, encrypted transport.
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture with:
//! - **Domain Layer:** identifiers, XOR metric, buckets and the routing table
//! - **Ports Layer:** liveness probe, message stream and read-only directory
//! - **Service Layer:** concurrent table with lock-probe-lock eviction and
//!   peer-join/peer-leave events
//! - **Transport:** signed handshake, encrypted frames, stream multiplexing
//! - **Client:** dial, listen, bootstrap and the stream interceptors
//!
//! ## Invariants
//!
//! - A bucket never holds more than the bucket size in force at insertion
//! - A peer appears in at most one bucket, the one its distance selects
//! - The local identity is never stored
//! - The table lock is never held across a liveness probe
//!
//! ## Example
//!
//! ```rust
//! use kadmesh_routing::{NodeId, PeerId, RoutingTable};
//!
//! let local = PeerId::new("127.0.0.1:7000", NodeId::zero());
//! let mut table = RoutingTable::new(local, 16);
//!
//! for first in [0x01u8, 0x02, 0x04] {
//!     let mut id = [0u8; 32];
//!     id[31] = first;
//!     table.try_insert(PeerId::new(format!("10.0.0.{first}:7000"), NodeId::new(id)));
//! }
//!
//! let closest = table.find_closest(&NodeId::zero(), 2);
//! assert_eq!(closest[0].node_id.as_bytes()[31], 0x01);
//! assert_eq!(closest[1].node_id.as_bytes()[31], 0x02);
//! ```

#![warn(missing_docs)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

// =============================================================================
// CORE MODULES
// =============================================================================

pub mod domain;
pub mod ports;
pub mod service;

// =============================================================================
// NETWORK MODULES
// =============================================================================

pub mod client;
pub mod transport;

/// Scripted probe, in-memory streams and event recording.
/// Requires feature: `test-utils`
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

// =============================================================================
// RE-EXPORTS
// =============================================================================

// Domain entities
pub use domain::{
    Bucket, Distance, EvictionCommit, IdentityProof, Insertion, KademliaConfig, MembershipError,
    NodeId, PeerId, RoutingTable, UpdateOutcome, DEFAULT_BUCKET_SIZE, NUM_BUCKETS,
};

// Domain services
pub use domain::{bucket_index, cmp_by_distance, find_k_closest, sort_by_distance, xor_distance};

// Port traits
pub use ports::{LivenessProbe, MessageStream, PeerDirectory, ProbeError};

// Service
pub use service::{PeerEvents, PeerHandler, RoutingService};

// Client
pub use client::{Client, ClientConfig, InterceptedStream, PeerStream, ServerHandle};

// Transport
pub use transport::{
    Connection, ConnectionDirection, HandshakeCredentials, Message, StreamKind, TransportError,
};

pub use kadmesh_crypto::Keys;
