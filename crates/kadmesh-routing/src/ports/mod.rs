//! # Ports Layer - Hexagonal Architecture Boundaries
//!
//! - **Driving Ports (Inbound):** read-only membership queries offered to
//!   the embedding application.
//! - **Driven Ports (Outbound):** what the routing core needs from the
//!   network: a bounded liveness probe and bidirectional message streams.

pub mod inbound;
pub mod outbound;

pub use inbound::PeerDirectory;
pub use outbound::{LivenessProbe, MessageStream, ProbeError};
