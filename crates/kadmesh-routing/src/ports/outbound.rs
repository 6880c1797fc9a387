//! # Driven Ports (Outbound SPI)
//!
//! Interfaces the routing core requires from the transport.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::PeerId;
use crate::transport::{Message, TransportError};

/// Liveness check used by ping-before-evict.
///
/// Called without any table lock held. The routing service applies its own
/// timeout on top, so implementations may simply await the network.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; probes for different buckets run
/// concurrently.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// `Ok(())` if `peer` answered.
    async fn probe(&self, peer: &PeerId) -> Result<(), ProbeError>;
}

/// Why a liveness probe failed. Internal to eviction; never surfaced to
/// callers of public operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProbeError {
    /// No answer within the probe timeout
    #[error("liveness probe timed out")]
    Timeout,
    /// Could not reach the peer at all
    #[error("peer unreachable: {0}")]
    Unreachable(String),
    /// Peer answered with something other than a pong
    #[error("unexpected probe response: {0}")]
    UnexpectedResponse(String),
}

/// Bidirectional message stream (`SendMsg`/`RecvMsg`).
///
/// The stream interceptors decorate any implementation of this trait.
#[async_trait]
pub trait MessageStream: Send {
    /// Send one message.
    async fn send_msg(&mut self, message: Message) -> Result<(), TransportError>;

    /// Receive the next message; `Ok(None)` once the remote closed the stream.
    async fn recv_msg(&mut self) -> Result<Option<Message>, TransportError>;
}
