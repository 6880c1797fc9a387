//! Error taxonomy for the membership layer.

use thiserror::Error;

use crate::transport::TransportError;

/// Errors surfaced by public operations.
///
/// Liveness probe failures never appear here: they are contained inside the
/// routing service and only show up as a peer-leave/peer-join pair.
#[derive(Debug, Error)]
pub enum MembershipError {
    /// Malformed difficulty parameters, bucket size or timeouts.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Connecting or completing the handshake failed; the table is untouched.
    #[error("dial {address} failed: {reason}")]
    DialFailed {
        /// Address that was dialed.
        address: String,
        /// Underlying cause.
        reason: String,
    },

    /// Remote did not produce a valid authenticated identity.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// No registered connection to the requested peer.
    #[error("peer {0} is not connected")]
    PeerNotConnected(String),

    /// Peer answered a membership request with something unexpected.
    #[error("unexpected response from peer: {0}")]
    UnexpectedResponse(String),

    /// A caller-bounded operation ran out of time.
    #[error("{operation} timed out")]
    Timeout {
        /// Operation that timed out.
        operation: &'static str,
    },

    /// Transport failure on an established connection.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

