use kadmesh_crypto::CryptoError;
use thiserror::Error;

/// Errors that can occur in transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Socket-level failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Frame length prefix above the limit.
    #[error("frame of {size} bytes exceeds limit of {max}")]
    FrameTooLarge {
        /// Announced or attempted size.
        size: usize,
        /// Limit in force.
        max: usize,
    },

    /// Malformed message encoding.
    #[error("codec error: {0}")]
    Codec(String),

    /// Signature, key agreement or frame authentication failure.
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    /// Handshake protocol violation.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Remote speaks another protocol version.
    #[error("protocol version mismatch: local {local}, remote {remote}")]
    VersionMismatch {
        /// Our version.
        local: u16,
        /// Advertised remote version.
        remote: u16,
    },

    /// Remote identity does not satisfy the identity puzzle.
    #[error("remote identity failed the puzzle")]
    PuzzleRejected,

    /// Remote presented our own identity.
    #[error("connection to self rejected")]
    SelfConnection,

    /// The connection is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// A bounded operation ran out of time.
    #[error("operation timed out")]
    Timeout,
}

impl TransportError {
    /// Whether this error means the remote failed to authenticate, as
    /// opposed to a plain connectivity failure.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            Self::Handshake(_)
                | Self::VersionMismatch { .. }
                | Self::PuzzleRejected
                | Self::SelfConnection
                | Self::Crypto(_)
        )
    }
}

impl From<bincode::Error> for TransportError {
    fn from(err: bincode::Error) -> Self {
        Self::Codec(err.to_string())
    }
}
