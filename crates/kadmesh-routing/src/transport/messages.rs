//! Wire messages.

use bincode::Options;
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::frame::MAX_PAYLOAD_SIZE;
use super::TransportError;
use crate::domain::{NodeId, PeerId};

/// Messages exchanged on a stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Liveness probe.
    Ping {
        /// Echoed in the pong.
        nonce: u64,
    },
    /// Liveness answer.
    Pong {
        /// Nonce of the ping being answered.
        nonce: u64,
    },
    /// Ask for the responder's closest peers to `target`.
    FindNode {
        /// Lookup target.
        target: NodeId,
    },
    /// Answer to `FindNode`.
    Nodes {
        /// Closest known peers, each with its identity proof.
        peers: Vec<PeerId>,
    },
    /// Opaque payload of the embedding application.
    Application(Vec<u8>),
    /// Request could not be served.
    Error {
        /// Human-readable reason.
        reason: String,
    },
}

/// What a newly opened stream carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamKind {
    /// Ping and FindNode requests served by the membership layer.
    Membership,
    /// Handed to the embedding application.
    Application,
}

/// Multiplexing frame carried inside one secured connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    /// Open stream `stream_id` (odd ids from the dialer, even from the acceptor).
    Open {
        /// Stream identifier.
        stream_id: u32,
        /// Stream purpose.
        kind: StreamKind,
    },
    /// One message on an open stream.
    Data {
        /// Stream identifier.
        stream_id: u32,
        /// Payload.
        message: Message,
    },
    /// The sender will not use `stream_id` again.
    Close {
        /// Stream identifier.
        stream_id: u32,
    },
}

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_PAYLOAD_SIZE as u64)
}

/// Serialize with the wire codec.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, TransportError> {
    Ok(codec().serialize(value)?)
}

/// Deserialize with the wire codec; rejects oversized length prefixes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, TransportError> {
    Ok(codec().deserialize(bytes)?)
}
