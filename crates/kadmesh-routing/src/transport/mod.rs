//! Transport layer.
//!
//! ## Layers
//!
//! - `frame` - `u32` big-endian length-prefixed frames over any byte stream
//! - `handshake` - signed hello exchange, X25519 agreement, key confirmation
//! - `secure` - XChaCha20-Poly1305 framed reader/writer with counter nonces
//! - `connection` - stream multiplexing over one secured connection
//! - `messages` - membership RPC messages and mux frames (bincode)

mod connection;
mod error;
mod frame;
mod handshake;
mod messages;
mod secure;

pub use connection::{Connection, ConnectionDirection, IncomingStream, MuxStream};
pub use error::TransportError;
pub use frame::{read_frame, write_frame, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use handshake::{HandshakeCredentials, Hello, Role, PROTOCOL_VERSION};
pub use messages::{decode, encode, Frame, Message, StreamKind};
pub use secure::{SecureChannel, SecureReader, SecureWriter};
