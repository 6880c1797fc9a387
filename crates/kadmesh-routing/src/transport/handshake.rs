//! Authenticated key exchange.
//!
//! 1. Both sides send a [`Hello`]: identity key, puzzle nonce, an ephemeral
//!    X25519 key and an Ed25519 signature over the ephemeral key and the
//!    advertised address.
//! 2. Each side verifies the signature, the identity puzzle and that the
//!    remote is not itself.
//! 3. Directional session keys are derived from the shared secret and the
//!    hash of both hellos.
//! 4. Each side sends the transcript hash encrypted under its new key and
//!    checks the one it receives. No RPC flows before this completes.

use std::sync::Arc;
use std::time::Duration;

use kadmesh_crypto::{
    blake3_derive_key, verify, verify_puzzle, Blake3Hasher, EphemeralKeyPair, Ed25519PublicKey,
    Keys, SecretKey,
};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;
use zeroize::Zeroize;

use super::frame::{read_frame, write_frame};
use super::messages::{decode, encode};
use super::secure::{SecureChannel, SecureReader, SecureWriter};
use super::TransportError;
use crate::domain::{IdentityProof, NodeId, PeerId};

/// Handshake protocol version.
pub const PROTOCOL_VERSION: u16 = 1;

const HELLO_DOMAIN: &[u8] = b"kadmesh-hello-v1:";
const KEY_CONTEXT_INITIATOR: &str = "kadmesh 2026-10 session key initiator to responder";
const KEY_CONTEXT_RESPONDER: &str = "kadmesh 2026-10 session key responder to initiator";
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(3);

/// Side of the connection; decides which derived key is used to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The dialing side.
    Initiator,
    /// The accepting side.
    Responder,
}

/// First handshake message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hello {
    /// Protocol version.
    pub version: u16,
    /// Address the sender accepts connections on.
    pub address: String,
    /// Long-term Ed25519 public key.
    pub public_key: [u8; 32],
    /// Dynamic puzzle solution.
    pub puzzle_nonce: [u8; 32],
    /// Ephemeral X25519 public key.
    pub ephemeral: [u8; 32],
    /// Signature over `HELLO_DOMAIN || ephemeral || address`.
    pub signature: Vec<u8>,
}

fn signed_payload(ephemeral: &[u8; 32], address: &str) -> Vec<u8> {
    let mut payload = Vec::with_capacity(HELLO_DOMAIN.len() + 32 + address.len());
    payload.extend_from_slice(HELLO_DOMAIN);
    payload.extend_from_slice(ephemeral);
    payload.extend_from_slice(address.as_bytes());
    payload
}

/// Local credentials for authenticating connections.
///
/// Remote identities must satisfy puzzle difficulties `c1`/`c2`, which
/// default to the local identity's own difficulties.
#[derive(Clone)]
pub struct HandshakeCredentials {
    keys: Arc<Keys>,
    address: String,
    c1: u32,
    c2: u32,
    timeout: Duration,
}

impl HandshakeCredentials {
    /// Credentials advertising `address` for the identity `keys`.
    pub fn new(address: impl Into<String>, keys: Arc<Keys>) -> Self {
        let (c1, c2) = (keys.c1(), keys.c2());
        Self {
            keys,
            address: address.into(),
            c1,
            c2,
            timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Require remote identities to meet these difficulties.
    #[must_use]
    pub fn with_difficulty(mut self, c1: u32, c2: u32) -> Self {
        self.c1 = c1;
        self.c2 = c2;
        self
    }

    /// Bound the whole handshake.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Advertised address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Local identity as seen by remote peers.
    pub fn local_peer(&self) -> PeerId {
        PeerId::from_keys(self.address.clone(), &self.keys)
    }

    /// Authenticate `stream` and return the remote identity with the
    /// encrypted channel.
    ///
    /// # Errors
    ///
    /// Any failure leaves nothing registered; the caller drops the stream.
    pub async fn authenticate<S>(
        &self,
        stream: S,
        role: Role,
    ) -> Result<(PeerId, SecureChannel<S>), TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        tokio::time::timeout(self.timeout, self.run(stream, role))
            .await
            .map_err(|_| TransportError::Timeout)?
    }

    async fn run<S>(
        &self,
        stream: S,
        role: Role,
    ) -> Result<(PeerId, SecureChannel<S>), TransportError>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send,
    {
        let (mut rd, mut wr) = tokio::io::split(stream);
        let ephemeral = EphemeralKeyPair::generate();

        let local_hello = self.hello(ephemeral.public_bytes());
        let local_bytes = encode(&local_hello)?;
        write_frame(&mut wr, &local_bytes).await?;

        let remote_bytes = read_frame(&mut rd)
            .await?
            .ok_or(TransportError::ConnectionClosed)?;
        let remote_hello: Hello = decode(&remote_bytes)?;
        let remote = self.verify_hello(&remote_hello)?;

        let shared = ephemeral.agree(remote_hello.ephemeral)?;
        let (initiator_hello, responder_hello) = match role {
            Role::Initiator => (&local_bytes, &remote_bytes),
            Role::Responder => (&remote_bytes, &local_bytes),
        };
        let transcript = Blake3Hasher::new()
            .absorb(initiator_hello)
            .absorb(responder_hello)
            .finalize();

        let mut material = [0u8; 64];
        material[..32].copy_from_slice(shared.as_bytes());
        material[32..].copy_from_slice(&transcript);
        let initiator_key = SecretKey::from_bytes(blake3_derive_key(KEY_CONTEXT_INITIATOR, &material));
        let responder_key = SecretKey::from_bytes(blake3_derive_key(KEY_CONTEXT_RESPONDER, &material));
        material.zeroize();

        let (send_key, recv_key) = match role {
            Role::Initiator => (initiator_key, responder_key),
            Role::Responder => (responder_key, initiator_key),
        };
        let mut reader = SecureReader::new(rd, recv_key);
        let mut writer = SecureWriter::new(wr, send_key);

        writer.send(&transcript).await?;
        let confirm = reader
            .recv()
            .await?
            .ok_or(TransportError::ConnectionClosed)?;
        if confirm.as_slice() != transcript.as_slice() {
            return Err(TransportError::Handshake("transcript mismatch".into()));
        }

        debug!(peer = %remote, ?role, "handshake complete");
        Ok((remote, SecureChannel { reader, writer }))
    }

    fn hello(&self, ephemeral: [u8; 32]) -> Hello {
        let signature = self.keys.sign(&signed_payload(&ephemeral, &self.address));
        Hello {
            version: PROTOCOL_VERSION,
            address: self.address.clone(),
            public_key: *self.keys.public_key().as_bytes(),
            puzzle_nonce: *self.keys.nonce(),
            ephemeral,
            signature: signature.as_bytes().to_vec(),
        }
    }

    fn verify_hello(&self, hello: &Hello) -> Result<PeerId, TransportError> {
        if hello.version != PROTOCOL_VERSION {
            return Err(TransportError::VersionMismatch {
                local: PROTOCOL_VERSION,
                remote: hello.version,
            });
        }
        Ed25519PublicKey::from_bytes(hello.public_key)?;

        let node_id = NodeId::from_public_key(&hello.public_key);
        if node_id.as_bytes() == self.keys.node_id() {
            return Err(TransportError::SelfConnection);
        }
        if !verify(
            &hello.public_key,
            &signed_payload(&hello.ephemeral, &hello.address),
            &hello.signature,
        ) {
            return Err(TransportError::Handshake("invalid hello signature".into()));
        }
        if !verify_puzzle(&hello.public_key, &hello.puzzle_nonce, self.c1, self.c2) {
            return Err(TransportError::PuzzleRejected);
        }

        Ok(PeerId::with_proof(
            hello.address.clone(),
            IdentityProof {
                public_key: hello.public_key,
                nonce: hello.puzzle_nonce,
            },
        ))
    }
}

impl std::fmt::Debug for HandshakeCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeCredentials")
            .field("address", &self.address)
            .field("node_id", &NodeId::new(*self.keys.node_id()))
            .field("c1", &self.c1)
            .field("c2", &self.c2)
            .field("timeout", &self.timeout)
            .finish()
    }
}
