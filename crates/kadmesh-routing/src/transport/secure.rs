//! Encrypted framed halves produced by a completed handshake.

use kadmesh_crypto::{decrypt, encrypt, Nonce, SecretKey};
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};

use super::frame::{read_frame, write_frame, MAX_PAYLOAD_SIZE};
use super::TransportError;

/// Decrypting half. Frame `n` must decrypt under nonce `n`, so replayed,
/// dropped or reordered frames fail authentication.
pub struct SecureReader<R> {
    inner: R,
    key: SecretKey,
    counter: u64,
}

impl<R: AsyncRead + Unpin + Send> SecureReader<R> {
    pub(crate) fn new(inner: R, key: SecretKey) -> Self {
        Self {
            inner,
            key,
            counter: 0,
        }
    }

    /// Next plaintext frame, `Ok(None)` on clean end of stream.
    pub async fn recv(&mut self) -> Result<Option<Vec<u8>>, TransportError> {
        let Some(ciphertext) = read_frame(&mut self.inner).await? else {
            return Ok(None);
        };
        let nonce = Nonce::from_counter(self.counter);
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or(TransportError::ConnectionClosed)?;
        Ok(Some(decrypt(&self.key, &nonce, &ciphertext)?))
    }
}

/// Encrypting half.
pub struct SecureWriter<W> {
    inner: W,
    key: SecretKey,
    counter: u64,
}

impl<W: AsyncWrite + Unpin + Send> SecureWriter<W> {
    pub(crate) fn new(inner: W, key: SecretKey) -> Self {
        Self {
            inner,
            key,
            counter: 0,
        }
    }

    /// Encrypt and send one frame.
    pub async fn send(&mut self, plaintext: &[u8]) -> Result<(), TransportError> {
        if plaintext.len() > MAX_PAYLOAD_SIZE {
            return Err(TransportError::FrameTooLarge {
                size: plaintext.len(),
                max: MAX_PAYLOAD_SIZE,
            });
        }
        let nonce = Nonce::from_counter(self.counter);
        self.counter = self
            .counter
            .checked_add(1)
            .ok_or(TransportError::ConnectionClosed)?;
        let ciphertext = encrypt(&self.key, &nonce, plaintext)?;
        write_frame(&mut self.inner, &ciphertext).await
    }
}

/// Both halves of an authenticated connection.
pub struct SecureChannel<S> {
    /// Receiving half.
    pub reader: SecureReader<ReadHalf<S>>,
    /// Sending half.
    pub writer: SecureWriter<WriteHalf<S>>,
}

impl<S> std::fmt::Debug for SecureChannel<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureChannel").finish_non_exhaustive()
    }
}
