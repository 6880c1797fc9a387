//! # X25519 Key Agreement
//!
//! Each handshake uses a fresh ephemeral pair; the long-term Ed25519 key
//! only signs the ephemeral public key.

use crate::CryptoError;
use x25519_dalek::{EphemeralSecret, PublicKey};
use zeroize::Zeroize;

/// Ephemeral X25519 key pair, consumed by [`EphemeralKeyPair::agree`].
pub struct EphemeralKeyPair {
    secret: EphemeralSecret,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generate a fresh pair.
    pub fn generate() -> Self {
        let secret = EphemeralSecret::random_from_rng(rand::thread_rng());
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Public half to send to the remote side.
    pub fn public_bytes(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Complete the exchange with the remote public key.
    ///
    /// # Errors
    ///
    /// `CryptoError::KeyAgreementFailed` for low-order remote keys.
    pub fn agree(self, remote_public: [u8; 32]) -> Result<SharedSecret, CryptoError> {
        let shared = self.secret.diffie_hellman(&PublicKey::from(remote_public));
        if !shared.was_contributory() {
            return Err(CryptoError::KeyAgreementFailed);
        }
        Ok(SharedSecret(shared.to_bytes()))
    }
}

/// Raw Diffie-Hellman output, wiped on drop.
pub struct SharedSecret([u8; 32]);

impl SharedSecret {
    /// Get inner bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Drop for SharedSecret {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_both_sides_agree() {
        let alice = EphemeralKeyPair::generate();
        let bob = EphemeralKeyPair::generate();
        let alice_pub = alice.public_bytes();
        let bob_pub = bob.public_bytes();

        let s1 = alice.agree(bob_pub).unwrap();
        let s2 = bob.agree(alice_pub).unwrap();
        assert_eq!(s1.as_bytes(), s2.as_bytes());
    }

    #[test]
    fn test_low_order_key_rejected() {
        let pair = EphemeralKeyPair::generate();
        assert!(matches!(
            pair.agree([0u8; 32]),
            Err(CryptoError::KeyAgreementFailed)
        ));
    }
}
