//! # Ed25519 Signatures
//!
//! Handshake authentication. The signing key never leaves
//! [`Ed25519KeyPair`]; its seed is wiped when the pair is dropped.

use crate::CryptoError;
use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use zeroize::Zeroize;

/// Ed25519 public key (32 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Ed25519PublicKey([u8; 32]);

impl Ed25519PublicKey {
    /// Create from bytes, rejecting encodings that are not curve points.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, CryptoError> {
        VerifyingKey::from_bytes(&bytes).map_err(|_| CryptoError::InvalidPublicKey)?;
        Ok(Self(bytes))
    }

    /// Create from an arbitrary slice (wire decoding).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Self::from_bytes(array)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Ed25519Signature) -> Result<(), CryptoError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CryptoError::InvalidPublicKey)?;
        let sig = ed25519_dalek::Signature::from_bytes(&signature.0);

        verifying_key
            .verify_strict(message, &sig)
            .map_err(|_| CryptoError::SignatureVerificationFailed)
    }
}

/// Ed25519 signature (64 bytes).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Ed25519Signature([u8; 64]);

impl Ed25519Signature {
    /// Create from bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Create from an arbitrary slice (wire decoding).
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; 64] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSignatureFormat)?;
        Ok(Self(array))
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

/// Ed25519 keypair.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
}

impl Ed25519KeyPair {
    /// Generate random keypair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self { signing_key }
    }

    /// Create from secret seed (32 bytes).
    pub fn from_seed(seed: [u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(&seed);
        Self { signing_key }
    }

    /// Get public key.
    pub fn public_key(&self) -> Ed25519PublicKey {
        Ed25519PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message (deterministic).
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(message).to_bytes())
    }

    /// Get secret seed.
    pub fn to_seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl Clone for Ed25519KeyPair {
    fn clone(&self) -> Self {
        let mut seed = self.to_seed();
        let pair = Self::from_seed(seed);
        seed.zeroize();
        pair
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Sign `message` with `keypair`.
pub fn sign(keypair: &Ed25519KeyPair, message: &[u8]) -> Ed25519Signature {
    keypair.sign(message)
}

/// Verify raw wire bytes: `true` only for a well-formed key and a valid signature.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    let Ok(key) = Ed25519PublicKey::from_slice(public_key) else {
        return false;
    };
    let Ok(sig) = Ed25519Signature::from_slice(signature) else {
        return false;
    };
    key.verify(message, &sig).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify() {
        let keypair = Ed25519KeyPair::generate();
        let signature = sign(&keypair, b"hello");

        assert!(verify(keypair.public_key().as_bytes(), b"hello", signature.as_bytes()));
        assert!(!verify(keypair.public_key().as_bytes(), b"other", signature.as_bytes()));
    }

    #[test]
    fn test_wrong_key_fails() {
        let keypair1 = Ed25519KeyPair::generate();
        let keypair2 = Ed25519KeyPair::generate();

        let signature = keypair1.sign(b"test");
        assert!(keypair2.public_key().verify(b"test", &signature).is_err());
    }

    #[test]
    fn test_malformed_inputs_do_not_verify() {
        let keypair = Ed25519KeyPair::generate();
        let signature = keypair.sign(b"m");

        assert!(!verify(&[0u8; 31], b"m", signature.as_bytes()));
        assert!(!verify(keypair.public_key().as_bytes(), b"m", &[0u8; 10]));
    }

    #[test]
    fn test_clone_preserves_identity() {
        let original = Ed25519KeyPair::from_seed([0xAB; 32]);
        let cloned = original.clone();
        assert_eq!(original.public_key(), cloned.public_key());
        assert_eq!(original.sign(b"x"), cloned.sign(b"x"));
    }

    #[test]
    fn test_clone_outlives_original() {
        let original = Ed25519KeyPair::generate();
        let public_key = original.public_key();
        let cloned = original.clone();
        drop(original);

        let signature = cloned.sign(b"after drop");
        assert!(public_key.verify(b"after drop", &signature).is_ok());
        assert_eq!(cloned.public_key(), public_key);
    }
}
