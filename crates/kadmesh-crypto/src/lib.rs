//! # Kadmesh Crypto - Identity and Channel Primitives
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `signatures` | Ed25519 | Handshake authentication |
//! | `exchange` | X25519 | Ephemeral key agreement |
//! | `symmetric` | XChaCha20-Poly1305 | Frame encryption |
//! | `hashing` | BLAKE3 | Identifiers, puzzles, key derivation |
//! | `puzzle` | BLAKE3 leading zeros | Sybil-resistant identity minting |
//!
//! ## Identity
//!
//! A node identifier is `BLAKE3(public_key)`. It is only accepted when it
//! satisfies the static puzzle (`c1` leading zero bits in
//! `BLAKE3(identifier)`) and carries a nonce solving the dynamic puzzle
//! (`c2` leading zero bits in `BLAKE3(identifier XOR nonce)`).

#![warn(missing_docs)]
#![warn(clippy::all)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod errors;
pub mod exchange;
pub mod hashing;
pub mod puzzle;
pub mod signatures;
pub mod symmetric;

// Re-exports
pub use errors::CryptoError;
pub use exchange::{EphemeralKeyPair, SharedSecret};
pub use hashing::{blake3_derive_key, blake3_hash, blake3_hash_many, Blake3Hasher, Hash};
pub use puzzle::{
    leading_zero_bits, node_id_for, verify_puzzle, Keys, MAX_DIFFICULTY, MIN_DIFFICULTY,
};
pub use signatures::{sign, verify, Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
pub use symmetric::{decrypt, encrypt, Nonce, SecretKey};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version() {
        assert!(!super::VERSION.is_empty());
    }
}
