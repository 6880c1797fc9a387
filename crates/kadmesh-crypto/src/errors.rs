//! Crypto error types.

use thiserror::Error;

/// Cryptographic operation errors.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Decryption failed
    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength {
        /// Expected key length in bytes
        expected: usize,
        /// Actual key length in bytes
        actual: usize,
    },

    /// Signature verification failed
    #[error("Signature verification failed")]
    SignatureVerificationFailed,

    /// Invalid signature format
    #[error("Invalid signature format")]
    InvalidSignatureFormat,

    /// Invalid public key
    #[error("Invalid public key")]
    InvalidPublicKey,

    /// Key agreement produced an all-zero shared secret
    #[error("Key agreement failed: non-contributory public key")]
    KeyAgreementFailed,

    /// Puzzle difficulty outside the supported range
    #[error("Invalid {name} difficulty {value}: must be within {min}..={max}")]
    InvalidDifficulty {
        /// Parameter name (`c1` or `c2`)
        name: &'static str,
        /// Rejected value
        value: u32,
        /// Smallest accepted value
        min: u32,
        /// Largest accepted value
        max: u32,
    },

    /// No identity satisfying the puzzle was found within the attempt budget
    #[error("Identity puzzle exhausted after {attempts} attempts at difficulty {difficulty}")]
    PuzzleExhausted {
        /// Difficulty that could not be met
        difficulty: u32,
        /// Attempts made before giving up
        attempts: u64,
    },

    /// Identity does not satisfy the required puzzle
    #[error("Identity puzzle not satisfied")]
    PuzzleUnsolved,
}
