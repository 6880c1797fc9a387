//! # Identity Puzzle
//!
//! Node identifiers are minted under two proof-of-work constraints:
//!
//! - **Static**: `BLAKE3(node_id)` has at least `c1` leading zero bits, where
//!   `node_id = BLAKE3(public_key)`. Solved by regenerating the key pair.
//! - **Dynamic**: a 32-byte nonce `X` such that `BLAKE3(node_id XOR X)` has at
//!   least `c2` leading zero bits. Solved by searching nonces.
//!
//! Verification is two hashes per puzzle; minting costs roughly `2^c1` key
//! generations plus `2^c2` hashes.

use crate::hashing::{blake3_hash, Hash};
use crate::signatures::{Ed25519KeyPair, Ed25519PublicKey, Ed25519Signature};
use crate::CryptoError;
use rand::RngCore;

/// Smallest accepted difficulty.
pub const MIN_DIFFICULTY: u32 = 1;

/// Largest accepted difficulty.
pub const MAX_DIFFICULTY: u32 = 32;

/// Attempts allowed per unit of expected work (`2^difficulty`), as a power of two.
const BUDGET_HEADROOM_BITS: u32 = 6;

/// Hard ceiling on attempts for a single puzzle.
const MAX_ATTEMPT_BITS: u32 = 40;

/// Count leading zero bits in a hash.
pub fn leading_zero_bits(hash: &Hash) -> u32 {
    let mut zeros = 0u32;
    for byte in hash {
        if *byte == 0 {
            zeros += 8;
        } else {
            zeros += byte.leading_zeros();
            break;
        }
    }
    zeros
}

/// Identifier for a public key.
pub fn node_id_for(public_key: &[u8; 32]) -> Hash {
    blake3_hash(public_key)
}

fn static_puzzle_holds(node_id: &Hash, c1: u32) -> bool {
    leading_zero_bits(&blake3_hash(node_id)) >= c1
}

fn dynamic_puzzle_holds(node_id: &Hash, nonce: &[u8; 32], c2: u32) -> bool {
    let mut mixed = [0u8; 32];
    for (out, (a, b)) in mixed.iter_mut().zip(node_id.iter().zip(nonce.iter())) {
        *out = a ^ b;
    }
    leading_zero_bits(&blake3_hash(&mixed)) >= c2
}

/// Check both puzzles for a claimed identity.
pub fn verify_puzzle(public_key: &[u8; 32], nonce: &[u8; 32], c1: u32, c2: u32) -> bool {
    let node_id = node_id_for(public_key);
    static_puzzle_holds(&node_id, c1) && dynamic_puzzle_holds(&node_id, nonce, c2)
}

fn check_difficulty(name: &'static str, value: u32) -> Result<(), CryptoError> {
    if (MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value) {
        Ok(())
    } else {
        Err(CryptoError::InvalidDifficulty {
            name,
            value,
            min: MIN_DIFFICULTY,
            max: MAX_DIFFICULTY,
        })
    }
}

fn attempt_budget(difficulty: u32) -> u64 {
    1u64 << (difficulty + BUDGET_HEADROOM_BITS).min(MAX_ATTEMPT_BITS)
}

/// Local identity: signing key, derived identifier and dynamic puzzle nonce.
#[derive(Clone, Debug)]
pub struct Keys {
    keypair: Ed25519KeyPair,
    public_key: Ed25519PublicKey,
    node_id: Hash,
    nonce: [u8; 32],
    c1: u32,
    c2: u32,
}

impl Keys {
    /// Mint a fresh identity satisfying difficulties `c1` and `c2`.
    ///
    /// # Errors
    ///
    /// - `InvalidDifficulty` if either parameter is outside `1..=32`.
    /// - `PuzzleExhausted` if the attempt budget runs out.
    pub fn generate(c1: u32, c2: u32) -> Result<Self, CryptoError> {
        check_difficulty("c1", c1)?;
        check_difficulty("c2", c2)?;

        let budget = attempt_budget(c1);
        let mut keypair = None;
        for _ in 0..budget {
            let candidate = Ed25519KeyPair::generate();
            if static_puzzle_holds(&node_id_for(candidate.public_key().as_bytes()), c1) {
                keypair = Some(candidate);
                break;
            }
        }
        let keypair = keypair.ok_or(CryptoError::PuzzleExhausted {
            difficulty: c1,
            attempts: budget,
        })?;

        let node_id = node_id_for(keypair.public_key().as_bytes());
        let nonce = solve_dynamic(&node_id, c2)?;
        Self::from_parts(keypair, nonce, c1, c2)
    }

    /// Rebuild an identity from stored material, re-checking both puzzles.
    ///
    /// # Errors
    ///
    /// `InvalidDifficulty` or `PuzzleUnsolved`.
    pub fn from_parts(
        keypair: Ed25519KeyPair,
        nonce: [u8; 32],
        c1: u32,
        c2: u32,
    ) -> Result<Self, CryptoError> {
        check_difficulty("c1", c1)?;
        check_difficulty("c2", c2)?;

        let public_key = keypair.public_key();
        if !verify_puzzle(public_key.as_bytes(), &nonce, c1, c2) {
            return Err(CryptoError::PuzzleUnsolved);
        }

        Ok(Self {
            node_id: node_id_for(public_key.as_bytes()),
            keypair,
            public_key,
            nonce,
            c1,
            c2,
        })
    }

    /// Identifier derived from the public key.
    pub fn node_id(&self) -> &Hash {
        &self.node_id
    }

    /// Long-term public key.
    pub fn public_key(&self) -> &Ed25519PublicKey {
        &self.public_key
    }

    /// Dynamic puzzle solution.
    pub fn nonce(&self) -> &[u8; 32] {
        &self.nonce
    }

    /// Static puzzle difficulty.
    pub fn c1(&self) -> u32 {
        self.c1
    }

    /// Dynamic puzzle difficulty.
    pub fn c2(&self) -> u32 {
        self.c2
    }

    /// Sign with the identity key.
    pub fn sign(&self, message: &[u8]) -> Ed25519Signature {
        self.keypair.sign(message)
    }
}

fn solve_dynamic(node_id: &Hash, c2: u32) -> Result<[u8; 32], CryptoError> {
    let budget = attempt_budget(c2);
    let mut rng = rand::thread_rng();
    let mut nonce = [0u8; 32];
    for _ in 0..budget {
        rng.fill_bytes(&mut nonce);
        if dynamic_puzzle_holds(node_id, &nonce, c2) {
            return Ok(nonce);
        }
    }
    Err(CryptoError::PuzzleExhausted {
        difficulty: c2,
        attempts: budget,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_leading_zero_bits() {
        let mut hash = [0u8; 32];
        assert_eq!(leading_zero_bits(&hash), 256);

        hash[0] = 0b0001_0000;
        assert_eq!(leading_zero_bits(&hash), 3);

        hash[0] = 0;
        hash[1] = 0b0100_0000;
        assert_eq!(leading_zero_bits(&hash), 9);
    }

    #[test]
    fn test_generated_keys_satisfy_puzzle() {
        let keys = Keys::generate(4, 4).unwrap();

        assert_eq!(keys.node_id(), &node_id_for(keys.public_key().as_bytes()));
        assert!(verify_puzzle(keys.public_key().as_bytes(), keys.nonce(), 4, 4));
        assert!(leading_zero_bits(&blake3_hash(keys.node_id())) >= 4);
    }

    #[test]
    fn test_invalid_difficulty_rejected() {
        assert!(matches!(
            Keys::generate(0, 1),
            Err(CryptoError::InvalidDifficulty { name: "c1", .. })
        ));
        assert!(matches!(
            Keys::generate(1, 33),
            Err(CryptoError::InvalidDifficulty { name: "c2", .. })
        ));
    }

    #[test]
    fn test_from_parts_rejects_wrong_nonce() {
        let keys = Keys::generate(1, 8).unwrap();
        let rebuilt = Keys::from_parts(keys.keypair.clone(), *keys.nonce(), 1, 8);
        assert!(rebuilt.is_ok());

        // A nonce that fails an 8-bit puzzle exists among a handful of tries.
        let node_id = *keys.node_id();
        let bad = (0u8..=255)
            .map(|b| [b; 32])
            .find(|n| !dynamic_puzzle_holds(&node_id, n, 8))
            .unwrap();
        assert!(matches!(
            Keys::from_parts(keys.keypair.clone(), bad, 1, 8),
            Err(CryptoError::PuzzleUnsolved)
        ));
    }

    #[test]
    fn test_verify_puzzle_detects_higher_difficulty() {
        let keys = Keys::generate(1, 1).unwrap();
        let zeros = leading_zero_bits(&blake3_hash(keys.node_id()));
        assert!(!verify_puzzle(keys.public_key().as_bytes(), keys.nonce(), zeros + 1, 1));
    }
}
