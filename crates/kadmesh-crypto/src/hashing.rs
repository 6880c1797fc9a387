//! # BLAKE3 Hashing
//!
//! Node identifiers, puzzle digests, handshake transcripts and session key
//! derivation all go through BLAKE3.

/// BLAKE3 hash output (256-bit).
pub type Hash = [u8; 32];

/// Incremental BLAKE3 hasher used for handshake transcripts.
#[derive(Clone, Default)]
pub struct Blake3Hasher {
    inner: blake3::Hasher,
}

impl Blake3Hasher {
    /// Create new hasher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Absorb a length-prefixed field so that adjacent fields cannot be
    /// shifted into each other.
    pub fn absorb(&mut self, field: &[u8]) -> &mut Self {
        self.inner.update(&(field.len() as u64).to_be_bytes());
        self.inner.update(field);
        self
    }

    /// Finalize and return hash.
    pub fn finalize(&self) -> Hash {
        *self.inner.finalize().as_bytes()
    }
}

/// Hash data with BLAKE3 (one-shot).
pub fn blake3_hash(data: &[u8]) -> Hash {
    *blake3::hash(data).as_bytes()
}

/// Hash the concatenation of several inputs.
pub fn blake3_hash_many(inputs: &[&[u8]]) -> Hash {
    let mut hasher = blake3::Hasher::new();
    for input in inputs {
        hasher.update(input);
    }
    *hasher.finalize().as_bytes()
}

/// Derive a 32-byte key from context string and input key material.
pub fn blake3_derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    blake3::derive_key(context, key_material)
}
