//! Value objects: XOR distance, table configuration and update outcomes.

use std::time::Duration;

use super::entities::PeerId;
use super::errors::MembershipError;

/// XOR distance between two identifiers.
///
/// Compared as an unsigned big-endian integer, which is exactly the
/// lexicographic order of the XORed bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Distance(pub [u8; 32]);

impl Distance {
    /// Zero distance (identical identifiers).
    pub fn zero() -> Self {
        Self([0u8; 32])
    }

    /// Number of leading zero bits, i.e. the length of the shared prefix.
    pub fn leading_zeros(&self) -> u32 {
        let mut zeros = 0;
        for byte in &self.0 {
            if *byte == 0 {
                zeros += 8;
            } else {
                return zeros + byte.leading_zeros();
            }
        }
        zeros
    }

    /// Bucket class: index of the highest differing bit counted from the
    /// most significant bit. `None` for zero distance.
    pub fn bucket_index(&self) -> Option<usize> {
        let zeros = self.leading_zeros() as usize;
        (zeros < 256).then_some(zeros)
    }
}

/// Routing table and lookup tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KademliaConfig {
    /// Bucket capacity (default: 16)
    pub bucket_size: usize,
    /// Concurrent queries per bootstrap round (default: 3)
    pub alpha: usize,
    /// Bootstrap round limit (default: 8)
    pub max_bootstrap_rounds: usize,
    /// Optimistic retries of the lock-probe-lock insertion (default: 3)
    pub max_update_attempts: usize,
    /// Liveness probe bound (default: 300ms)
    pub probe_timeout: Duration,
}

impl Default for KademliaConfig {
    fn default() -> Self {
        Self {
            bucket_size: 16,
            alpha: 3,
            max_bootstrap_rounds: 8,
            max_update_attempts: 3,
            probe_timeout: Duration::from_millis(300),
        }
    }
}

impl KademliaConfig {
    /// Create a config suitable for testing (smaller values)
    pub fn for_testing() -> Self {
        Self {
            bucket_size: 2,
            alpha: 2,
            max_bootstrap_rounds: 4,
            max_update_attempts: 3,
            probe_timeout: Duration::from_millis(100),
        }
    }

    /// Reject values that would make the table unusable.
    pub fn validate(&self) -> Result<(), MembershipError> {
        if self.bucket_size == 0 {
            return Err(MembershipError::Configuration(
                "bucket_size must be at least 1".into(),
            ));
        }
        if self.alpha == 0 {
            return Err(MembershipError::Configuration(
                "alpha must be at least 1".into(),
            ));
        }
        if self.max_update_attempts == 0 {
            return Err(MembershipError::Configuration(
                "max_update_attempts must be at least 1".into(),
            ));
        }
        if self.probe_timeout.is_zero() {
            return Err(MembershipError::Configuration(
                "probe_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Result of recording activity for a peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// New peer placed at the front of its bucket (peer-join fired).
    Inserted,
    /// Known peer moved to the front of its bucket.
    Refreshed,
    /// The local identity; nothing stored.
    SelfIgnored,
    /// Identifier already known under a different address; nothing changed.
    AddressConflict,
    /// Bucket full and the tail proved live (or state kept shifting).
    Rejected,
    /// Tail failed its probe and was replaced (peer-leave, then peer-join).
    Replaced {
        /// The evicted tail.
        evicted: PeerId,
    },
    /// Bucket full; ping-before-evict continues on a background task.
    ProbeScheduled,
}

impl UpdateOutcome {
    /// Whether the peer is now a table member.
    pub fn is_member(&self) -> bool {
        matches!(
            self,
            Self::Inserted | Self::Refreshed | Self::Replaced { .. }
        )
    }
}
