use std::time::Duration;

use kadmesh_crypto::{MAX_DIFFICULTY, MIN_DIFFICULTY};

use crate::domain::{KademliaConfig, MembershipError};

// ============================================================================
// ClientConfig - Node-level tunables
// ============================================================================

/// Client configuration.
///
/// Built from defaults with chainable options:
///
/// ```rust
/// use kadmesh_routing::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_c1(8)
///     .with_c2(8)
///     .with_bucket_size(20)
///     .with_probe_timeout(Duration::from_millis(250));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Static puzzle difficulty required of every identity (default: 16)
    pub c1: u32,
    /// Dynamic puzzle difficulty required of every identity (default: 16)
    pub c2: u32,
    /// Routing table and bootstrap tunables
    pub kademlia: KademliaConfig,
    /// Bound on TCP connect plus handshake when dialing (default: 5s)
    pub dial_timeout: Duration,
    /// Bound on the authenticated handshake (default: 3s)
    pub handshake_timeout: Duration,
    /// Bound on a whole bootstrap (default: 30s)
    pub bootstrap_timeout: Duration,
    /// Contacts dialed by bootstrap when no connection exists yet
    pub bootstrap_nodes: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            c1: 16,
            c2: 16,
            kademlia: KademliaConfig::default(),
            dial_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(3),
            bootstrap_timeout: Duration::from_secs(30),
            bootstrap_nodes: Vec::new(),
        }
    }
}

impl ClientConfig {
    /// Static puzzle difficulty.
    #[must_use]
    pub fn with_c1(mut self, c1: u32) -> Self {
        self.c1 = c1;
        self
    }

    /// Dynamic puzzle difficulty.
    #[must_use]
    pub fn with_c2(mut self, c2: u32) -> Self {
        self.c2 = c2;
        self
    }

    /// Bucket capacity.
    #[must_use]
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.kademlia.bucket_size = bucket_size;
        self
    }

    /// Queries in flight per bootstrap round.
    #[must_use]
    pub fn with_alpha(mut self, alpha: usize) -> Self {
        self.kademlia.alpha = alpha;
        self
    }

    /// Bootstrap round limit.
    #[must_use]
    pub fn with_max_bootstrap_rounds(mut self, rounds: usize) -> Self {
        self.kademlia.max_bootstrap_rounds = rounds;
        self
    }

    /// Liveness probe bound used by ping-before-evict.
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.kademlia.probe_timeout = timeout;
        self
    }

    /// Dial bound.
    #[must_use]
    pub fn with_dial_timeout(mut self, timeout: Duration) -> Self {
        self.dial_timeout = timeout;
        self
    }

    /// Handshake bound.
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Bootstrap bound.
    #[must_use]
    pub fn with_bootstrap_timeout(mut self, timeout: Duration) -> Self {
        self.bootstrap_timeout = timeout;
        self
    }

    /// Initial contacts.
    #[must_use]
    pub fn with_bootstrap_nodes<I, S>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bootstrap_nodes = nodes.into_iter().map(Into::into).collect();
        self
    }

    /// Small, fast settings for tests: difficulty 1, bucket size 2.
    pub fn for_testing() -> Self {
        Self {
            c1: 1,
            c2: 1,
            kademlia: KademliaConfig::for_testing(),
            dial_timeout: Duration::from_secs(2),
            handshake_timeout: Duration::from_secs(2),
            bootstrap_timeout: Duration::from_secs(5),
            bootstrap_nodes: Vec::new(),
        }
    }

    /// Reject settings the client cannot run with.
    ///
    /// # Errors
    ///
    /// `MembershipError::Configuration` naming the offending setting.
    pub fn validate(&self) -> Result<(), MembershipError> {
        for (name, value) in [("c1", self.c1), ("c2", self.c2)] {
            if !(MIN_DIFFICULTY..=MAX_DIFFICULTY).contains(&value) {
                return Err(MembershipError::Configuration(format!(
                    "{name} must be within {MIN_DIFFICULTY}..={MAX_DIFFICULTY}, got {value}"
                )));
            }
        }
        self.kademlia.validate()?;
        for (name, timeout) in [
            ("dial_timeout", self.dial_timeout),
            ("handshake_timeout", self.handshake_timeout),
            ("bootstrap_timeout", self.bootstrap_timeout),
        ] {
            if timeout.is_zero() {
                return Err(MembershipError::Configuration(format!(
                    "{name} must be non-zero"
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// TOML loading (requires "toml-config" feature)
// ============================================================================

#[cfg(feature = "toml-config")]
mod toml_config {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use std::path::Path;

    /// Configuration file structure.
    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct ConfigFile {
        #[serde(default)]
        identity: IdentitySection,
        #[serde(default)]
        kademlia: KademliaSection,
        #[serde(default)]
        timeouts: TimeoutSection,
        #[serde(default)]
        bootstrap: BootstrapSection,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct IdentitySection {
        c1: Option<u32>,
        c2: Option<u32>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct KademliaSection {
        bucket_size: Option<usize>,
        alpha: Option<usize>,
        max_bootstrap_rounds: Option<usize>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct TimeoutSection {
        probe_ms: Option<u64>,
        dial_ms: Option<u64>,
        handshake_ms: Option<u64>,
        bootstrap_ms: Option<u64>,
    }

    #[derive(Debug, Deserialize, Default)]
    #[serde(deny_unknown_fields)]
    struct BootstrapSection {
        #[serde(default)]
        nodes: Vec<String>,
    }

    impl ClientConfig {
        /// Load and validate a TOML configuration file.
        ///
        /// # Config File Format
        ///
        /// ```toml
        /// [identity]
        /// c1 = 16
        /// c2 = 16
        ///
        /// [kademlia]
        /// bucket_size = 16
        /// alpha = 3
        /// max_bootstrap_rounds = 8
        ///
        /// [timeouts]
        /// probe_ms = 300
        /// dial_ms = 5000
        /// handshake_ms = 3000
        /// bootstrap_ms = 30000
        ///
        /// [bootstrap]
        /// nodes = ["10.0.0.1:7000"]
        /// ```
        ///
        /// Missing keys keep their defaults.
        ///
        /// # Errors
        ///
        /// `MembershipError::Configuration` if the file cannot be read,
        /// parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, MembershipError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| {
                MembershipError::Configuration(format!(
                    "cannot read {}: {e}",
                    path.as_ref().display()
                ))
            })?;
            Self::from_toml_str(&content)
        }

        /// Parse and validate configuration from a TOML string.
        ///
        /// # Errors
        ///
        /// `MembershipError::Configuration` on syntax errors, unknown keys or
        /// invalid values.
        pub fn from_toml_str(content: &str) -> Result<Self, MembershipError> {
            let file: ConfigFile = toml::from_str(content)
                .map_err(|e| MembershipError::Configuration(e.to_string()))?;

            let mut config = Self::default();
            let identity = file.identity;
            config.c1 = identity.c1.unwrap_or(config.c1);
            config.c2 = identity.c2.unwrap_or(config.c2);

            let kc = file.kademlia;
            config.kademlia.bucket_size = kc.bucket_size.unwrap_or(config.kademlia.bucket_size);
            config.kademlia.alpha = kc.alpha.unwrap_or(config.kademlia.alpha);
            config.kademlia.max_bootstrap_rounds = kc
                .max_bootstrap_rounds
                .unwrap_or(config.kademlia.max_bootstrap_rounds);

            let t = file.timeouts;
            if let Some(ms) = t.probe_ms {
                config.kademlia.probe_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = t.dial_ms {
                config.dial_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = t.handshake_ms {
                config.handshake_timeout = Duration::from_millis(ms);
            }
            if let Some(ms) = t.bootstrap_ms {
                config.bootstrap_timeout = Duration::from_millis(ms);
            }

            config.bootstrap_nodes = file.bootstrap.nodes;

            config.validate()?;
            Ok(config)
        }
    }
}
