//! # Client
//!
//! Node-level façade over the routing service and the secure transport.
//!
//! ## Data flow
//!
//! ```text
//! dial / accept ──► handshake ──► register connection ──► update (peer-join)
//!                                        │
//!      every stream ──► InterceptedStream ──► observe (passive refresh)
//!                                        │
//!      connection lost ──► forget ──► evict (peer-leave)
//! ```
//!
//! Only the registered connection of a peer drives eviction on loss;
//! duplicates (for example from simultaneous dials in both directions) are
//! served but otherwise ignored.

mod bootstrap;
mod config;
mod core;
mod dial;
mod interceptor;
mod protocol;

pub use config::ClientConfig;
pub use core::{Client, PeerStream};
pub use dial::ServerHandle;
pub use interceptor::InterceptedStream;
