//! # Routing Service
//!
//! Concurrent front-end to the domain `RoutingTable`.
//!
//! ## Locking discipline
//!
//! The table sits behind a single `RwLock`. Updates that hit a full bucket
//! run in three phases: lock to pick the tail, probe it with no lock held,
//! re-lock and commit only if the bucket is unchanged. A live tail rejects
//! the newcomer only if it still fills its bucket on re-check. Queries take
//! a read lock and never wait on the network.
//!
//! ## Events
//!
//! Join and leave handlers run inline on the task that changed membership,
//! after the table lock has been released but before any later change is
//! dispatched, so handlers see membership in table order. A handler that
//! needs to block should hand the work to its own task; while it runs,
//! other membership changes wait.

mod api;
mod core;
mod events;

pub use core::RoutingService;
pub use events::{PeerEvents, PeerHandler};
