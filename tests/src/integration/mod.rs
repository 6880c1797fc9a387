//! # Integration Scenarios
//!
//! Real clients talking over loopback TCP.
//!
//! | Module | Scenario |
//! |--------|----------|
//! | `lifecycle` | dial, join/leave events, listener shutdown |
//! | `eviction` | ping-before-evict with live and dead tails |
//! | `passive_refresh` | stream traffic keeps a peer out of eviction |
//! | `convergence` | bootstrap finds every node's true closest peers |
//! | `authentication` | identities below the network difficulty are refused |

pub mod authentication;
pub mod convergence;
pub mod eviction;
pub mod lifecycle;
pub mod passive_refresh;
