use parking_lot::RwLock;
use std::sync::Arc;

use crate::domain::PeerId;

/// Membership change handler.
pub type PeerHandler = Arc<dyn Fn(&PeerId) + Send + Sync>;

/// Single-slot join/leave handlers; registering again replaces the previous one.
#[derive(Default)]
pub struct PeerEvents {
    join: RwLock<Option<PeerHandler>>,
    leave: RwLock<Option<PeerHandler>>,
}

impl PeerEvents {
    /// Register the peer-join handler.
    pub fn on_join<F>(&self, handler: F)
    where
        F: Fn(&PeerId) + Send + Sync + 'static,
    {
        *self.join.write() = Some(Arc::new(handler));
    }

    /// Register the peer-leave handler.
    pub fn on_leave<F>(&self, handler: F)
    where
        F: Fn(&PeerId) + Send + Sync + 'static,
    {
        *self.leave.write() = Some(Arc::new(handler));
    }

    pub(crate) fn fire_join(&self, peer: &PeerId) {
        // Clone out of the slot so the handler may re-register itself.
        let handler = self.join.read().clone();
        if let Some(handler) = handler {
            handler(peer);
        }
    }

    pub(crate) fn fire_leave(&self, peer: &PeerId) {
        let handler = self.leave.read().clone();
        if let Some(handler) = handler {
            handler(peer);
        }
    }
}

impl std::fmt::Debug for PeerEvents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PeerEvents")
            .field("join", &self.join.read().is_some())
            .field("leave", &self.leave.read().is_some())
            .finish()
    }
}
