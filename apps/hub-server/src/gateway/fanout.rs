//! Broadcast hub for fanning events out to connected sessions.
//!
//! Uses a single `tokio::sync::broadcast` channel. Each session subscribes
//! and filters frames locally by origin, which is how "everyone except the
//! sender" routing works in this single-process architecture.

use std::sync::Arc;

use tokio::sync::broadcast;

use super::events::ServerEvent;

/// Capacity of the broadcast channel. Slow receivers that fall behind will
/// skip messages (RecvError::Lagged).
const BROADCAST_CAPACITY: usize = 4096;

/// A frame fanned out to all connected sessions.
#[derive(Debug, Clone)]
pub struct BroadcastFrame {
    /// Connection that originated the event. Sessions drop their own frames;
    /// `None` means deliver to everyone, originator included.
    pub origin: Option<String>,
    pub event: ServerEvent,
}

/// The global broadcast hub. Cloneable — store in AppState.
#[derive(Clone)]
pub struct HubBroadcast {
    sender: broadcast::Sender<Arc<BroadcastFrame>>,
}

impl HubBroadcast {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self { sender }
    }

    /// Subscribe to the broadcast channel. Each session calls this once.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<BroadcastFrame>> {
        self.sender.subscribe()
    }

    /// Fan an event out to every session except `origin` (all sessions when
    /// `origin` is `None`).
    pub fn dispatch(&self, origin: Option<&str>, event: ServerEvent) {
        // send() returns Err if there are no receivers — that's fine.
        let _ = self.sender.send(Arc::new(BroadcastFrame {
            origin: origin.map(str::to_string),
            event,
        }));
    }
}

impl Default for HubBroadcast {
    fn default() -> Self {
        Self::new()
    }
}
