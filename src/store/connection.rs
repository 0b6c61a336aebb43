//! Connected/disconnected signal

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Published connection state. Starts disconnected.
#[derive(Debug, Clone)]
pub struct ConnectionState {
    tx: Arc<watch::Sender<bool>>,
}

impl ConnectionState {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Update the signal. Subscribers are only woken when the value changes.
    pub fn set(&self, connected: bool) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == connected {
                return false;
            }
            *current = connected;
            true
        });
        if changed {
            debug!(connected, "Connection state changed");
        }
        changed
    }

    pub fn current(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self::new()
    }
}
