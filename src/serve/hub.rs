// src/serve/hub.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::debug;

/// Message fanned out to every connected client stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HubMessage {
    /// Reload, tagged with a sequence number.
    Reload(u64),
    /// The server is shutting down; streams end.
    Close,
}

/// Broadcasts reload signals to live-reload clients.
///
/// Cloning is cheap; all clones share the same channel.
#[derive(Debug, Clone)]
pub struct ReloadHub {
    tx: broadcast::Sender<HubMessage>,
    sent: Arc<AtomicU64>,
}

impl Default for ReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ReloadHub {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(16);
        Self {
            tx,
            sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Push a reload signal to every connected client.
    ///
    /// Fire-and-forget: returns how many clients were reached, which is
    /// zero when nobody is listening.
    pub fn notify_reload(&self) -> usize {
        let seq = self.sent.fetch_add(1, Ordering::SeqCst) + 1;
        let reached = self.tx.send(HubMessage::Reload(seq)).unwrap_or(0);
        debug!(seq, clients = reached, "reload signal sent");
        reached
    }

    /// Number of reload signals sent so far, whether or not anyone listened.
    pub fn reloads_sent(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    pub fn client_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HubMessage> {
        self.tx.subscribe()
    }

    /// Tell every open stream to end.
    pub(crate) fn close_all(&self) {
        let _ = self.tx.send(HubMessage::Close);
    }
}
