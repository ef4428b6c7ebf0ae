//! Broadcast + history feed of console notifications.

use std::{
    collections::VecDeque,
    sync::{PoisonError, RwLock},
};

use futures::StreamExt;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use crate::{event::Notification, traits::ControlPlane};

/// Default number of notifications kept for replay.
pub const DEFAULT_HISTORY: usize = 1000;

/// Upper bound on bytes kept for replay (8 MB).
const HISTORY_BYTES: usize = 8 * 1024 * 1024;

struct Stored {
    notification: Notification,
    bytes: usize,
}

struct Inner {
    history: VecDeque<Stored>,
    total_bytes: usize,
}

/// Notification feed with broadcast and history support.
///
/// A console that reconnects gets the recent history first, then
/// switches to live updates.
pub struct ConsoleFeed {
    inner: RwLock<Inner>,
    sender: broadcast::Sender<Notification>,
    capacity: usize,
}

impl Default for ConsoleFeed {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY)
    }
}

impl ConsoleFeed {
    /// Create a feed keeping at most `capacity` notifications for replay.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(16));
        Self {
            inner: RwLock::new(Inner {
                history: VecDeque::with_capacity(capacity.min(32)),
                total_bytes: 0,
            }),
            sender,
            capacity,
        }
    }

    /// Push a notification to live listeners and history.
    ///
    /// The send happens under the history lock, so a listener started by
    /// [`ConsoleFeed::history_plus_stream`] sees every notification exactly
    /// once.
    pub fn push(&self, notification: Notification) {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let _ = self.sender.send(notification.clone()); // live listeners
        if self.capacity == 0 {
            return;
        }
        let bytes = notification.approx_bytes();

        while inner.history.len() >= self.capacity
            || inner.total_bytes.saturating_add(bytes) > HISTORY_BYTES
        {
            if let Some(front) = inner.history.pop_front() {
                inner.total_bytes = inner.total_bytes.saturating_sub(front.bytes);
            } else {
                break;
            }
        }
        inner.history.push_back(Stored {
            notification,
            bytes,
        });
        inner.total_bytes = inner.total_bytes.saturating_add(bytes);
    }

    /// Receiver for live updates.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Snapshot of the history.
    #[must_use]
    pub fn history(&self) -> Vec<Notification> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .history
            .iter()
            .map(|s| s.notification.clone())
            .collect()
    }

    /// Stream that yields history first, then live updates.
    ///
    /// Listeners that fall behind the broadcast buffer skip the missed
    /// notifications rather than ending the stream.
    #[must_use]
    pub fn history_plus_stream(&self) -> futures::stream::BoxStream<'static, Notification> {
        let (history, rx) = {
            let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
            let history: Vec<_> = inner.history.iter().map(|s| s.notification.clone()).collect();
            (history, self.subscribe())
        };

        let hist = futures::stream::iter(history);
        let live = BroadcastStream::new(rx).filter_map(|res| async move {
            match res {
                Ok(n) => Some(n),
                Err(e) => {
                    tracing::warn!("Console listener lagged: {e}");
                    None
                }
            }
        });

        Box::pin(hist.chain(live))
    }
}

impl ControlPlane for ConsoleFeed {
    fn notify(&self, notification: Notification) {
        self.push(notification);
    }
}
