//! Notifications from the reading engine to whatever shell hosts it.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Events are dropped for subscribers that fall this far behind
const DEFAULT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReaderEvent {
    PageRendered { page: usize, words: usize },
    RenderFailed { page: usize, reason: String },
    PageTurned { from: usize, to: usize },
    PlaybackChanged { playing: bool },
    SpeedChanged { wpm: u32 },
    ProgressSaved { page: usize, word_index: usize },
    ProgressSaveFailed { reason: String },
    SessionCompleted { duration_secs: u64, word_count: usize, wpm: u32 },
}

/// Broadcast bus owned by the application shell
///
/// Cloning shares the channel. Publishing with nobody listening is fine.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<ReaderEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReaderEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: ReaderEvent) {
        trace!("event: {:?}", event);
        // An error only means there are no receivers right now
        let _ = self.sender.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
