//! Observed playback state

use tokio::sync::{Mutex, watch};

use super::{ClientEvent, EventBus};
use crate::types::{PlaybackState, PlaybackStatus};

/// Last observed playback status plus the one-shot seek offset
///
/// State and position changes are published on the event bus only when the
/// value differs from the previous observation. Duration is replaced
/// silently.
pub struct PlaybackTracker {
    pending_seek: Mutex<Option<u64>>,
    status: watch::Sender<PlaybackStatus>,
    events: EventBus,
}

impl PlaybackTracker {
    /// Start in `stopped` at position 0
    #[must_use]
    pub fn new(events: EventBus) -> Self {
        let (status, _) = watch::channel(PlaybackStatus::stopped());
        Self {
            pending_seek: Mutex::new(None),
            status,
            events,
        }
    }

    /// Last observed status
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        *self.status.borrow()
    }

    /// Watch the observed status
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PlaybackStatus> {
        self.status.subscribe()
    }

    /// Record the offset to seek to once playback starts
    ///
    /// An offset of 0 clears any pending seek.
    pub async fn set_pending_seek(&self, offset: u64) {
        *self.pending_seek.lock().await = (offset > 0).then_some(offset);
    }

    /// Pending seek offset, if any
    pub async fn pending_seek(&self) -> Option<u64> {
        *self.pending_seek.lock().await
    }

    /// Apply a polled status
    ///
    /// Returns the pending seek offset when this observation is a transition
    /// into `playing`; the offset is cleared so it is returned only once.
    pub async fn apply(&self, observed: PlaybackStatus) -> Option<u64> {
        let mut pending = self.pending_seek.lock().await;
        let old = self.status.send_replace(observed);

        let mut seek = None;
        if observed.state != old.state {
            self.events.emit(ClientEvent::StateChanged {
                new: observed.state,
                old: old.state,
            });
            if observed.state == PlaybackState::Playing {
                seek = pending.take();
            }
        }
        if observed.position != old.position {
            self.events.emit(ClientEvent::PositionChanged {
                new: observed.position,
                old: old.position,
            });
        }
        seek
    }

    /// Overwrite only the state, keeping position and duration
    pub async fn force_state(&self, state: PlaybackState) -> Option<u64> {
        let current = self.status();
        self.apply(PlaybackStatus { state, ..current }).await
    }
}

impl std::fmt::Debug for PlaybackTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackTracker")
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
