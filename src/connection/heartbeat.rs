//! Control-socket keep-alive

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;

use super::{ConnectionManager, SocketTask};
use crate::control::Command;
use crate::net::DeviceConnection;
use crate::state::PlaybackTracker;
use crate::types::PlaybackState;

/// Command that re-asserts the observed state, if any
///
/// Receivers drop an idle control connection; repeating the current rate
/// keeps it alive without changing playback.
#[must_use]
pub fn keep_alive_command(state: PlaybackState) -> Option<Command> {
    match state {
        PlaybackState::Playing => Some(Command::Resume),
        PlaybackState::Paused => Some(Command::Pause),
        PlaybackState::Stopped => None,
    }
}

/// Keep-alive task for the control socket
#[derive(Debug)]
pub struct Heartbeat {
    tracker: Arc<PlaybackTracker>,
    interval: Duration,
}

impl Heartbeat {
    /// Beat every `interval` based on the tracker's observed state
    #[must_use]
    pub fn new(tracker: Arc<PlaybackTracker>, interval: Duration) -> Self {
        Self { tracker, interval }
    }
}

#[async_trait]
impl SocketTask for Heartbeat {
    async fn run(&self, _manager: Weak<ConnectionManager>, connection: Arc<DeviceConnection>) {
        let role = connection.role();
        loop {
            tokio::time::sleep(self.interval).await;

            let state = self.tracker.status().state;
            let Some(command) = keep_alive_command(state) else {
                continue;
            };
            tracing::debug!(%role, %state, "Heartbeat");
            let result = match command.request() {
                Ok(request) => connection.request(&request).await.map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                tracing::warn!(%role, error = %e, "Heartbeat failed");
            }
        }
    }
}
