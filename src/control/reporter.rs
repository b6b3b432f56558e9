//! Info-socket status polling

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;

use super::Command;
use crate::connection::{ConnectionManager, SocketTask};
use crate::error::AirPlayError;
use crate::net::DeviceConnection;
use crate::protocol::plist;
use crate::state::PlaybackTracker;
use crate::types::{PlaybackStatus, SocketRole};

/// Request and decode `/playback-info` on `connection`
///
/// # Errors
///
/// Returns the request failure or [`AirPlayError::Codec`] for a body that is
/// not a property list. An empty body decodes as `stopped`.
pub async fn fetch_status(connection: &DeviceConnection) -> Result<PlaybackStatus, AirPlayError> {
    let response = connection.request(&Command::PlaybackInfo.request()?).await?;
    if response.body.is_empty() {
        return Ok(PlaybackStatus::stopped());
    }
    let info = plist::decode(&response.body)?;
    Ok(PlaybackStatus::from_playback_info(&info))
}

/// Polling task for the info socket
///
/// Each poll runs to completion before the next one is scheduled, so a slow
/// device stretches the period rather than stacking requests.
#[derive(Debug)]
pub struct StatusReporter {
    tracker: Arc<PlaybackTracker>,
    interval: Duration,
}

impl StatusReporter {
    /// Poll every `interval`, publishing into `tracker`
    #[must_use]
    pub fn new(tracker: Arc<PlaybackTracker>, interval: Duration) -> Self {
        Self { tracker, interval }
    }

    /// One poll: fetch, publish, and run the pending seek on a transition to
    /// `playing`
    pub async fn poll(&self, manager: &Weak<ConnectionManager>, connection: &DeviceConnection) {
        let observed = match fetch_status(connection).await {
            Ok(status) => status,
            Err(e) => {
                tracing::debug!(role = %connection.role(), error = %e, "Status poll failed");
                PlaybackStatus::stopped()
            }
        };

        let Some(offset) = self.tracker.apply(observed).await else {
            return;
        };
        let Some(manager) = manager.upgrade() else {
            return;
        };
        tracing::debug!(offset, "Applying initial seek");
        let result = match Command::Seek(offset).request() {
            Ok(request) => manager.send(SocketRole::Control, &request).await.map(|_| ()),
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(offset, error = %e, "Initial seek failed");
        }
    }
}

#[async_trait]
impl SocketTask for StatusReporter {
    async fn run(&self, manager: Weak<ConnectionManager>, connection: Arc<DeviceConnection>) {
        loop {
            self.poll(&manager, &connection).await;
            tokio::time::sleep(self.interval).await;
        }
    }
}
