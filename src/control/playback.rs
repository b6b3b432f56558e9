//! Playback control for `AirPlay`

use std::sync::Arc;

use super::Command;
use super::reporter::fetch_status;
use crate::connection::ConnectionManager;
use crate::error::AirPlayError;
use crate::state::PlaybackTracker;
use crate::types::{PlaybackState, PlaybackStatus, SocketRole};

/// Playback controller
///
/// Every command is exactly one request on the control socket.
#[derive(Debug, Clone)]
pub struct PlaybackController {
    manager: Arc<ConnectionManager>,
    tracker: Arc<PlaybackTracker>,
}

impl PlaybackController {
    /// Create a new playback controller
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>, tracker: Arc<PlaybackTracker>) -> Self {
        Self { manager, tracker }
    }

    /// Load `url` and start playback
    ///
    /// A non-zero `offset` is remembered and sought to once the device first
    /// reports `playing`. After the device accepts the request the observed
    /// state drops to `stopped`, so that transition is always seen.
    ///
    /// # Errors
    ///
    /// Returns the control request's failure.
    pub async fn play(&self, url: &str, offset: u64) -> Result<(), AirPlayError> {
        self.tracker.set_pending_seek(offset).await;
        self.send(Command::Play {
            url: url.to_string(),
        })
        .await?;
        self.tracker.force_state(PlaybackState::Stopped).await;
        Ok(())
    }

    /// Seek to `position` seconds
    ///
    /// # Errors
    ///
    /// Returns the control request's failure.
    pub async fn seek(&self, position: u64) -> Result<(), AirPlayError> {
        self.send(Command::Seek(position)).await
    }

    /// Pause playback
    ///
    /// # Errors
    ///
    /// Returns the control request's failure.
    pub async fn pause(&self) -> Result<(), AirPlayError> {
        self.send(Command::Pause).await
    }

    /// Resume playback
    ///
    /// # Errors
    ///
    /// Returns the control request's failure.
    pub async fn resume(&self) -> Result<(), AirPlayError> {
        self.send(Command::Resume).await
    }

    /// Stop playback
    ///
    /// # Errors
    ///
    /// Returns the control request's failure.
    pub async fn stop(&self) -> Result<(), AirPlayError> {
        self.send(Command::Stop).await
    }

    /// Display a JPEG image
    ///
    /// # Errors
    ///
    /// Returns the control request's failure.
    pub async fn send_image(&self, image: Vec<u8>) -> Result<(), AirPlayError> {
        self.send(Command::Photo(image)).await
    }

    /// Last observed playback status
    #[must_use]
    pub fn status(&self) -> PlaybackStatus {
        self.tracker.status()
    }

    /// Query `/playback-info` once on the info socket
    ///
    /// Unlike the reporter, failures are returned rather than mapped to
    /// `stopped`, and the tracker is not updated.
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::Disconnected`] if the info socket is not ready,
    /// or the request or decode failure.
    pub async fn fetch_playback_info(&self) -> Result<PlaybackStatus, AirPlayError> {
        let connection = self
            .manager
            .connection(SocketRole::Info)
            .await
            .ok_or(AirPlayError::Disconnected {
                role: SocketRole::Info,
            })?;
        fetch_status(&connection).await
    }

    async fn send(&self, command: Command) -> Result<(), AirPlayError> {
        let request = command.request()?;
        match self.manager.send(SocketRole::Control, &request).await {
            Ok(_) => {
                tracing::debug!(command = command.name(), "Command accepted");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(command = command.name(), error = %e, "Command failed");
                Err(e)
            }
        }
    }
}
