//! Main `AirPlay` client implementation

use std::sync::Arc;

use tokio::sync::{broadcast, watch};

use crate::connection::{ConnectionManager, ConnectionState, Heartbeat};
use crate::control::{PlaybackController, StatusReporter};
use crate::discovery;
use crate::error::AirPlayError;
use crate::protocol::pairing::PinProvider;
use crate::state::{ClientEvent, EventBus, EventFilter, PlaybackTracker};
use crate::types::{AirPlayConfig, AirPlayDevice, Credentials, PlaybackStatus, SocketRole};


/// `AirPlay` remote-control client
///
/// Owns the connection manager, the heartbeat on the control socket and the
/// status reporter on the info socket.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
///
/// use airplay_remote::protocol::pairing::{FileCredentialStore, StdinPin};
/// use airplay_remote::{AirPlayClient, AirPlayConfig, Credentials};
///
/// # async fn example() -> Result<(), airplay_remote::AirPlayError> {
/// let store = FileCredentialStore::new("credentials.json");
/// let credentials = Credentials::load_or_generate(&store).await?;
///
/// let client = AirPlayClient::find(
///     AirPlayConfig::default(),
///     credentials,
///     Arc::new(StdinPin::default()),
/// )
/// .await?;
///
/// client.connect().await?;
/// client.play("http://example.com/movie.mp4", 30).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct AirPlayClient {
    manager: Arc<ConnectionManager>,
    tracker: Arc<PlaybackTracker>,
    playback: PlaybackController,
    events: EventBus,
}

impl AirPlayClient {
    /// Create a client for `device`
    ///
    /// Nothing is opened until [`AirPlayClient::connect`].
    #[must_use]
    pub fn new(
        device: AirPlayDevice,
        credentials: Credentials,
        config: AirPlayConfig,
        pin: Arc<dyn PinProvider>,
    ) -> Self {
        let events = EventBus::new();
        let tracker = Arc::new(PlaybackTracker::new(events.clone()));

        let heartbeat = Heartbeat::new(tracker.clone(), config.heartbeat_interval);
        let reporter = StatusReporter::new(tracker.clone(), config.poll_interval);
        let manager = Arc::new(
            ConnectionManager::new(device, config, credentials, pin, events.clone())
                .with_task(SocketRole::Control, Arc::new(heartbeat))
                .with_task(SocketRole::Info, Arc::new(reporter)),
        );
        let playback = PlaybackController::new(manager.clone(), tracker.clone());

        Self {
            manager,
            tracker,
            playback,
            events,
        }
    }

    /// Discover the first device on the network and create a client for it
    ///
    /// # Errors
    ///
    /// Returns a discovery error if no device resolves within
    /// `config.discovery_timeout`.
    pub async fn find(
        config: AirPlayConfig,
        credentials: Credentials,
        pin: Arc<dyn PinProvider>,
    ) -> Result<Self, AirPlayError> {
        let device = discovery::find(config.discovery_timeout).await?;
        Ok(Self::new(device, credentials, config, pin))
    }

    // === Connection ===

    /// Open and authenticate the device sockets
    ///
    /// Pairs with the device first if it does not know our key, prompting
    /// the PIN provider.
    ///
    /// # Errors
    ///
    /// Returns the first connection or handshake failure.
    pub async fn connect(&self) -> Result<(), AirPlayError> {
        self.manager.connect().await
    }

    /// Close every socket and stop the periodic tasks
    pub async fn disconnect(&self) {
        self.manager.disconnect().await;
    }

    /// Check if the control socket is ready
    pub async fn is_connected(&self) -> bool {
        self.manager.state(SocketRole::Control).await.is_ready()
    }

    /// Lifecycle state of one socket
    pub async fn socket_state(&self, role: SocketRole) -> ConnectionState {
        self.manager.state(role).await
    }

    /// Target device
    #[must_use]
    pub fn device(&self) -> &AirPlayDevice {
        self.manager.device()
    }

    /// Client identity
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        self.manager.credentials()
    }

    // === Playback ===

    /// Load `url` and start playback, seeking to `offset` seconds once the
    /// device reports `playing`
    ///
    /// # Errors
    ///
    /// Returns error if the play request fails.
    pub async fn play(&self, url: &str, offset: u64) -> Result<(), AirPlayError> {
        self.playback.play(url, offset).await
    }

    /// Seek to `position` seconds
    ///
    /// # Errors
    ///
    /// Returns error if the seek request fails.
    pub async fn seek(&self, position: u64) -> Result<(), AirPlayError> {
        self.playback.seek(position).await
    }

    /// Pause playback
    ///
    /// # Errors
    ///
    /// Returns error if the rate request fails.
    pub async fn pause(&self) -> Result<(), AirPlayError> {
        self.playback.pause().await
    }

    /// Resume playback
    ///
    /// # Errors
    ///
    /// Returns error if the rate request fails.
    pub async fn resume(&self) -> Result<(), AirPlayError> {
        self.playback.resume().await
    }

    /// Stop playback
    ///
    /// # Errors
    ///
    /// Returns error if the stop request fails.
    pub async fn stop(&self) -> Result<(), AirPlayError> {
        self.playback.stop().await
    }

    /// Show a JPEG image on the device
    ///
    /// # Errors
    ///
    /// Returns error if the upload fails.
    pub async fn send_image(&self, image: Vec<u8>) -> Result<(), AirPlayError> {
        self.playback.send_image(image).await
    }

    /// Last observed playback status
    #[must_use]
    pub fn playback_status(&self) -> PlaybackStatus {
        self.tracker.status()
    }

    /// Query the device's playback status now
    ///
    /// # Errors
    ///
    /// Returns error if the info socket is not ready or the query fails.
    pub async fn fetch_playback_info(&self) -> Result<PlaybackStatus, AirPlayError> {
        self.playback.fetch_playback_info().await
    }

    // === Events ===

    /// Subscribe to all client events
    #[must_use]
    pub fn subscribe_events(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    /// Subscribe to state and position changes only
    #[must_use]
    pub fn playback_events(&self) -> EventFilter {
        EventFilter::playback_events(&self.events)
    }

    /// Subscribe to events pushed over the reverse channel
    #[must_use]
    pub fn device_events(&self) -> EventFilter {
        EventFilter::device_events(&self.events)
    }

    /// Watch the observed playback status
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<PlaybackStatus> {
        self.tracker.subscribe()
    }
}

impl std::fmt::Debug for AirPlayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirPlayClient")
            .field("device", self.manager.device())
            .field("status", &self.tracker.status())
            .finish_non_exhaustive()
    }
}
