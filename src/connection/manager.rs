//! Connection manager for `AirPlay` devices

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::ConnectionState;
use crate::error::{AirPlayError, HandshakeStep};
use crate::net::{DeviceConnection, ReverseConnection};
use crate::protocol::crypto::Ed25519KeyPair;
use crate::protocol::http::{HttpRequest, HttpResponse};
use crate::protocol::pairing::{
    PAIR_SETUP_PATH, PAIR_VERIFY_PATH, PIN_START_PATH, PairSetup, PairVerify, PairingError,
    PinProvider,
};
use crate::protocol::plist;
use crate::state::{ClientEvent, EventBus};
use crate::types::{AirPlayConfig, AirPlayDevice, Credentials, SocketRole};

/// Periodic work bound to one socket role
///
/// Started each time the socket becomes ready and aborted as soon as it
/// closes, so a task never outlives its connection.
#[async_trait]
pub trait SocketTask: Send + Sync {
    /// Run until aborted
    async fn run(&self, manager: Weak<ConnectionManager>, connection: Arc<DeviceConnection>);
}

/// Socket task for the event role: runs the reverse channel and republishes
/// pushed messages as [`ClientEvent::DeviceEvent`]
#[derive(Debug, Default)]
pub struct EventChannel;

#[async_trait]
impl SocketTask for EventChannel {
    async fn run(&self, manager: Weak<ConnectionManager>, connection: Arc<DeviceConnection>) {
        let Some(events) = manager.upgrade().map(|m| m.events.clone()) else {
            return;
        };
        let role = connection.role();
        let reverse = ReverseConnection::new(connection);
        if let Err(e) = reverse
            .run(|message| events.emit(ClientEvent::DeviceEvent { message }))
            .await
        {
            tracing::warn!(%role, error = %e, "Event channel failed");
        }
    }
}

#[derive(Default)]
struct Slot {
    state: ConnectionState,
    connection: Option<Arc<DeviceConnection>>,
    task: Option<JoinHandle<()>>,
    /// Waits for the connection to close and drives the reconnect
    supervisor: Option<JoinHandle<()>>,
}

impl Slot {
    fn stop_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Connection manager handles the device's sockets
pub struct ConnectionManager {
    device: AirPlayDevice,
    config: AirPlayConfig,
    credentials: Credentials,
    /// Long-term identity, derived once and shared by every handshake
    long_term: Ed25519KeyPair,
    pin: Arc<dyn PinProvider>,
    events: EventBus,
    tasks: HashMap<SocketRole, Arc<dyn SocketTask>>,
    slots: Mutex<HashMap<SocketRole, Slot>>,
    shutting_down: AtomicBool,
}

impl ConnectionManager {
    /// Create a new connection manager
    ///
    /// The event role runs [`EventChannel`] unless replaced with
    /// [`ConnectionManager::with_task`].
    #[must_use]
    pub fn new(
        device: AirPlayDevice,
        config: AirPlayConfig,
        credentials: Credentials,
        pin: Arc<dyn PinProvider>,
        events: EventBus,
    ) -> Self {
        let long_term = credentials.key_pair();
        let mut tasks: HashMap<SocketRole, Arc<dyn SocketTask>> = HashMap::new();
        tasks.insert(SocketRole::Event, Arc::new(EventChannel));

        Self {
            device,
            config,
            credentials,
            long_term,
            pin,
            events,
            tasks,
            slots: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
        }
    }

    /// Attach the periodic task for a role
    #[must_use]
    pub fn with_task(mut self, role: SocketRole, task: Arc<dyn SocketTask>) -> Self {
        self.tasks.insert(role, task);
        self
    }

    /// Target device
    #[must_use]
    pub fn device(&self) -> &AirPlayDevice {
        &self.device
    }

    /// Client configuration
    #[must_use]
    pub fn config(&self) -> &AirPlayConfig {
        &self.config
    }

    /// Client identity
    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Event bus shared with the rest of the client
    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Current state of a socket
    pub async fn state(&self, role: SocketRole) -> ConnectionState {
        self.slots
            .lock()
            .await
            .get(&role)
            .map_or(ConnectionState::Disconnected, |slot| slot.state)
    }

    /// The ready connection for a role
    pub async fn connection(&self, role: SocketRole) -> Option<Arc<DeviceConnection>> {
        let slots = self.slots.lock().await;
        let slot = slots.get(&role)?;
        if slot.state.is_ready() {
            slot.connection.clone()
        } else {
            None
        }
    }

    /// Open and authenticate the control and info sockets, plus the event
    /// socket when enabled
    ///
    /// If any socket fails, the ones already opened are torn down again.
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::InvalidState`] if already connected, or the
    /// first connection or handshake error.
    pub async fn connect(self: &Arc<Self>) -> Result<(), AirPlayError> {
        if self.state(SocketRole::Control).await.is_active() {
            return Err(AirPlayError::InvalidState {
                message: "already connected or connecting".to_string(),
            });
        }
        self.shutting_down.store(false, Ordering::SeqCst);

        let mut roles = vec![SocketRole::Control, SocketRole::Info];
        if self.config.enable_event_channel {
            roles.push(SocketRole::Event);
        }

        for role in roles {
            if let Err(e) = self.open(role).await {
                tracing::warn!(%role, error = %e, "Connect failed");
                self.disconnect().await;
                return Err(e);
            }
        }

        tracing::info!(device = %self.device, "Connected");
        Ok(())
    }

    /// Close every socket
    ///
    /// Close watchers and periodic tasks are stopped first so teardown does
    /// not trigger a reconnect. A failure on one socket does not stop the
    /// others from closing.
    pub async fn disconnect(&self) {
        self.shutting_down.store(true, Ordering::SeqCst);

        let mut drained: Vec<(SocketRole, Slot)> = self.slots.lock().await.drain().collect();
        drained.sort_by_key(|(role, _)| *role);

        for (role, mut slot) in drained {
            if let Some(supervisor) = slot.supervisor.take() {
                supervisor.abort();
            }
            slot.stop_task();
            if let Some(connection) = slot.connection.take() {
                connection.close().await;
            }
            if slot.state != ConnectionState::Disconnected {
                self.emit_state(role, slot.state, ConnectionState::Disconnected);
            }
        }

        tracing::info!(device = %self.device, "Disconnected");
    }

    /// Send a request on a ready socket, requiring status 200
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::Disconnected`] if the socket is not ready, or
    /// the request's own failure.
    pub async fn send(
        &self,
        role: SocketRole,
        request: &HttpRequest,
    ) -> Result<HttpResponse, AirPlayError> {
        let connection = self
            .connection(role)
            .await
            .ok_or(AirPlayError::Disconnected { role })?;
        connection.request(request).await
    }

    /// Connect and authenticate one socket, then start its task and watcher
    async fn open(self: &Arc<Self>, role: SocketRole) -> Result<(), AirPlayError> {
        self.set_state(role, ConnectionState::Connecting).await;

        let connection = match self.establish(role).await {
            Ok(connection) => Arc::new(connection),
            Err(e) => {
                self.set_state(role, ConnectionState::Disconnected).await;
                return Err(e);
            }
        };

        if self.shutting_down.load(Ordering::SeqCst) {
            connection.close().await;
            self.set_state(role, ConnectionState::Disconnected).await;
            return Err(AirPlayError::InvalidState {
                message: "disconnect in progress".to_string(),
            });
        }

        let old = {
            let mut slots = self.slots.lock().await;
            let slot = slots.entry(role).or_default();
            slot.stop_task();
            slot.connection = Some(connection.clone());
            let old = std::mem::replace(&mut slot.state, ConnectionState::Ready);

            slot.task = self.tasks.get(&role).map(|task| {
                let task = task.clone();
                let manager = Arc::downgrade(self);
                let connection = connection.clone();
                tokio::spawn(async move { task.run(manager, connection).await })
            });
            // A previous watcher is the one running this reconnect; it ends on its own
            slot.supervisor = Some(tokio::spawn(Self::supervise(
                Arc::downgrade(self),
                role,
                connection,
            )));
            old
        };
        self.emit_state(role, old, ConnectionState::Ready);

        tracing::info!(%role, "Socket ready");
        Ok(())
    }

    async fn establish(&self, role: SocketRole) -> Result<DeviceConnection, AirPlayError> {
        let connection = DeviceConnection::connect(
            &self.device,
            role,
            self.config.connection_timeout,
            self.config.request_timeout,
        )
        .await?;

        self.set_state(role, ConnectionState::Authenticating).await;
        if let Err(e) = self.authenticate(&connection).await {
            connection.close().await;
            return Err(e);
        }
        Ok(connection)
    }

    /// Wait for the socket to close, then stop its task and reconnect
    fn supervise(
        manager: Weak<Self>,
        role: SocketRole,
        connection: Arc<DeviceConnection>,
    ) -> BoxFuture<'static, ()> {
        async move {
            connection.closed().await;

            let Some(manager) = manager.upgrade() else {
                return;
            };
            if manager.shutting_down.load(Ordering::SeqCst) {
                return;
            }
            {
                let mut slots = manager.slots.lock().await;
                let Some(slot) = slots.get_mut(&role) else {
                    return;
                };
                if !slot
                    .connection
                    .as_ref()
                    .is_some_and(|current| Arc::ptr_eq(current, &connection))
                {
                    return;
                }
                slot.stop_task();
                slot.connection = None;
            }

            tracing::warn!(%role, "Socket closed by device");
            manager.reconnect(role).await;
        }
        .boxed()
    }

    async fn reconnect(self: &Arc<Self>, role: SocketRole) {
        let policy = self.config.reconnect;
        let mut last_error = "reconnect disabled".to_string();

        for attempt in 0..policy.max_attempts {
            let delay = policy.delay_for(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if self.shutting_down.load(Ordering::SeqCst) {
                return;
            }

            tracing::info!(%role, attempt = attempt + 1, "Reconnecting");
            match self.open(role).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(%role, attempt = attempt + 1, error = %e, "Reconnect failed");
                    last_error = e.to_string();
                }
            }
        }

        self.set_state(role, ConnectionState::Disconnected).await;
        tracing::warn!(%role, "Giving up on socket");
        self.events.emit(ClientEvent::ReconnectFailed {
            role,
            message: last_error,
        });
    }

    /// Pair-verify, falling back to pair-setup and a second verify when the
    /// device rejects our key
    async fn authenticate(&self, connection: &DeviceConnection) -> Result<(), AirPlayError> {
        let role = connection.role();
        match self.verify(connection).await {
            Ok(()) => {
                tracing::debug!(%role, "Pair-verify succeeded");
                return Ok(());
            }
            Err(e @ AirPlayError::HandshakeFailed { .. }) => {
                tracing::info!(%role, error = %e, "Pair-verify rejected, starting pair-setup");
            }
            Err(e) => return Err(e),
        }

        self.pair_setup(connection).await?;
        self.verify(connection).await?;
        tracing::debug!(%role, "Pair-verify succeeded after pairing");
        Ok(())
    }

    async fn verify(&self, connection: &DeviceConnection) -> Result<(), AirPlayError> {
        let mut session = PairVerify::new(&self.long_term);

        let body = session.start()?;
        let reply = self
            .handshake(
                connection,
                HttpRequest::octet_stream(PAIR_VERIFY_PATH, body),
                HandshakeStep::VerifyStart,
            )
            .await?;

        let body = session.finish(&reply.body)?;
        self.handshake(
            connection,
            HttpRequest::octet_stream(PAIR_VERIFY_PATH, body),
            HandshakeStep::VerifyFinish,
        )
        .await?;
        Ok(())
    }

    async fn pair_setup(&self, connection: &DeviceConnection) -> Result<(), AirPlayError> {
        let role = connection.role();

        if self.config.request_pin_display {
            self.handshake(
                connection,
                HttpRequest::post(PIN_START_PATH),
                HandshakeStep::PinStart,
            )
            .await?;
        }
        let pin = self.pin.pin().await?;

        let client_id = self.credentials.client_id();
        let mut session =
            PairSetup::new(client_id, &self.long_term).with_strict(self.config.strict_pair_setup);

        let body = session.start()?;
        let reply = self
            .handshake(connection, setup_request(body), HandshakeStep::SetupStart)
            .await?;

        let body = session.process_challenge(&reply.body, &pin)?;
        let reply = self
            .handshake(connection, setup_request(body), HandshakeStep::SetupProof)
            .await?;

        let body = session.process_proof(&reply.body).map_err(|e| match e {
            PairingError::ServerProofMismatch => AirPlayError::HandshakeFailed {
                step: HandshakeStep::ServerProof,
                status: None,
            },
            other => other.into(),
        })?;
        self.handshake(connection, setup_request(body), HandshakeStep::SetupKeyExchange)
            .await?;

        tracing::info!(%role, client_id, "Pairing successful");
        self.events.emit(ClientEvent::Paired {
            client_id: client_id.to_string(),
        });
        Ok(())
    }

    async fn handshake(
        &self,
        connection: &DeviceConnection,
        request: HttpRequest,
        step: HandshakeStep,
    ) -> Result<HttpResponse, AirPlayError> {
        let response = connection.send(&request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            tracing::debug!(
                role = %connection.role(),
                %step,
                status = ?response.status.map(|s| s.as_u16()),
                "Handshake step rejected"
            );
            Err(AirPlayError::HandshakeFailed {
                step,
                status: response.status,
            })
        }
    }

    async fn set_state(&self, role: SocketRole, new: ConnectionState) {
        let old = {
            let mut slots = self.slots.lock().await;
            std::mem::replace(&mut slots.entry(role).or_default().state, new)
        };
        self.emit_state(role, old, new);
    }

    fn emit_state(&self, role: SocketRole, old: ConnectionState, new: ConnectionState) {
        if old != new {
            tracing::debug!(%role, %old, %new, "Socket state changed");
            self.events
                .emit(ClientEvent::SocketStateChanged { role, old, new });
        }
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("device", &self.device)
            .field("client_id", &self.credentials.client_id())
            .finish_non_exhaustive()
    }
}

fn setup_request(body: Vec<u8>) -> HttpRequest {
    HttpRequest::post(PAIR_SETUP_PATH).with_body(plist::CONTENT_TYPE, body)
}
