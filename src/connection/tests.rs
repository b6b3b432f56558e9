use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;

use super::*;
use crate::error::{AirPlayError, HandshakeStep};
use crate::net::DeviceConnection;
use crate::protocol::http::{HttpRequest, StatusCode};
use crate::protocol::pairing::{PAIR_SETUP_PATH, PIN_START_PATH, StaticPin};
use crate::state::{ClientEvent, EventBus, EventFilter};
use crate::testing::MockAirPlayDevice;
use crate::types::{AirPlayConfig, Credentials, PlaybackState, ReconnectPolicy, SocketRole};

const PIN: &str = "1234";

fn manager(mock: &MockAirPlayDevice, config: AirPlayConfig) -> (Arc<ConnectionManager>, EventBus) {
    manager_with(mock, config, Credentials::generate(), PIN)
}

fn manager_with(
    mock: &MockAirPlayDevice,
    config: AirPlayConfig,
    credentials: Credentials,
    pin: &str,
) -> (Arc<ConnectionManager>, EventBus) {
    let events = EventBus::new();
    let manager = ConnectionManager::new(
        mock.device(),
        config,
        credentials,
        Arc::new(StaticPin::new(pin)),
        events.clone(),
    );
    (Arc::new(manager), events)
}

async fn wait_for_state(manager: &ConnectionManager, role: SocketRole, state: ConnectionState) {
    let wait = async {
        while manager.state(role).await != state {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("{role} never reached {state}"));
}

async fn wait_until(counter: &AtomicUsize, value: usize) {
    let wait = async {
        while counter.load(Ordering::SeqCst) != value {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .unwrap_or_else(|_| panic!("counter never reached {value}"));
}

/// Counts task starts, and stops via a drop guard
#[derive(Default)]
struct CountingTask {
    started: Arc<AtomicUsize>,
    stopped: Arc<AtomicUsize>,
}

struct StopGuard(Arc<AtomicUsize>);

impl Drop for StopGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl SocketTask for CountingTask {
    async fn run(&self, _manager: Weak<ConnectionManager>, _connection: Arc<DeviceConnection>) {
        let _guard = StopGuard(self.stopped.clone());
        self.started.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
    }
}

// --- ConnectionState ---

#[test]
fn test_connection_state_is_active() {
    assert!(ConnectionState::Connecting.is_active());
    assert!(ConnectionState::Authenticating.is_active());
    assert!(ConnectionState::Ready.is_active());
    assert!(!ConnectionState::Disconnected.is_active());
}

#[test]
fn test_connection_state_is_ready() {
    assert!(ConnectionState::Ready.is_ready());
    assert!(!ConnectionState::Authenticating.is_ready());
    assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
    assert_eq!(ConnectionState::Authenticating.to_string(), "authenticating");
}

// --- keep-alive ---

#[test]
fn test_keep_alive_command() {
    use crate::control::Command;

    assert_eq!(keep_alive_command(PlaybackState::Playing), Some(Command::Resume));
    assert_eq!(keep_alive_command(PlaybackState::Paused), Some(Command::Pause));
    assert_eq!(keep_alive_command(PlaybackState::Stopped), None);
}

// --- ConnectionManager ---

#[tokio::test]
async fn test_send_while_disconnected() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let (manager, _) = manager(&mock, AirPlayConfig::default());

    let result = manager
        .send(SocketRole::Control, &HttpRequest::post("/stop"))
        .await;
    assert!(matches!(
        result,
        Err(AirPlayError::Disconnected {
            role: SocketRole::Control
        })
    ));
    assert_eq!(manager.state(SocketRole::Info).await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_pairs_unknown_client() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let credentials = Credentials::generate();
    let public_key = credentials.key_pair().public_key();
    let (manager, events) = manager_with(&mock, AirPlayConfig::default(), credentials, PIN);
    let mut rx = events.subscribe();

    manager.connect().await.unwrap();

    assert!(mock.is_paired(&public_key).await);
    assert_eq!(manager.state(SocketRole::Control).await, ConnectionState::Ready);
    assert_eq!(manager.state(SocketRole::Info).await, ConnectionState::Ready);
    assert_eq!(manager.state(SocketRole::Event).await, ConnectionState::Disconnected);

    // Only the first socket pairs; the info socket verifies straight away
    assert_eq!(mock.request_count(PIN_START_PATH).await, 1);
    assert_eq!(mock.request_count(PAIR_SETUP_PATH).await, 3);

    let mut paired = 0;
    while let Ok(event) = rx.try_recv() {
        if let ClientEvent::Paired { client_id } = event {
            assert_eq!(client_id, manager.credentials().client_id());
            paired += 1;
        }
    }
    assert_eq!(paired, 1);

    manager.disconnect().await;
}

#[tokio::test]
async fn test_connect_known_client_skips_pairing() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let credentials = Credentials::generate();
    mock.register_client(&credentials.key_pair().public_key()).await;
    let (manager, _) = manager_with(&mock, AirPlayConfig::default(), credentials, "0000");

    manager.connect().await.unwrap();

    assert_eq!(mock.request_count(PAIR_SETUP_PATH).await, 0);
    assert_eq!(mock.request_count("/pair-verify").await, 4);
    manager.disconnect().await;
}

#[tokio::test]
async fn test_connect_without_pin_display() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let config = AirPlayConfig::builder().request_pin_display(false).build();
    let (manager, _) = manager(&mock, config);

    manager.connect().await.unwrap();
    assert_eq!(mock.request_count(PIN_START_PATH).await, 0);
    manager.disconnect().await;
}

#[tokio::test]
async fn test_connect_strict_pair_setup() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let config = AirPlayConfig::builder().strict_pair_setup(true).build();
    let (manager, _) = manager(&mock, config);

    manager.connect().await.unwrap();
    manager.disconnect().await;
}

#[tokio::test]
async fn test_connect_wrong_pin() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let (manager, _) = manager_with(
        &mock,
        AirPlayConfig::default(),
        Credentials::generate(),
        "9999",
    );

    let err = manager.connect().await.unwrap_err();
    assert!(matches!(
        err,
        AirPlayError::HandshakeFailed {
            step: HandshakeStep::SetupProof,
            status: Some(StatusCode::CONNECTION_AUTHORIZATION_REQUIRED),
        }
    ));
    assert_eq!(manager.state(SocketRole::Control).await, ConnectionState::Disconnected);
    assert_eq!(manager.state(SocketRole::Info).await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_connect_twice_is_rejected() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let (manager, _) = manager(&mock, AirPlayConfig::default());

    manager.connect().await.unwrap();
    assert!(matches!(
        manager.connect().await,
        Err(AirPlayError::InvalidState { .. })
    ));
    manager.disconnect().await;
}

#[tokio::test]
async fn test_disconnect_does_not_reconnect() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let (manager, events) = manager(&mock, AirPlayConfig::default());
    manager.connect().await.unwrap();
    let mut filter = EventFilter::connection_events(&events);

    manager.disconnect().await;

    for expected in [SocketRole::Control, SocketRole::Info] {
        match filter.recv().await {
            Some(ClientEvent::SocketStateChanged { role, old, new }) => {
                assert_eq!(role, expected);
                assert_eq!(old, ConnectionState::Ready);
                assert_eq!(new, ConnectionState::Disconnected);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(mock.connection_count().await, 2);
    assert_eq!(manager.state(SocketRole::Control).await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_reconnect_restarts_task() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let task = Arc::new(CountingTask::default());
    let started = task.started.clone();
    let stopped = task.stopped.clone();

    let events = EventBus::new();
    let manager = Arc::new(
        ConnectionManager::new(
            mock.device(),
            AirPlayConfig::default(),
            Credentials::generate(),
            Arc::new(StaticPin::new(PIN)),
            events.clone(),
        )
        .with_task(SocketRole::Info, task),
    );
    manager.connect().await.unwrap();
    wait_until(&started, 1).await;
    let mut filter = EventFilter::connection_events(&events);

    mock.drop_connections();

    // Each socket passes through connecting again before it is ready
    let mut reconnected = Vec::new();
    while reconnected.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(5), filter.recv())
            .await
            .unwrap();
        if let Some(ClientEvent::SocketStateChanged { role, new, .. }) = event {
            if new == ConnectionState::Ready {
                reconnected.push(role);
            }
        }
    }
    reconnected.sort();
    assert_eq!(reconnected, vec![SocketRole::Control, SocketRole::Info]);

    wait_until(&stopped, 1).await;
    wait_until(&started, 2).await;
    assert_eq!(mock.connection_count().await, 4);

    manager.disconnect().await;
    wait_until(&stopped, 2).await;
}

#[tokio::test]
async fn test_reconnect_exhausted() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let config = AirPlayConfig::builder()
        .reconnect(ReconnectPolicy::exponential(
            Duration::from_millis(10),
            Duration::from_millis(20),
            2,
        ))
        .build();
    let (manager, events) = manager(&mock, config);
    manager.connect().await.unwrap();
    let mut rx = events.subscribe();

    mock.refuse_connections(true).await;
    mock.drop_connections();

    let mut failed = Vec::new();
    while failed.len() < 2 {
        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        if let ClientEvent::ReconnectFailed { role, .. } = event {
            failed.push(role);
        }
    }
    failed.sort();
    assert_eq!(failed, vec![SocketRole::Control, SocketRole::Info]);

    assert_eq!(manager.state(SocketRole::Control).await, ConnectionState::Disconnected);
    // Two sockets, two attempts each, on top of the original pair
    assert_eq!(mock.connection_count().await, 6);
}

#[tokio::test]
async fn test_reconnect_disabled() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let config = AirPlayConfig::builder()
        .reconnect(ReconnectPolicy::disabled())
        .build();
    let (manager, events) = manager(&mock, config);
    manager.connect().await.unwrap();
    let mut rx = events.subscribe();

    mock.drop_connections();

    wait_for_state(&manager, SocketRole::Control, ConnectionState::Disconnected).await;
    wait_for_state(&manager, SocketRole::Info, ConnectionState::Disconnected).await;
    let mut messages = Vec::new();
    while messages.len() < 2 {
        if let Ok(ClientEvent::ReconnectFailed { message, .. }) = rx.recv().await {
            messages.push(message);
        }
    }
    assert!(messages.iter().all(|m| m == "reconnect disabled"));
    assert_eq!(mock.connection_count().await, 2);
}

#[tokio::test]
async fn test_event_channel_emits_device_events() {
    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let config = AirPlayConfig::builder().enable_event_channel(true).build();
    let (manager, events) = manager(&mock, config);
    let mut filter = EventFilter::device_events(&events);

    manager.connect().await.unwrap();
    assert_eq!(manager.state(SocketRole::Event).await, ConnectionState::Ready);
    assert!(mock.wait_for_event_channel().await);

    assert_eq!(mock.push_event("text/x-apple-plist+xml", b"<plist/>"), 1);

    let event = tokio::time::timeout(Duration::from_secs(5), filter.recv())
        .await
        .unwrap();
    match event {
        Some(ClientEvent::DeviceEvent { message }) => {
            assert_eq!(message.status, None);
            assert_eq!(message.start_line, "POST /event HTTP/1.1");
            assert_eq!(message.body, b"<plist/>");
        }
        other => panic!("unexpected event {other:?}"),
    }

    let acked = async {
        while mock.event_acks().await == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(5), acked).await.unwrap();
    manager.disconnect().await;
}

#[tokio::test]
async fn test_heartbeat_follows_observed_state() {
    use crate::state::PlaybackTracker;

    let mock = MockAirPlayDevice::start(PIN).await.unwrap();
    let events = EventBus::new();
    let tracker = Arc::new(PlaybackTracker::new(events.clone()));
    let heartbeat = Heartbeat::new(tracker.clone(), Duration::from_millis(20));
    let manager = Arc::new(
        ConnectionManager::new(
            mock.device(),
            AirPlayConfig::default(),
            Credentials::generate(),
            Arc::new(StaticPin::new(PIN)),
            events,
        )
        .with_task(SocketRole::Control, Arc::new(heartbeat)),
    );
    manager.connect().await.unwrap();

    // Stopped: nothing is sent
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(mock.commands().await.is_empty());

    tracker.force_state(PlaybackState::Playing).await;
    assert!(mock.wait_for_requests("/rate?value=1", 2).await);

    tracker.force_state(PlaybackState::Paused).await;
    assert!(mock.wait_for_requests("/rate?value=0", 2).await);

    manager.disconnect().await;
}
