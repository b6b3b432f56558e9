use std::sync::Arc;

use super::*;
use crate::connection::ConnectionManager;
use crate::error::AirPlayError;
use crate::protocol::http::{Method, StatusCode};
use crate::protocol::pairing::StaticPin;
use crate::protocol::plist::{self, PlistValue};
use crate::state::{ClientEvent, EventBus, PlaybackTracker};
use crate::testing::MockAirPlayDevice;
use crate::types::{AirPlayConfig, Credentials, PlaybackState, SocketRole};

struct Harness {
    mock: MockAirPlayDevice,
    manager: Arc<ConnectionManager>,
    tracker: Arc<PlaybackTracker>,
    controller: PlaybackController,
    events: EventBus,
}

/// Connected manager without periodic tasks, so polls are driven by hand
async fn harness() -> Harness {
    let mock = MockAirPlayDevice::start("1234").await.unwrap();
    let credentials = Credentials::generate();
    mock.register_client(&credentials.key_pair().public_key()).await;

    let events = EventBus::new();
    let manager = Arc::new(ConnectionManager::new(
        mock.device(),
        AirPlayConfig::default(),
        credentials,
        Arc::new(StaticPin::new("1234")),
        events.clone(),
    ));
    manager.connect().await.unwrap();

    let tracker = Arc::new(PlaybackTracker::new(events.clone()));
    let controller = PlaybackController::new(manager.clone(), tracker.clone());
    Harness {
        mock,
        manager,
        tracker,
        controller,
        events,
    }
}

impl Harness {
    async fn poll(&self, reporter: &StatusReporter) {
        let connection = self.manager.connection(SocketRole::Info).await.unwrap();
        reporter
            .poll(&Arc::downgrade(&self.manager), &connection)
            .await;
    }

    async fn seeks(&self) -> Vec<String> {
        self.mock
            .commands()
            .await
            .into_iter()
            .filter(|r| r.path.starts_with("/scrub"))
            .map(|r| r.path)
            .collect()
    }
}

// --- Command ---

#[test]
fn test_play_request() {
    let request = Command::Play {
        url: "http://example.com/movie.mp4".to_string(),
    }
    .request()
    .unwrap();

    assert_eq!(request.method, Method::Post);
    assert_eq!(request.path, "/play");
    assert_eq!(request.content_type.as_deref(), Some(plist::CONTENT_TYPE));

    let body = plist::decode(&request.body).unwrap();
    assert_eq!(
        body.get("Content-Location").and_then(PlistValue::as_str),
        Some("http://example.com/movie.mp4")
    );
    assert_eq!(body.get("Start-Position"), Some(&PlistValue::Integer(0)));
}

#[test]
fn test_simple_command_paths() {
    let cases = [
        (Command::Seek(42), Method::Post, "/scrub?position=42"),
        (Command::Pause, Method::Post, "/rate?value=0"),
        (Command::Resume, Method::Post, "/rate?value=1"),
        (Command::Stop, Method::Post, "/stop"),
        (Command::PlaybackInfo, Method::Get, "/playback-info"),
    ];
    for (command, method, path) in cases {
        let request = command.request().unwrap();
        assert_eq!(request.method, method, "{}", command.name());
        assert_eq!(request.path, path);
        assert!(request.body.is_empty());
        assert_eq!(request.content_type, None);
    }
}

#[test]
fn test_photo_request() {
    let request = Command::Photo(vec![0xFF, 0xD8, 0xFF]).request().unwrap();
    assert_eq!(request.method, Method::Put);
    assert_eq!(request.path, "/photo");
    assert_eq!(request.content_type.as_deref(), Some(IMAGE_CONTENT_TYPE));
    assert_eq!(request.body, vec![0xFF, 0xD8, 0xFF]);
}

// --- PlaybackController ---

#[tokio::test]
async fn test_commands_use_control_socket() {
    let h = harness().await;

    h.controller.pause().await.unwrap();
    h.controller.resume().await.unwrap();
    h.controller.seek(90).await.unwrap();
    h.controller.stop().await.unwrap();
    h.controller.send_image(vec![1, 2, 3]).await.unwrap();

    let paths: Vec<String> = h.mock.commands().await.into_iter().map(|r| r.path).collect();
    assert_eq!(
        paths,
        vec!["/rate?value=0", "/rate?value=1", "/scrub?position=90", "/stop", "/photo"]
    );
    let photo = h.mock.commands().await.pop().unwrap();
    assert_eq!(photo.method, "PUT");
    assert_eq!(photo.body, vec![1, 2, 3]);

    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_command_failure_carries_status() {
    let h = harness().await;
    h.mock.respond_with("/stop", 500).await;

    let err = h.controller.stop().await.unwrap_err();
    assert!(matches!(
        err,
        AirPlayError::RequestFailed { method: "POST", ref path, status: Some(StatusCode(500)) }
            if path == "/stop"
    ));
    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_commands_fail_when_disconnected() {
    let h = harness().await;
    h.manager.disconnect().await;

    assert!(matches!(
        h.controller.pause().await,
        Err(AirPlayError::Disconnected {
            role: SocketRole::Control
        })
    ));
    assert!(matches!(
        h.controller.fetch_playback_info().await,
        Err(AirPlayError::Disconnected {
            role: SocketRole::Info
        })
    ));
}

#[tokio::test]
async fn test_play_records_offset_and_resets_state() {
    let h = harness().await;
    h.tracker.force_state(PlaybackState::Playing).await;
    let mut rx = h.events.subscribe();

    h.controller.play("http://example.com/a.mp4", 30).await.unwrap();

    assert_eq!(h.tracker.pending_seek().await, Some(30));
    assert_eq!(h.controller.status().state, PlaybackState::Stopped);
    assert!(matches!(
        rx.recv().await.unwrap(),
        ClientEvent::StateChanged {
            new: PlaybackState::Stopped,
            old: PlaybackState::Playing
        }
    ));

    let play = h.mock.commands().await.pop().unwrap();
    assert_eq!(play.path, "/play");
    assert_eq!(play.content_type.as_deref(), Some(plist::CONTENT_TYPE));
    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_failed_play_keeps_state() {
    let h = harness().await;
    h.tracker.force_state(PlaybackState::Paused).await;
    h.mock.respond_with("/play", 404).await;

    assert!(h.controller.play("http://example.com/a.mp4", 0).await.is_err());
    assert_eq!(h.controller.status().state, PlaybackState::Paused);
    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_fetch_playback_info() {
    let h = harness().await;
    h.mock.set_playback(PlaybackState::Playing, 61.9, 3600.5).await;

    let status = h.controller.fetch_playback_info().await.unwrap();
    assert_eq!(status.state, PlaybackState::Playing);
    assert_eq!(status.position, 61);
    assert_eq!(status.duration, 3600);
    // One-off queries do not touch the tracker
    assert_eq!(h.controller.status().state, PlaybackState::Stopped);
    h.manager.disconnect().await;
}

// --- StatusReporter ---

#[tokio::test]
async fn test_pending_seek_applied_once() {
    let h = harness().await;
    let reporter = StatusReporter::new(h.tracker.clone(), std::time::Duration::from_secs(1));

    h.controller.play("http://example.com/a.mp4", 30).await.unwrap();

    h.mock.set_playback(PlaybackState::Playing, 0.0, 100.0).await;
    h.poll(&reporter).await;
    assert_eq!(h.seeks().await, vec!["/scrub?position=30"]);

    // Still playing, then playing again after a pause: no further seek
    h.poll(&reporter).await;
    h.mock.set_playback(PlaybackState::Paused, 30.0, 100.0).await;
    h.poll(&reporter).await;
    h.mock.set_playback(PlaybackState::Playing, 31.0, 100.0).await;
    h.poll(&reporter).await;
    assert_eq!(h.seeks().await.len(), 1);
    assert_eq!(h.tracker.pending_seek().await, None);

    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_play_without_offset_never_seeks() {
    let h = harness().await;
    let reporter = StatusReporter::new(h.tracker.clone(), std::time::Duration::from_secs(1));

    h.controller.play("http://example.com/a.mp4", 0).await.unwrap();
    h.mock.set_playback(PlaybackState::Playing, 0.0, 100.0).await;
    h.poll(&reporter).await;

    assert!(h.seeks().await.is_empty());
    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_seek_failure_is_swallowed() {
    let h = harness().await;
    let reporter = StatusReporter::new(h.tracker.clone(), std::time::Duration::from_secs(1));
    h.mock.respond_with("/scrub?position=10", 500).await;

    h.controller.play("http://example.com/a.mp4", 10).await.unwrap();
    h.mock.set_playback(PlaybackState::Playing, 0.0, 100.0).await;
    h.poll(&reporter).await;

    assert_eq!(h.mock.request_count("/scrub?position=10").await, 1);
    assert_eq!(h.tracker.status().state, PlaybackState::Playing);
    assert_eq!(h.tracker.pending_seek().await, None);
    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_poll_failure_reports_stopped() {
    let h = harness().await;
    let reporter = StatusReporter::new(h.tracker.clone(), std::time::Duration::from_secs(1));

    h.mock.set_playback(PlaybackState::Playing, 5.0, 100.0).await;
    h.poll(&reporter).await;
    assert_eq!(h.tracker.status().position, 5);

    h.mock.respond_with("/playback-info", 500).await;
    h.poll(&reporter).await;
    let status = h.tracker.status();
    assert_eq!(status.state, PlaybackState::Stopped);
    assert_eq!(status.position, 0);
    assert_eq!(status.duration, 0);
    h.manager.disconnect().await;
}

#[tokio::test]
async fn test_poll_publishes_changes_only() {
    let h = harness().await;
    let reporter = StatusReporter::new(h.tracker.clone(), std::time::Duration::from_secs(1));
    let mut rx = h.events.subscribe();

    h.poll(&reporter).await;
    h.poll(&reporter).await;
    h.mock.set_playback(PlaybackState::Playing, 0.0, 100.0).await;
    h.poll(&reporter).await;

    let mut state_events = 0;
    while let Ok(event) = rx.try_recv() {
        if let ClientEvent::StateChanged { new, old } = event {
            assert_eq!((new, old), (PlaybackState::Playing, PlaybackState::Stopped));
            state_events += 1;
        }
    }
    assert_eq!(state_events, 1);
    assert_eq!(h.tracker.status().duration, 100);
    h.manager.disconnect().await;
}
