use std::sync::Arc;
use std::time::Duration;

use airplay_remote::protocol::pairing::{
    CredentialStore, FileCredentialStore, PAIR_SETUP_PATH, PAIR_VERIFY_PATH, PIN_START_PATH,
    StaticPin,
};
use airplay_remote::protocol::http::StatusCode;
use airplay_remote::testing::MockAirPlayDevice;
use airplay_remote::{
    AirPlayClient, AirPlayConfig, AirPlayError, ClientEvent, Credentials, HandshakeStep,
    SocketRole,
};
use tokio::time::timeout;
use tokio_test::{assert_err, assert_ok};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn client(mock: &MockAirPlayDevice, credentials: Credentials, pin: &str) -> AirPlayClient {
    AirPlayClient::new(
        mock.device(),
        credentials,
        AirPlayConfig::default(),
        Arc::new(StaticPin::new(pin)),
    )
}

#[tokio::test]
async fn test_first_connect_pairs_then_verifies() {
    init_tracing();
    let mock = MockAirPlayDevice::start("3939").await.unwrap();
    let credentials = Credentials::generate();
    let public_key = credentials.key_pair().public_key();
    let client = client(&mock, credentials.clone(), "3939");
    let mut events = client.subscribe_events();

    timeout(Duration::from_secs(5), client.connect())
        .await
        .expect("connect timed out")
        .expect("connect failed");

    assert!(mock.is_paired(&public_key).await);
    assert_eq!(mock.request_count(PIN_START_PATH).await, 1);
    assert_eq!(mock.request_count(PAIR_SETUP_PATH).await, 3);
    // One rejected verify, then two steps for each socket
    assert_eq!(mock.request_count(PAIR_VERIFY_PATH).await, 5);

    let mut paired = 0;
    while let Ok(event) = events.try_recv() {
        if let ClientEvent::Paired { client_id } = event {
            assert_eq!(client_id, credentials.client_id());
            paired += 1;
        }
    }
    assert_eq!(paired, 1);

    client.disconnect().await;
}

#[tokio::test]
async fn test_persisted_credentials_skip_pairing() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let store = FileCredentialStore::new(dir.path().join("credentials.json"));
    let mock = MockAirPlayDevice::start("1111").await.unwrap();

    let first = Credentials::load_or_generate(&store).await.unwrap();
    let client_a = client(&mock, first.clone(), "1111");
    assert_ok!(client_a.connect().await);
    client_a.disconnect().await;
    let setup_requests = mock.request_count(PAIR_SETUP_PATH).await;

    // Same identity after a restart
    let second = Credentials::load_or_generate(&store).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(store.load().await.unwrap(), Some(first));

    let client_b = client(&mock, second, "1111");
    client_b.connect().await.unwrap();
    assert_eq!(mock.request_count(PAIR_SETUP_PATH).await, setup_requests);
    assert_eq!(mock.request_count(PIN_START_PATH).await, 1);
    client_b.disconnect().await;
}

#[tokio::test]
async fn test_wrong_pin_fails_connect() {
    init_tracing();
    let mock = MockAirPlayDevice::start("1234").await.unwrap();
    let credentials = Credentials::generate();
    let public_key = credentials.key_pair().public_key();
    let client = client(&mock, credentials, "0000");

    let err = client.connect().await.unwrap_err();
    assert!(matches!(
        err,
        AirPlayError::HandshakeFailed {
            step: HandshakeStep::SetupProof,
            status: Some(StatusCode(470)),
            ..
        }
    ));
    assert!(!mock.is_paired(&public_key).await);
    assert!(!client.is_connected().await);
    assert!(matches!(
        client.pause().await,
        Err(AirPlayError::Disconnected {
            role: SocketRole::Control
        })
    ));
}

#[tokio::test]
async fn test_strict_mode_accepts_honest_device() {
    init_tracing();
    let mock = MockAirPlayDevice::start("2468").await.unwrap();
    let config = AirPlayConfig::builder().strict_pair_setup(true).build();
    let client = AirPlayClient::new(
        mock.device(),
        Credentials::generate(),
        config,
        Arc::new(StaticPin::new("2468")),
    );

    assert_ok!(client.connect().await);
    assert!(client.is_connected().await);
    assert_err!(client.connect().await);
    client.disconnect().await;
}
