use std::net::Ipv4Addr;
use std::time::Duration;

use super::*;
use crate::error::AirPlayError;
use crate::protocol::plist::{DictBuilder, PlistValue};

#[test]
fn test_config_defaults() {
    let config = AirPlayConfig::default();
    assert_eq!(config.discovery_timeout, Duration::from_secs(5));
    assert_eq!(config.poll_interval, Duration::from_secs(1));
    assert_eq!(config.heartbeat_interval, Duration::from_secs(10));
    assert_eq!(config.request_timeout, None);
    assert_eq!(config.reconnect, ReconnectPolicy::immediate());
    assert!(!config.strict_pair_setup);
    assert!(!config.enable_event_channel);
}

#[test]
fn test_config_builder() {
    let config = AirPlayConfig::builder()
        .poll_interval(Duration::from_millis(50))
        .request_timeout(Duration::from_secs(2))
        .strict_pair_setup(true)
        .build();
    assert_eq!(config.poll_interval, Duration::from_millis(50));
    assert_eq!(config.request_timeout, Some(Duration::from_secs(2)));
    assert!(config.strict_pair_setup);
}

#[test]
fn test_reconnect_backoff_is_bounded() {
    let policy =
        ReconnectPolicy::exponential(Duration::from_millis(100), Duration::from_secs(1), 10);
    assert_eq!(policy.delay_for(0), Duration::from_millis(100));
    assert_eq!(policy.delay_for(1), Duration::from_millis(200));
    assert_eq!(policy.delay_for(3), Duration::from_millis(800));
    assert_eq!(policy.delay_for(4), Duration::from_secs(1));
    assert_eq!(policy.delay_for(40), Duration::from_secs(1));
    assert_eq!(ReconnectPolicy::immediate().delay_for(0), Duration::ZERO);
}

#[test]
fn test_device_address() {
    let device = AirPlayDevice::new("AA:BB:CC:DD:EE:FF", Ipv4Addr::new(192, 168, 1, 20), 7000);
    assert_eq!(device.address().to_string(), "192.168.1.20:7000");
    assert_eq!(device.display_name(), "AA:BB:CC:DD:EE:FF");
    assert_eq!(device.with_name("Living Room").display_name(), "Living Room");
}

#[test]
fn test_generated_credentials_shape() {
    let credentials = Credentials::generate();
    assert_eq!(credentials.client_id().len(), CLIENT_ID_LEN);
    assert!(
        credentials
            .client_id()
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    );
    assert_ne!(credentials.seed(), Credentials::generate().seed());
}

#[test]
fn test_credentials_hex_roundtrip() {
    let credentials = Credentials::new("ABCDEFGHIJKLMNOP", [0xAB; SEED_LEN]).unwrap();
    let restored = Credentials::from_hex("ABCDEFGHIJKLMNOP", &credentials.seed_hex()).unwrap();
    assert_eq!(credentials, restored);
    assert!(Credentials::from_hex("ABC", "zz").is_err());
    assert!(Credentials::new("has space", [0; SEED_LEN]).is_err());
}

#[test]
fn test_credentials_seed_hex_decoding() {
    let seed_hex = format!("  {}\n", "AB".repeat(SEED_LEN));
    let credentials = Credentials::from_hex("ABCDEFGHIJKLMNOP", &seed_hex).unwrap();
    assert_eq!(credentials.seed(), &[0xAB; SEED_LEN]);
    assert_eq!(credentials.seed_hex(), "ab".repeat(SEED_LEN));

    for bad in ["ab".repeat(SEED_LEN - 1), "zz".repeat(SEED_LEN), "ab".repeat(SEED_LEN + 1)] {
        assert!(matches!(
            Credentials::from_hex("ABCDEFGHIJKLMNOP", &bad),
            Err(AirPlayError::InvalidCredentials { .. })
        ));
    }

    let json = serde_json::json!({ "clientId": "ABCDEFGHIJKLMNOP", "seed": "xyz" });
    assert!(serde_json::from_value::<Credentials>(json).is_err());
}

#[test]
fn test_credentials_json_shape() {
    let credentials = Credentials::new("ABCDEFGHIJKLMNOP", [1; SEED_LEN]).unwrap();
    let json = serde_json::to_value(&credentials).unwrap();
    assert_eq!(json["clientId"], "ABCDEFGHIJKLMNOP");
    assert_eq!(json["seed"], "01".repeat(SEED_LEN));

    let parsed: Credentials = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, credentials);
}

#[test]
fn test_credentials_debug_redacts_seed() {
    let credentials = Credentials::new("ABCDEFGHIJKLMNOP", [0xCD; SEED_LEN]).unwrap();
    let debug = format!("{credentials:?}");
    assert!(!debug.contains("cd"));
    assert!(debug.contains("redacted"));
}

#[test]
fn test_key_pair_is_deterministic() {
    let credentials = Credentials::new("ABCDEFGHIJKLMNOP", [9; SEED_LEN]).unwrap();
    assert_eq!(
        credentials.key_pair().public_key(),
        credentials.key_pair().public_key()
    );
    assert_eq!(credentials.key_pair().secret_bytes(), [9; SEED_LEN]);
}

#[test]
fn test_playback_decode_empty_is_stopped() {
    let status = PlaybackStatus::from_playback_info(&PlistValue::empty_dict());
    assert_eq!(status, PlaybackStatus::stopped());
}

#[test]
fn test_playback_decode_rate() {
    let playing = DictBuilder::new().insert("rate", 1i64).build();
    assert_eq!(
        PlaybackStatus::from_playback_info(&playing).state,
        PlaybackState::Playing
    );

    let paused = DictBuilder::new().insert("rate", 0i64).build();
    let status = PlaybackStatus::from_playback_info(&paused);
    assert_eq!(status.state, PlaybackState::Paused);
    assert_eq!(status.position, 0);
    assert_eq!(status.duration, 0);
}

#[test]
fn test_playback_decode_missing_rate_is_paused() {
    let info = DictBuilder::new().insert("readyToPlay", true).build();
    assert_eq!(
        PlaybackStatus::from_playback_info(&info).state,
        PlaybackState::Paused
    );
}

#[test]
fn test_playback_decode_truncates_times() {
    let info = DictBuilder::new()
        .insert("rate", 1.0)
        .insert("position", 42.9)
        .insert("duration", 3600.5)
        .build();
    let status = PlaybackStatus::from_playback_info(&info);
    assert_eq!(status.position, 42);
    assert_eq!(status.duration, 3600);
}

#[test]
fn test_socket_role_display() {
    assert_eq!(SocketRole::Control.to_string(), "control");
    assert_eq!(SocketRole::Info.to_string(), "info");
    assert_eq!(SocketRole::Event.to_string(), "event");
}
