use std::net::Ipv4Addr;

use mdns_sd::ServiceInfo;

use super::*;

fn service(addresses: &str, properties: &[(&str, &str)]) -> ServiceInfo {
    ServiceInfo::new(
        AIRPLAY_SERVICE_TYPE,
        "Living Room",
        "living-room.local.",
        addresses,
        7000,
        properties,
    )
    .unwrap()
}

#[test]
fn test_device_from_service() {
    let info = service(
        "192.168.1.20",
        &[("deviceid", "58:55:CA:1A:2B:3C"), ("model", "AppleTV3,2")],
    );

    let device = device_from_service(&info).unwrap();
    assert_eq!(device.id, "58:55:CA:1A:2B:3C");
    assert_eq!(device.host, Ipv4Addr::new(192, 168, 1, 20));
    assert_eq!(device.port, 7000);
    assert_eq!(device.name.as_deref(), Some("Living Room"));
}

#[test]
fn test_device_id_falls_back_to_instance_name() {
    let info = service("10.0.0.5", &[("model", "AppleTV5,3")]);

    let device = device_from_service(&info).unwrap();
    assert_eq!(device.id, "Living Room");
    assert_eq!(device.display_name(), "Living Room");
}

#[test]
fn test_device_requires_ipv4() {
    let info = service("fe80::1", &[("deviceid", "AA:BB:CC:DD:EE:FF")]);
    assert!(device_from_service(&info).is_none());
}

#[test]
fn test_instance_name() {
    assert_eq!(instance_name("Kitchen._airplay._tcp.local."), "Kitchen");
    assert_eq!(instance_name("odd-name"), "odd-name");
}
