//! mDNS device discovery for `AirPlay` devices

#[cfg(test)]
mod tests;

use std::net::IpAddr;
use std::time::Duration;

use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};

use crate::error::AirPlayError;
use crate::types::AirPlayDevice;

/// Service type for `AirPlay` discovery
pub const AIRPLAY_SERVICE_TYPE: &str = "_airplay._tcp.local.";

/// Default time to wait for a device
pub const DEFAULT_DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Wait for the first `AirPlay` device that resolves with an IPv4 address
///
/// Browsing stops as soon as a device is found.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), airplay_remote::AirPlayError> {
/// let device = airplay_remote::discovery::find(Duration::from_secs(5)).await?;
/// println!("Found {device}");
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`AirPlayError::DiscoveryTimeout`] if nothing resolves in time, or
/// [`AirPlayError::DiscoveryFailed`] if the mDNS daemon cannot browse.
pub async fn find(timeout: Duration) -> Result<AirPlayDevice, AirPlayError> {
    let mdns = ServiceDaemon::new().map_err(|e| AirPlayError::DiscoveryFailed {
        message: format!("failed to create mDNS daemon: {e}"),
    })?;

    let result = browse(&mdns, timeout).await;

    let _ = mdns.stop_browse(AIRPLAY_SERVICE_TYPE);
    if let Err(e) = mdns.shutdown() {
        tracing::debug!(error = %e, "mDNS daemon shutdown failed");
    }
    result
}

async fn browse(mdns: &ServiceDaemon, timeout: Duration) -> Result<AirPlayDevice, AirPlayError> {
    let receiver = mdns
        .browse(AIRPLAY_SERVICE_TYPE)
        .map_err(|e| AirPlayError::DiscoveryFailed {
            message: format!("failed to browse: {e}"),
        })?;
    tracing::debug!(service = AIRPLAY_SERVICE_TYPE, ?timeout, "Browsing");

    let search = async {
        while let Ok(event) = receiver.recv_async().await {
            if let ServiceEvent::ServiceResolved(info) = event {
                match device_from_service(&info) {
                    Some(device) => return Ok(device),
                    None => tracing::debug!(
                        service = info.get_fullname(),
                        "Ignoring service without IPv4 address"
                    ),
                }
            }
        }
        Err(AirPlayError::DiscoveryFailed {
            message: "mDNS browse channel closed".to_string(),
        })
    };

    match tokio::time::timeout(timeout, search).await {
        Ok(Ok(device)) => {
            tracing::info!(%device, "Discovered device");
            Ok(device)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(AirPlayError::DiscoveryTimeout { timeout }),
    }
}

/// Build a device identity from a resolved service
///
/// The identifier is TXT `deviceid`, or the instance name when absent.
/// Returns `None` if the service has no IPv4 address.
#[must_use]
pub fn device_from_service(info: &ServiceInfo) -> Option<AirPlayDevice> {
    let host = info
        .get_addresses()
        .iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(v4) => Some(*v4),
            IpAddr::V6(_) => None,
        })
        .min()?;

    let instance = instance_name(info.get_fullname());
    let id = info
        .get_property_val_str("deviceid")
        .map_or_else(|| instance.to_string(), ToString::to_string);

    Some(AirPlayDevice::new(id, host, info.get_port()).with_name(instance))
}

/// Instance part of `Name._airplay._tcp.local.`
fn instance_name(fullname: &str) -> &str {
    fullname
        .strip_suffix(AIRPLAY_SERVICE_TYPE)
        .map_or(fullname, |name| name.trim_end_matches('.'))
}
