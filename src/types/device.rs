use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

/// A receiver resolved on the local network
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AirPlayDevice {
    /// Device identifier (TXT `deviceid`, usually a MAC address)
    pub id: String,
    /// IPv4 address
    pub host: Ipv4Addr,
    /// Control port
    pub port: u16,
    /// Service instance name, when known
    pub name: Option<String>,
}

impl AirPlayDevice {
    /// Create a device identity from its parts
    pub fn new(id: impl Into<String>, host: Ipv4Addr, port: u16) -> Self {
        Self {
            id: id.into(),
            host,
            port,
            name: None,
        }
    }

    /// Attach a display name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Socket address to connect to
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        SocketAddr::V4(SocketAddrV4::new(self.host, self.port))
    }

    /// Name for log lines and errors
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

impl std::fmt::Display for AirPlayDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.address())
    }
}
