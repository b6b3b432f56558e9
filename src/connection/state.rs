//! Per-socket lifecycle

/// Lifecycle of one socket role
///
/// `Disconnected -> Connecting -> Authenticating -> Ready`, and back to
/// `Connecting` when a ready socket closes unexpectedly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected
    #[default]
    Disconnected,
    /// TCP connection in progress
    Connecting,
    /// Pair-verify (or pair-setup) in progress
    Authenticating,
    /// Authenticated and usable
    Ready,
}

impl ConnectionState {
    /// Check if currently connected or connecting
    #[must_use]
    pub fn is_active(self) -> bool {
        !matches!(self, ConnectionState::Disconnected)
    }

    /// Check if usable for requests
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, ConnectionState::Ready)
    }

    /// Lower-case name for logs
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Authenticating => "authenticating",
            ConnectionState::Ready => "ready",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
