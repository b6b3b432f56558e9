/// Which logical connection a socket serves
///
/// Each role gets its own TCP connection and its own verify handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SocketRole {
    /// Commands and heartbeat
    Control,
    /// Status polling
    Info,
    /// Reverse channel for pushed events
    Event,
}

impl SocketRole {
    /// Lower-case name used in logs
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SocketRole::Control => "control",
            SocketRole::Info => "info",
            SocketRole::Event => "event",
        }
    }
}

impl std::fmt::Display for SocketRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
