use std::time::Duration;

/// How a socket is brought back after an unexpected close
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Connect+authenticate attempts per close event (0 disables reconnect)
    pub max_attempts: u32,
    /// Delay before the first attempt
    pub initial_delay: Duration,
    /// Upper bound for the doubling delay
    pub max_delay: Duration,
}

impl ReconnectPolicy {
    /// One attempt, started immediately
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Never reconnect
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_attempts: 0,
            ..Self::immediate()
        }
    }

    /// Bounded exponential backoff
    #[must_use]
    pub fn exponential(initial_delay: Duration, max_delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
        }
    }

    /// Delay before attempt number `attempt` (zero-based)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay.max(self.initial_delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::immediate()
    }
}

/// Configuration for `AirPlay` client behavior
#[derive(Debug, Clone)]
pub struct AirPlayConfig {
    /// Timeout for device discovery (default: 5 seconds)
    pub discovery_timeout: Duration,

    /// Timeout for each TCP connect (default: 5 seconds)
    pub connection_timeout: Duration,

    /// Per-request timeout (default: none; a silent peer stalls its socket)
    pub request_timeout: Option<Duration>,

    /// Interval for polling playback state (default: 1 second)
    pub poll_interval: Duration,

    /// Interval for control-socket keep-alive (default: 10 seconds)
    pub heartbeat_interval: Duration,

    /// Reconnect behaviour after a socket closes
    pub reconnect: ReconnectPolicy,

    /// Require the server proof during pair-setup
    pub strict_pair_setup: bool,

    /// Ask the device to show its PIN before prompting for it
    pub request_pin_display: bool,

    /// Bring up the event socket and reverse channel on connect
    pub enable_event_channel: bool,
}

impl Default for AirPlayConfig {
    fn default() -> Self {
        Self {
            discovery_timeout: Duration::from_secs(5),
            connection_timeout: Duration::from_secs(5),
            request_timeout: None,
            poll_interval: Duration::from_secs(1),
            heartbeat_interval: Duration::from_secs(10),
            reconnect: ReconnectPolicy::immediate(),
            strict_pair_setup: false,
            request_pin_display: true,
            enable_event_channel: false,
        }
    }
}

impl AirPlayConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> AirPlayConfigBuilder {
        AirPlayConfigBuilder::default()
    }
}

/// Builder for `AirPlayConfig`
#[derive(Debug, Clone, Default)]
pub struct AirPlayConfigBuilder {
    config: AirPlayConfig,
}

impl AirPlayConfigBuilder {
    /// Set discovery timeout
    #[must_use]
    pub fn discovery_timeout(mut self, timeout: Duration) -> Self {
        self.config.discovery_timeout = timeout;
        self
    }

    /// Set connection timeout
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.config.connection_timeout = timeout;
        self
    }

    /// Fail requests that get no response within `timeout`
    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Set state polling interval
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set heartbeat interval
    #[must_use]
    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.config.heartbeat_interval = interval;
        self
    }

    /// Set reconnect policy
    #[must_use]
    pub fn reconnect(mut self, policy: ReconnectPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    /// Validate the server proof during pair-setup
    #[must_use]
    pub fn strict_pair_setup(mut self, strict: bool) -> Self {
        self.config.strict_pair_setup = strict;
        self
    }

    /// Send `/pair-pin-start` before prompting for the PIN
    #[must_use]
    pub fn request_pin_display(mut self, enable: bool) -> Self {
        self.config.request_pin_display = enable;
        self
    }

    /// Open the event socket during connect
    #[must_use]
    pub fn enable_event_channel(mut self, enable: bool) -> Self {
        self.config.enable_event_channel = enable;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> AirPlayConfig {
        self.config
    }
}
