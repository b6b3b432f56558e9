//! Event bus for client events

use tokio::sync::broadcast;

use crate::connection::ConnectionState;
use crate::protocol::http::HttpResponse;
use crate::types::{PlaybackState, SocketRole};

/// Client events
#[derive(Debug, Clone)]
pub enum ClientEvent {
    // Playback events
    /// Observed playback state changed
    StateChanged {
        /// New state
        new: PlaybackState,
        /// Previous state
        old: PlaybackState,
    },
    /// Observed position changed (whole seconds)
    PositionChanged {
        /// New position
        new: u64,
        /// Previous position
        old: u64,
    },

    // Device events
    /// Message pushed over the event channel
    DeviceEvent {
        /// The pushed message as received
        message: HttpResponse,
    },

    // Connection events
    /// A socket moved between lifecycle states
    SocketStateChanged {
        /// Which socket
        role: SocketRole,
        /// Previous state
        old: ConnectionState,
        /// New state
        new: ConnectionState,
    },
    /// Pair-setup registered our key with the device
    Paired {
        /// Identifier the key was registered under
        client_id: String,
    },
    /// Reconnect attempts for a socket were exhausted
    ReconnectFailed {
        /// Which socket
        role: SocketRole,
        /// Last error
        message: String,
    },
}

/// Event bus for distributing events
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Broadcast sender
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Create a new event bus
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    /// Subscribe to events; dropping the receiver unsubscribes
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    /// Emit an event
    pub fn emit(&self, event: ClientEvent) {
        // Ignore error if no receivers
        let _ = self.tx.send(event);
    }

    /// Get subscriber count
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event filter for selective subscription
pub struct EventFilter {
    rx: broadcast::Receiver<ClientEvent>,
    filter: Box<dyn Fn(&ClientEvent) -> bool + Send>,
}

impl EventFilter {
    /// Create a filtered event receiver
    pub fn new<F>(bus: &EventBus, filter: F) -> Self
    where
        F: Fn(&ClientEvent) -> bool + Send + 'static,
    {
        Self {
            rx: bus.subscribe(),
            filter: Box::new(filter),
        }
    }

    /// Receive next matching event
    pub async fn recv(&mut self) -> Option<ClientEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) if (self.filter)(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Helper functions for common filters
impl EventFilter {
    /// Filter for state and position changes only
    #[must_use]
    pub fn playback_events(bus: &EventBus) -> Self {
        Self::new(bus, |e| {
            matches!(
                e,
                ClientEvent::StateChanged { .. } | ClientEvent::PositionChanged { .. }
            )
        })
    }

    /// Filter for socket lifecycle events only
    #[must_use]
    pub fn connection_events(bus: &EventBus) -> Self {
        Self::new(bus, |e| {
            matches!(
                e,
                ClientEvent::SocketStateChanged { .. }
                    | ClientEvent::Paired { .. }
                    | ClientEvent::ReconnectFailed { .. }
            )
        })
    }

    /// Filter for pushed device events only
    #[must_use]
    pub fn device_events(bus: &EventBus) -> Self {
        Self::new(bus, |e| matches!(e, ClientEvent::DeviceEvent { .. }))
    }
}
