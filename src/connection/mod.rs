//! Connection management
//!
//! The [`ConnectionManager`] owns the control, info and event sockets,
//! authenticates each one, runs the periodic task attached to its role and
//! reopens a socket when the device drops it.

mod heartbeat;
mod manager;
mod state;

pub use heartbeat::{Heartbeat, keep_alive_command};
pub use manager::{ConnectionManager, EventChannel, SocketTask};
pub use state::ConnectionState;

#[cfg(test)]
mod tests;
