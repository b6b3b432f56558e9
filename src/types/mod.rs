//! Core types module

mod config;
mod credentials;
mod device;
mod role;
mod state;
#[cfg(test)]
mod tests;

pub use config::{AirPlayConfig, AirPlayConfigBuilder, ReconnectPolicy};
pub use credentials::{CLIENT_ID_LEN, Credentials, SEED_LEN};
pub use device::AirPlayDevice;
pub use role::SocketRole;
pub use state::{PlaybackState, PlaybackStatus};
