//! # airplay-remote
//!
//! An async Rust client for remote-controlling `AirPlay` video receivers.
//!
//! ## Features
//!
//! - Device discovery via mDNS
//! - PIN pairing (SRP) and per-connection pair-verify
//! - Playback control: play, seek, pause, resume, stop, photos
//! - Polled playback state with change events
//! - Reconnection and keep-alive for the device sockets
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use airplay_remote::protocol::pairing::{MemoryCredentialStore, StaticPin};
//! use airplay_remote::{AirPlayClient, AirPlayConfig, Credentials};
//!
//! # async fn example() -> Result<(), airplay_remote::AirPlayError> {
//! let credentials = Credentials::load_or_generate(&MemoryCredentialStore::new()).await?;
//! let client = AirPlayClient::find(
//!     AirPlayConfig::default(),
//!     credentials,
//!     Arc::new(StaticPin::new("1234")),
//! )
//! .await?;
//!
//! client.connect().await?;
//! client.play("http://example.com/movie.mp4", 0).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! - **High-level**: `AirPlayClient` - connect, control, observe
//! - **Mid-level**: `ConnectionManager` and `PlaybackController` - sockets,
//!   handshakes and periodic tasks
//! - **Low-level**: Protocol modules - HTTP framing, plist, crypto and the
//!   sans-IO pairing state machines

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// State management
pub mod state;
/// Core types
pub mod types;

/// Testing utilities
pub mod testing;

// Internal modules
mod client;
pub mod connection;
pub mod control;
pub mod discovery;
pub mod net;
pub mod protocol;

// Re-exports
pub use client::AirPlayClient;
pub use connection::{ConnectionManager, ConnectionState};
pub use error::{AirPlayError, HandshakeStep};
pub use state::{ClientEvent, EventBus, EventFilter};
pub use types::{
    AirPlayConfig, AirPlayDevice, Credentials, PlaybackState, PlaybackStatus, ReconnectPolicy,
    SocketRole,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    pub use crate::protocol::pairing::{
        CredentialStore, FileCredentialStore, PinProvider, StaticPin, StdinPin,
    };
    pub use crate::{
        AirPlayClient, AirPlayConfig, AirPlayDevice, AirPlayError, ClientEvent, Credentials,
        PlaybackState, PlaybackStatus, SocketRole,
    };
}
