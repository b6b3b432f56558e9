use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::crypto::CryptoError;
use crate::protocol::http::{HttpCodecError, StatusCode};
use crate::protocol::pairing::{PairingError, StorageError};
use crate::protocol::plist::{PlistDecodeError, PlistEncodeError};
use crate::types::SocketRole;

/// Handshake exchange that produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStep {
    /// First `/pair-verify` exchange
    VerifyStart,
    /// Second `/pair-verify` exchange
    VerifyFinish,
    /// `/pair-pin-start`
    PinStart,
    /// `/pair-setup-pin` method/user exchange
    SetupStart,
    /// `/pair-setup-pin` SRP proof exchange
    SetupProof,
    /// `/pair-setup-pin` encrypted key exchange
    SetupKeyExchange,
    /// Server proof check in strict mode
    ServerProof,
}

impl std::fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HandshakeStep::VerifyStart => "pair-verify 1/2",
            HandshakeStep::VerifyFinish => "pair-verify 2/2",
            HandshakeStep::PinStart => "pair-pin-start",
            HandshakeStep::SetupStart => "pair-setup 1/3",
            HandshakeStep::SetupProof => "pair-setup 2/3",
            HandshakeStep::SetupKeyExchange => "pair-setup 3/3",
            HandshakeStep::ServerProof => "pair-setup server proof",
        };
        f.write_str(name)
    }
}

/// Errors that can occur during `AirPlay` operations
#[derive(Debug, Error)]
pub enum AirPlayError {
    // ===== Discovery Errors =====
    /// No device appeared before the timeout
    #[error("no device discovered within {timeout:?}")]
    DiscoveryTimeout {
        /// How long discovery ran
        timeout: Duration,
    },

    /// mDNS discovery failed
    #[error("discovery failed: {message}")]
    DiscoveryFailed {
        /// Description of the failure
        message: String,
    },

    // ===== Connection Errors =====
    /// Failed to establish a TCP connection
    #[error("{role} connection to {device_name} failed: {message}")]
    ConnectionFailed {
        /// The name of the device
        device_name: String,
        /// Socket the connection was for
        role: SocketRole,
        /// Description of the failure
        message: String,
        /// The underlying source of the error
        #[source]
        source: Option<io::Error>,
    },

    /// Socket closed, or was never opened
    #[error("{role} socket disconnected")]
    Disconnected {
        /// Socket that is gone
        role: SocketRole,
    },

    // ===== Authentication Errors =====
    /// A handshake exchange returned a non-200 status or bad payload
    #[error("handshake failed at {step}{}", status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    HandshakeFailed {
        /// Which exchange failed
        step: HandshakeStep,
        /// Status code, when the failure was a response
        status: Option<StatusCode>,
    },

    /// Handshake payload could not be processed
    #[error("pairing error: {0}")]
    Pairing(#[from] PairingError),

    /// The PIN provider could not produce a PIN
    #[error("PIN unavailable: {message}")]
    PinUnavailable {
        /// Why no PIN was returned
        message: String,
    },

    /// Stored identity is malformed
    #[error("invalid credentials: {message}")]
    InvalidCredentials {
        /// What is wrong
        message: String,
    },

    // ===== Protocol Errors =====
    /// A command or status request got a non-200 response
    #[error("{method} {path} failed with status {}", status.map_or_else(|| "none".to_string(), |s| s.to_string()))]
    RequestFailed {
        /// Request method
        method: &'static str,
        /// Request path
        path: String,
        /// Status code, if the reply had one
        status: Option<StatusCode>,
    },

    /// No response within the configured request timeout
    #[error("{role} request {path} timed out after {timeout:?}")]
    Timeout {
        /// Socket the request was on
        role: SocketRole,
        /// Request path
        path: String,
        /// Configured limit
        timeout: Duration,
    },

    /// Payload encoding or decoding failed
    #[error("codec error: {message}")]
    Codec {
        /// Description of the error
        message: String,
    },

    /// Cryptographic failure
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),

    // ===== State Errors =====
    /// Operation not valid in current state
    #[error("invalid state: {message}")]
    InvalidState {
        /// Description of why the state is invalid
        message: String,
    },

    // ===== I/O Errors =====
    /// Credential persistence failed
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Network I/O error
    #[error("network error: {0}")]
    NetworkError(#[from] io::Error),
}

impl AirPlayError {
    /// Check if this error is recoverable by retrying
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::NetworkError(_)
                | Self::Disconnected { .. }
                | Self::ConnectionFailed { .. }
                | Self::RequestFailed { .. }
        )
    }

    /// Check if this error indicates connection loss
    #[must_use]
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            Self::Disconnected { .. } | Self::ConnectionFailed { .. }
        )
    }

    /// Status code carried by a handshake or request failure
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::HandshakeFailed { status, .. } | Self::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<PlistDecodeError> for AirPlayError {
    fn from(err: PlistDecodeError) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}

impl From<PlistEncodeError> for AirPlayError {
    fn from(err: PlistEncodeError) -> Self {
        Self::Codec {
            message: err.to_string(),
        }
    }
}

impl From<HttpCodecError> for AirPlayError {
    fn from(err: HttpCodecError) -> Self {
        match err {
            HttpCodecError::Io(io) => Self::NetworkError(io),
            other => Self::Codec {
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for `AirPlay` operations
pub type Result<T> = std::result::Result<T, AirPlayError>;
