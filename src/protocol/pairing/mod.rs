//! Pair-verify and PIN pair-setup handshakes
//!
//! Both state machines are sans-IO: they turn device response bodies into
//! the next request body and leave the socket work to the caller.

pub mod pin;
pub mod setup;
pub mod storage;
pub mod verify;


pub use pin::{PinProvider, StaticPin, StdinPin};
pub use setup::PairSetup;
pub use storage::{CredentialStore, FileCredentialStore, MemoryCredentialStore, StorageError};
pub use verify::PairVerify;

use crate::protocol::crypto::CryptoError;
use crate::protocol::plist::{PlistDecodeError, PlistEncodeError};

/// Handshake endpoint for pair-verify
pub const PAIR_VERIFY_PATH: &str = "/pair-verify";

/// Handshake endpoint for all three pair-setup exchanges
pub const PAIR_SETUP_PATH: &str = "/pair-setup-pin";

/// Endpoint that makes the device display its PIN
pub const PIN_START_PATH: &str = "/pair-pin-start";

/// Handshake session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairingState {
    /// Initial state
    Init,
    /// First message sent, waiting for the device
    WaitingResponse,
    /// SRP proof sent (pair-setup only)
    SrpExchange,
    /// Final message produced
    Complete,
    /// Handshake failed and cannot continue
    Failed,
}

/// Pairing errors
#[derive(Debug, thiserror::Error)]
pub enum PairingError {
    /// Method called out of order
    #[error("invalid state: expected {expected:?}, got {actual:?}")]
    InvalidState {
        /// State the call requires
        expected: PairingState,
        /// State the session is in
        actual: PairingState,
    },

    /// Response body shorter than the handshake requires
    #[error("response too short: need {expected} bytes, got {actual}")]
    ResponseTooShort {
        /// Minimum length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// Response dictionary lacks a required entry
    #[error("response is missing {0:?}")]
    MissingField(&'static str),

    /// Server proof `M2` did not match (strict mode)
    #[error("server proof mismatch")]
    ServerProofMismatch,

    /// Crypto failure
    #[error("crypto error: {0}")]
    CryptoError(#[from] CryptoError),

    /// Response body is not a valid binary plist
    #[error("plist decode error: {0}")]
    Decode(#[from] PlistDecodeError),

    /// Request body could not be encoded
    #[error("plist encode error: {0}")]
    Encode(#[from] PlistEncodeError),
}
