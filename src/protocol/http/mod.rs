//! Minimal HTTP/1.1 framing for the device control protocol
//!
//! Every exchange with a receiver is HTTP-shaped, but only a handful of paths
//! and headers are ever used, so this is a small sans-IO layer rather than a
//! general HTTP stack: [`HttpRequest`] builds and encodes requests,
//! [`parse_response`] parses one complete message, and [`HttpCodec`]
//! reassembles messages from a byte stream.

mod codec;
pub mod headers;
mod request;
mod response;

pub use codec::{HttpCodec, HttpCodecError};
pub use headers::Headers;
pub use request::HttpRequest;
pub use response::{HttpResponse, StatusCode, parse_response};

/// User agent sent with every control request
pub const USER_AGENT: &str = "AirPlay/320.20";

/// User agent sent with the reverse-channel upgrade
pub const REVERSE_USER_AGENT: &str = "MediaControl/1.0";

/// Content type for raw handshake payloads
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Acknowledgement written back for every pushed event
pub const EVENT_ACK: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 0\r\n\r\n";

/// Request methods used by the control protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Status queries
    Get,
    /// Handshakes and commands
    Post,
    /// Image upload
    Put,
}

impl Method {
    /// Wire representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
