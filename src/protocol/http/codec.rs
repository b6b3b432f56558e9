use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio_util::codec::Decoder;

use super::headers::names;
use super::response::{parse_head, split_head};
use super::HttpResponse;

/// Errors while framing messages from a byte stream
#[derive(Debug, Error)]
pub enum HttpCodecError {
    /// `Content-Length` present but not a number
    #[error("invalid content length: {0:?}")]
    InvalidContentLength(String),

    /// Message exceeds the configured limit
    #[error("message too large: {size} bytes")]
    MessageTooLarge {
        /// Size that would be buffered
        size: usize,
    },

    /// Underlying read failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stream decoder yielding one [`HttpResponse`] per message
///
/// Waits for `Content-Length` body bytes before yielding. A message without
/// `Content-Length` takes whatever follows its header block in the current
/// buffer as its body; 1xx and 204 responses never carry a body.
#[derive(Debug, Clone)]
pub struct HttpCodec {
    max_size: usize,
}

impl HttpCodec {
    /// Create a codec with a 1 MiB message limit
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_size: 1024 * 1024,
        }
    }

    /// Set maximum message size
    #[must_use]
    pub fn with_max_size(mut self, size: usize) -> Self {
        self.max_size = size;
        self
    }
}

impl Default for HttpCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for HttpCodec {
    type Item = HttpResponse;
    type Error = HttpCodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<HttpResponse>, HttpCodecError> {
        // Stray line breaks between messages
        let leading = src.iter().take_while(|b| matches!(b, b'\r' | b'\n')).count();
        src.advance(leading);

        let Some((head_end, body_start)) = split_head(src) else {
            if src.len() > self.max_size {
                return Err(HttpCodecError::MessageTooLarge { size: src.len() });
            }
            return Ok(None);
        };

        let head = parse_head(&src[..head_end], Vec::new());
        let body_len = if head.status.is_some_and(|s| s.is_bodiless()) {
            0
        } else {
            match head.headers.get(names::CONTENT_LENGTH) {
                Some(raw) => raw
                    .parse::<usize>()
                    .map_err(|_| HttpCodecError::InvalidContentLength(raw.to_string()))?,
                None => src.len() - body_start,
            }
        };

        let total = body_start + body_len;
        if total > self.max_size {
            return Err(HttpCodecError::MessageTooLarge { size: total });
        }
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let frame = src.split_to(total);
        Ok(Some(HttpResponse {
            body: frame[body_start..].to_vec(),
            ..head
        }))
    }
}
