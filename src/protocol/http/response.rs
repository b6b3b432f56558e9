use super::Headers;

/// Status code of a parsed response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(pub u16);

impl StatusCode {
    /// 101 Switching Protocols (reverse-channel upgrade accepted)
    pub const SWITCHING_PROTOCOLS: StatusCode = StatusCode(101);
    /// 200 OK
    pub const OK: StatusCode = StatusCode(200);
    /// 204 No Content
    pub const NO_CONTENT: StatusCode = StatusCode(204);
    /// 404 Not Found
    pub const NOT_FOUND: StatusCode = StatusCode(404);
    /// 470 Connection Authorization Required (device does not know this client)
    pub const CONNECTION_AUTHORIZATION_REQUIRED: StatusCode = StatusCode(470);

    /// Numeric value
    #[must_use]
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Informational or no-content responses never carry a body
    #[must_use]
    pub fn is_bodiless(self) -> bool {
        (100..200).contains(&self.0) || self.0 == 204
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A parsed message from the device
///
/// Usually a response, but events pushed over the reverse channel arrive as
/// requests (`POST /event HTTP/1.1`); those have no status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status from the first `HTTP/1.x NNN` line, if any
    pub status: Option<StatusCode>,
    /// First line of the message
    pub start_line: String,
    /// Headers (lower-cased keys)
    pub headers: Headers,
    /// Byte-exact body
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// True only for status 200
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(StatusCode::OK)
    }

    /// True for the 101 reverse-channel upgrade
    #[must_use]
    pub fn is_upgrade(&self) -> bool {
        self.status == Some(StatusCode::SWITCHING_PROTOCOLS)
    }
}

/// Parse one complete message held in `raw`
///
/// Lines end in CR-LF or LF. The first line matching `HTTP/1.<0|1> <ddd>`
/// sets the status; other non-empty lines before the first empty line are
/// `key: value` headers; everything after the first empty line is the body,
/// untouched.
#[must_use]
pub fn parse_response(raw: &[u8]) -> HttpResponse {
    match split_head(raw) {
        Some((head_end, body_start)) => parse_head(&raw[..head_end], raw[body_start..].to_vec()),
        None => parse_head(raw, Vec::new()),
    }
}

/// Locate the first empty line
///
/// Returns the end of the header block and the start of the body.
pub(crate) fn split_head(buf: &[u8]) -> Option<(usize, usize)> {
    let mut line_start = 0;
    while let Some(offset) = buf[line_start..].iter().position(|b| *b == b'\n') {
        let newline = line_start + offset;
        let line = &buf[line_start..newline];
        if line.is_empty() || line == b"\r" {
            return Some((line_start, newline + 1));
        }
        line_start = newline + 1;
    }
    None
}

pub(crate) fn parse_head(head: &[u8], body: Vec<u8>) -> HttpResponse {
    let text = String::from_utf8_lossy(head);
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .filter(|line| !line.is_empty());

    let start_line = lines.next().unwrap_or_default().to_string();
    let mut status = match_status(&start_line);
    let mut headers = Headers::new();

    for line in lines {
        if status.is_none() {
            if let Some(code) = match_status(line) {
                status = Some(code);
                continue;
            }
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key, value);
        }
    }

    HttpResponse {
        status,
        start_line,
        headers,
        body,
    }
}

/// Find `HTTP/1.<0|1><ws><3 digits>` anywhere in the line
fn match_status(line: &str) -> Option<StatusCode> {
    line.match_indices("HTTP/1.").find_map(|(idx, marker)| {
        let rest = line.as_bytes().get(idx + marker.len()..)?;
        let [minor, space, d1, d2, d3, ..] = rest else {
            return None;
        };
        let digits = [*d1, *d2, *d3];
        if matches!(*minor, b'0' | b'1')
            && space.is_ascii_whitespace()
            && digits.iter().all(u8::is_ascii_digit)
        {
            let code = digits
                .iter()
                .fold(0u16, |acc, d| acc * 10 + u16::from(d - b'0'));
            Some(StatusCode(code))
        } else {
            None
        }
    })
}
