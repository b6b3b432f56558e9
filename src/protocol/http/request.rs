use super::{Method, OCTET_STREAM, REVERSE_USER_AGENT, USER_AGENT};

/// A request to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method
    pub method: Method,
    /// Path including any query string
    pub path: String,
    /// Optional body media type
    pub content_type: Option<String>,
    /// Raw body bytes (may be empty)
    pub body: Vec<u8>,
    /// Headers written instead of the standard control header set
    upgrade_headers: Option<Vec<(String, String)>>,
}

impl HttpRequest {
    /// Create a request with no body
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            content_type: None,
            body: Vec::new(),
            upgrade_headers: None,
        }
    }

    /// `GET path`
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    /// `POST path`
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    /// `PUT path`
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    /// `POST path` with an `application/octet-stream` body
    pub fn octet_stream(path: impl Into<String>, body: Vec<u8>) -> Self {
        Self::post(path).with_body(OCTET_STREAM, body)
    }

    /// The reverse-channel upgrade request
    ///
    /// Carries no `Content-Length`; the device answers with `101` and then
    /// starts pushing events over the same connection.
    pub fn reverse_upgrade(session_id: impl Into<String>) -> Self {
        let headers = vec![
            ("Upgrade".to_string(), "PTTH/1.0".to_string()),
            ("Connection".to_string(), "Upgrade".to_string()),
            ("X-Apple-Purpose".to_string(), "event".to_string()),
            ("User-Agent".to_string(), REVERSE_USER_AGENT.to_string()),
            ("X-Apple-Session-ID".to_string(), session_id.into()),
        ];
        Self {
            upgrade_headers: Some(headers),
            ..Self::post("/reverse")
        }
    }

    /// Attach a body with its content type
    #[must_use]
    pub fn with_body(mut self, content_type: impl Into<String>, body: Vec<u8>) -> Self {
        self.content_type = Some(content_type.into());
        self.body = body;
        self
    }

    /// Encode the request line and header block, including the blank line
    ///
    /// The standard header set is `User-Agent`, `Connection: keep-alive`,
    /// optional `Content-Type`, and `Content-Length` (always present).
    #[must_use]
    pub fn encode_head(&self) -> Vec<u8> {
        let mut head = format!("{} {} HTTP/1.1\r\n", self.method, self.path);

        if let Some(headers) = &self.upgrade_headers {
            for (name, value) in headers {
                head.push_str(&format!("{name}: {value}\r\n"));
            }
        } else {
            head.push_str(&format!("User-Agent: {USER_AGENT}\r\n"));
            head.push_str("Connection: keep-alive\r\n");
            if let Some(content_type) = &self.content_type {
                head.push_str(&format!("Content-Type: {content_type}\r\n"));
            }
            head.push_str(&format!("Content-Length: {}\r\n", self.body.len()));
        }

        head.push_str("\r\n");
        head.into_bytes()
    }

    /// Encode the full request (head followed by body)
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut output = self.encode_head();
        output.extend_from_slice(&self.body);
        output
    }
}
