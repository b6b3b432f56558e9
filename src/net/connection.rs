use std::net::SocketAddr;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;

use crate::error::AirPlayError;
use crate::protocol::http::{HttpCodec, HttpCodecError, HttpRequest, HttpResponse};
use crate::types::{AirPlayDevice, SocketRole};

/// Buffered messages waiting to be claimed by a request
const MESSAGE_QUEUE: usize = 16;

/// One persistent connection to the device
pub struct DeviceConnection {
    role: SocketRole,
    peer: SocketAddr,
    request_timeout: Option<Duration>,
    /// Write half and inbound queue; holding the lock is holding the socket
    exchange: Mutex<Exchange>,
    closed: watch::Receiver<bool>,
    reader: JoinHandle<()>,
}

struct Exchange {
    writer: Option<OwnedWriteHalf>,
    messages: mpsc::Receiver<Result<HttpResponse, HttpCodecError>>,
}

impl DeviceConnection {
    /// Open a TCP connection to the device for `role`
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::ConnectionFailed`] if the connect fails or does
    /// not finish within `connect_timeout`.
    pub async fn connect(
        device: &AirPlayDevice,
        role: SocketRole,
        connect_timeout: Duration,
        request_timeout: Option<Duration>,
    ) -> Result<Self, AirPlayError> {
        let addr = device.address();
        tracing::debug!(%role, %addr, "Connecting");

        let stream = match tokio::time::timeout(connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(AirPlayError::ConnectionFailed {
                    device_name: device.display_name().to_string(),
                    role,
                    message: e.to_string(),
                    source: Some(e),
                });
            }
            Err(_) => {
                return Err(AirPlayError::ConnectionFailed {
                    device_name: device.display_name().to_string(),
                    role,
                    message: format!("connect timed out after {connect_timeout:?}"),
                    source: None,
                });
            }
        };
        let _ = stream.set_nodelay(true);

        tracing::debug!(%role, %addr, "Connected");
        Ok(Self::from_stream(stream, role, addr, request_timeout))
    }

    /// Wrap an already connected stream
    pub(crate) fn from_stream(
        stream: TcpStream,
        role: SocketRole,
        peer: SocketAddr,
        request_timeout: Option<Duration>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (message_tx, message_rx) = mpsc::channel(MESSAGE_QUEUE);
        let (closed_tx, closed_rx) = watch::channel(false);

        let reader = tokio::spawn(async move {
            let mut framed = FramedRead::new(read_half, HttpCodec::new());
            while let Some(item) = framed.next().await {
                let failed = item.is_err();
                if let Err(ref e) = item {
                    tracing::warn!(%role, error = %e, "Failed to read from device");
                }
                if message_tx.send(item).await.is_err() || failed {
                    break;
                }
            }
            tracing::debug!(%role, "Connection closed");
            let _ = closed_tx.send(true);
        });

        Self {
            role,
            peer,
            request_timeout,
            exchange: Mutex::new(Exchange {
                writer: Some(write_half),
                messages: message_rx,
            }),
            closed: closed_rx,
            reader,
        }
    }

    /// Socket role
    #[must_use]
    pub fn role(&self) -> SocketRole {
        self.role
    }

    /// Remote address
    #[must_use]
    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// True once the peer has closed the connection or it was closed locally
    #[must_use]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow() || self.reader.is_finished()
    }

    /// Resolve when the connection closes
    pub async fn closed(&self) {
        let mut closed = self.closed.clone();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    /// Perform one exchange, requiring status 200
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::RequestFailed`] for any other status, or the
    /// errors of [`DeviceConnection::send`].
    pub async fn request(&self, request: &HttpRequest) -> Result<HttpResponse, AirPlayError> {
        let response = self.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            tracing::warn!(
                role = %self.role,
                method = %request.method,
                path = %request.path,
                status = ?response.status.map(|s| s.as_u16()),
                "Request failed"
            );
            Err(AirPlayError::RequestFailed {
                method: request.method.as_str(),
                path: request.path.clone(),
                status: response.status,
            })
        }
    }

    /// Perform one exchange and return the reply whatever its status
    ///
    /// Writes the header block, then the body, then waits for the next
    /// message from the device. Concurrent callers are serialized.
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::Disconnected`] if the connection closes before
    /// a reply arrives and [`AirPlayError::Timeout`] if a request timeout is
    /// configured and elapses.
    pub async fn send(&self, request: &HttpRequest) -> Result<HttpResponse, AirPlayError> {
        let exchange = self.exchange_once(request);
        let Some(limit) = self.request_timeout else {
            return exchange.await;
        };
        tokio::time::timeout(limit, exchange)
            .await
            .map_err(|_| {
                tracing::warn!(role = %self.role, path = %request.path, "Request timed out");
                AirPlayError::Timeout {
                    role: self.role,
                    path: request.path.clone(),
                    timeout: limit,
                }
            })?
    }

    async fn exchange_once(&self, request: &HttpRequest) -> Result<HttpResponse, AirPlayError> {
        let mut exchange = self.exchange.lock().await;

        // Anything already queued arrived before this request was written
        while let Ok(stale) = exchange.messages.try_recv() {
            tracing::debug!(role = %self.role, message = ?stale.map(|m| m.start_line), "Discarding unsolicited message");
        }

        tracing::debug!(
            role = %self.role,
            method = %request.method,
            path = %request.path,
            body_len = request.body.len(),
            ">> Sending request"
        );
        let writer = exchange
            .writer
            .as_mut()
            .ok_or(AirPlayError::Disconnected { role: self.role })?;
        writer.write_all(&request.encode_head()).await?;
        if !request.body.is_empty() {
            writer.write_all(&request.body).await?;
        }
        writer.flush().await?;

        let response = exchange
            .messages
            .recv()
            .await
            .ok_or(AirPlayError::Disconnected { role: self.role })??;

        tracing::debug!(
            role = %self.role,
            path = %request.path,
            status = ?response.status.map(|s| s.as_u16()),
            content_length = ?response.headers.content_length(),
            body_len = response.body.len(),
            "<< Received response"
        );
        Ok(response)
    }

    /// Write raw bytes without waiting for a reply
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is closed or the write fails.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), AirPlayError> {
        let mut exchange = self.exchange.lock().await;
        let writer = exchange
            .writer
            .as_mut()
            .ok_or(AirPlayError::Disconnected { role: self.role })?;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Wait for the next message from the device
    ///
    /// Returns `None` once the connection has closed.
    pub async fn next_message(&self) -> Option<Result<HttpResponse, AirPlayError>> {
        let mut exchange = self.exchange.lock().await;
        exchange
            .messages
            .recv()
            .await
            .map(|item| item.map_err(AirPlayError::from))
    }

    /// Half-close then drop the socket
    ///
    /// Any waiting request fails with [`AirPlayError::Disconnected`]. Errors
    /// from the half-close are logged and otherwise ignored.
    pub async fn close(&self) {
        self.reader.abort();

        let mut exchange = self.exchange.lock().await;
        if let Some(mut writer) = exchange.writer.take() {
            if let Err(e) = writer.shutdown().await {
                tracing::debug!(role = %self.role, error = %e, "Half-close failed");
            }
        }
        exchange.messages.close();
        tracing::debug!(role = %self.role, "Closed connection");
    }
}

impl Drop for DeviceConnection {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

impl std::fmt::Debug for DeviceConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceConnection")
            .field("role", &self.role)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
