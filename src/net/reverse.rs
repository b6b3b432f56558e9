use std::sync::Arc;

use super::DeviceConnection;
use crate::error::AirPlayError;
use crate::protocol::http::{EVENT_ACK, HttpRequest, HttpResponse};

/// Event push channel
///
/// Sends the `POST /reverse` upgrade on a dedicated connection and then
/// answers every message the device pushes with a bare `200 OK` before
/// handing it to the listener. The `101` that confirms the upgrade is not
/// an event.
pub struct ReverseConnection {
    connection: Arc<DeviceConnection>,
    session_id: String,
}

impl ReverseConnection {
    /// Prepare a reverse channel with a fresh session identifier
    #[must_use]
    pub fn new(connection: Arc<DeviceConnection>) -> Self {
        Self {
            connection,
            session_id: new_session_id(),
        }
    }

    /// `X-Apple-Session-ID` sent with the upgrade
    #[must_use]
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Send the upgrade and deliver pushed messages until the connection closes
    ///
    /// # Errors
    ///
    /// Returns an error if the upgrade or an acknowledgement cannot be
    /// written, or the inbound stream is malformed.
    pub async fn run<F>(&self, mut on_event: F) -> Result<(), AirPlayError>
    where
        F: FnMut(HttpResponse) + Send,
    {
        let role = self.connection.role();
        let upgrade = HttpRequest::reverse_upgrade(self.session_id.as_str());
        self.connection.write(&upgrade.encode()).await?;
        tracing::debug!(%role, session_id = %self.session_id, "Sent reverse upgrade");

        while let Some(message) = self.connection.next_message().await {
            let message = message?;
            if message.is_upgrade() {
                tracing::info!(%role, "Event channel established");
                continue;
            }

            self.connection.write(EVENT_ACK).await?;
            tracing::debug!(%role, start_line = %message.start_line, "Device event");
            on_event(message);
        }

        tracing::debug!(%role, "Event channel closed");
        Ok(())
    }
}

/// Random version 4 UUID, upper-case
fn new_session_id() -> String {
    uuid::Uuid::new_v4()
        .hyphenated()
        .encode_upper(&mut uuid::Uuid::encode_buffer())
        .to_string()
}
