//! Command catalogue for the control and info sockets

use crate::error::AirPlayError;
use crate::protocol::http::HttpRequest;
use crate::protocol::plist::{self, DictBuilder};

/// Content type for image uploads
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// A single request the client can issue to the device
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Load and start a media URL
    Play {
        /// Media location
        url: String,
    },
    /// Jump to a position in seconds
    Seek(u64),
    /// Set rate 0
    Pause,
    /// Set rate 1
    Resume,
    /// Unload the current item
    Stop,
    /// Show an image
    Photo(Vec<u8>),
    /// Query playback status
    PlaybackInfo,
}

impl Command {
    /// Build the wire request for this command
    ///
    /// `Play` always sends `Start-Position: 0`; an initial offset is applied
    /// by a later seek once the device reports playback.
    ///
    /// # Errors
    ///
    /// Returns [`AirPlayError::Codec`] if the play body cannot be encoded.
    pub fn request(&self) -> Result<HttpRequest, AirPlayError> {
        let request = match self {
            Command::Play { url } => {
                let body = DictBuilder::new()
                    .insert("Content-Location", url.as_str())
                    .insert("Start-Position", 0i64)
                    .build();
                HttpRequest::post("/play").with_body(plist::CONTENT_TYPE, plist::encode(&body)?)
            }
            Command::Seek(position) => HttpRequest::post(format!("/scrub?position={position}")),
            Command::Pause => HttpRequest::post("/rate?value=0"),
            Command::Resume => HttpRequest::post("/rate?value=1"),
            Command::Stop => HttpRequest::post("/stop"),
            Command::Photo(image) => {
                HttpRequest::put("/photo").with_body(IMAGE_CONTENT_TYPE, image.clone())
            }
            Command::PlaybackInfo => HttpRequest::get("/playback-info"),
        };
        Ok(request)
    }

    /// Short name for logs
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::Play { .. } => "play",
            Command::Seek(_) => "seek",
            Command::Pause => "pause",
            Command::Resume => "resume",
            Command::Stop => "stop",
            Command::Photo(_) => "photo",
            Command::PlaybackInfo => "playback-info",
        }
    }
}
