//! Playback control module
//!
//! Commands go out on the control socket through [`PlaybackController`];
//! [`StatusReporter`] polls the info socket into the playback tracker.

mod commands;
pub mod playback;
mod reporter;

#[cfg(test)]
mod tests;

pub use commands::{Command, IMAGE_CONTENT_TYPE};
pub use playback::PlaybackController;
pub use reporter::{StatusReporter, fetch_status};
