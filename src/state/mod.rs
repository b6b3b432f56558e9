//! Observed playback state and client events

mod events;
mod tracker;

pub use events::{ClientEvent, EventBus, EventFilter};
pub use tracker::PlaybackTracker;
