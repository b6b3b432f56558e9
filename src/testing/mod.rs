//! Test utilities
//!
//! [`MockAirPlayDevice`] stands in for a receiver in unit and integration
//! tests.

pub mod mock_device;

pub use mock_device::{MOCK_DEVICE_ID, MockAirPlayDevice, RecordedRequest};
