//! Hardware abstraction traits for the air-quality node firmware
//!
//! This crate defines the boundary between the platform-agnostic core logic
//! and the board: the radio, the sensor, the monotonic clock, the listening
//! socket and the static page content. BSPs implement these traits; the core
//! only ever talks to them through these seams.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod content;
pub mod net;
pub mod radio;
pub mod sensor;
pub mod time;

pub use content::StaticContent;
pub use net::{Connection, Listener};
pub use radio::{
    LinkSnapshot, Radio, RadioStatus, ScanResults, Ssid, MAX_SCAN_RESULTS, MAX_SSID_LEN,
};
pub use sensor::{Measurement, Sensor};
pub use time::{Clock, Duration, Instant};
