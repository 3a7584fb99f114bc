//! Monotonic clock backed by the embassy-time driver

use hal_abstractions::{Clock, Instant};

/// Milliseconds since boot, from the RP2040 timer
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now(&self) -> Instant {
        Instant::from_ticks(embassy_time::Instant::now().as_millis())
    }
}
