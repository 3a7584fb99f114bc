//! Platform-agnostic core logic for the air-quality node
//!
//! This crate contains the connectivity supervisor, the sensor cache, the
//! HTTP dispatcher and the cooperative orchestrator that ties them together.
//! It has NO hardware dependencies: the radio, sensor, clock and listening
//! socket are reached through the traits in `hal-abstractions`.
//!
//! ## Logging
//!
//! Enable `defmt` on target or `log` on hosted builds; with neither feature
//! all log statements compile away.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

// This mod MUST go first, so that the others see its macros.
pub(crate) mod fmt;

pub mod config;
pub mod error;
pub mod http;
pub mod network;
pub mod orchestrator;
pub mod sensors;

#[cfg(test)]
mod testing;

pub use config::{LinkPolicy, NodeConfig, SensorPolicy, ServerConfig};
pub use error::NodeError;
pub use network::{CandidateList, ConnectivitySupervisor, LinkOutcome, LinkState, NetworkCandidate};
pub use orchestrator::{Orchestrator, TickReport};
pub use sensors::{SensorCache, SensorCacheEntry, SensorReading};

use hal_abstractions::{Duration, Instant};

/// Time from `since` to `now`, zero if the clock appears to have gone backwards
pub(crate) fn elapsed_since(now: Instant, since: Instant) -> Duration {
    now.checked_duration_since(since)
        .unwrap_or(Duration::from_ticks(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ms;

    #[test]
    fn test_elapsed_since_saturates() {
        assert_eq!(elapsed_since(ms(1_500), ms(1_000)).to_millis(), 500);
        assert_eq!(elapsed_since(ms(1_000), ms(1_500)).to_millis(), 0);
    }
}
