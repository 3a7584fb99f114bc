//! Sensor sampling
//!
//! - **`cache`**: last-known-good reading with debounced refresh and warm-up handling
//! - **`scd4x`**: Sensirion SCD4x driver implementing [`hal_abstractions::Sensor`]

pub mod cache;
pub mod scd4x;

pub use cache::{RefreshOutcome, SensorCache, SensorCacheEntry, SensorReading};
pub use scd4x::{Scd4x, Scd4xError};
