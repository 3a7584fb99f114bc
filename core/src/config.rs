//! Node configuration structures

use fugit::ExtU64;
use hal_abstractions::Duration;

use crate::error::NodeError;

/// Connection and reconnection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    /// Maximum time one attempt waits for association
    pub connect_timeout: Duration,
    /// Pause between two attempts on the same candidate
    pub retry_delay: Duration,
    /// Attempts per candidate on a cold-start connect
    pub retries_per_candidate: u8,
    /// Attempts per candidate on a reconnection cycle
    pub reconnect_retries_per_candidate: u8,
    /// Minimum spacing between two liveness checks
    pub check_interval: Duration,
    /// Spacing between two association polls within one attempt
    pub status_poll_interval: Duration,
    /// Pause between disassociating and requesting the next association
    pub settle_delay: Duration,
    /// Scan before the first attempt on each candidate of a cold start
    pub scan_on_cold_start: bool,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: 20_u64.secs(),
            retry_delay: 5_u64.secs(),
            retries_per_candidate: 2,
            reconnect_retries_per_candidate: 1,
            check_interval: 10_u64.secs(),
            status_poll_interval: 1_u64.secs(),
            settle_delay: 1_u64.secs(),
            scan_on_cold_start: true,
        }
    }
}

/// Sensor sampling policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorPolicy {
    /// Minimum spacing between two sample attempts
    pub sample_interval: Duration,
    /// Period after initialization during which read failures are expected
    pub warmup_window: Duration,
}

impl Default for SensorPolicy {
    fn default() -> Self {
        Self {
            sample_interval: 20_u64.secs(),
            warmup_window: 30_u64.secs(),
        }
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// TCP port to listen on
    pub port: u16,
    /// How long one tick waits for a pending client
    pub poll_timeout: Duration,
    /// Bound on each read or write of an accepted connection
    pub io_timeout: Duration,
    /// Bytes of the request read before routing
    pub max_request_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 80,
            poll_timeout: 300_u64.millis(),
            io_timeout: 250_u64.millis(),
            max_request_len: crate::http::MAX_REQUEST_LEN,
        }
    }
}

/// Complete node configuration, validated once at startup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    pub link: LinkPolicy,
    pub sensor: SensorPolicy,
    pub server: ServerConfig,
    /// Upper bound on the time any single step may hold the loop
    pub max_poll_slice: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            link: LinkPolicy::default(),
            sensor: SensorPolicy::default(),
            server: ServerConfig::default(),
            max_poll_slice: 500_u64.millis(),
        }
    }
}

impl NodeConfig {
    /// Check the configuration against the poll-slice bound
    ///
    /// # Errors
    ///
    /// Returns `NodeError::InvalidPolicy` naming the first offending field.
    pub fn validate(&self) -> Result<(), NodeError> {
        let zero = Duration::from_ticks(0);
        let slice = self.max_poll_slice;

        if slice == zero {
            return Err(NodeError::InvalidPolicy("max_poll_slice"));
        }
        if self.server.poll_timeout == zero || self.server.poll_timeout > slice {
            return Err(NodeError::InvalidPolicy("server.poll_timeout"));
        }
        if self.server.io_timeout == zero || self.server.io_timeout > slice {
            return Err(NodeError::InvalidPolicy("server.io_timeout"));
        }
        if self.server.max_request_len == 0
            || self.server.max_request_len > crate::http::MAX_REQUEST_LEN
        {
            return Err(NodeError::InvalidPolicy("server.max_request_len"));
        }
        if self.link.connect_timeout == zero {
            return Err(NodeError::InvalidPolicy("link.connect_timeout"));
        }
        if self.link.status_poll_interval == zero {
            return Err(NodeError::InvalidPolicy("link.status_poll_interval"));
        }
        if self.link.check_interval == zero {
            return Err(NodeError::InvalidPolicy("link.check_interval"));
        }
        if self.link.retries_per_candidate == 0 {
            return Err(NodeError::InvalidPolicy("link.retries_per_candidate"));
        }
        if self.link.reconnect_retries_per_candidate == 0 {
            return Err(NodeError::InvalidPolicy(
                "link.reconnect_retries_per_candidate",
            ));
        }
        if self.sensor.sample_interval == zero {
            return Err(NodeError::InvalidPolicy("sensor.sample_interval"));
        }
        Ok(())
    }
}
