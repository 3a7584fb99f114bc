//! Link state and connection outcome types

use hal_abstractions::{Duration, Instant, RadioStatus, Ssid};

/// Current state of the radio link, owned by the supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkState {
    Disconnected,
    Scanning,
    Associating,
    Connected,
    /// Every candidate was exhausted; retried at the next liveness check
    Failed,
}

impl LinkState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "Disconnected",
            Self::Scanning => "Scanning",
            Self::Associating => "Associating",
            Self::Connected => "Connected",
            Self::Failed => "Failed",
        }
    }
}

/// Result of one complete connection cycle
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkOutcome {
    Connected {
        /// Position of the candidate in the configured list
        candidate: usize,
        identifier: Ssid,
    },
    Failed {
        last_status: RadioStatus,
    },
}

impl LinkOutcome {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

/// How a single attempt on one candidate ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AttemptOutcome {
    Associated,
    /// No association within the connect timeout; carries the last status seen
    TimedOut(RadioStatus),
    /// The radio refused the association request outright
    RequestFailed,
}

/// One attempt on one candidate; logged when the attempt ends, then dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionAttemptRecord {
    pub candidate: usize,
    pub attempt: u8,
    pub started_at: Instant,
    pub elapsed: Duration,
    pub outcome: AttemptOutcome,
}

/// What one supervisor step reports back to the loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    /// No cycle in progress
    Idle,
    /// Cycle still running; nothing useful happens before `next_step_at`
    Pending { next_step_at: Instant },
    /// Cycle finished on this step
    Done(LinkOutcome),
}
