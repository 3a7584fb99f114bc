//! Station-mode radio primitives

use core::net::Ipv4Addr;

/// Maximum SSID length in bytes (802.11)
pub const MAX_SSID_LEN: usize = 32;

/// Maximum number of access points kept from one scan
pub const MAX_SCAN_RESULTS: usize = 16;

/// Access point identifier as reported by a scan
pub type Ssid = heapless::String<MAX_SSID_LEN>;

/// Identifiers seen during one scan
pub type ScanResults = heapless::Vec<Ssid, MAX_SCAN_RESULTS>;

/// Link status reported by the radio
///
/// Raw codes follow the CYW43 station link-status convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioStatus {
    /// Not connected, nothing in progress
    Idle,
    /// Join in progress
    Connecting,
    /// Authentication rejected
    WrongPassword,
    /// No access point answered for the identifier
    NoApFound,
    /// Generic join failure
    ConnectFailed,
    /// Associated and holding an address
    GotIp,
    /// Code outside the documented set
    Other(i32),
}

impl RadioStatus {
    pub const fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Idle,
            1 => Self::Connecting,
            3 => Self::GotIp,
            -1 => Self::ConnectFailed,
            -2 => Self::NoApFound,
            -3 => Self::WrongPassword,
            other => Self::Other(other),
        }
    }

    pub const fn code(self) -> i32 {
        match self {
            Self::Idle => 0,
            Self::Connecting => 1,
            Self::GotIp => 3,
            Self::ConnectFailed => -1,
            Self::NoApFound => -2,
            Self::WrongPassword => -3,
            Self::Other(code) => code,
        }
    }

    /// Short human-readable diagnosis, used when an attempt times out
    pub const fn diagnosis(self) -> &'static str {
        match self {
            Self::Idle => "radio idle",
            Self::Connecting => "still joining",
            Self::WrongPassword => "wrong credential",
            Self::NoApFound => "access point not found",
            Self::ConnectFailed => "general connection failure",
            Self::GotIp => "connected",
            Self::Other(_) => "undocumented status",
        }
    }
}

impl core::fmt::Display for RadioStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} ({})", self.diagnosis(), self.code())
    }
}

/// Station-mode radio
///
/// Every method must return promptly: `connect` only *requests* a join and
/// progress is observed through `status` / `is_associated`. Implementations
/// backed by asynchronous drivers bridge to a control task and report the
/// latest known state.
pub trait Radio {
    type Error: core::fmt::Debug;

    /// Reset the station interface before a connection cycle
    fn reset(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    /// Identifiers of the access points currently in range
    fn scan(&mut self) -> Result<ScanResults, Self::Error>;

    /// Drop any current association
    fn disconnect(&mut self) -> Result<(), Self::Error>;

    /// Request association with `identifier`; an empty credential means an open network
    fn connect(&mut self, identifier: &str, credential: &str) -> Result<(), Self::Error>;

    /// Latest link status
    fn status(&mut self) -> RadioStatus;

    /// Whether the station is currently associated
    fn is_associated(&mut self) -> bool;

    /// Address assigned to the station, once configured
    fn local_address(&mut self) -> Option<Ipv4Addr>;
}

/// State shared between a non-blocking [`Radio`] front and the task
/// driving the hardware
///
/// Every request that changes the association starts a new generation. A
/// join result is only recorded for the generation that queued it, so a join
/// finishing after a newer request cannot mark the wrong network as joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSnapshot {
    pub status: RadioStatus,
    /// Results of the last completed scan
    pub scan: ScanResults,
    joined: bool,
    generation: u32,
}

impl LinkSnapshot {
    pub const fn new() -> Self {
        Self {
            status: RadioStatus::Idle,
            scan: ScanResults::new(),
            joined: false,
            generation: 0,
        }
    }

    /// Last join of the current generation succeeded
    pub fn joined(&self) -> bool {
        self.joined
    }

    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Supersede every outstanding request; returns the new generation
    pub fn begin(&mut self, status: RadioStatus) -> u32 {
        self.generation = self.generation.wrapping_add(1);
        self.joined = false;
        self.status = status;
        self.generation
    }

    pub fn is_current(&self, generation: u32) -> bool {
        self.generation == generation
    }

    /// Record the result of a join queued under `generation`
    ///
    /// Returns `false`, leaving the snapshot untouched, when a newer request
    /// has been made since.
    pub fn complete_join(&mut self, generation: u32, result: Result<(), RadioStatus>) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        match result {
            Ok(()) => {
                self.joined = true;
                self.status = RadioStatus::Connecting;
            }
            Err(status) => self.status = status,
        }
        true
    }

    /// Record a leave queued under `generation`
    pub fn complete_leave(&mut self, generation: u32) -> bool {
        if !self.is_current(generation) {
            return false;
        }
        self.joined = false;
        self.status = RadioStatus::Idle;
        true
    }
}

impl Default for LinkSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_round_trip_through_known_values() {
        for code in [-3, -2, -1, 0, 1, 3] {
            assert_eq!(RadioStatus::from_code(code).code(), code);
        }
        assert_eq!(RadioStatus::from_code(7), RadioStatus::Other(7));
    }

    #[test]
    fn test_diagnosis() {
        assert_eq!(RadioStatus::WrongPassword.diagnosis(), "wrong credential");
        assert_eq!(RadioStatus::NoApFound.diagnosis(), "access point not found");
    }

    #[test]
    fn test_join_result_recorded_for_current_request() {
        let mut snapshot = LinkSnapshot::new();
        let join = snapshot.begin(RadioStatus::Connecting);

        assert!(snapshot.complete_join(join, Ok(())));
        assert!(snapshot.joined());
        assert_eq!(snapshot.status, RadioStatus::Connecting);
    }

    #[test]
    fn test_late_join_does_not_mark_newer_request_joined() {
        let mut snapshot = LinkSnapshot::new();
        let first = snapshot.begin(RadioStatus::Connecting);
        // Attempt timed out; the next candidate is requested before the
        // first join returns.
        snapshot.begin(RadioStatus::Idle);
        let second = snapshot.begin(RadioStatus::Connecting);

        assert!(!snapshot.complete_join(first, Ok(())));
        assert!(!snapshot.joined());
        assert_eq!(snapshot.status, RadioStatus::Connecting);

        assert!(snapshot.complete_join(second, Err(RadioStatus::NoApFound)));
        assert!(!snapshot.joined());
        assert_eq!(snapshot.status, RadioStatus::NoApFound);
    }

    #[test]
    fn test_late_leave_keeps_newer_status() {
        let mut snapshot = LinkSnapshot::new();
        let leave = snapshot.begin(RadioStatus::Idle);
        let join = snapshot.begin(RadioStatus::Connecting);

        assert!(!snapshot.complete_leave(leave));
        assert_eq!(snapshot.status, RadioStatus::Connecting);
        assert!(snapshot.complete_join(join, Ok(())));
        assert!(snapshot.joined());
    }
}
