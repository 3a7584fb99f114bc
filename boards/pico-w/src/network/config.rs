//! Network configuration structures
//!
//! Candidate networks are baked in at build time from environment variables:
//!
//! ```text
//! AIRNODE_WIFI_SSID_1=home AIRNODE_WIFI_PASSWORD_1=... AIRNODE_WIFI_PRIORITY_1=1 \
//! AIRNODE_WIFI_SSID_2=phone AIRNODE_WIFI_PASSWORD_2=... cargo run --release
//! ```
//!
//! An unset password means an open network. An unset or unparsable priority
//! falls back to the slot number, so slot 1 is preferred by default.

use airnode_core::{CandidateList, NetworkCandidate, NodeError};
use heapless::Vec;

const SLOT_COUNT: usize = 3;

/// Build-time slots; extend the table to allow more
const SLOTS: [CandidateSlot; SLOT_COUNT] = [
    CandidateSlot {
        ssid: option_env!("AIRNODE_WIFI_SSID_1"),
        password: option_env!("AIRNODE_WIFI_PASSWORD_1"),
        priority: option_env!("AIRNODE_WIFI_PRIORITY_1"),
    },
    CandidateSlot {
        ssid: option_env!("AIRNODE_WIFI_SSID_2"),
        password: option_env!("AIRNODE_WIFI_PASSWORD_2"),
        priority: option_env!("AIRNODE_WIFI_PRIORITY_2"),
    },
    CandidateSlot {
        ssid: option_env!("AIRNODE_WIFI_SSID_3"),
        password: option_env!("AIRNODE_WIFI_PASSWORD_3"),
        priority: option_env!("AIRNODE_WIFI_PRIORITY_3"),
    },
];

struct CandidateSlot {
    ssid: Option<&'static str>,
    password: Option<&'static str>,
    priority: Option<&'static str>,
}

/// Radio and stack settings
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Upper bound on one join request inside the control loop, in seconds
    pub join_timeout_secs: u64,
    /// Let the chip doze between beacons
    pub power_save: bool,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            join_timeout_secs: 20,
            power_save: true,
        }
    }
}

/// Candidate networks configured at build time
///
/// # Errors
///
/// `NodeError::NoCandidates` when no slot carries an SSID, or the length
/// errors of [`NetworkCandidate::new`].
pub fn candidates() -> Result<CandidateList, NodeError> {
    let mut found: Vec<NetworkCandidate, SLOT_COUNT> = Vec::new();
    for (slot, entry) in SLOTS.iter().enumerate() {
        let Some(ssid) = entry.ssid.filter(|s| !s.is_empty()) else {
            continue;
        };
        let priority = entry
            .priority
            .and_then(|p| p.trim().parse::<i32>().ok())
            .unwrap_or(slot as i32 + 1);
        let candidate = NetworkCandidate::new(ssid, entry.password.unwrap_or(""), priority)?;
        // One push per slot, so this cannot overflow.
        let _ = found.push(candidate);
    }
    CandidateList::from_slice(&found)
}
