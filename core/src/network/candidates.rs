//! Candidate access points and their priority ordering

use hal_abstractions::{Ssid, MAX_SSID_LEN};
use heapless::{String, Vec};

use crate::error::NodeError;

/// Maximum number of configured candidate networks
pub const MAX_CANDIDATES: usize = 8;

/// Maximum WPA passphrase length in bytes
pub const MAX_CREDENTIAL_LEN: usize = 64;

/// One network the device may join
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct NetworkCandidate {
    pub identifier: Ssid,
    /// Empty for open networks
    pub credential: String<MAX_CREDENTIAL_LEN>,
    /// Lower is preferred
    pub priority: i32,
}

impl NetworkCandidate {
    /// # Errors
    ///
    /// Returns `IdentifierTooLong` / `CredentialTooLong` when a field does not fit.
    pub fn new(identifier: &str, credential: &str, priority: i32) -> Result<Self, NodeError> {
        if identifier.len() > MAX_SSID_LEN {
            return Err(NodeError::IdentifierTooLong);
        }
        if credential.len() > MAX_CREDENTIAL_LEN {
            return Err(NodeError::CredentialTooLong);
        }
        let mut id = Ssid::new();
        id.push_str(identifier)
            .map_err(|_| NodeError::IdentifierTooLong)?;
        let mut cred = String::new();
        cred.push_str(credential)
            .map_err(|_| NodeError::CredentialTooLong)?;
        Ok(Self {
            identifier: id,
            credential: cred,
            priority,
        })
    }
}

/// Positions into a [`CandidateList`], in the order they should be tried
pub type AttemptOrder = Vec<usize, MAX_CANDIDATES>;

/// Immutable set of candidates as loaded at startup
///
/// The list itself is never reordered. Each connection cycle computes a fresh
/// [`AttemptOrder`] of positions, so a candidate keeps its identity (its
/// position) across cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateList {
    entries: Vec<NetworkCandidate, MAX_CANDIDATES>,
}

impl CandidateList {
    /// # Errors
    ///
    /// Returns `NoCandidates` for an empty slice and `TooManyCandidates` when
    /// it exceeds [`MAX_CANDIDATES`].
    pub fn from_slice(candidates: &[NetworkCandidate]) -> Result<Self, NodeError> {
        if candidates.is_empty() {
            return Err(NodeError::NoCandidates);
        }
        let entries = Vec::from_slice(candidates).map_err(|_| NodeError::TooManyCandidates)?;
        Ok(Self { entries })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&NetworkCandidate> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkCandidate> {
        self.entries.iter()
    }

    /// Positions sorted by ascending priority, ties kept in load order
    pub fn by_priority(&self) -> AttemptOrder {
        let mut order: AttemptOrder = (0..self.entries.len()).collect();
        order.sort_unstable_by_key(|&i| (self.entries[i].priority, i));
        order
    }

    /// Priority order with `preferred` moved to the front
    ///
    /// An out-of-range `preferred` is ignored.
    pub fn preferring(&self, preferred: Option<usize>) -> AttemptOrder {
        let by_priority = self.by_priority();
        let Some(first) = preferred.filter(|&i| i < self.entries.len()) else {
            return by_priority;
        };
        let mut order = AttemptOrder::new();
        // Capacity matches the list, so these pushes cannot fail.
        let _ = order.push(first);
        for i in by_priority.into_iter().filter(|&i| i != first) {
            let _ = order.push(i);
        }
        order
    }
}
