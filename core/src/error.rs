//! Configuration and startup errors
//!
//! Runtime failures (radio, sensor, malformed requests) never surface as
//! errors; they are absorbed by the owning component and show up as state.

/// Errors detected while loading configuration or bringing the node up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeError {
    /// The candidate network list is empty
    NoCandidates,
    /// More candidates than the list can hold
    TooManyCandidates,
    /// A network identifier exceeds the SSID length limit
    IdentifierTooLong,
    /// A credential exceeds the passphrase length limit
    CredentialTooLong,
    /// A policy value violates the poll-slice bound or is zero
    InvalidPolicy(&'static str),
    /// The listening socket could not be acquired
    ListenerBind,
}

impl core::fmt::Display for NodeError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "No candidate networks configured"),
            Self::TooManyCandidates => write!(f, "Too many candidate networks"),
            Self::IdentifierTooLong => write!(f, "Network identifier too long"),
            Self::CredentialTooLong => write!(f, "Network credential too long"),
            Self::InvalidPolicy(field) => write!(f, "Invalid policy value: {}", field),
            Self::ListenerBind => write!(f, "Failed to bind listening socket"),
        }
    }
}

impl core::error::Error for NodeError {}
