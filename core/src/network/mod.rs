//! Connectivity: candidate networks and the link supervisor
//!
//! - **`candidates`**: immutable candidate list and per-cycle priority ordering
//! - **`state`**: link state, attempt records and cycle outcomes
//! - **`supervisor`**: resumable connect / reconnect state machine
//!
//! The supervisor never waits. Every call performs at most one radio action
//! and reports when the next step is due, so the orchestrator can interleave
//! sensor sampling and request servicing with a connection cycle that may
//! span tens of seconds.

pub mod candidates;
pub mod state;
pub mod supervisor;

pub use candidates::{CandidateList, NetworkCandidate, MAX_CANDIDATES};
pub use state::{AttemptOutcome, ConnectionAttemptRecord, LinkOutcome, LinkState, Progress};
pub use supervisor::{ConnectivitySupervisor, CycleKind};
