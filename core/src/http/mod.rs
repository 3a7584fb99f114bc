//! Minimal HTTP surface
//!
//! - **`dispatcher`**: pure request-line routing to a fixed set of responses
//! - **`server`**: read one request from an accepted connection, answer, close

pub mod dispatcher;
pub mod server;

pub use dispatcher::{route, Body, Response, Status};
pub use server::{serve, ServeOutcome};

/// Bytes of a request read before routing; anything beyond is ignored
pub const MAX_REQUEST_LEN: usize = 1024;
