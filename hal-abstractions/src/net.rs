//! Listening socket abstraction for the HTTP surface

use core::future::Future;

use embedded_io_async::{Read, Write};

use crate::time::{Duration, Instant};

/// One accepted client connection
///
/// Reads and writes are expected to be bounded by a transport-level timeout.
pub trait Connection: Read + Write {
    /// Bound every later read, write and close to finish by `deadline`
    ///
    /// Transports with their own timer should also cut a blocked operation
    /// short once the deadline passes.
    fn set_deadline(&mut self, deadline: Instant);

    /// Flush and close the connection
    fn close(&mut self) -> impl Future<Output = ()>;
}

/// Bound listening socket
pub trait Listener {
    type Error: core::fmt::Debug;

    type Connection<'a>: Connection
    where
        Self: 'a;

    /// Wait at most `timeout` for a pending client
    ///
    /// Returns `Ok(None)` when the timeout elapses without a client.
    fn accept(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Option<Self::Connection<'_>>, Self::Error>>;
}
