//! Network error types

use defmt::Format;

/// Radio bridge and listener errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Format)]
pub enum NetworkError {
    /// The radio control loop has not drained earlier commands
    CommandQueueFull,
    /// Identifier or credential does not fit the driver's limits
    InvalidRequest,
    /// Listening port is unusable
    Bind,
    /// Accept failed for a reason other than the poll timeout
    Accept,
    /// Client read or write exceeded the I/O timeout
    Timeout,
    /// Client connection reset or closed underneath us
    SocketError,
}

impl core::fmt::Display for NetworkError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::CommandQueueFull => write!(f, "Radio command queue full"),
            Self::InvalidRequest => write!(f, "Invalid radio request"),
            Self::Bind => write!(f, "Listening port unusable"),
            Self::Accept => write!(f, "Accept failed"),
            Self::Timeout => write!(f, "Socket I/O timeout"),
            Self::SocketError => write!(f, "Socket error"),
        }
    }
}

// Implement core::error::Error for no_std compatibility
impl core::error::Error for NetworkError {}

impl embedded_io_async::Error for NetworkError {
    fn kind(&self) -> embedded_io_async::ErrorKind {
        match self {
            Self::SocketError => embedded_io_async::ErrorKind::BrokenPipe,
            Self::Timeout => embedded_io_async::ErrorKind::TimedOut,
            Self::Bind => embedded_io_async::ErrorKind::AddrInUse,
            _ => embedded_io_async::ErrorKind::Other,
        }
    }
}
