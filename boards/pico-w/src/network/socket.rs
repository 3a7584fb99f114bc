//! HTTP listening socket over embassy-net
//!
//! One `TcpSocket` is re-armed on every accept, so at most one client is
//! handled at a time. Every client read and write is bounded by the I/O
//! timeout and by the deadline the server sets for the whole exchange.

use embassy_net::tcp::{State, TcpSocket};
use embassy_net::Stack;
use embassy_time::{with_timeout, Duration, Instant};
use embedded_io_async::{ErrorType, Read, Write};
use hal_abstractions::{Connection, Listener};

use super::error::NetworkError;

fn to_embassy(duration: hal_abstractions::Duration) -> Duration {
    Duration::from_millis(duration.to_millis())
}

/// Listening socket on a fixed port
pub struct HttpListener<'a> {
    socket: TcpSocket<'a>,
    port: u16,
    io_timeout: Duration,
}

impl<'a> HttpListener<'a> {
    /// # Errors
    ///
    /// Returns `NetworkError::Bind` for port 0 or empty buffers.
    pub fn bind(
        stack: Stack<'a>,
        rx_buffer: &'a mut [u8],
        tx_buffer: &'a mut [u8],
        port: u16,
        io_timeout: hal_abstractions::Duration,
    ) -> Result<Self, NetworkError> {
        if port == 0 || rx_buffer.is_empty() || tx_buffer.is_empty() {
            return Err(NetworkError::Bind);
        }
        Ok(Self {
            socket: TcpSocket::new(stack, rx_buffer, tx_buffer),
            port,
            io_timeout: to_embassy(io_timeout),
        })
    }
}

impl<'a> Listener for HttpListener<'a> {
    type Error = NetworkError;
    type Connection<'c>
        = TcpConnection<'c, 'a>
    where
        Self: 'c;

    async fn accept(
        &mut self,
        timeout: hal_abstractions::Duration,
    ) -> Result<Option<TcpConnection<'_, 'a>>, NetworkError> {
        // A listen left over from a timed-out accept must be dropped first.
        if self.socket.state() != State::Closed {
            self.socket.abort();
        }
        match with_timeout(to_embassy(timeout), self.socket.accept(self.port)).await {
            Err(_) => {
                self.socket.abort();
                Ok(None)
            }
            Ok(Err(_)) => {
                self.socket.abort();
                Err(NetworkError::Accept)
            }
            Ok(Ok(())) => Ok(Some(TcpConnection {
                socket: &mut self.socket,
                io_timeout: self.io_timeout,
                deadline: None,
            })),
        }
    }
}

/// Accepted client, borrowed from the listener until closed
pub struct TcpConnection<'c, 'a> {
    socket: &'c mut TcpSocket<'a>,
    io_timeout: Duration,
    deadline: Option<Instant>,
}

impl TcpConnection<'_, '_> {
    /// Time the next operation may take
    fn budget(&self) -> Duration {
        match self.deadline {
            Some(deadline) => self
                .io_timeout
                .min(deadline.saturating_duration_since(Instant::now())),
            None => self.io_timeout,
        }
    }
}

impl ErrorType for TcpConnection<'_, '_> {
    type Error = NetworkError;
}

impl Read for TcpConnection<'_, '_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        with_timeout(self.budget(), self.socket.read(buf))
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|_| NetworkError::SocketError)
    }
}

impl Write for TcpConnection<'_, '_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        with_timeout(self.budget(), self.socket.write(buf))
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|_| NetworkError::SocketError)
    }

    async fn flush(&mut self) -> Result<(), Self::Error> {
        with_timeout(self.budget(), self.socket.flush())
            .await
            .map_err(|_| NetworkError::Timeout)?
            .map_err(|_| NetworkError::SocketError)
    }
}

impl Connection for TcpConnection<'_, '_> {
    fn set_deadline(&mut self, deadline: hal_abstractions::Instant) {
        self.deadline = Some(Instant::from_millis(deadline.ticks()));
    }

    async fn close(&mut self) {
        self.socket.close();
        let _ = with_timeout(self.budget(), self.socket.flush()).await;
        // Back to Closed so the next accept can listen again.
        self.socket.abort();
        let _ = with_timeout(self.budget(), self.socket.flush()).await;
    }
}
