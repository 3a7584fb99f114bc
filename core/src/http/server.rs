//! Serve one accepted connection

use embedded_io_async::Read;
use hal_abstractions::{Clock, Connection, Instant, StaticContent};

use super::dispatcher::{route, Status};
use super::MAX_REQUEST_LEN;
use crate::fmt::Debug2Format;
use crate::sensors::SensorCacheEntry;

/// What happened to one client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ServeOutcome {
    Responded(Status),
    /// Empty or malformed request line; closed without a response
    Dropped,
    ReadFailed,
    WriteFailed,
    /// Deadline passed before a response could be written
    TimedOut,
}

/// Read one request, answer it and close the connection
///
/// At most `max_request_len` bytes (capped at [`MAX_REQUEST_LEN`]) are read,
/// stopping early at the end of the request line. The whole exchange is
/// bounded by `deadline`: no read starts after it and no response is written
/// once it has passed. The connection is closed on every path.
pub async fn serve<C, P, K>(
    conn: &mut C,
    snapshot: &SensorCacheEntry,
    content: &P,
    max_request_len: usize,
    clock: &K,
    deadline: Instant,
) -> ServeOutcome
where
    C: Connection,
    P: StaticContent + ?Sized,
    K: Clock + ?Sized,
{
    let mut buf = [0u8; MAX_REQUEST_LEN];
    let limit = max_request_len.min(MAX_REQUEST_LEN);
    conn.set_deadline(deadline);

    let outcome = match read_request(conn, &mut buf[..limit], clock, deadline).await {
        Err(e) => {
            warn!("Client read failed: {:?}", Debug2Format(&e));
            ServeOutcome::ReadFailed
        }
        Ok(None) => {
            warn!("Client too slow, dropping request");
            ServeOutcome::TimedOut
        }
        Ok(Some(len)) => match route(request_line(&buf[..len]), snapshot, content) {
            None => {
                debug!("Malformed request ({} bytes), closing", len);
                ServeOutcome::Dropped
            }
            Some(_) if clock.now() >= deadline => {
                warn!("Deadline passed before responding");
                ServeOutcome::TimedOut
            }
            Some(response) => match response.write_to(conn).await {
                Ok(()) => {
                    debug!(
                        "Responded {} ({} body bytes)",
                        response.status.code(),
                        response.body().len()
                    );
                    ServeOutcome::Responded(response.status)
                }
                Err(e) => {
                    warn!("Client write failed: {:?}", Debug2Format(&e));
                    ServeOutcome::WriteFailed
                }
            },
        },
    };

    conn.close().await;
    outcome
}

/// Fill `buf` until a newline arrives, the peer stops sending, or it is full
///
/// Returns `Ok(None)` when `deadline` passes first.
async fn read_request<R, K>(
    conn: &mut R,
    buf: &mut [u8],
    clock: &K,
    deadline: Instant,
) -> Result<Option<usize>, R::Error>
where
    R: Read,
    K: Clock + ?Sized,
{
    let mut len = 0;
    while len < buf.len() {
        if clock.now() >= deadline {
            return Ok(None);
        }
        let n = conn.read(&mut buf[len..]).await?;
        if n == 0 {
            break;
        }
        let line_done = buf[len..len + n].contains(&b'\n');
        len += n;
        if line_done {
            break;
        }
    }
    Ok(Some(len))
}

/// First line of a raw request, without its line terminator
///
/// Bytes that are not valid UTF-8 yield an empty line.
pub fn request_line(request: &[u8]) -> &str {
    let end = request
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(request.len());
    let line = &request[..end];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    core::str::from_utf8(line).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ms, FakeConnection, ManualClock};
    use embassy_futures::block_on;
    use embedded_io_async::{ErrorKind, ErrorType, Write};
    use hal_abstractions::Duration;

    const PAGE: &str = "<p>hi</p>";

    fn serve_bytes(conn: &mut FakeConnection, limit: usize) -> ServeOutcome {
        let clock = ManualClock::new(0);
        let mut handle = conn;
        block_on(serve(
            &mut handle,
            &SensorCacheEntry::default(),
            &PAGE,
            limit,
            &clock,
            ms(500),
        ))
    }

    /// Client that trickles one byte per read, each taking `per_read_ms`
    struct Trickle<'c> {
        clock: &'c ManualClock,
        per_read_ms: u64,
        request: &'static [u8],
        reads: usize,
        written: usize,
        deadline: Option<Instant>,
        closed: bool,
    }

    impl<'c> Trickle<'c> {
        fn new(clock: &'c ManualClock, per_read_ms: u64, request: &'static [u8]) -> Self {
            Self {
                clock,
                per_read_ms,
                request,
                reads: 0,
                written: 0,
                deadline: None,
                closed: false,
            }
        }
    }

    impl ErrorType for Trickle<'_> {
        type Error = ErrorKind;
    }

    impl Read for Trickle<'_> {
        async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
            self.clock.advance(self.per_read_ms);
            let Some(&byte) = self.request.get(self.reads) else {
                return Ok(0);
            };
            buf[0] = byte;
            self.reads += 1;
            Ok(1)
        }
    }

    impl Write for Trickle<'_> {
        async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
            self.written += buf.len();
            Ok(buf.len())
        }

        async fn flush(&mut self) -> Result<(), ErrorKind> {
            Ok(())
        }
    }

    impl Connection for &mut Trickle<'_> {
        fn set_deadline(&mut self, deadline: Instant) {
            self.deadline = Some(deadline);
        }

        async fn close(&mut self) {
            self.closed = true;
        }
    }

    fn serve_trickle(client: &mut Trickle<'_>, clock: &ManualClock, budget_ms: u64) -> ServeOutcome {
        let deadline = clock.now() + Duration::millis(budget_ms);
        let mut handle = client;
        block_on(serve(
            &mut handle,
            &SensorCacheEntry::default(),
            &PAGE,
            1024,
            clock,
            deadline,
        ))
    }

    #[test]
    fn test_request_line_strips_terminator() {
        assert_eq!(request_line(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n"), "GET / HTTP/1.1");
        assert_eq!(request_line(b"GET /data"), "GET /data");
        assert_eq!(request_line(b""), "");
        assert_eq!(request_line(&[0xFF, 0xFE, b'\n']), "");
    }

    #[test]
    fn test_serves_index_and_closes() {
        let mut conn = FakeConnection::new(b"GET / HTTP/1.1\r\nHost: node\r\n\r\n");
        assert_eq!(serve_bytes(&mut conn, 1024), ServeOutcome::Responded(Status::Ok));
        assert!(conn.closed);
        let text = conn.response_text();
        assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(text.contains("Content-Type: text/html; charset=utf-8\r\n"));
        assert!(text.contains("Connection: close\r\n"));
        assert!(text.ends_with("\r\n\r\n<p>hi</p>"));
    }

    #[test]
    fn test_request_line_split_across_reads() {
        let mut conn = FakeConnection::new(b"GET /data HTTP/1.1\r\n\r\n");
        conn.chunk = 3;
        assert_eq!(serve_bytes(&mut conn, 1024), ServeOutcome::Responded(Status::Ok));
        assert!(conn.response_text().contains("application/json"));
    }

    #[test]
    fn test_reads_stop_at_limit() {
        let mut request = std::vec![b'A'; 4096];
        request.extend_from_slice(b" /data\r\n");
        let mut conn = FakeConnection::new(&request);
        conn.chunk = 512;
        // The line is cut at the limit, leaving a single token.
        assert_eq!(serve_bytes(&mut conn, 1024), ServeOutcome::Dropped);
        assert_eq!(conn.bytes_read, 1024);
        assert!(conn.response.is_empty());
        assert!(conn.closed);
    }

    #[test]
    fn test_empty_request_closed_silently() {
        let mut conn = FakeConnection::new(b"");
        assert_eq!(serve_bytes(&mut conn, 1024), ServeOutcome::Dropped);
        assert!(conn.response.is_empty());
        assert!(conn.closed);
    }

    #[test]
    fn test_slow_client_cut_off_at_deadline() {
        let clock = ManualClock::new(1_000);
        let request: &'static [u8] = &[b'A'; 1024];
        let mut client = Trickle::new(&clock, 20, request);

        assert_eq!(serve_trickle(&mut client, &clock, 500), ServeOutcome::TimedOut);
        // No read starts at or after 1500 ms.
        assert_eq!(client.reads, 25);
        assert_eq!(clock.now(), ms(1_500));
        assert_eq!(client.deadline, Some(ms(1_500)));
        assert_eq!(client.written, 0);
        assert!(client.closed);
    }

    #[test]
    fn test_no_response_after_deadline() {
        let clock = ManualClock::new(0);
        // The final newline lands exactly on the deadline.
        let mut client = Trickle::new(&clock, 100, b"GET /\n");

        assert_eq!(serve_trickle(&mut client, &clock, 600), ServeOutcome::TimedOut);
        assert_eq!(client.reads, 6);
        assert_eq!(client.written, 0);
        assert!(client.closed);
    }

    #[test]
    fn test_slow_client_within_budget_is_served() {
        let clock = ManualClock::new(0);
        let mut client = Trickle::new(&clock, 10, b"GET /\n");

        assert_eq!(
            serve_trickle(&mut client, &clock, 500),
            ServeOutcome::Responded(Status::Ok)
        );
        assert!(client.written > 0);
        assert!(client.closed);
    }

    #[test]
    fn test_read_failure_still_closes() {
        let mut conn = FakeConnection::new(b"GET / HTTP/1.1\r\n");
        conn.fail_reads = true;
        assert_eq!(serve_bytes(&mut conn, 1024), ServeOutcome::ReadFailed);
        assert!(conn.closed);
    }
}
