//! Request-line routing
//!
//! | Request                   | Response                                   |
//! |---------------------------|--------------------------------------------|
//! | `GET /`, `GET /index*`    | `200`, `text/html`, static content         |
//! | `GET /data*`              | `200`, `application/json`, cached reading  |
//! | anything else             | `404`, plain text                          |
//!
//! A request line with fewer than two tokens gets no response at all.

use core::fmt::Write as _;

use embedded_io_async::Write;
use hal_abstractions::StaticContent;
use heapless::String;

use crate::sensors::SensorCacheEntry;

pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";
pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";

const NOT_FOUND_BODY: &str = "404 Not Found";

/// Room for three floats in their shortest round-trip form
pub const JSON_CAPACITY: usize = 128;

const HEAD_CAPACITY: usize = 160;

/// Telemetry document
pub type JsonBody = String<JSON_CAPACITY>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Status {
    Ok,
    NotFound,
}

impl Status {
    pub const fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::NotFound => 404,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NotFound => "Not Found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body<'a> {
    /// Static page bytes
    Content(&'a [u8]),
    Json(JsonBody),
    Text(&'static str),
}

impl Body<'_> {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Self::Content(bytes) => bytes,
            Self::Json(json) => json.as_bytes(),
            Self::Text(text) => text.as_bytes(),
        }
    }
}

/// A complete response, written in one go and followed by a close
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: Status,
    pub content_type: &'static str,
    pub body: Body<'a>,
}

impl Response<'_> {
    pub fn body(&self) -> &[u8] {
        self.body.as_bytes()
    }

    /// Write status line, headers and body
    pub async fn write_to<W: Write>(&self, out: &mut W) -> Result<(), W::Error> {
        let mut head: String<HEAD_CAPACITY> = String::new();
        // Every field is bounded, so the head always fits.
        let _ = write!(
            head,
            "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.code(),
            self.status.reason(),
            self.content_type,
            self.body().len()
        );
        out.write_all(head.as_bytes()).await?;
        out.write_all(self.body()).await?;
        out.flush().await
    }
}

/// Route one request line against the static content and a cache snapshot
///
/// Returns `None` when the line does not carry both a method and a path.
pub fn route<'a, P: StaticContent + ?Sized>(
    request_line: &str,
    snapshot: &SensorCacheEntry,
    content: &'a P,
) -> Option<Response<'a>> {
    let mut tokens = request_line.split_ascii_whitespace();
    let (Some(method), Some(path)) = (tokens.next(), tokens.next()) else {
        return None;
    };

    if method != "GET" {
        return Some(not_found());
    }

    if path == "/" || path.starts_with("/index") {
        return Some(Response {
            status: Status::Ok,
            content_type: CONTENT_TYPE_HTML,
            body: Body::Content(content.index()),
        });
    }

    if path.starts_with("/data") {
        let Ok(json) = telemetry_json(snapshot) else {
            return Some(not_found());
        };
        return Some(Response {
            status: Status::Ok,
            content_type: CONTENT_TYPE_JSON,
            body: Body::Json(json),
        });
    }

    Some(not_found())
}

fn not_found() -> Response<'static> {
    Response {
        status: Status::NotFound,
        content_type: CONTENT_TYPE_TEXT,
        body: Body::Text(NOT_FOUND_BODY),
    }
}

/// `{"co2": .., "temp": .., "rh": ..}`, each field `null` until the first reading
pub fn telemetry_json(snapshot: &SensorCacheEntry) -> Result<JsonBody, core::fmt::Error> {
    let reading = snapshot.last_reading;
    let mut out = JsonBody::new();
    out.write_str("{\"co2\": ")?;
    write_number(&mut out, reading.map(|r| r.co2))?;
    out.write_str(", \"temp\": ")?;
    write_number(&mut out, reading.map(|r| r.temperature))?;
    out.write_str(", \"rh\": ")?;
    write_number(&mut out, reading.map(|r| r.relative_humidity))?;
    out.write_str("}")?;
    Ok(out)
}

fn write_number(out: &mut JsonBody, value: Option<f32>) -> core::fmt::Result {
    match value {
        // Debug keeps the fractional part ("450.0"), which Display drops.
        Some(v) if v.is_finite() => write!(out, "{:?}", v),
        _ => out.write_str("null"),
    }
}
