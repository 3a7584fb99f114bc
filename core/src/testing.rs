//! Scripted collaborators for unit tests

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::rc::Rc;

use embedded_hal::i2c::{self, NoAcknowledgeSource, Operation};
use embedded_io_async::ErrorKind;
use hal_abstractions::{
    Clock, Connection, Duration, Instant, Listener, Measurement, Radio, RadioStatus, ScanResults,
    Sensor, Ssid,
};

pub fn ms(ticks: u64) -> Instant {
    Instant::from_ticks(ticks)
}

/// Error returned by the scripted radio and sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeError;

/// Shared record of which collaborator was touched, in order
#[derive(Clone, Default)]
pub struct EventLog(Rc<RefCell<Vec<&'static str>>>);

impl EventLog {
    pub fn push(&self, event: &'static str) {
        self.0.borrow_mut().push(event);
    }

    pub fn events(&self) -> Vec<&'static str> {
        self.0.borrow().clone()
    }
}

// --- Radio ---

/// How a network reacts to an association request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Behavior {
    /// The n-th association poll after the request succeeds
    AssociatesAfter(u32),
    /// Never associates; reports the given status while joining
    Never(RadioStatus),
    /// The request itself is refused
    RejectRequest,
}

/// Radio actions, in call order; status polls are not recorded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RadioCall {
    Reset,
    Scan,
    Disconnect,
    Connect(String),
}

pub struct FakeRadio {
    networks: Vec<(String, Behavior)>,
    pub fail_scan: bool,
    calls: Vec<RadioCall>,
    /// Network being joined, with its behavior at request time
    target: Option<(String, Behavior)>,
    polls: u32,
    associated: bool,
    log: Option<EventLog>,
}

impl FakeRadio {
    pub fn new(networks: &[(&str, Behavior)]) -> Self {
        Self {
            networks: networks
                .iter()
                .map(|(name, b)| (name.to_string(), *b))
                .collect(),
            fail_scan: false,
            calls: Vec::new(),
            target: None,
            polls: 0,
            associated: false,
            log: None,
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn calls(&self) -> &[RadioCall] {
        &self.calls
    }

    pub fn connect_targets(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                RadioCall::Connect(name) => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn set_behavior(&mut self, name: &str, behavior: Behavior) {
        for (n, b) in self.networks.iter_mut() {
            if n == name {
                *b = behavior;
            }
        }
    }

    /// Simulate the access point going away
    pub fn drop_link(&mut self) {
        self.associated = false;
        self.target = None;
    }

    /// Simulate an association established outside any cycle
    pub fn force_associated(&mut self) {
        self.associated = true;
    }

    fn touch(&self) {
        if let Some(log) = &self.log {
            log.push("radio");
        }
    }

    fn behavior_of(&self, name: &str) -> Behavior {
        self.networks
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, b)| *b)
            .unwrap_or(Behavior::Never(RadioStatus::NoApFound))
    }
}

impl Radio for FakeRadio {
    type Error = FakeError;

    fn reset(&mut self) -> Result<(), FakeError> {
        self.touch();
        self.calls.push(RadioCall::Reset);
        self.drop_link();
        Ok(())
    }

    fn scan(&mut self) -> Result<ScanResults, FakeError> {
        self.touch();
        self.calls.push(RadioCall::Scan);
        if self.fail_scan {
            return Err(FakeError);
        }
        let mut found = ScanResults::new();
        for (name, _) in &self.networks {
            let ssid: Ssid = name.as_str().try_into().map_err(|_| FakeError)?;
            let _ = found.push(ssid);
        }
        Ok(found)
    }

    fn disconnect(&mut self) -> Result<(), FakeError> {
        self.touch();
        self.calls.push(RadioCall::Disconnect);
        self.drop_link();
        Ok(())
    }

    fn connect(&mut self, identifier: &str, _credential: &str) -> Result<(), FakeError> {
        self.touch();
        self.calls.push(RadioCall::Connect(identifier.to_string()));
        self.associated = false;
        self.polls = 0;
        let behavior = self.behavior_of(identifier);
        if behavior == Behavior::RejectRequest {
            self.target = None;
            return Err(FakeError);
        }
        self.target = Some((identifier.to_string(), behavior));
        Ok(())
    }

    fn status(&mut self) -> RadioStatus {
        if self.associated {
            return RadioStatus::GotIp;
        }
        match &self.target {
            Some((_, Behavior::Never(status))) => *status,
            Some((_, Behavior::AssociatesAfter(_))) => RadioStatus::Connecting,
            Some((_, Behavior::RejectRequest)) => RadioStatus::ConnectFailed,
            None => RadioStatus::Idle,
        }
    }

    fn is_associated(&mut self) -> bool {
        if !self.associated {
            if let Some((_, Behavior::AssociatesAfter(n))) = self.target {
                self.polls += 1;
                if self.polls >= n {
                    self.associated = true;
                }
            }
        }
        self.associated
    }

    fn local_address(&mut self) -> Option<Ipv4Addr> {
        self.associated.then_some(Ipv4Addr::new(192, 168, 1, 50))
    }
}

// --- Sensor ---

/// Outcome of one sample attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorStep {
    Ready(Measurement),
    NotReady,
    ReadyCheckFails,
    ReadFails,
}

pub struct FakeSensor {
    steps: VecDeque<SensorStep>,
    current: Option<SensorStep>,
    /// Data-ready and read calls
    pub calls: u32,
    pub starts: u32,
    pub start_failures: u32,
    log: Option<EventLog>,
}

impl FakeSensor {
    pub fn new(steps: &[SensorStep]) -> Self {
        Self {
            steps: steps.iter().copied().collect(),
            current: None,
            calls: 0,
            starts: 0,
            start_failures: 0,
            log: None,
        }
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn push(&mut self, step: SensorStep) {
        self.steps.push_back(step);
    }

    fn touch(&self) {
        if let Some(log) = &self.log {
            log.push("sensor");
        }
    }
}

impl Sensor for FakeSensor {
    type Error = FakeError;

    fn start_periodic_sampling(&mut self) -> Result<(), FakeError> {
        self.starts += 1;
        if self.start_failures > 0 {
            self.start_failures -= 1;
            return Err(FakeError);
        }
        Ok(())
    }

    fn is_data_ready(&mut self) -> Result<bool, FakeError> {
        self.touch();
        self.calls += 1;
        self.current = self.steps.pop_front();
        match self.current {
            Some(SensorStep::Ready(_)) | Some(SensorStep::ReadFails) => Ok(true),
            Some(SensorStep::NotReady) | None => Ok(false),
            Some(SensorStep::ReadyCheckFails) => Err(FakeError),
        }
    }

    fn read_measurement(&mut self) -> Result<Measurement, FakeError> {
        self.calls += 1;
        match self.current.take() {
            Some(SensorStep::Ready(m)) => Ok(m),
            _ => Err(FakeError),
        }
    }
}

// --- Clock ---

#[derive(Default)]
pub struct ManualClock(Cell<u64>);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(Cell::new(start_ms))
    }

    pub fn advance(&self, by_ms: u64) {
        self.0.set(self.0.get() + by_ms);
    }

    pub fn set(&self, at_ms: u64) {
        self.0.set(at_ms);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        ms(self.0.get())
    }
}

// --- Network ---

/// Scripted client connection
#[derive(Debug, Default)]
pub struct FakeConnection {
    request: Vec<u8>,
    pos: usize,
    /// Largest number of bytes handed out per read
    pub chunk: usize,
    pub response: Vec<u8>,
    pub closed: bool,
    pub fail_reads: bool,
    pub bytes_read: usize,
    pub deadline: Option<Instant>,
}

impl FakeConnection {
    pub fn new(request: &[u8]) -> Self {
        Self {
            request: request.to_vec(),
            chunk: usize::MAX,
            ..Default::default()
        }
    }

    pub fn response_text(&self) -> String {
        String::from_utf8_lossy(&self.response).into_owned()
    }
}

impl embedded_io_async::ErrorType for FakeConnection {
    type Error = ErrorKind;
}

impl embedded_io_async::Read for FakeConnection {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, ErrorKind> {
        if self.fail_reads {
            return Err(ErrorKind::TimedOut);
        }
        let remaining = &self.request[self.pos..];
        let n = remaining.len().min(buf.len()).min(self.chunk);
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        self.bytes_read += n;
        Ok(n)
    }
}

impl embedded_io_async::Write for FakeConnection {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, ErrorKind> {
        self.response.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn flush(&mut self) -> Result<(), ErrorKind> {
        Ok(())
    }
}

impl Connection for &mut FakeConnection {
    fn set_deadline(&mut self, deadline: Instant) {
        self.deadline = Some(deadline);
    }

    async fn close(&mut self) {
        self.closed = true;
    }
}

/// Listener handing out queued connections, one per accept
#[derive(Default)]
pub struct FakeListener {
    pending: VecDeque<FakeConnection>,
    pub served: Vec<FakeConnection>,
    pub accept_timeouts: Vec<Duration>,
    pub fail_accepts: u32,
    log: Option<EventLog>,
}

impl FakeListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn queue(&mut self, conn: FakeConnection) {
        self.pending.push_back(conn);
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Listener for FakeListener {
    type Error = ErrorKind;
    type Connection<'a> = &'a mut FakeConnection where Self: 'a;

    async fn accept(
        &mut self,
        timeout: Duration,
    ) -> Result<Option<&mut FakeConnection>, ErrorKind> {
        if let Some(log) = &self.log {
            log.push("accept");
        }
        self.accept_timeouts.push(timeout);
        if self.fail_accepts > 0 {
            self.fail_accepts -= 1;
            return Err(ErrorKind::ConnectionReset);
        }
        match self.pending.pop_front() {
            Some(conn) => {
                self.served.push(conn);
                Ok(self.served.last_mut())
            }
            None => Ok(None),
        }
    }
}

// --- I2C ---

/// I2C bus answering reads from a queue and recording writes
#[derive(Default)]
pub struct FakeI2c {
    pub writes: Vec<(u8, Vec<u8>)>,
    reads: VecDeque<Vec<u8>>,
    pub nack_writes: bool,
}

impl FakeI2c {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue_read(&mut self, bytes: &[u8]) {
        self.reads.push_back(bytes.to_vec());
    }
}

impl i2c::ErrorType for FakeI2c {
    type Error = i2c::ErrorKind;
}

impl i2c::I2c for FakeI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), i2c::ErrorKind> {
        for op in operations {
            match op {
                Operation::Write(bytes) => {
                    if self.nack_writes {
                        return Err(i2c::ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
                    }
                    self.writes.push((address, bytes.to_vec()));
                }
                Operation::Read(buf) => {
                    let data = self.reads.pop_front().ok_or(i2c::ErrorKind::Other)?;
                    let n = buf.len().min(data.len());
                    buf[..n].copy_from_slice(&data[..n]);
                }
            }
        }
        Ok(())
    }
}

/// Delay that only accumulates the requested time
#[derive(Default)]
pub struct FakeDelay {
    pub total_ns: u64,
}

impl embedded_hal::delay::DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
