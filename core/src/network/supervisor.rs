//! Connectivity supervisor
//!
//! Owns the link state and drives connection cycles over the candidate list.
//! A cycle is an explicit value (attempt order, position, attempt number,
//! phase, due time, last status) advanced by one radio action per call:
//!
//! ```text
//! Reset -> [Scan] -> Disconnect -(settle)-> Associate -> AwaitAssociation
//!                        ^                                  |      |
//!                        |                          associated  timeout
//!                        +---- RetryWait <--- retries left -----+      |
//!                              next candidate / Failed <---------------+
//! ```

use hal_abstractions::{Duration, Instant, Radio, RadioStatus, ScanResults};

use super::candidates::{AttemptOrder, CandidateList, NetworkCandidate};
use super::state::{AttemptOutcome, ConnectionAttemptRecord, LinkOutcome, LinkState, Progress};
use crate::config::LinkPolicy;
use crate::elapsed_since;
use crate::fmt::Debug2Format;

/// Why a cycle was started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CycleKind {
    /// First connection after boot: priority order, scan diagnostics, full retries
    ColdStart,
    /// Link lost: last-known-good first, no scan, reconnect retries
    Reconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Reset,
    Scan,
    Disconnect,
    Associate,
    AwaitAssociation { requested_at: Instant },
    RetryWait,
}

#[derive(Debug, Clone)]
struct ConnectCycle {
    kind: CycleKind,
    order: AttemptOrder,
    position: usize,
    attempt: u8,
    attempts_allowed: u8,
    phase: Phase,
    due_at: Instant,
    attempt_started_at: Instant,
    last_status: RadioStatus,
}

impl ConnectCycle {
    fn candidate(&self) -> usize {
        self.order[self.position]
    }
}

enum StepResult {
    Continue,
    Finished(LinkOutcome),
}

/// Resumable connect / reconnect state machine over a [`Radio`]
pub struct ConnectivitySupervisor<R: Radio> {
    radio: R,
    candidates: CandidateList,
    policy: LinkPolicy,
    state: LinkState,
    cycle: Option<ConnectCycle>,
    last_known_good: Option<usize>,
    last_check: Option<Instant>,
    last_outcome: Option<LinkOutcome>,
}

impl<R: Radio> ConnectivitySupervisor<R> {
    pub fn new(radio: R, candidates: CandidateList, policy: LinkPolicy) -> Self {
        Self {
            radio,
            candidates,
            policy,
            state: LinkState::Disconnected,
            cycle: None,
            last_known_good: None,
            last_check: None,
            last_outcome: None,
        }
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    pub fn candidates(&self) -> &CandidateList {
        &self.candidates
    }

    /// Most recently successful candidate
    pub fn last_known_good(&self) -> Option<&NetworkCandidate> {
        self.last_known_good.and_then(|i| self.candidates.get(i))
    }

    pub fn last_outcome(&self) -> Option<&LinkOutcome> {
        self.last_outcome.as_ref()
    }

    pub fn is_cycling(&self) -> bool {
        self.cycle.is_some()
    }

    /// Earliest time the running cycle has something to do
    pub fn next_step_at(&self) -> Option<Instant> {
        self.cycle.as_ref().map(|c| c.due_at)
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Start a cold-start cycle over all candidates in priority order
    ///
    /// Replaces any cycle in progress and performs its first step. The
    /// outcome is delivered by [`advance`](Self::advance) once the cycle ends.
    pub fn connect(&mut self, now: Instant) -> Progress {
        self.begin_cycle(CycleKind::ColdStart, now);
        self.advance(now)
    }

    /// Perform at most one step of the running cycle
    ///
    /// A call before the cycle's due time is a no-op reporting the due time.
    pub fn advance(&mut self, now: Instant) -> Progress {
        let Some(mut cycle) = self.cycle.take() else {
            return Progress::Idle;
        };

        if now < cycle.due_at {
            let next_step_at = cycle.due_at;
            self.cycle = Some(cycle);
            return Progress::Pending { next_step_at };
        }

        match self.step(&mut cycle, now) {
            StepResult::Continue => {
                let next_step_at = cycle.due_at;
                self.cycle = Some(cycle);
                Progress::Pending { next_step_at }
            }
            StepResult::Finished(outcome) => {
                self.last_check = Some(now);
                self.last_outcome = Some(outcome.clone());
                Progress::Done(outcome)
            }
        }
    }

    /// Debounced liveness check
    ///
    /// While a cycle is running this advances it by at most one step. Otherwise,
    /// at most once per `check_interval`, the link state is reconciled with the
    /// radio; a lost association starts a reconnection cycle.
    pub fn ensure_connected(&mut self, now: Instant) -> LinkState {
        if self.cycle.is_some() {
            self.advance(now);
            return self.state;
        }

        if let Some(last) = self.last_check {
            if elapsed_since(now, last) < self.policy.check_interval {
                return self.state;
            }
        }
        self.last_check = Some(now);

        if self.radio.is_associated() {
            if self.state != LinkState::Connected {
                info!("Association restored without a cycle");
                self.transition(LinkState::Connected);
            }
            return self.state;
        }

        match self.state {
            LinkState::Connected => warn!("WiFi link lost, reconnecting..."),
            LinkState::Failed => info!("Retrying connection after exhausted cycle"),
            _ => {}
        }
        self.transition(LinkState::Disconnected);
        self.begin_cycle(CycleKind::Reconnect, now);
        self.advance(now);
        self.state
    }

    fn begin_cycle(&mut self, kind: CycleKind, now: Instant) {
        let (order, attempts_allowed) = match kind {
            CycleKind::ColdStart => (
                self.candidates.by_priority(),
                self.policy.retries_per_candidate.max(1),
            ),
            CycleKind::Reconnect => (
                self.candidates.preferring(self.last_known_good),
                self.policy.reconnect_retries_per_candidate.max(1),
            ),
        };
        info!(
            "Starting {:?} cycle over {} candidates ({} attempts each)",
            kind,
            order.len(),
            attempts_allowed
        );
        self.cycle = Some(ConnectCycle {
            kind,
            order,
            position: 0,
            attempt: 1,
            attempts_allowed,
            phase: Phase::Reset,
            due_at: now,
            attempt_started_at: now,
            last_status: RadioStatus::Idle,
        });
    }

    fn step(&mut self, cycle: &mut ConnectCycle, now: Instant) -> StepResult {
        match cycle.phase {
            Phase::Reset => {
                if let Err(e) = self.radio.reset() {
                    warn!("Radio reset failed: {:?}", Debug2Format(&e));
                }
                self.start_attempt(cycle, now);
                StepResult::Continue
            }
            Phase::Scan => {
                self.scan_for(cycle.candidate());
                cycle.phase = Phase::Disconnect;
                cycle.due_at = now;
                StepResult::Continue
            }
            Phase::Disconnect => {
                if let Err(e) = self.radio.disconnect() {
                    debug!("Disconnect before join failed: {:?}", Debug2Format(&e));
                }
                self.transition(LinkState::Associating);
                cycle.phase = Phase::Associate;
                cycle.due_at = now + self.policy.settle_delay;
                StepResult::Continue
            }
            Phase::Associate => {
                let index = cycle.candidate();
                let Some(candidate) = self.candidates.get(index) else {
                    return self.fail_attempt(cycle, now, AttemptOutcome::RequestFailed);
                };
                info!(
                    "Connecting to '{}' (attempt {} of {})",
                    candidate.identifier.as_str(),
                    cycle.attempt,
                    cycle.attempts_allowed
                );
                match self
                    .radio
                    .connect(candidate.identifier.as_str(), candidate.credential.as_str())
                {
                    Ok(()) => {
                        cycle.phase = Phase::AwaitAssociation { requested_at: now };
                        cycle.due_at = now;
                        StepResult::Continue
                    }
                    Err(e) => {
                        warn!("Association request rejected: {:?}", Debug2Format(&e));
                        self.fail_attempt(cycle, now, AttemptOutcome::RequestFailed)
                    }
                }
            }
            Phase::AwaitAssociation { requested_at } => {
                let status = self.radio.status();
                if status != cycle.last_status {
                    debug!("WiFi status changed to {:?}", status);
                    cycle.last_status = status;
                }
                if self.radio.is_associated() {
                    return self.succeed(cycle, now);
                }
                let waited = elapsed_since(now, requested_at);
                if waited > self.policy.connect_timeout {
                    self.log_timeout(cycle.candidate(), waited, status);
                    return self.fail_attempt(cycle, now, AttemptOutcome::TimedOut(status));
                }
                cycle.due_at = now + self.policy.status_poll_interval;
                StepResult::Continue
            }
            Phase::RetryWait => {
                if self.radio.is_associated() {
                    info!("Late association observed while waiting to retry");
                    return self.succeed(cycle, now);
                }
                cycle.attempt += 1;
                self.start_attempt(cycle, now);
                StepResult::Continue
            }
        }
    }

    fn start_attempt(&mut self, cycle: &mut ConnectCycle, now: Instant) {
        cycle.attempt_started_at = now;
        cycle.due_at = now;
        let scan = cycle.kind == CycleKind::ColdStart
            && self.policy.scan_on_cold_start
            && cycle.attempt == 1;
        if scan {
            self.transition(LinkState::Scanning);
            cycle.phase = Phase::Scan;
        } else {
            self.transition(LinkState::Associating);
            cycle.phase = Phase::Disconnect;
        }
    }

    fn succeed(&mut self, cycle: &mut ConnectCycle, now: Instant) -> StepResult {
        let index = cycle.candidate();
        self.record(cycle, now, AttemptOutcome::Associated);
        self.last_known_good = Some(index);
        self.transition(LinkState::Connected);

        let identifier = self
            .candidates
            .get(index)
            .map(|c| c.identifier.clone())
            .unwrap_or_default();
        info!("Connected to '{}'", identifier.as_str());
        if let Some(ip) = self.radio.local_address() {
            let octets = ip.octets();
            info!(
                "IP: {}.{}.{}.{}",
                octets[0], octets[1], octets[2], octets[3]
            );
        }

        StepResult::Finished(LinkOutcome::Connected {
            candidate: index,
            identifier,
        })
    }

    fn fail_attempt(
        &mut self,
        cycle: &mut ConnectCycle,
        now: Instant,
        outcome: AttemptOutcome,
    ) -> StepResult {
        self.record(cycle, now, outcome);

        if cycle.attempt < cycle.attempts_allowed {
            info!(
                "Waiting {} ms before retrying",
                self.policy.retry_delay.to_millis()
            );
            cycle.phase = Phase::RetryWait;
            cycle.due_at = now + self.policy.retry_delay;
            return StepResult::Continue;
        }

        cycle.position += 1;
        if cycle.position >= cycle.order.len() {
            error!("Could not connect to any configured network");
            self.transition(LinkState::Failed);
            return StepResult::Finished(LinkOutcome::Failed {
                last_status: cycle.last_status,
            });
        }
        cycle.attempt = 1;
        cycle.last_status = RadioStatus::Idle;
        self.start_attempt(cycle, now);
        StepResult::Continue
    }

    fn record(&self, cycle: &ConnectCycle, now: Instant, outcome: AttemptOutcome) {
        let record = ConnectionAttemptRecord {
            candidate: cycle.candidate(),
            attempt: cycle.attempt,
            started_at: cycle.attempt_started_at,
            elapsed: elapsed_since(now, cycle.attempt_started_at),
            outcome,
        };
        info!(
            "Attempt {} on candidate #{} ended after {} ms: {:?}",
            record.attempt,
            record.candidate,
            record.elapsed.to_millis(),
            record.outcome
        );
    }

    fn scan_for(&mut self, index: usize) {
        let Some(target) = self.candidates.get(index) else {
            return;
        };
        match self.radio.scan() {
            Ok(found) => {
                report_scan(&found, target.identifier.as_str());
            }
            Err(e) => warn!("Network scan failed: {:?}", Debug2Format(&e)),
        }
    }

    fn log_timeout(&self, index: usize, waited: Duration, status: RadioStatus) {
        let name = self
            .candidates
            .get(index)
            .map(|c| c.identifier.as_str())
            .unwrap_or("?");
        warn!(
            "Timeout ({} ms) connecting to '{}', last status {:?}: {}",
            waited.to_millis(),
            name,
            status,
            status.diagnosis()
        );
    }

    fn transition(&mut self, to: LinkState) {
        if self.state != to {
            debug!("Link state {} -> {}", self.state.as_str(), to.as_str());
            self.state = to;
        }
    }
}

fn report_scan(found: &ScanResults, target: &str) {
    info!("Scan found {} networks", found.len());
    for ssid in found.iter() {
        debug!(" - {}", ssid.as_str());
    }
    if found.iter().any(|s| s.as_str() == target) {
        info!("Network '{}' is in range", target);
    } else {
        warn!(
            "Network '{}' not in scan results (check power, 2.4 GHz band, exact SSID)",
            target
        );
    }
}
