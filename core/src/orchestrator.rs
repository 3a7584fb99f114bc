//! Cooperative main loop
//!
//! One tick runs, in fixed order:
//!
//! 1. the liveness check, advancing a running connection cycle by one step
//! 2. a sensor refresh (no-op unless the sample interval has elapsed)
//! 3. an accept bounded by the poll timeout
//! 4. if a client is pending, one request read, routed, answered and closed,
//!    all within `max_poll_slice` of the accept
//!
//! Nothing in a tick waits on the radio; the accept timeout is the loop's
//! only pacing.

use hal_abstractions::{Clock, Duration, Listener, Radio, Sensor, StaticContent};

use crate::config::{NodeConfig, ServerConfig};
use crate::error::NodeError;
use crate::fmt::Debug2Format;
use crate::http::{serve, ServeOutcome};
use crate::network::{CandidateList, ConnectivitySupervisor, LinkState, Progress};
use crate::sensors::{RefreshOutcome, SensorCache};

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub link: LinkState,
    pub sensor: RefreshOutcome,
    /// `None` when no client was pending
    pub client: Option<ServeOutcome>,
}

/// Owns every long-lived component and multiplexes them on one thread
pub struct Orchestrator<R, S, C, P>
where
    R: Radio,
    S: Sensor,
    C: Clock,
    P: StaticContent,
{
    supervisor: ConnectivitySupervisor<R>,
    sensors: SensorCache<S>,
    clock: C,
    content: P,
    server: ServerConfig,
    max_poll_slice: Duration,
    started: bool,
    ticks: u64,
    clients_served: u32,
}

impl<R, S, C, P> Orchestrator<R, S, C, P>
where
    R: Radio,
    S: Sensor,
    C: Clock,
    P: StaticContent,
{
    /// # Errors
    ///
    /// Returns `NodeError::InvalidPolicy` when `config` fails validation.
    pub fn new(
        config: &NodeConfig,
        radio: R,
        candidates: CandidateList,
        sensor: S,
        clock: C,
        content: P,
    ) -> Result<Self, NodeError> {
        config.validate()?;
        info!(
            "Orchestrator configured with {} candidate networks",
            candidates.len()
        );
        Ok(Self {
            supervisor: ConnectivitySupervisor::new(radio, candidates, config.link),
            sensors: SensorCache::new(sensor, config.sensor),
            clock,
            content,
            server: config.server,
            max_poll_slice: config.max_poll_slice,
            started: false,
            ticks: 0,
            clients_served: 0,
        })
    }

    /// Start the sensor warm-up and the cold-start connection cycle
    ///
    /// Called by the first tick if not called before.
    pub fn start(&mut self) -> Progress {
        let now = self.clock.now();
        self.started = true;
        self.sensors.initialize(now);
        self.supervisor.connect(now)
    }

    /// Run one tick against `listener`
    ///
    /// The first tick starts the node if [`start`](Self::start) was not
    /// called; the cold-start step then stands in for the liveness check.
    pub async fn tick<L: Listener>(&mut self, listener: &mut L) -> TickReport {
        self.ticks = self.ticks.wrapping_add(1);

        let link = if self.started {
            self.supervisor.ensure_connected(self.clock.now())
        } else {
            self.start();
            self.supervisor.state()
        };
        let sensor = self.sensors.refresh(self.clock.now());

        let client = match listener.accept(self.server.poll_timeout).await {
            Ok(Some(mut conn)) => {
                let now = self.clock.now();
                let snapshot = self.sensors.latest(now);
                let outcome = serve(
                    &mut conn,
                    &snapshot,
                    &self.content,
                    self.server.max_request_len,
                    &self.clock,
                    now + self.max_poll_slice,
                )
                .await;
                self.clients_served = self.clients_served.wrapping_add(1);
                info!("Client #{} served: {:?}", self.clients_served, outcome);
                Some(outcome)
            }
            Ok(None) => None,
            Err(e) => {
                debug!("Accept failed: {:?}", Debug2Format(&e));
                None
            }
        };

        TickReport {
            link,
            sensor,
            client,
        }
    }

    /// Tick forever
    pub async fn run<L: Listener>(&mut self, listener: &mut L) -> ! {
        info!("Entering main loop");
        loop {
            self.tick(listener).await;
        }
    }

    pub fn supervisor(&self) -> &ConnectivitySupervisor<R> {
        &self.supervisor
    }

    pub fn supervisor_mut(&mut self) -> &mut ConnectivitySupervisor<R> {
        &mut self.supervisor
    }

    pub fn sensors(&self) -> &SensorCache<S> {
        &self.sensors
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn clients_served(&self) -> u32 {
        self.clients_served
    }
}
