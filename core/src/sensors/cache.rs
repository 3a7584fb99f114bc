//! Last-known-good sensor reading with warm-up tolerant error accounting

use hal_abstractions::{Instant, Measurement, Sensor};

use crate::config::SensorPolicy;
use crate::elapsed_since;
use crate::fmt::Debug2Format;

/// One successful measurement with the time it was taken
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub co2: f32,
    pub temperature: f32,
    pub relative_humidity: f32,
    pub observed_at: Instant,
}

impl SensorReading {
    pub fn from_measurement(m: Measurement, observed_at: Instant) -> Self {
        Self {
            co2: m.co2_ppm,
            temperature: m.temperature_c,
            relative_humidity: m.relative_humidity,
            observed_at,
        }
    }
}

/// Read-only snapshot of the cache
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SensorCacheEntry {
    pub last_reading: Option<SensorReading>,
    pub last_sample_attempt_at: Option<Instant>,
    /// Read failures outside the warm-up window
    pub error_count: u32,
    /// Whether the warm-up window was still open when the snapshot was taken
    pub in_warmup: bool,
}

/// Result of one `refresh` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshOutcome {
    /// Called within the sample interval; nothing done
    NotDue,
    /// Sensor had no new data
    NotReady,
    /// New reading stored
    Updated,
    /// Bus failure, not counted (warm-up)
    WarmupError,
    /// Bus failure, counted
    Error,
}

/// Caches the last valid reading of a [`Sensor`]
pub struct SensorCache<S: Sensor> {
    sensor: S,
    policy: SensorPolicy,
    initialized_at: Option<Instant>,
    sampling_started: bool,
    entry: SensorCacheEntry,
}

impl<S: Sensor> SensorCache<S> {
    pub fn new(sensor: S, policy: SensorPolicy) -> Self {
        Self {
            sensor,
            policy,
            initialized_at: None,
            sampling_started: false,
            entry: SensorCacheEntry::default(),
        }
    }

    /// Record the start of the warm-up window and start periodic sampling
    ///
    /// A failure to start is not fatal; sampling is restarted on the next
    /// due refresh.
    pub fn initialize(&mut self, now: Instant) {
        self.initialized_at = Some(now);
        self.start_sampling();
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized_at.is_some()
    }

    /// Whether `now` falls inside the warm-up window
    pub fn in_warmup(&self, now: Instant) -> bool {
        match self.initialized_at {
            Some(at) => elapsed_since(now, at) < self.policy.warmup_window,
            None => true,
        }
    }

    /// Sample the sensor if `sample_interval` has elapsed since the last attempt
    pub fn refresh(&mut self, now: Instant) -> RefreshOutcome {
        if self.initialized_at.is_none() {
            return RefreshOutcome::NotDue;
        }
        if let Some(last) = self.entry.last_sample_attempt_at {
            if elapsed_since(now, last) < self.policy.sample_interval {
                return RefreshOutcome::NotDue;
            }
        }

        self.entry.last_sample_attempt_at = Some(now);
        let in_warmup = self.in_warmup(now);

        if !self.sampling_started && !self.start_sampling() {
            return self.record_failure(in_warmup);
        }

        match self.sensor.is_data_ready() {
            Ok(true) => {}
            Ok(false) => {
                if in_warmup {
                    debug!("Sensor warm-up: no data ready yet");
                } else {
                    debug!("Sensor: no data ready yet");
                }
                return RefreshOutcome::NotReady;
            }
            Err(e) => {
                self.log_failure(in_warmup, &e);
                return self.record_failure(in_warmup);
            }
        }

        match self.sensor.read_measurement() {
            Ok(m) => {
                let reading = SensorReading::from_measurement(m, now);
                let newer = self
                    .entry
                    .last_reading
                    .map_or(true, |prev| reading.observed_at > prev.observed_at);
                if !newer {
                    return RefreshOutcome::NotReady;
                }
                if in_warmup {
                    info!(
                        "Sensor (warm-up): CO2={} ppm T={} C RH={} %",
                        reading.co2, reading.temperature, reading.relative_humidity
                    );
                } else {
                    info!(
                        "Sensor: CO2={} ppm T={} C RH={} %",
                        reading.co2, reading.temperature, reading.relative_humidity
                    );
                }
                self.entry.last_reading = Some(reading);
                RefreshOutcome::Updated
            }
            Err(e) => {
                self.log_failure(in_warmup, &e);
                self.record_failure(in_warmup)
            }
        }
    }

    /// Snapshot of the cache as seen at `now`
    pub fn latest(&self, now: Instant) -> SensorCacheEntry {
        SensorCacheEntry {
            in_warmup: self.in_warmup(now),
            ..self.entry
        }
    }

    pub fn sensor(&self) -> &S {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    fn start_sampling(&mut self) -> bool {
        match self.sensor.start_periodic_sampling() {
            Ok(()) => {
                info!("Sensor periodic measurement started");
                self.sampling_started = true;
            }
            Err(e) => {
                warn!("Failed to start periodic measurement: {:?}", Debug2Format(&e));
                self.sampling_started = false;
            }
        }
        self.sampling_started
    }

    fn log_failure(&self, in_warmup: bool, e: &S::Error) {
        if in_warmup {
            debug!("Sensor warm-up, expected error: {:?}", Debug2Format(e));
        } else {
            warn!(
                "Sensor read error, keeping last valid reading: {:?}",
                Debug2Format(e)
            );
        }
    }

    fn record_failure(&mut self, in_warmup: bool) -> RefreshOutcome {
        if in_warmup {
            RefreshOutcome::WarmupError
        } else {
            self.entry.error_count = self.entry.error_count.saturating_add(1);
            RefreshOutcome::Error
        }
    }
}
