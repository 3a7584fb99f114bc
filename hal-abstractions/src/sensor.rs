//! CO2 / temperature / humidity sensor primitives

/// One raw measurement as produced by the sensor
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Measurement {
    /// CO2 concentration in ppm
    pub co2_ppm: f32,
    /// Temperature in °C
    pub temperature_c: f32,
    /// Relative humidity in %
    pub relative_humidity: f32,
}

/// Periodic-measurement sensor on a shared bus
///
/// Each call is a single short bus transaction and may fail with a bus error.
pub trait Sensor {
    type Error: core::fmt::Debug;

    fn start_periodic_sampling(&mut self) -> Result<(), Self::Error>;

    fn is_data_ready(&mut self) -> Result<bool, Self::Error>;

    fn read_measurement(&mut self) -> Result<Measurement, Self::Error>;
}
