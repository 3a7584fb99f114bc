//! Sensirion SCD4x CO2 sensor over I2C
//!
//! Only the periodic-measurement subset is implemented: start, stop,
//! data-ready and read. Every word returned by the sensor carries a CRC-8
//! which is checked before the value is used.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use hal_abstractions::{Measurement, Sensor};

/// Factory I2C address
pub const DEFAULT_ADDRESS: u8 = 0x62;

const CMD_START_PERIODIC_MEASUREMENT: u16 = 0x21B1;
const CMD_STOP_PERIODIC_MEASUREMENT: u16 = 0x3F86;
const CMD_GET_DATA_READY_STATUS: u16 = 0xE4B8;
const CMD_READ_MEASUREMENT: u16 = 0xEC05;

/// Time between a command write and the matching read
const COMMAND_EXECUTION_MS: u32 = 1;

const CRC8_POLYNOMIAL: u8 = 0x31;
const CRC8_INIT: u8 = 0xFF;

/// SCD4x driver errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Scd4xError<E> {
    /// Underlying I2C error
    Bus(E),
    /// A received word failed its checksum
    Crc,
}

impl<E: core::fmt::Debug> core::fmt::Display for Scd4xError<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Bus(e) => write!(f, "I2C bus error: {:?}", e),
            Self::Crc => write!(f, "Checksum mismatch"),
        }
    }
}

impl<E: core::fmt::Debug> core::error::Error for Scd4xError<E> {}

/// Sensirion CRC-8 (polynomial 0x31, init 0xFF, no reflection)
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC8_INIT;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// SCD4x on an I2C bus
pub struct Scd4x<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Scd4x<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_address(i2c, delay, DEFAULT_ADDRESS)
    }

    pub fn with_address(i2c: I, delay: D, address: u8) -> Self {
        Self {
            i2c,
            delay,
            address,
        }
    }

    /// Give the bus and delay back
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    pub fn start_periodic_measurement(&mut self) -> Result<(), Scd4xError<I::Error>> {
        self.write_command(CMD_START_PERIODIC_MEASUREMENT)
    }

    pub fn stop_periodic_measurement(&mut self) -> Result<(), Scd4xError<I::Error>> {
        self.write_command(CMD_STOP_PERIODIC_MEASUREMENT)
    }

    /// Whether a new measurement can be read (low 11 bits of the status word)
    pub fn data_ready(&mut self) -> Result<bool, Scd4xError<I::Error>> {
        let mut words = [0u16; 1];
        self.read_words(CMD_GET_DATA_READY_STATUS, &mut words)?;
        Ok(words[0] & 0x07FF != 0)
    }

    /// Read and convert the latest measurement
    pub fn measurement(&mut self) -> Result<Measurement, Scd4xError<I::Error>> {
        let mut words = [0u16; 3];
        self.read_words(CMD_READ_MEASUREMENT, &mut words)?;
        let [co2, temperature, humidity] = words;
        Ok(Measurement {
            co2_ppm: f32::from(co2),
            temperature_c: -45.0 + 175.0 * f32::from(temperature) / 65535.0,
            relative_humidity: 100.0 * f32::from(humidity) / 65535.0,
        })
    }

    fn write_command(&mut self, command: u16) -> Result<(), Scd4xError<I::Error>> {
        self.i2c
            .write(self.address, &command.to_be_bytes())
            .map_err(Scd4xError::Bus)
    }

    fn read_words(
        &mut self,
        command: u16,
        words: &mut [u16],
    ) -> Result<(), Scd4xError<I::Error>> {
        self.write_command(command)?;
        self.delay.delay_ms(COMMAND_EXECUTION_MS);

        // Largest response is three words of two bytes plus CRC
        let mut buf = [0u8; 9];
        let raw = &mut buf[..words.len() * 3];
        self.i2c.read(self.address, raw).map_err(Scd4xError::Bus)?;

        for (word, chunk) in words.iter_mut().zip(raw.chunks_exact(3)) {
            if crc8(&chunk[..2]) != chunk[2] {
                return Err(Scd4xError::Crc);
            }
            *word = u16::from_be_bytes([chunk[0], chunk[1]]);
        }
        Ok(())
    }
}

impl<I: I2c, D: DelayNs> Sensor for Scd4x<I, D> {
    type Error = Scd4xError<I::Error>;

    fn start_periodic_sampling(&mut self) -> Result<(), Self::Error> {
        self.start_periodic_measurement()
    }

    fn is_data_ready(&mut self) -> Result<bool, Self::Error> {
        self.data_ready()
    }

    fn read_measurement(&mut self) -> Result<Measurement, Self::Error> {
        self.measurement()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDelay, FakeI2c};

    fn word(value: u16) -> [u8; 3] {
        let [hi, lo] = value.to_be_bytes();
        [hi, lo, crc8(&[hi, lo])]
    }

    fn sensor(i2c: FakeI2c) -> Scd4x<FakeI2c, FakeDelay> {
        Scd4x::new(i2c, FakeDelay::default())
    }

    #[test]
    fn test_crc8_reference_value() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
        assert_eq!(crc8(&[0x01, 0xC2]), 0x50);
    }

    #[test]
    fn test_start_writes_command() {
        let mut scd = sensor(FakeI2c::new());
        scd.start_periodic_sampling().unwrap();
        let (i2c, _) = scd.release();
        assert_eq!(i2c.writes, std::vec![(0x62, std::vec![0x21, 0xB1])]);
    }

    #[test]
    fn test_data_ready_uses_low_eleven_bits() {
        let mut i2c = FakeI2c::new();
        i2c.queue_read(&word(0x8000));
        i2c.queue_read(&word(0x0006));
        let mut scd = sensor(i2c);
        assert!(!scd.is_data_ready().unwrap());
        assert!(scd.is_data_ready().unwrap());

        let (i2c, delay) = scd.release();
        assert_eq!(i2c.writes[0].1, std::vec![0xE4, 0xB8]);
        assert_eq!(delay.total_ns, 2_000_000);
    }

    #[test]
    fn test_measurement_conversion() {
        let mut i2c = FakeI2c::new();
        let mut raw = std::vec::Vec::new();
        raw.extend_from_slice(&word(450));
        raw.extend_from_slice(&word(0x6666));
        raw.extend_from_slice(&word(0x6666));
        i2c.queue_read(&raw);

        let m = sensor(i2c).read_measurement().unwrap();
        assert_eq!(m.co2_ppm, 450.0);
        assert!((m.temperature_c - 25.0).abs() < 0.01);
        assert!((m.relative_humidity - 40.0).abs() < 0.01);
    }

    #[test]
    fn test_bad_checksum_rejected() {
        let mut i2c = FakeI2c::new();
        let mut raw = word(450);
        raw[2] ^= 0xFF;
        i2c.queue_read(&raw);
        let mut scd = sensor(i2c);
        assert_eq!(scd.is_data_ready(), Err(Scd4xError::Crc));
    }

    #[test]
    fn test_bus_error_propagates() {
        let mut i2c = FakeI2c::new();
        i2c.nack_writes = true;
        let mut scd = sensor(i2c);
        assert!(matches!(
            scd.start_periodic_sampling(),
            Err(Scd4xError::Bus(_))
        ));
    }
}
