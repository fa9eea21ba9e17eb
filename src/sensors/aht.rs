//! AHT10/AHT20 humidity + temperature sensor driver.
//!
//! Pure protocol driver, generic over [`embedded_hal::i2c::I2c`] and
//! [`embedded_hal::delay::DelayNs`] — the bus is injected at every call
//! so it can be shared with other devices and mocked in host tests.
//!
//! ## Protocol
//!
//! - Init: `0xBE 0x08 0x00` (enable calibration).
//! - Measure: `0xAC 0x33 0x00`, wait ~80 ms, read 6 bytes.
//! - Frame: status byte, then 20-bit humidity and 20-bit temperature
//!   packed big-endian across bytes 1–5.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::error::SensorError;

const CMD_INIT: [u8; 3] = [0xBE, 0x08, 0x00];
const CMD_TRIGGER: [u8; 3] = [0xAC, 0x33, 0x00];

/// Status bit 7: measurement still in progress.
const STATUS_BUSY: u8 = 0x80;
/// Status bit 3: factory calibration loaded.
const STATUS_CALIBRATED: u8 = 0x08;

/// Conversion time per the datasheet (75 ms typical).
const MEASUREMENT_DELAY_MS: u32 = 80;

/// One successful measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// AHT10/AHT20 on a shared I²C bus.
pub struct AhtSensor {
    addr: u8,
}

impl AhtSensor {
    pub fn new(addr: u8) -> Self {
        Self { addr }
    }

    /// Send the one-time calibration/init command.
    pub fn init<B: I2c>(&mut self, bus: &mut B) -> Result<(), SensorError> {
        bus.write(self.addr, &CMD_INIT)
            .map_err(|_| SensorError::BusError)
    }

    /// Trigger a measurement and block until the result is read back.
    ///
    /// Called once per sampling tick.  Any failure means the whole tick
    /// is skipped by the caller — no partial readings are returned.
    pub fn read<B: I2c, D: DelayNs>(
        &mut self,
        bus: &mut B,
        delay: &mut D,
    ) -> Result<Reading, SensorError> {
        bus.write(self.addr, &CMD_TRIGGER)
            .map_err(|_| SensorError::BusError)?;

        delay.delay_ms(MEASUREMENT_DELAY_MS);

        let mut data = [0u8; 6];
        bus.read(self.addr, &mut data)
            .map_err(|_| SensorError::BusError)?;

        let status = data[0];
        if status & STATUS_BUSY != 0 {
            return Err(SensorError::Timeout);
        }
        if status & STATUS_CALIBRATED == 0 {
            return Err(SensorError::NotCalibrated);
        }

        let raw_hum = (u32::from(data[1]) << 12) | (u32::from(data[2]) << 4) | u32::from(data[3] >> 4);
        let raw_temp =
            (u32::from(data[3] & 0x0F) << 16) | (u32::from(data[4]) << 8) | u32::from(data[5]);

        let humidity_pct = raw_hum as f32 * 100.0 / 1_048_576.0;
        let temperature_c = raw_temp as f32 * 200.0 / 1_048_576.0 - 50.0;

        if !(0.0..=100.0).contains(&humidity_pct) {
            return Err(SensorError::OutOfRange);
        }

        Ok(Reading {
            temperature_c,
            humidity_pct,
        })
    }
}
