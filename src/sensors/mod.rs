//! Sensor subsystem.
//!
//! The AHT10 driver in [`aht`] is a pure protocol driver over an
//! injected I²C bus.  For host builds this module also provides a
//! simulated bus that answers the AHT protocol with injectable values,
//! so the full trigger/decode path runs off-target.

pub mod aht;

#[cfg(not(target_os = "espidf"))]
pub use sim::{sim_set_humidity, sim_set_temperature, SimDelay, SimI2cBus};

#[cfg(not(target_os = "espidf"))]
mod sim {
    use core::sync::atomic::{AtomicU32, Ordering};

    use embedded_hal::delay::DelayNs;
    use embedded_hal::i2c::{ErrorKind, ErrorType, I2c, Operation};

    // Injected readings, stored as f32 bit patterns.
    static SIM_HUMIDITY_BITS: AtomicU32 = AtomicU32::new(0x4248_0000); // 50.0
    static SIM_TEMPERATURE_BITS: AtomicU32 = AtomicU32::new(0x41B8_0000); // 23.0

    /// Inject the relative humidity (%) the simulated sensor reports.
    pub fn sim_set_humidity(pct: f32) {
        SIM_HUMIDITY_BITS.store(pct.to_bits(), Ordering::Relaxed);
    }

    /// Inject the temperature (°C) the simulated sensor reports.
    pub fn sim_set_temperature(celsius: f32) {
        SIM_TEMPERATURE_BITS.store(celsius.to_bits(), Ordering::Relaxed);
    }

    /// Host-side I²C bus that speaks just enough AHT10 to feed the real
    /// driver: ignores writes, answers reads with a frame encoding the
    /// injected values.
    pub struct SimI2cBus;

    impl ErrorType for SimI2cBus {
        type Error = ErrorKind;
    }

    impl I2c for SimI2cBus {
        fn transaction(
            &mut self,
            _address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            for op in operations {
                match op {
                    Operation::Write(_) => {}
                    Operation::Read(buf) => {
                        let frame = encode_frame(
                            f32::from_bits(SIM_HUMIDITY_BITS.load(Ordering::Relaxed)),
                            f32::from_bits(SIM_TEMPERATURE_BITS.load(Ordering::Relaxed)),
                        );
                        let len = buf.len().min(frame.len());
                        buf[..len].copy_from_slice(&frame[..len]);
                    }
                }
            }
            Ok(())
        }
    }

    /// Host-side delay: sleeps are pointless in simulation, so this is a
    /// no-op.
    pub struct SimDelay;

    impl DelayNs for SimDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    fn encode_frame(humidity_pct: f32, temperature_c: f32) -> [u8; 6] {
        let raw_hum = ((humidity_pct.clamp(0.0, 100.0) / 100.0) * 1_048_576.0) as u32 & 0xF_FFFF;
        let raw_temp =
            (((temperature_c.clamp(-50.0, 150.0) + 50.0) / 200.0) * 1_048_576.0) as u32 & 0xF_FFFF;

        [
            0x08, // calibrated, not busy
            (raw_hum >> 12) as u8,
            (raw_hum >> 4) as u8,
            (((raw_hum & 0x0F) << 4) as u8) | ((raw_temp >> 16) as u8),
            (raw_temp >> 8) as u8,
            raw_temp as u8,
        ]
    }

}
