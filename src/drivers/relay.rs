//! Fan relay driver.
//!
//! Open-drain output, active LOW: driving the pin low energizes the
//! relay coil and runs the exhaust fan.  The driver is a dumb actuator —
//! when to run the fan is decided entirely by the controller.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: drives the real GPIO via hw_init helpers.
//! On host/test: tracks state in-memory only.

use crate::app::ports::RelayPort;
use crate::drivers::hw_init;
use crate::pins;

pub struct RelayDriver {
    energized: bool,
}

impl RelayDriver {
    /// Construct with the relay de-energized (fan off).
    pub fn new() -> Self {
        let driver = Self { energized: false };
        driver.write_hw(false);
        driver
    }

    fn write_hw(&self, on: bool) {
        let level = if on {
            pins::RELAY_ON_LEVEL
        } else {
            pins::RELAY_OFF_LEVEL
        };
        hw_init::gpio_write(pins::FAN_RELAY_GPIO, level);
    }
}

impl Default for RelayDriver {
    fn default() -> Self {
        Self::new()
    }
}

impl RelayPort for RelayDriver {
    fn set_fan(&mut self, on: bool) {
        self.write_hw(on);
        self.energized = on;
    }

    fn is_fan_on(&self) -> bool {
        self.energized
    }
}
