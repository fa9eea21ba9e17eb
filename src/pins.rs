//! GPIO / peripheral pin assignments for the HumiVent main board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.
//!
//! Pin assignments match the ESP32-C3 Super Mini carrier board.

// ---------------------------------------------------------------------------
// Fan relay (open-drain, active LOW)
// ---------------------------------------------------------------------------

/// Digital output to the fan relay module.  The relay input is active LOW:
/// driving the pin low energizes the coil and runs the fan.
pub const FAN_RELAY_GPIO: i32 = 3;

/// GPIO level that energizes the relay.
pub const RELAY_ON_LEVEL: bool = false;
/// GPIO level that de-energizes the relay.
pub const RELAY_OFF_LEVEL: bool = true;

// ---------------------------------------------------------------------------
// I²C bus — shared by the AHT10 sensor and the SSD1306 OLED
// ---------------------------------------------------------------------------

pub const I2C_SDA_GPIO: i32 = 5;
pub const I2C_SCL_GPIO: i32 = 6;
/// I²C master clock (both devices are happy at 100 kHz).
pub const I2C_FREQ_HZ: u32 = 100_000;

/// AHT10 humidity/temperature sensor slave address.
pub const AHT_I2C_ADDR: u8 = 0x38;
/// SSD1306 OLED slave address.
pub const OLED_I2C_ADDR: u8 = 0x3C;

// ---------------------------------------------------------------------------
// User button (active-low with internal pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button for the manual fan override.
pub const BUTTON_GPIO: i32 = 7;
