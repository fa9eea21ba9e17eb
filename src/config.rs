//! System configuration parameters
//!
//! All tunable parameters for the HumiVent controller.
//! Values can be overridden via NVS (non-volatile storage).

use serde::{Deserialize, Serialize};

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Humidity threshold ---
    /// Relative humidity (%) above which the fan starts a cooling run
    pub high_humidity_pct: f32,

    // --- Cycle durations ---
    /// Minutes without high humidity before a forced ventilation run
    pub force_after_mins: u32,
    /// Maximum fan run duration per cycle (minutes)
    pub fan_run_mins: u32,
    /// Mandatory rest period after a fan run (minutes)
    pub cool_down_mins: u32,

    // --- Timing ---
    /// Humidity sampling / control loop interval (milliseconds)
    pub sample_interval_ms: u32,
    /// Display refresh interval (milliseconds)
    pub display_refresh_ms: u32,
}

impl SystemConfig {
    /// High-humidity hold-off expressed in monotonic microseconds.
    pub fn force_after_us(&self) -> u64 {
        u64::from(self.force_after_mins) * 60 * 1_000_000
    }

    /// Fan run duration expressed in monotonic microseconds.
    pub fn fan_run_us(&self) -> u64 {
        u64::from(self.fan_run_mins) * 60 * 1_000_000
    }

    /// Cool-down duration expressed in monotonic microseconds.
    pub fn cool_down_us(&self) -> u64 {
        u64::from(self.cool_down_mins) * 60 * 1_000_000
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Humidity
            high_humidity_pct: 70.0,

            // Cycle durations
            force_after_mins: 360, // 6 h without moisture -> forced ventilation
            fan_run_mins: 30,
            cool_down_mins: 120,

            // Timing
            sample_interval_ms: 1000,  // 1 Hz
            display_refresh_ms: 1000,  // 1 Hz
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_sane() {
        let c = SystemConfig::default();
        assert!(c.high_humidity_pct > 0.0 && c.high_humidity_pct < 100.0);
        assert!(c.fan_run_mins > 0);
        assert!(c.cool_down_mins > 0);
        assert!(c.force_after_mins > c.fan_run_mins);
        assert!(c.sample_interval_ms > 0);
        assert!(c.display_refresh_ms > 0);
    }

    #[test]
    fn duration_conversions() {
        let c = SystemConfig::default();
        assert_eq!(c.fan_run_us(), 30 * 60 * 1_000_000);
        assert_eq!(c.cool_down_us(), 120 * 60 * 1_000_000);
        assert_eq!(c.force_after_us(), 360 * 60 * 1_000_000);
    }

    #[test]
    fn serde_roundtrip() {
        let c = SystemConfig::default();
        let json = serde_json::to_string(&c).unwrap();
        let c2: SystemConfig = serde_json::from_str(&json).unwrap();
        assert!((c.high_humidity_pct - c2.high_humidity_pct).abs() < 0.001);
        assert_eq!(c.fan_run_mins, c2.fan_run_mins);
        assert_eq!(c.cool_down_mins, c2.cool_down_mins);
    }

    #[test]
    fn postcard_roundtrip() {
        let c = SystemConfig::default();
        let bytes = postcard::to_allocvec(&c).unwrap();
        let c2: SystemConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(c.force_after_mins, c2.force_after_mins);
        assert!((c.high_humidity_pct - c2.high_humidity_pct).abs() < 0.001);
    }
}
