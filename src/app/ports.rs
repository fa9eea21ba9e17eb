//! Port traits — the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ Controller (domain)
//! ```
//!
//! Driven adapters (relay, persistent store, display) implement these
//! traits.  The [`Controller`](super::service::Controller) consumes them
//! via generics at call sites, so the domain core never touches hardware
//! directly and every test runs against mocks.
//!
//! All port errors are typed.  Storage errors in particular are advisory
//! by policy: callers may ignore them, but the failure is visible, never
//! silently swallowed inside the adapter.

use crate::display::icons::Icon;
use crate::error::{ConfigError, DisplayError, StorageError};

// ───────────────────────────────────────────────────────────────
// Relay port (driven adapter: domain → fan relay)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the domain calls this to drive the fan relay line.
pub trait RelayPort {
    /// Energize (`true`) or de-energize (`false`) the fan relay.
    fn set_fan(&mut self, on: bool);

    /// Whether the relay is currently energized.
    fn is_fan_on(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the transition log and config.
///
/// - Keys are namespaced to prevent collisions between subsystems.
/// - Write operations MUST be atomic per key — no partial blobs on power
///   loss.  The ESP-IDF NVS API guarantees this natively; the in-memory
///   simulation achieves it trivially.  Cross-key atomicity is NOT
///   required: the transition log tolerates losing the entry written
///   during an unclean power-down.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns defaults if no stored config exists.
    fn load(&self) -> Result<crate::config::SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &crate::config::SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Display port (driven adapter: domain → OLED)
// ───────────────────────────────────────────────────────────────

/// Double-buffered character/bitmap display, 8 text rows of 16 columns.
///
/// Draw calls mutate the off-screen frame buffer and are bounds-checked:
/// text that would overrun a row is truncated deterministically, never
/// written out of bounds.  Nothing reaches the panel until [`present`]
/// flushes the buffer in one transfer.
///
/// [`present`]: DisplayPort::present
pub trait DisplayPort {
    /// Draw a text line at character row `row` (0–7), starting at column 0.
    fn draw_text(&mut self, row: u8, text: &str);

    /// Draw a small bitmap with its top-left corner at pixel column `x`,
    /// character row `row`.
    fn draw_bitmap(&mut self, x: u8, row: u8, icon: &Icon);

    /// Blank one character row of the frame buffer.
    fn clear_row(&mut self, row: u8);

    /// Flush the frame buffer to the panel.
    fn present(&mut self) -> Result<(), DisplayError>;
}
