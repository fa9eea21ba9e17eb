//! Presentation deriver — pure functions from controller state to
//! display content.
//!
//! Everything in this module is a pure function of a
//! [`ControllerSnapshot`], the configuration, and a timestamp: no shared
//! mutable state, safe to call at any display-refresh cadence
//! independently of the control tick.  The OLED adapter consumes the
//! returned lines and icons; nothing here touches hardware.

pub mod icons;

use core::fmt::Write as _;

use crate::app::service::ControllerSnapshot;
use crate::config::SystemConfig;
use crate::fsm::FanState;
use crate::translog::{self, LogEntry};
use icons::Icon;

/// Display rows (SSD1306 character rows, 8 px each).
pub const ROW_TEMPERATURE: u8 = 3;
pub const ROW_HUMIDITY: u8 = 4;
pub const ROW_FAN: u8 = 5;
pub const ROW_TIMER: u8 = 6;
pub const ROW_STATE: u8 = 7;

/// Rows available for the boot-time history dump.
pub const HISTORY_ROWS: usize = 8;

// ───────────────────────────────────────────────────────────────
// Status lines
// ───────────────────────────────────────────────────────────────

/// Fixed 7-character fan status label.
pub fn fan_line(snap: &ControllerSnapshot) -> &'static str {
    if snap.fan_on { "FAN ON " } else { "FAN OFF" }
}

/// Fixed 7-character state label.
pub fn state_line(state: FanState) -> &'static str {
    match state {
        FanState::Idle => "IDLE   ",
        FanState::Cooling => "COOLING",
        FanState::Force => "FORCE  ",
        FanState::Waiting => "WAIT   ",
    }
}

/// `MM:SS` countdown to the next automatic transition.
///
/// Remaining time is measured against the anchor that will end the
/// current state: the fan-run timer while Cooling/Force, the rest timer
/// while Waiting, the forced-ventilation hold-off while Idle.  Clamped
/// at zero — once the threshold instant passes but the state has not
/// rolled over yet (the next control tick hasn't run), this renders
/// `00:00`, never a negative time.
pub fn timer_line(
    snap: &ControllerSnapshot,
    config: &SystemConfig,
    now_us: u64,
) -> heapless::String<8> {
    let remaining_us = match snap.state {
        FanState::Cooling | FanState::Force => config
            .fan_run_us()
            .saturating_sub(now_us.saturating_sub(snap.fan_start_us)),
        FanState::Waiting => config
            .cool_down_us()
            .saturating_sub(now_us.saturating_sub(snap.last_transition_us)),
        FanState::Idle => config
            .force_after_us()
            .saturating_sub(now_us.saturating_sub(snap.last_high_humidity_us)),
    };

    let total_secs = remaining_us / 1_000_000;
    let mins = total_secs / 60;
    let secs = total_secs % 60;

    let mut line = heapless::String::new();
    let _ = write!(line, "{:02}:{:02}", mins, secs);
    line
}

/// Temperature readout line, e.g. `T: 23.4C`.
pub fn temperature_line(temperature_c: f32) -> heapless::String<16> {
    let mut line = heapless::String::new();
    let _ = write!(line, "T: {:.1}C", temperature_c);
    line
}

/// Humidity readout line, e.g. `H: 61.2%`.
pub fn humidity_line(humidity_pct: f32) -> heapless::String<16> {
    let mut line = heapless::String::new();
    let _ = write!(line, "H: {:.1}%", humidity_pct);
    line
}

// ───────────────────────────────────────────────────────────────
// State icon
// ───────────────────────────────────────────────────────────────

/// Select the state glyph.  Total over [`FanState`] by construction;
/// the clock doubles as the fallback for the rest-like states.
pub fn state_icon(state: FanState) -> &'static Icon {
    match state {
        FanState::Idle => &icons::MOON,
        FanState::Cooling => &icons::POWER,
        FanState::Force => &icons::UPLOAD,
        FanState::Waiting => &icons::CLOCK,
    }
}

// ───────────────────────────────────────────────────────────────
// History view
// ───────────────────────────────────────────────────────────────

/// Render the most recent transitions newest-first, skipping the
/// `scroll` newest, at most [`HISTORY_ROWS`] lines.  Used for the
/// boot-time history dump and any scrollable history page.
pub fn history_lines(
    entries: &[LogEntry],
    scroll: usize,
) -> heapless::Vec<heapless::String<48>, HISTORY_ROWS> {
    let mut lines = heapless::Vec::new();
    for entry in translog::recent(entries, scroll).take(HISTORY_ROWS) {
        let _ = lines.push(entry.format_line());
    }
    lines
}
