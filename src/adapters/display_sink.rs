//! Log-backed display adapter.
//!
//! Implements [`DisplayPort`] by keeping an 8-row text frame and writing
//! it to the serial log on [`present`](DisplayPort::present) — the stand-in
//! panel for boards without the OLED fitted and for host simulation.  A
//! real SSD1306 adapter implements the same trait; the presentation
//! deriver and main loop never know the difference.
//!
//! Rows are 16 characters wide (128 px / 8 px per glyph).  Text that
//! would overrun a row is truncated deterministically; out-of-range rows
//! are ignored.  Only frames that changed since the last `present` are
//! logged, so a static screen stays quiet at refresh cadence.

use log::info;

use crate::app::ports::DisplayPort;
use crate::display::icons::Icon;
use crate::error::DisplayError;

/// Character rows on the panel (64 px / 8 px per row).
const ROWS: usize = 8;
/// Character columns on the panel (128 px / 8 px per glyph).
const COLS: usize = 16;

pub struct LogDisplaySink {
    frame: [heapless::String<COLS>; ROWS],
    /// Width of the icon last drawn — tracked only for change detection.
    icon_width: u8,
    dirty: bool,
}

impl LogDisplaySink {
    pub fn new() -> Self {
        Self {
            frame: Default::default(),
            icon_width: 0,
            dirty: false,
        }
    }
}

impl Default for LogDisplaySink {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayPort for LogDisplaySink {
    fn draw_text(&mut self, row: u8, text: &str) {
        let Some(slot) = self.frame.get_mut(row as usize) else {
            return;
        };
        let mut line = heapless::String::new();
        for ch in text.chars().take(COLS) {
            let _ = line.push(ch);
        }
        if *slot != line {
            *slot = line;
            self.dirty = true;
        }
    }

    fn draw_bitmap(&mut self, _x: u8, _row: u8, icon: &Icon) {
        if self.icon_width != icon.width {
            self.icon_width = icon.width;
            self.dirty = true;
        }
    }

    fn clear_row(&mut self, row: u8) {
        if let Some(slot) = self.frame.get_mut(row as usize) {
            if !slot.is_empty() {
                slot.clear();
                self.dirty = true;
            }
        }
    }

    fn present(&mut self) -> Result<(), DisplayError> {
        if !self.dirty {
            return Ok(());
        }
        self.dirty = false;
        for (row, line) in self.frame.iter().enumerate() {
            if !line.is_empty() {
                info!("OLED[{}] {}", row, line);
            }
        }
        Ok(())
    }
}
