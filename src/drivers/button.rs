//! ISR-debounced override button driver.
//!
//! ## Hardware
//!
//! Active-low momentary switch with internal pull-up.  GPIO fires on
//! falling edge; the ISR records the raw timestamp into an atomic, and
//! the `tick()` method (called from the main loop at control-tick rate)
//! runs the debounce state machine.  One debounced press = one override
//! toggle — the handler negates the current fan state and feeds it to
//! the controller.

use core::sync::atomic::{AtomicU32, Ordering};

const DEBOUNCE_MS: u32 = 50;

/// Raw ISR timestamp (milliseconds since boot, truncated to u32).
/// Written by the ISR, read by the main loop.
static BUTTON_ISR_TIMESTAMP: AtomicU32 = AtomicU32::new(0);

/// Internal debounce state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DebounceState {
    Idle,
    DebounceWait { since_ms: u32 },
    WaitRelease,
}

pub struct ButtonDriver {
    gpio: i32,
    state: DebounceState,
    last_isr_ms: u32,
}

impl ButtonDriver {
    pub fn new(gpio: i32) -> Self {
        Self {
            gpio,
            state: DebounceState::Idle,
            last_isr_ms: 0,
        }
    }

    /// GPIO pin this button is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }

    /// Call from the main loop at each control tick.
    /// `now_ms` is the current monotonic time in milliseconds.
    /// Returns `true` when a debounced press has completed.
    pub fn tick(&mut self, now_ms: u32) -> bool {
        let isr_ms = BUTTON_ISR_TIMESTAMP.load(Ordering::Acquire);
        let new_press = isr_ms != self.last_isr_ms && isr_ms != 0;

        match self.state {
            DebounceState::Idle => {
                if new_press {
                    self.last_isr_ms = isr_ms;
                    self.state = DebounceState::DebounceWait { since_ms: now_ms };
                }
                false
            }

            DebounceState::DebounceWait { since_ms } => {
                if now_ms.wrapping_sub(since_ms) < DEBOUNCE_MS {
                    return false;
                }
                if Self::is_pressed_hw(self.gpio) {
                    // Still held: fire once the finger lifts.
                    self.state = DebounceState::WaitRelease;
                    false
                } else {
                    self.state = DebounceState::Idle;
                    true
                }
            }

            DebounceState::WaitRelease => {
                if Self::is_pressed_hw(self.gpio) {
                    return false;
                }
                self.state = DebounceState::Idle;
                true
            }
        }
    }

    #[cfg(target_os = "espidf")]
    fn is_pressed_hw(gpio: i32) -> bool {
        // Active low.
        !crate::drivers::hw_init::gpio_read(gpio)
    }

    #[cfg(not(target_os = "espidf"))]
    fn is_pressed_hw(_gpio: i32) -> bool {
        false
    }
}

/// ISR handler — register this on the button GPIO falling edge.
/// Safe to call from interrupt context (lock-free atomic store).
pub fn button_isr_handler(now_ms: u32) {
    BUTTON_ISR_TIMESTAMP.store(now_ms, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use super::*;

    // The ISR timestamp is process-global; serialize tests that touch it.
    static ISR_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

    fn reset_isr() -> std::sync::MutexGuard<'static, ()> {
        let guard = ISR_LOCK.lock().unwrap();
        BUTTON_ISR_TIMESTAMP.store(0, Ordering::SeqCst);
        guard
    }

    #[test]
    fn no_toggle_without_press() {
        let _guard = reset_isr();
        let mut btn = ButtonDriver::new(7);
        assert!(!btn.tick(100));
        assert!(!btn.tick(200));
    }

    #[test]
    fn press_fires_after_debounce() {
        let _guard = reset_isr();
        let mut btn = ButtonDriver::new(7);
        button_isr_handler(1000);
        assert!(!btn.tick(1000)); // edge latched, debounce starts
        assert!(!btn.tick(1030)); // still inside the 50 ms window
        assert!(btn.tick(1060)); // debounce clear, released -> toggle
    }

    #[test]
    fn one_edge_fires_exactly_once() {
        let _guard = reset_isr();
        let mut btn = ButtonDriver::new(7);
        button_isr_handler(500);
        btn.tick(500);
        assert!(btn.tick(600));
        // Same ISR timestamp must not re-trigger.
        assert!(!btn.tick(700));
        assert!(!btn.tick(5000));
    }

    #[test]
    fn second_edge_fires_again() {
        let _guard = reset_isr();
        let mut btn = ButtonDriver::new(7);
        button_isr_handler(500);
        btn.tick(500);
        assert!(btn.tick(600));

        button_isr_handler(2000);
        btn.tick(2000);
        assert!(btn.tick(2100));
    }
}
