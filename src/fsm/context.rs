//! Shared mutable context threaded through every FSM handler.
//!
//! `FsmContext` is the single struct that state handlers read from and
//! write to.  It carries the latest humidity sample, the tick timestamp,
//! the three timing anchors that drive every transition decision, the fan
//! output intent, and the configuration.  The anchors are monotonic
//! microseconds since boot — they reset to zero on every power cycle and
//! are never compared across boots.

use crate::config::SystemConfig;

/// The shared context passed to every state handler function.
pub struct FsmContext {
    // -- Input --
    /// Latest relative-humidity sample (%).  Written before each tick.
    pub humidity_pct: f32,
    /// Monotonic timestamp of the current tick (µs since boot).
    pub now_us: u64,

    // -- Timing anchors --
    /// Last instant humidity exceeded the high threshold, or the moment
    /// of entering Idle / leaving Force / releasing the override.
    pub last_high_humidity_us: u64,
    /// Instant the fan was last energized.  Meaningful only while the
    /// fan is running (Cooling / Force).
    pub fan_start_us: u64,
    /// Instant Waiting was entered.  Meaningful only while Waiting.
    pub last_transition_us: u64,

    // -- Output intent --
    /// Desired relay state.  Applied to the relay port by the controller
    /// after each tick, never from inside a handler.
    pub fan_on: bool,

    // -- Configuration --
    pub config: SystemConfig,

    /// Label of the transition taken this tick, if any.  Consumed by the
    /// controller to append exactly one log entry per transition.
    transition_label: Option<&'static str>,
}

impl FsmContext {
    /// Create a new context with the given configuration.
    pub fn new(config: SystemConfig) -> Self {
        Self {
            humidity_pct: 0.0,
            now_us: 0,
            last_high_humidity_us: 0,
            fan_start_us: 0,
            last_transition_us: 0,
            fan_on: false,
            config,
            transition_label: None,
        }
    }

    /// Request the fan on and anchor the start of the run at `now_us`.
    pub fn energize_fan(&mut self) {
        self.fan_on = true;
        self.fan_start_us = self.now_us;
    }

    /// Request the fan off.  `fan_start_us` keeps its old value; it is
    /// only meaningful while the fan runs.
    pub fn deenergize_fan(&mut self) {
        self.fan_on = false;
    }

    /// Record the label for the transition fired this tick.
    pub fn note_transition(&mut self, label: &'static str) {
        self.transition_label = Some(label);
    }

    /// Take the pending transition label, leaving `None`.
    pub fn take_transition_label(&mut self) -> Option<&'static str> {
        self.transition_label.take()
    }
}
