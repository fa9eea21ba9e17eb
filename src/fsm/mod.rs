//! Function-pointer finite state machine engine.
//!
//! Classic embedded FSM pattern ported to Rust:
//!
//! ```text
//! ┌────────────────────────────────────────────────┐
//! │  StateTable                                    │
//! │  ┌─────────┬──────────┬─────────────────────┐  │
//! │  │ FanState │ name     │ on_update           │  │
//! │  ├─────────┼──────────┼─────────────────────┤  │
//! │  │ Idle     │ "IDLE"   │ fn(ctx)->Option<>   │  │
//! │  │ Cooling  │ "COOLING"│ fn(ctx)->Option<>   │  │
//! │  │ Force    │ "FORCE"  │ fn(ctx)->Option<>   │  │
//! │  │ Waiting  │ "WAITING"│ fn(ctx)->Option<>   │  │
//! │  └─────────┴──────────┴─────────────────────┘  │
//! └────────────────────────────────────────────────┘
//! ```
//!
//! Each tick the engine calls `on_update` for the **current** state with
//! the shared [`FsmContext`].  If it returns `Some(next)`, the engine
//! updates the current pointer.  Side effects (relay intent, timing
//! anchors, log label) are written by the handlers themselves, on the
//! edge that causes them — this machine has no enter/exit hooks because
//! two different edges into the same state move different anchors.

pub mod context;
pub mod states;

use context::FsmContext;
use log::info;

// ---------------------------------------------------------------------------
// State identity
// ---------------------------------------------------------------------------

/// Enumeration of all fan controller states.
/// Must stay in sync with the state table built in [`states::build_state_table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FanState {
    /// Fan off, watching humidity and the forced-ventilation timer.
    Idle = 0,
    /// Fan running against high humidity (or manual override).
    Cooling = 1,
    /// Fan running on the periodic forced-ventilation cycle.
    Force = 2,
    /// Mandatory rest period after a fan run.
    Waiting = 3,
}

impl FanState {
    /// Total number of states — used to size the table array.
    pub const COUNT: usize = 4;

    /// Convert a `u8` index back to `FanState`.  Panics on out-of-range in
    /// debug builds; returns `Idle` in release (fan-off safe fallback).
    pub fn from_index(idx: usize) -> Self {
        match idx {
            0 => Self::Idle,
            1 => Self::Cooling,
            2 => Self::Force,
            3 => Self::Waiting,
            _ => {
                debug_assert!(false, "invalid state index: {idx}");
                Self::Idle
            }
        }
    }

    /// True for the states in which the fan must be energized.
    pub fn runs_fan(self) -> bool {
        matches!(self, Self::Cooling | Self::Force)
    }
}

// ---------------------------------------------------------------------------
// Function-pointer type alias
// ---------------------------------------------------------------------------

/// Signature for the per-tick update handler.
/// Returns `Some(next)` to trigger a transition, or `None` to stay.
pub type StateUpdateFn = fn(&mut FsmContext) -> Option<FanState>;

// ---------------------------------------------------------------------------
// State descriptor (one row in the table)
// ---------------------------------------------------------------------------

/// Static descriptor for a single FSM state.
/// Stored in a fixed-size array — no heap, no `dyn`.
pub struct StateDescriptor {
    pub id: FanState,
    pub name: &'static str,
    pub on_update: StateUpdateFn,
}

// ---------------------------------------------------------------------------
// FSM engine
// ---------------------------------------------------------------------------

/// The finite state machine engine.
///
/// Owns the state table (array of [`StateDescriptor`]) and a pointer to
/// the current state.  All mutable working data lives in the
/// [`FsmContext`] passed into every call.
pub struct Fsm {
    /// Fixed-size table indexed by `FanState as usize`.
    table: [StateDescriptor; FanState::COUNT],
    /// Index of the currently active state.
    current: usize,
}

impl Fsm {
    /// Construct a new FSM with the given state table, starting in `initial`.
    pub fn new(table: [StateDescriptor; FanState::COUNT], initial: FanState) -> Self {
        Self {
            table,
            current: initial as usize,
        }
    }

    /// Advance the FSM by one tick: call `on_update` for the current
    /// state and, if it returns `Some(next)`, move the current pointer.
    pub fn tick(&mut self, ctx: &mut FsmContext) {
        let next = (self.table[self.current].on_update)(ctx);

        if let Some(next_id) = next {
            let next_idx = next_id as usize;
            info!(
                "FSM transition: {} -> {}",
                self.table[self.current].name, self.table[next_idx].name
            );
            self.current = next_idx;
        }
    }

    /// Jump straight to `next` without consulting the current state's
    /// handler.  Used by the manual override, which bypasses every
    /// automatic threshold.  The caller owns the accompanying side
    /// effects (relay intent, anchors).
    pub fn force_transition(&mut self, next: FanState) {
        let next_idx = next as usize;
        if next_idx != self.current {
            info!(
                "FSM forced: {} -> {}",
                self.table[self.current].name, self.table[next_idx].name
            );
        }
        self.current = next_idx;
    }

    /// The current state's identity.
    pub fn current_state(&self) -> FanState {
        FanState::from_index(self.current)
    }

    /// The current state's log name.
    pub fn state_name(&self) -> &'static str {
        self.table[self.current].name
    }
}

#[cfg(test)]
mod tests {
    use super::context::FsmContext;
    use super::*;
    use crate::config::SystemConfig;

    const MIN_US: u64 = 60 * 1_000_000;

    fn make_ctx() -> FsmContext {
        FsmContext::new(SystemConfig::default())
    }

    fn make_fsm() -> Fsm {
        Fsm::new(states::build_state_table(), FanState::Idle)
    }

    fn tick_at(fsm: &mut Fsm, ctx: &mut FsmContext, now_us: u64, humidity: f32) {
        ctx.now_us = now_us;
        ctx.humidity_pct = humidity;
        fsm.tick(ctx);
    }

    #[test]
    fn starts_in_idle() {
        let fsm = make_fsm();
        assert_eq!(fsm.current_state(), FanState::Idle);
    }

    #[test]
    fn idle_to_cooling_on_high_humidity() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();

        tick_at(&mut fsm, &mut ctx, 5 * MIN_US, 75.0);
        assert_eq!(fsm.current_state(), FanState::Cooling);
        assert!(ctx.fan_on);
        assert_eq!(ctx.fan_start_us, 5 * MIN_US);
        assert_eq!(ctx.take_transition_label(), Some("COOLING"));
    }

    #[test]
    fn cooling_entry_also_refreshes_high_humidity_anchor() {
        // The trailing refresh in idle_update fires on the same tick that
        // takes the Cooling transition.
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = 0;

        tick_at(&mut fsm, &mut ctx, 7 * MIN_US, 80.0);
        assert_eq!(fsm.current_state(), FanState::Cooling);
        assert_eq!(ctx.last_high_humidity_us, 7 * MIN_US);
    }

    #[test]
    fn idle_stays_below_threshold() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = MIN_US;

        tick_at(&mut fsm, &mut ctx, 2 * MIN_US, 55.0);
        assert_eq!(fsm.current_state(), FanState::Idle);
        assert!(!ctx.fan_on);
        assert_eq!(ctx.take_transition_label(), None);
    }

    #[test]
    fn humidity_exactly_at_threshold_is_not_high() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = MIN_US;

        tick_at(&mut fsm, &mut ctx, 2 * MIN_US, 70.0);
        assert_eq!(fsm.current_state(), FanState::Idle);
        // The trailing refresh uses the same strict comparison.
        assert_eq!(ctx.last_high_humidity_us, MIN_US);
    }

    #[test]
    fn idle_to_force_after_holdoff() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = 0;

        let past_holdoff = ctx.config.force_after_us() + 1;
        tick_at(&mut fsm, &mut ctx, past_holdoff, 40.0);
        assert_eq!(fsm.current_state(), FanState::Force);
        assert!(ctx.fan_on);
        assert_eq!(ctx.fan_start_us, past_holdoff);
        assert_eq!(ctx.take_transition_label(), Some("FORCE"));
    }

    #[test]
    fn idle_holds_at_exact_holdoff_boundary() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = 0;

        let at = ctx.config.force_after_us();
        tick_at(&mut fsm, &mut ctx, at, 40.0);
        assert_eq!(fsm.current_state(), FanState::Idle);
    }

    #[test]
    fn high_humidity_wins_over_force_timeout() {
        // Both conditions true on the same tick: the humidity branch is
        // checked first, so the machine cools instead of forcing.
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = 0;

        let past_holdoff = ctx.config.force_after_us() + 1;
        tick_at(&mut fsm, &mut ctx, past_holdoff, 90.0);
        assert_eq!(fsm.current_state(), FanState::Cooling);
        assert_eq!(ctx.take_transition_label(), Some("COOLING"));
    }

    #[test]
    fn cooling_to_waiting_on_run_timeout() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        tick_at(&mut fsm, &mut ctx, MIN_US, 85.0);
        assert_eq!(fsm.current_state(), FanState::Cooling);

        let past_run = MIN_US + ctx.config.fan_run_us() + 1;
        tick_at(&mut fsm, &mut ctx, past_run, 85.0);
        assert_eq!(fsm.current_state(), FanState::Waiting);
        assert!(!ctx.fan_on);
        assert_eq!(ctx.last_transition_us, past_run);
        assert_eq!(ctx.take_transition_label(), Some("WAITING"));
    }

    #[test]
    fn cooling_to_waiting_on_humidity_drop() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        tick_at(&mut fsm, &mut ctx, MIN_US, 85.0);

        // One second later, humidity already back down: exit immediately.
        tick_at(&mut fsm, &mut ctx, MIN_US + 1_000_000, 60.0);
        assert_eq!(fsm.current_state(), FanState::Waiting);
        assert!(!ctx.fan_on);
    }

    #[test]
    fn cooling_holds_at_exact_boundaries() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        tick_at(&mut fsm, &mut ctx, MIN_US, 85.0);

        // Exactly 30 min elapsed and humidity exactly at the threshold:
        // both comparisons are strict, so the run continues.
        let at = MIN_US + ctx.config.fan_run_us();
        tick_at(&mut fsm, &mut ctx, at, 70.0);
        assert_eq!(fsm.current_state(), FanState::Cooling);
        assert!(ctx.fan_on);
    }

    #[test]
    fn force_to_idle_after_run() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = 0;
        let start = ctx.config.force_after_us() + 1;
        tick_at(&mut fsm, &mut ctx, start, 40.0);
        assert_eq!(fsm.current_state(), FanState::Force);
        let _ = ctx.take_transition_label();

        let past_run = start + ctx.config.fan_run_us() + 1;
        tick_at(&mut fsm, &mut ctx, past_run, 40.0);
        assert_eq!(fsm.current_state(), FanState::Idle);
        assert!(!ctx.fan_on);
        assert_eq!(ctx.last_high_humidity_us, past_run);
        assert_eq!(ctx.take_transition_label(), Some("IDLE (from FORCE)"));
    }

    #[test]
    fn force_ignores_humidity() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = 0;
        let start = ctx.config.force_after_us() + 1;
        tick_at(&mut fsm, &mut ctx, start, 40.0);

        // Humidity spiking mid-run does not end or extend a forced run.
        tick_at(&mut fsm, &mut ctx, start + MIN_US, 95.0);
        assert_eq!(fsm.current_state(), FanState::Force);
        assert!(ctx.fan_on);
    }

    #[test]
    fn waiting_to_idle_after_cooldown() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        tick_at(&mut fsm, &mut ctx, MIN_US, 85.0);
        tick_at(&mut fsm, &mut ctx, 2 * MIN_US, 60.0);
        assert_eq!(fsm.current_state(), FanState::Waiting);
        let _ = ctx.take_transition_label();

        let past_rest = 2 * MIN_US + ctx.config.cool_down_us() + 1;
        tick_at(&mut fsm, &mut ctx, past_rest, 60.0);
        assert_eq!(fsm.current_state(), FanState::Idle);
        assert!(!ctx.fan_on);
        assert_eq!(ctx.take_transition_label(), Some("IDLE (from WAITING)"));
    }

    #[test]
    fn waiting_holds_during_cooldown_even_when_humid() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        tick_at(&mut fsm, &mut ctx, MIN_US, 85.0);
        tick_at(&mut fsm, &mut ctx, 2 * MIN_US, 60.0);

        tick_at(&mut fsm, &mut ctx, 3 * MIN_US, 95.0);
        assert_eq!(fsm.current_state(), FanState::Waiting);
        assert!(!ctx.fan_on);
    }

    #[test]
    fn no_op_tick_leaves_anchors_untouched() {
        let mut fsm = make_fsm();
        let mut ctx = make_ctx();
        ctx.last_high_humidity_us = MIN_US;

        tick_at(&mut fsm, &mut ctx, 5 * MIN_US, 50.0);
        assert_eq!(fsm.current_state(), FanState::Idle);
        assert_eq!(ctx.last_high_humidity_us, MIN_US);
        assert_eq!(ctx.fan_start_us, 0);
        assert_eq!(ctx.last_transition_us, 0);
        assert_eq!(ctx.take_transition_label(), None);
    }

    #[test]
    fn runs_fan_matches_state_set() {
        assert!(!FanState::Idle.runs_fan());
        assert!(FanState::Cooling.runs_fan());
        assert!(FanState::Force.runs_fan());
        assert!(!FanState::Waiting.runs_fan());
    }

    #[test]
    fn state_from_index_roundtrip() {
        for i in 0..FanState::COUNT {
            let id = FanState::from_index(i);
            assert_eq!(id as usize, i);
        }
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn state_from_invalid_index_returns_idle() {
        let id = FanState::from_index(99);
        assert_eq!(id, FanState::Idle);
    }
}
