//! Concrete state handler functions and table builder.
//!
//! Each state is defined by a plain `fn` pointer — no closures, no
//! dynamic dispatch, no heap.  This is the classic embedded C FSM pattern
//! expressed in safe Rust.
//!
//! ```text
//!  IDLE ──[humidity > threshold]──────────▶ COOLING
//!    │                                        │
//!    │ [no high humidity          [30 min up, or humidity
//!    │  for 6 h]                   back under threshold]
//!    ▼                                        ▼
//!  FORCE ──[30 min up]──▶ IDLE ◀──[2 h rest]── WAITING
//!
//!  Manual override: any state ──▶ COOLING (on) / IDLE (off)
//! ```
//!
//! Unlike an enter/exit-hook machine, every side effect here lives on the
//! transition that causes it: the Idle→Cooling and Force→Idle edges move
//! different timing anchors, so the effects cannot be attached to the
//! destination state.

use super::context::FsmContext;
use super::{FanState, StateDescriptor};

// ═══════════════════════════════════════════════════════════════════════════
//  Table builder
// ═══════════════════════════════════════════════════════════════════════════

/// Build the static state table.  Called once at startup.
pub fn build_state_table() -> [StateDescriptor; FanState::COUNT] {
    [
        // Index 0 — Idle
        StateDescriptor {
            id: FanState::Idle,
            name: "IDLE",
            on_update: idle_update,
        },
        // Index 1 — Cooling
        StateDescriptor {
            id: FanState::Cooling,
            name: "COOLING",
            on_update: cooling_update,
        },
        // Index 2 — Force
        StateDescriptor {
            id: FanState::Force,
            name: "FORCE",
            on_update: force_update,
        },
        // Index 3 — Waiting
        StateDescriptor {
            id: FanState::Waiting,
            name: "WAITING",
            on_update: waiting_update,
        },
    ]
}

// ═══════════════════════════════════════════════════════════════════════════
//  IDLE state — fan off, watching humidity and the forced-run timer
// ═══════════════════════════════════════════════════════════════════════════

fn idle_update(ctx: &mut FsmContext) -> Option<FanState> {
    let now = ctx.now_us;
    let mut next = None;

    if ctx.humidity_pct > ctx.config.high_humidity_pct {
        ctx.energize_fan();
        ctx.note_transition("COOLING");
        next = Some(FanState::Cooling);
    } else if now.saturating_sub(ctx.last_high_humidity_us) > ctx.config.force_after_us() {
        ctx.energize_fan();
        ctx.note_transition("FORCE");
        next = Some(FanState::Force);
    }

    // Invariant: this refresh is a separate trailing check, not an `else`
    // of the branch above.  It must also run on the tick that just entered
    // Cooling; folding it into the branch changes boundary-tick behavior.
    if ctx.humidity_pct > ctx.config.high_humidity_pct {
        ctx.last_high_humidity_us = now;
    }

    next
}

// ═══════════════════════════════════════════════════════════════════════════
//  COOLING state — fan running against high humidity
// ═══════════════════════════════════════════════════════════════════════════

fn cooling_update(ctx: &mut FsmContext) -> Option<FanState> {
    let ran_us = ctx.now_us.saturating_sub(ctx.fan_start_us);

    // Strict comparisons: a sample of exactly the threshold neither starts
    // nor ends a cooling run.
    if ran_us > ctx.config.fan_run_us() || ctx.humidity_pct < ctx.config.high_humidity_pct {
        ctx.deenergize_fan();
        ctx.last_transition_us = ctx.now_us;
        ctx.note_transition("WAITING");
        return Some(FanState::Waiting);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  FORCE state — periodic ventilation run, ends on time alone
// ═══════════════════════════════════════════════════════════════════════════

fn force_update(ctx: &mut FsmContext) -> Option<FanState> {
    let ran_us = ctx.now_us.saturating_sub(ctx.fan_start_us);

    if ran_us > ctx.config.fan_run_us() {
        ctx.deenergize_fan();
        // A completed forced run counts as fresh ventilation: restart the
        // 6 h hold-off from here.
        ctx.last_high_humidity_us = ctx.now_us;
        ctx.note_transition("IDLE (from FORCE)");
        return Some(FanState::Idle);
    }

    None
}

// ═══════════════════════════════════════════════════════════════════════════
//  WAITING state — mandatory rest after any fan run
// ═══════════════════════════════════════════════════════════════════════════

fn waiting_update(ctx: &mut FsmContext) -> Option<FanState> {
    if ctx.now_us.saturating_sub(ctx.last_transition_us) > ctx.config.cool_down_us() {
        // Fan is already off; nothing to de-energize.
        ctx.note_transition("IDLE (from WAITING)");
        return Some(FanState::Idle);
    }

    None
}
