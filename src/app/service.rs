//! Controller — the hexagonal core.
//!
//! [`Controller`] owns the FSM, its context, and the transition log.  It
//! is the single process-wide owner of all control state: every mutation
//! goes through [`update`](Controller::update) or
//! [`set_manual_override`](Controller::set_manual_override), both driven
//! exclusively from the main loop, so ordering of effects and log
//! entries follows call order.
//!
//! ```text
//!  humidity sample ──▶ ┌──────────────────────┐ ──▶ TransitionLog (StoragePort)
//!                      │      Controller       │
//!        RelayPort ◀── │  FSM · anchors · log  │ ──▶ ControllerSnapshot
//!                      └──────────────────────┘
//! ```

use log::{info, warn};

use crate::config::SystemConfig;
use crate::fsm::context::FsmContext;
use crate::fsm::states::build_state_table;
use crate::fsm::{FanState, Fsm};
use crate::translog::TransitionLog;

use super::ports::{RelayPort, StoragePort};

// ───────────────────────────────────────────────────────────────
// Snapshot
// ───────────────────────────────────────────────────────────────

/// Copy of the controller state sufficient for the presentation layer.
/// Taking a snapshot has no side effects; the display task renders from
/// it at its own cadence.
#[derive(Debug, Clone, Copy)]
pub struct ControllerSnapshot {
    pub state: FanState,
    pub fan_on: bool,
    pub last_high_humidity_us: u64,
    pub fan_start_us: u64,
    pub last_transition_us: u64,
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

/// The fan controller: FSM, timing anchors, and transition log.
pub struct Controller {
    fsm: Fsm,
    ctx: FsmContext,
    log: TransitionLog,
}

impl Controller {
    /// Construct the controller from configuration.
    ///
    /// Does **not** touch the relay or storage — call [`init`] next.
    ///
    /// [`init`]: Controller::init
    pub fn new(config: SystemConfig) -> Self {
        Self {
            fsm: Fsm::new(build_state_table(), FanState::Idle),
            ctx: FsmContext::new(config),
            log: TransitionLog::new(),
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Reset to Idle with the fan off, anchor the high-humidity timer at
    /// `now_us`, drive the relay line to its off level, pick up the
    /// persisted log cursor, and record the boot in the transition log.
    pub fn init(
        &mut self,
        now_us: u64,
        relay: &mut impl RelayPort,
        store: &mut impl StoragePort,
    ) {
        self.fsm.force_transition(FanState::Idle);
        self.ctx.now_us = now_us;
        self.ctx.deenergize_fan();
        self.ctx.last_high_humidity_us = now_us;
        self.ctx.fan_start_us = 0;
        self.ctx.last_transition_us = 0;
        relay.set_fan(false);

        self.log.init(store);
        if let Err(e) = self.log.append(store, "FSM initialized", 0.0, now_us) {
            warn!("transition log unavailable: {e}");
        }
        info!("FSM initialized");
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle with a fresh humidity sample.
    ///
    /// Called once per sampling tick on sensor-read success only; a
    /// failed read skips the tick entirely.  Evaluates the transition
    /// rules, applies the relay intent, and appends exactly one log
    /// entry when a transition fired (none on a no-op tick).
    pub fn update(
        &mut self,
        humidity_pct: f32,
        now_us: u64,
        relay: &mut impl RelayPort,
        store: &mut impl StoragePort,
    ) {
        self.ctx.humidity_pct = humidity_pct;
        self.ctx.now_us = now_us;

        self.fsm.tick(&mut self.ctx);
        relay.set_fan(self.ctx.fan_on);

        if let Some(label) = self.ctx.take_transition_label() {
            if let Err(e) = self.log.append(store, label, humidity_pct, now_us) {
                // Advisory by policy: note the loss and keep controlling.
                warn!("transition log append failed: {e}");
            }
        }

        debug_assert_eq!(self.ctx.fan_on, self.fsm.current_state().runs_fan());
    }

    // ── Manual override ───────────────────────────────────────

    /// Operator override, bypassing every automatic threshold.
    ///
    /// `on` forces Cooling with the fan energized; `off` forces Idle with
    /// the fan off and the high-humidity anchor restarted at `now_us` —
    /// regardless of the state being overridden.  Overrides are not
    /// appended to the transition log.
    pub fn set_manual_override(&mut self, on: bool, now_us: u64, relay: &mut impl RelayPort) {
        self.ctx.now_us = now_us;

        if on {
            self.ctx.energize_fan();
            self.fsm.force_transition(FanState::Cooling);
            info!("Manual override: FAN ON (COOLING)");
        } else {
            self.ctx.deenergize_fan();
            self.ctx.last_high_humidity_us = now_us;
            self.fsm.force_transition(FanState::Idle);
            info!("Manual override: FAN OFF (IDLE)");
        }
        relay.set_fan(self.ctx.fan_on);

        debug_assert_eq!(self.ctx.fan_on, self.fsm.current_state().runs_fan());
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current FSM state.
    pub fn state(&self) -> FanState {
        self.fsm.current_state()
    }

    /// Whether the fan is currently commanded on.
    pub fn is_fan_on(&self) -> bool {
        self.ctx.fan_on
    }

    /// Snapshot for the presentation layer.
    pub fn snapshot(&self) -> ControllerSnapshot {
        ControllerSnapshot {
            state: self.fsm.current_state(),
            fan_on: self.ctx.fan_on,
            last_high_humidity_us: self.ctx.last_high_humidity_us,
            fan_start_us: self.ctx.fan_start_us,
            last_transition_us: self.ctx.last_transition_us,
        }
    }

    /// Clone of the live configuration.
    pub fn config(&self) -> SystemConfig {
        self.ctx.config.clone()
    }

    /// The transition log (for boot-time history reads).
    pub fn transition_log(&self) -> &TransitionLog {
        &self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageError;
    use std::collections::HashMap;

    struct MockRelay {
        on: bool,
        switches: usize,
    }

    impl MockRelay {
        fn new() -> Self {
            Self {
                on: false,
                switches: 0,
            }
        }
    }

    impl RelayPort for MockRelay {
        fn set_fan(&mut self, on: bool) {
            if on != self.on {
                self.switches += 1;
            }
            self.on = on;
        }

        fn is_fan_on(&self) -> bool {
            self.on
        }
    }

    struct MockStore {
        data: HashMap<String, Vec<u8>>,
        fail_writes: bool,
    }

    impl MockStore {
        fn new() -> Self {
            Self {
                data: HashMap::new(),
                fail_writes: false,
            }
        }

        fn broken() -> Self {
            Self {
                data: HashMap::new(),
                fail_writes: true,
            }
        }
    }

    impl StoragePort for MockStore {
        fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
            match self.data.get(&format!("{ns}::{key}")) {
                Some(v) => {
                    let len = v.len().min(buf.len());
                    buf[..len].copy_from_slice(&v[..len]);
                    Ok(len)
                }
                None => Err(StorageError::NotFound),
            }
        }

        fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
            if self.fail_writes {
                return Err(StorageError::IoError);
            }
            self.data.insert(format!("{ns}::{key}"), data.to_vec());
            Ok(())
        }

        fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
            self.data.remove(&format!("{ns}::{key}"));
            Ok(())
        }

        fn exists(&self, ns: &str, key: &str) -> bool {
            self.data.contains_key(&format!("{ns}::{key}"))
        }
    }

    const MIN_US: u64 = 60 * 1_000_000;

    fn booted() -> (Controller, MockRelay, MockStore) {
        let mut ctrl = Controller::new(SystemConfig::default());
        let mut relay = MockRelay::new();
        let mut store = MockStore::new();
        ctrl.init(0, &mut relay, &mut store);
        (ctrl, relay, store)
    }

    #[test]
    fn init_drives_relay_off_and_logs_boot() {
        let (ctrl, relay, store) = booted();
        assert_eq!(ctrl.state(), FanState::Idle);
        assert!(!ctrl.is_fan_on());
        assert!(!relay.is_fan_on());

        let entries = ctrl.transition_log().load_all(&store);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label.as_str(), "FSM initialized");
    }

    #[test]
    fn humidity_spike_energizes_relay_and_logs_once() {
        let (mut ctrl, mut relay, mut store) = booted();

        ctrl.update(60.0, MIN_US, &mut relay, &mut store);
        assert_eq!(ctrl.state(), FanState::Idle);

        ctrl.update(75.0, 2 * MIN_US, &mut relay, &mut store);
        assert_eq!(ctrl.state(), FanState::Cooling);
        assert!(relay.is_fan_on());
        assert_eq!(ctrl.snapshot().fan_start_us, 2 * MIN_US);

        let entries = ctrl.transition_log().load_all(&store);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].label.as_str(), "COOLING");
    }

    #[test]
    fn no_op_tick_appends_nothing() {
        let (mut ctrl, mut relay, mut store) = booted();
        let before = ctrl.snapshot();

        ctrl.update(50.0, MIN_US, &mut relay, &mut store);

        let after = ctrl.snapshot();
        assert_eq!(before.state, after.state);
        assert_eq!(before.last_high_humidity_us, after.last_high_humidity_us);
        assert_eq!(before.fan_start_us, after.fan_start_us);
        assert_eq!(ctrl.transition_log().load_all(&store).len(), 1);
    }

    #[test]
    fn override_on_forces_cooling_from_any_state() {
        for prime in [FanState::Idle, FanState::Cooling, FanState::Force, FanState::Waiting] {
            let (mut ctrl, mut relay, mut store) = booted();

            // Drive the controller into the starting state via override
            // plus natural ticks, then assert the override semantics.
            match prime {
                FanState::Idle => {}
                FanState::Cooling => ctrl.update(80.0, MIN_US, &mut relay, &mut store),
                FanState::Force => {
                    let past = ctrl.config().force_after_us() + 1;
                    ctrl.update(40.0, past, &mut relay, &mut store);
                }
                FanState::Waiting => {
                    ctrl.update(80.0, MIN_US, &mut relay, &mut store);
                    ctrl.update(40.0, 2 * MIN_US, &mut relay, &mut store);
                }
            }
            assert_eq!(ctrl.state(), prime);

            ctrl.set_manual_override(true, 10 * MIN_US, &mut relay);
            assert_eq!(ctrl.state(), FanState::Cooling, "from {prime:?}");
            assert!(ctrl.is_fan_on());
            assert!(relay.is_fan_on());
        }
    }

    #[test]
    fn override_off_forces_idle_and_restarts_holdoff() {
        let (mut ctrl, mut relay, mut store) = booted();
        ctrl.update(80.0, MIN_US, &mut relay, &mut store);
        assert_eq!(ctrl.state(), FanState::Cooling);

        ctrl.set_manual_override(false, 9 * MIN_US, &mut relay);
        assert_eq!(ctrl.state(), FanState::Idle);
        assert!(!relay.is_fan_on());
        assert_eq!(ctrl.snapshot().last_high_humidity_us, 9 * MIN_US);
    }

    #[test]
    fn override_appends_no_log_entry() {
        let (mut ctrl, mut relay, mut store) = booted();
        let before = ctrl.transition_log().load_all(&store).len();

        ctrl.set_manual_override(true, MIN_US, &mut relay);
        ctrl.set_manual_override(false, 2 * MIN_US, &mut relay);

        assert_eq!(ctrl.transition_log().load_all(&store).len(), before);
    }

    #[test]
    fn override_on_anchors_fan_start() {
        let (mut ctrl, mut relay, _store) = booted();
        ctrl.set_manual_override(true, 3 * MIN_US, &mut relay);
        assert_eq!(ctrl.snapshot().fan_start_us, 3 * MIN_US);
    }

    #[test]
    fn storage_failure_never_gates_control() {
        let mut ctrl = Controller::new(SystemConfig::default());
        let mut relay = MockRelay::new();
        let mut store = MockStore::broken();
        ctrl.init(0, &mut relay, &mut store);

        ctrl.update(90.0, MIN_US, &mut relay, &mut store);
        assert_eq!(ctrl.state(), FanState::Cooling);
        assert!(relay.is_fan_on());

        ctrl.update(40.0, 2 * MIN_US, &mut relay, &mut store);
        assert_eq!(ctrl.state(), FanState::Waiting);
        assert!(!relay.is_fan_on());
    }

    #[test]
    fn full_cycle_writes_expected_labels() {
        let (mut ctrl, mut relay, mut store) = booted();
        let cfg = ctrl.config();

        // Cooling run, rest, then a forced run six hours later.
        ctrl.update(85.0, MIN_US, &mut relay, &mut store);
        ctrl.update(55.0, 2 * MIN_US, &mut relay, &mut store);
        let idle_at = 2 * MIN_US + cfg.cool_down_us() + 1;
        ctrl.update(55.0, idle_at, &mut relay, &mut store);
        let force_at = idle_at + cfg.force_after_us() + 1;
        ctrl.update(55.0, force_at, &mut relay, &mut store);
        let done_at = force_at + cfg.fan_run_us() + 1;
        ctrl.update(55.0, done_at, &mut relay, &mut store);

        let entries = ctrl.transition_log().load_all(&store);
        let labels: Vec<&str> = entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "FSM initialized",
                "COOLING",
                "WAITING",
                "IDLE (from WAITING)",
                "FORCE",
                "IDLE (from FORCE)",
            ]
        );
    }
}
