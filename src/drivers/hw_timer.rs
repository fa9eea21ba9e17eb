//! Hardware timer module using ESP-IDF's esp_timer API.
//!
//! Creates periodic timers that push events into the lock-free SPSC
//! queue: the 1 Hz control tick and the display refresh tick.  On
//! simulation targets the sleep loop in `main()` drives the same events.
//!
//! Timer callbacks execute in the ESP timer task context (not ISR), so
//! they can safely call push_event() which uses AtomicU8.

use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut CONTROL_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut DISPLAY_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// SAFETY: CONTROL_TIMER is written once in `start_timers()` before any
/// timer callbacks fire.  Only called from the single main task.
#[cfg(target_os = "espidf")]
unsafe fn control_timer() -> esp_timer_handle_t {
    unsafe { CONTROL_TIMER }
}

/// SAFETY: Same invariants as `control_timer()`.
#[cfg(target_os = "espidf")]
unsafe fn display_timer() -> esp_timer_handle_t {
    unsafe { DISPLAY_TIMER }
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::ControlTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn display_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::DisplayTick);
}

/// Start the hardware tick timers.
///
/// * `control_period_us` — humidity sampling / FSM tick period
/// * `display_period_us` — display refresh period
#[cfg(target_os = "espidf")]
pub fn start_timers(control_period_us: u64, display_period_us: u64) {
    // SAFETY: CONTROL_TIMER and DISPLAY_TIMER are written here once at
    // boot from the single main-task context before any timer callbacks
    // fire.  The callbacks themselves only call push_event(), which is
    // ISR-safe.
    unsafe {
        let control_args = esp_timer_create_args_t {
            callback: Some(control_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"control\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&control_args, &raw mut CONTROL_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: control timer create failed (rc={}) — continuing without control ticks",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(CONTROL_TIMER, control_period_us);
        if ret != ESP_OK {
            log::error!("hw_timer: control timer start failed (rc={})", ret);
            return;
        }

        let display_args = esp_timer_create_args_t {
            callback: Some(display_tick_cb),
            arg: core::ptr::null_mut(),
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"display\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&display_args, &raw mut DISPLAY_TIMER);
        if ret != ESP_OK {
            log::error!(
                "hw_timer: display timer create failed (rc={}) — continuing without display ticks",
                ret
            );
            return;
        }
        let ret = esp_timer_start_periodic(DISPLAY_TIMER, display_period_us);
        if ret != ESP_OK {
            log::error!("hw_timer: display timer start failed (rc={})", ret);
            return;
        }

        info!(
            "hw_timer: control@{}µs + display@{}µs started",
            control_period_us, display_period_us
        );
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(_control_period_us: u64, _display_period_us: u64) {
    log::info!("hw_timer(sim): timers not started (events driven by sleep loop)");
}

/// Stop all hardware tick timers.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: CONTROL_TIMER/DISPLAY_TIMER are valid handles if
    // start_timers() succeeded; null-check prevents double-free.
    unsafe {
        // SAFETY: control_timer()/display_timer() contract — main task only.
        let ct = control_timer();
        if !ct.is_null() {
            esp_timer_stop(ct);
        }
        let dt = display_timer();
        if !dt.is_null() {
            esp_timer_stop(dt);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}
