//! HumiVent Firmware — Main Entry Point
//!
//! Hexagonal architecture with event-driven execution.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │                                                              │
//! │  RelayDriver      LogDisplaySink   NvsAdapter   Esp32Time    │
//! │  (RelayPort)      (DisplayPort)    (Config+NVS) (clock)      │
//! │  AhtSensor        ButtonDriver                               │
//! │  (I²C driver)     (debounce ISR)                             │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────        │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────┐      │
//! │  │            Controller (pure logic)                 │      │
//! │  │  FSM · timing anchors · transition log             │      │
//! │  └────────────────────────────────────────────────────┘      │
//! │                                                              │
//! │  Presentation deriver (pure) · Event queue (lock-free)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
mod config;
mod error;
mod events;
mod pins;

pub mod app;
mod adapters;
pub mod display;
mod drivers;
pub mod fsm;
mod sensors;
pub mod translog;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::display_sink::LogDisplaySink;
use adapters::nvs::NvsAdapter;
use adapters::time::Esp32TimeAdapter;
use app::ports::{ConfigPort, DisplayPort};
use app::service::Controller;
use config::SystemConfig;
use display::{ROW_FAN, ROW_HUMIDITY, ROW_STATE, ROW_TEMPERATURE, ROW_TIMER};
use drivers::button::ButtonDriver;
use drivers::relay::RelayDriver;
use events::{push_event, Event};
use sensors::aht::{AhtSensor, Reading};

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  HumiVent v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Initialise hardware peripherals ────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    if let Err(e) = drivers::hw_init::init_isr_service() {
        log::error!("ISR service init failed: {} — continuing without button ISR", e);
    }

    // ── 3. Load config from NVS (or defaults) ─────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            // Continue without NVS — history will not survive this session.
            // On next reboot, NVS should self-heal.
            NvsAdapter::default()
        }
    };
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 4. Clock, watchdog, tick timers ───────────────────────
    let time = Esp32TimeAdapter::new();
    info!("Wall clock synced: {}", time.wall_clock_valid());
    let watchdog = drivers::watchdog::Watchdog::new(config.sample_interval_ms);
    drivers::hw_timer::start_timers(
        u64::from(config.sample_interval_ms) * 1000,
        u64::from(config.display_refresh_ms) * 1000,
    );

    // ── 5. Construct adapters ─────────────────────────────────
    // The I²C bus is shared by the AHT10 and (when fitted) the OLED, so
    // it is owned here and lent to each device per transaction.
    #[cfg(target_os = "espidf")]
    let mut i2c = {
        use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
        use esp_idf_hal::peripherals::Peripherals;
        use esp_idf_hal::units::FromValueType;

        let p = Peripherals::take()?;
        let cfg = I2cConfig::new().baudrate(pins::I2C_FREQ_HZ.Hz().into());
        I2cDriver::new(p.i2c0, p.pins.gpio5, p.pins.gpio6, &cfg)?
    };
    #[cfg(not(target_os = "espidf"))]
    let mut i2c = sensors::SimI2cBus;

    #[cfg(target_os = "espidf")]
    let mut delay = esp_idf_hal::delay::Delay::new_default();
    #[cfg(not(target_os = "espidf"))]
    let mut delay = sensors::SimDelay;

    #[cfg(target_os = "espidf")]
    scan_i2c_bus(&mut i2c);

    let mut sensor = AhtSensor::new(pins::AHT_I2C_ADDR);
    if let Err(e) = sensor.init(&mut i2c) {
        warn!("AHT init failed ({}), readings may be unavailable", e);
    }

    let mut relay = RelayDriver::new();
    let mut button = ButtonDriver::new(pins::BUTTON_GPIO);
    let mut oled = LogDisplaySink::new();

    // ── 6. Construct the controller ───────────────────────────
    let mut controller = Controller::new(config.clone());
    controller.init(time.uptime_us(), &mut relay, &mut nvs);

    // Prior history survives reboots; show the most recent entries.
    let entries = controller.transition_log().load_all(&nvs);
    if !entries.is_empty() {
        info!("Transition history (newest first):");
        for line in display::history_lines(&entries, 0) {
            info!("  {}", line);
        }
    }

    info!("System ready. Entering event loop.");

    // ── 7. Event loop ─────────────────────────────────────────
    let mut last_reading: Option<Reading> = None;
    let mut last_timer_len = 0usize;

    loop {
        // Simulate timer interrupts via sleep on non-espidf targets.
        // On real hardware the esp_timer callbacks push these events.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(
                config.sample_interval_ms,
            )));
            push_event(Event::ControlTick);
            push_event(Event::DisplayTick);
        }

        // Process all pending events.
        events::drain_events(|event| match event {
            Event::ControlTick => {
                // Sensor failure skips the whole tick: no update call, no
                // log entry, the display keeps its prior values.
                match sensor.read(&mut i2c, &mut delay) {
                    Ok(reading) => {
                        last_reading = Some(reading);
                        controller.update(
                            reading.humidity_pct,
                            time.uptime_us(),
                            &mut relay,
                            &mut nvs,
                        );
                    }
                    Err(e) => warn!("Sensor read failed ({}), skipping tick", e),
                }
            }

            Event::ButtonToggle => {
                let desired = !controller.is_fan_on();
                info!("Button: override -> fan {}", if desired { "ON" } else { "OFF" });
                controller.set_manual_override(desired, time.uptime_us(), &mut relay);
            }

            Event::DisplayTick => {
                let snap = controller.snapshot();
                let now_us = time.uptime_us();

                if let Some(r) = last_reading {
                    oled.draw_text(ROW_TEMPERATURE, &display::temperature_line(r.temperature_c));
                    oled.draw_text(ROW_HUMIDITY, &display::humidity_line(r.humidity_pct));
                }
                oled.draw_text(ROW_FAN, display::fan_line(&snap));

                // Timer: clear the row when the rendered width shrinks
                // (e.g. "360:00" -> "59:59") so no stale glyphs remain.
                let timer = display::timer_line(&snap, &config, now_us);
                if timer.len() != last_timer_len {
                    oled.clear_row(ROW_TIMER);
                    last_timer_len = timer.len();
                }
                oled.draw_text(ROW_TIMER, &timer);

                oled.draw_text(ROW_STATE, display::state_line(snap.state));
                oled.draw_bitmap(0, 0, display::state_icon(snap.state));

                if let Err(e) = oled.present() {
                    warn!("Display present failed: {}", e);
                }
            }

            Event::WatchdogTick => {}
        });

        // Button gesture detection (runs outside drain_events since it
        // uses its own atomic).
        let now_ms = (time.uptime_us() / 1000) as u32;
        if button.tick(now_ms) {
            push_event(Event::ButtonToggle);
        }

        // Feed watchdog on every iteration.
        watchdog.feed();

        // Yield to FreeRTOS between event bursts.
        #[cfg(target_os = "espidf")]
        esp_idf_hal::delay::FreeRtos::delay_ms(10);
    }
}

/// One-shot I²C bus scan at boot — logs every responding address.
#[cfg(target_os = "espidf")]
fn scan_i2c_bus(bus: &mut impl embedded_hal::i2c::I2c) {
    info!("Scanning I2C bus...");
    for addr in 1u8..127 {
        if bus.write(addr, &[0]).is_ok() {
            info!("Found I2C device at 0x{:02X}", addr);
        }
    }
}
