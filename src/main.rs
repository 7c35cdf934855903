//! PhaseHub Firmware — Main Entry Point
//!
//! Hexagonal architecture with split timing domains:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  GpioOutputBank   LogChangeSink   NvsAdapter   TimeAdapter     │
//! │  (OutputBank)     (ChangeSink)    (Config+NVS) (monotonic ms)  │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  interrupt domain: zero-cross ISR · phase timer ISR    │    │
//! │  │           ▲ critical-section guard ▼                   │    │
//! │  │  cooperative domain: ControlService · FadeEngine ·     │    │
//! │  │  SafetyMonitor · WallSwitches · Telemetry              │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

// ── Module declarations ───────────────────────────────────────
pub mod config;
mod control;
mod error;
mod events;
mod fade;
mod isr;
mod pins;
mod power;
mod safety;
mod store;

pub mod app;
mod adapters;
pub mod diagnostics;
mod drivers;
mod esp_link_shims;

// ── Imports ───────────────────────────────────────────────────
use anyhow::Result;
use log::{info, warn};

use adapters::gpio::GpioOutputBank;
use adapters::log_sink::LogChangeSink;
use adapters::nvs::NvsAdapter;
use adapters::time::TimeAdapter;
use app::ports::ConfigPort;
use config::SystemConfig;
use control::ControlService;
use diagnostics::Telemetry;
use drivers::wall_switch::WallSwitches;
use events::Event;
use safety::SafetyMonitor;
use store::STORE;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  PhaseHub v{}                       ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    diagnostics::install_panic_handler();

    // ── 2. Peripherals ────────────────────────────────────────
    if let Err(e) = drivers::hw_init::init_peripherals() {
        // Peripheral init failure is critical — log and halt.
        // In production this triggers the watchdog reset after timeout.
        log::error!("HAL init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 3. Config and last state from NVS ─────────────────────
    let nvs = match NvsAdapter::new() {
        Ok(n) => n,
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
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
    let persisted = match nvs.load_state() {
        Ok(state) => state,
        Err(e) => {
            warn!("NVS channel state load failed ({}), starting clean", e);
            Default::default()
        }
    };

    // ── 4. Seed the registry, then arm the timing domain ──────
    //
    // The ISRs read the registry the instant they are attached, so the
    // power-on policies must be applied first.
    let time = TimeAdapter::new();
    STORE.seed(&config, &persisted, time.uptime_ms());

    if let Err(e) = drivers::hw_init::init_isr_service() {
        log::error!("ISR service init failed: {} — continuing without zero-cross", e);
    }
    if let Err(e) = drivers::hw_timer::start_timers(&config) {
        log::error!("Timer init failed: {} — halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }

    // ── 5. Cooperative-domain services ────────────────────────
    let watchdog = drivers::watchdog::ControlLoopWatchdog::new(&config);
    let mut outputs = GpioOutputBank;
    let mut control = ControlService::new(&STORE, &config);
    control.register_change_sink(Box::new(LogChangeSink::new()));
    let mut safety = SafetyMonitor::new(&config);
    let mut switches = WallSwitches::new(config.switch_debounce_ms);

    info!(
        "System ready: {} channels, fade {}ms/{} steps, zc timeout {}ms",
        config::CHANNEL_COUNT,
        config.fade_duration_ms,
        config.fade_steps,
        config.zc_timeout_ms
    );

    // ── 6. Event loop ─────────────────────────────────────────
    #[cfg(not(target_os = "espidf"))]
    let mut persist_cadence = drivers::hw_timer::SimCadence::new(1000);
    #[cfg(not(target_os = "espidf"))]
    let mut telemetry_cadence =
        drivers::hw_timer::SimCadence::new(u64::from(config.telemetry_interval_secs) * 1000);

    loop {
        // Simulate the cadence timers via sleep on non-espidf targets.
        // On real hardware the CPU idles in WFI and wakes on the esp_timer
        // callbacks that push these events.
        #[cfg(not(target_os = "espidf"))]
        {
            std::thread::sleep(std::time::Duration::from_millis(u64::from(
                config.control_loop_interval_ms,
            )));
            drivers::hw_timer::simulate_control_tick();
            let sim_now_ms = time.uptime_ms();
            if persist_cadence.due(sim_now_ms) {
                events::push_event(Event::PersistTick);
            }
            if telemetry_cadence.due(sim_now_ms) {
                events::push_event(Event::TelemetryTick);
            }
        }

        let now_ms = time.uptime_ms();

        events::drain_events(|event| match event {
            Event::FadeTick => {
                control.process_fades(now_ms);
            }

            Event::SwitchScanTick => {
                for ch in switches.scan_hw(now_ms) {
                    let Ok((on, brightness)) = control.get_device_state(ch) else {
                        continue;
                    };
                    info!("Wall switch: ch{} flip → {}", ch, if on { "off" } else { "on" });
                    if let Err(e) = control.set_device_state(ch, !on, brightness, true, now_ms) {
                        warn!("Wall switch: ch{} rejected: {}", ch, e);
                    }
                }
            }

            Event::SafetyTick => {
                safety.poll(&STORE, &mut outputs, &mut control, now_ms);
            }

            Event::PersistTick => {
                if control.take_persistable(now_ms, config.state_save_debounce_ms) {
                    match nvs.save_state(&STORE.persistable()) {
                        Ok(()) => info!("Channel state persisted"),
                        Err(e) => warn!("Channel state save failed: {}", e),
                    }
                }
            }

            Event::TelemetryTick => {
                Telemetry::collect(&STORE, &safety, time.uptime_secs()).log_report();
            }
        });

        // Feed watchdog on every iteration.
        watchdog.feed();

        // Nothing left to do until the next timer callback lands.
        #[cfg(target_os = "espidf")]
        if events::queue_is_empty() {
            unsafe {
                esp_idf_svc::sys::vTaskDelay(1);
            }
        }
    }
}
