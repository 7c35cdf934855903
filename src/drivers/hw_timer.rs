//! Hardware timers using ESP-IDF's esp_timer API.
//!
//! Two kinds of timer run here:
//!
//! - The **phase timer** fires every 100 µs with ISR dispatch and calls the
//!   phase-tick handler directly.  It never goes through the event queue —
//!   queueing would add unbounded latency to TRIAC gate timing.
//! - The **cadence timers** (control, housekeeping, telemetry) use task
//!   dispatch and only push events into the lock-free SPSC queue for the
//!   main loop to consume.
//!
//! On simulation targets the main loop drives the cadences via
//! thread::sleep instead.

use crate::events::{push_event, Event};

#[cfg(target_os = "espidf")]
use crate::config::{SystemConfig, PHASE_TIMER_INTERVAL_US};

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use log::info;

#[cfg(target_os = "espidf")]
static mut PHASE_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut CONTROL_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut HOUSEKEEPING_TIMER: esp_timer_handle_t = core::ptr::null_mut();
#[cfg(target_os = "espidf")]
static mut TELEMETRY_TIMER: esp_timer_handle_t = core::ptr::null_mut();

#[cfg(target_os = "espidf")]
unsafe extern "C" fn control_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::FadeTick);
    push_event(Event::SwitchScanTick);
    push_event(Event::SafetyTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn housekeeping_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::PersistTick);
}

#[cfg(target_os = "espidf")]
unsafe extern "C" fn telemetry_tick_cb(_arg: *mut core::ffi::c_void) {
    push_event(Event::TelemetryTick);
}

#[cfg(target_os = "espidf")]
unsafe fn create_and_start(
    handle: *mut esp_timer_handle_t,
    callback: esp_timer_cb_t,
    dispatch: esp_timer_dispatch_t,
    name: &'static [u8],
    period_us: u64,
) -> Result<(), i32> {
    let args = esp_timer_create_args_t {
        callback,
        arg: core::ptr::null_mut(),
        dispatch_method: dispatch,
        name: name.as_ptr() as *const _,
        skip_unhandled_events: true,
    };
    // SAFETY: called once at boot from the single main-task context before
    // any callback can fire; `handle` points at the matching static.
    let ret = unsafe { esp_timer_create(&args, handle) };
    if ret != ESP_OK {
        return Err(ret);
    }
    let ret = unsafe { esp_timer_start_periodic(*handle, period_us) };
    if ret != ESP_OK {
        return Err(ret);
    }
    Ok(())
}

/// Start the phase timer and the cadence timers.
///
/// - 100 µs phase timer (ISR dispatch — drives TRIAC firing)
/// - control timer at `control_loop_interval_ms` (fade / switch / safety)
/// - 1 s housekeeping timer (persistence check)
/// - telemetry timer at `telemetry_interval_secs`
#[cfg(target_os = "espidf")]
pub fn start_timers(config: &SystemConfig) -> Result<(), super::hw_init::HwInitError> {
    use super::hw_init::HwInitError;

    // SAFETY: the timer handle statics are written here once at boot from
    // the single main-task context before any callbacks fire.
    unsafe {
        create_and_start(
            &raw mut PHASE_TIMER,
            Some(crate::isr::phase_tick_isr),
            esp_timer_dispatch_t_ESP_TIMER_ISR,
            b"phase\0",
            PHASE_TIMER_INTERVAL_US,
        )
        .map_err(HwInitError::TimerCreateFailed)?;

        create_and_start(
            &raw mut CONTROL_TIMER,
            Some(control_tick_cb),
            esp_timer_dispatch_t_ESP_TIMER_TASK,
            b"control\0",
            u64::from(config.control_loop_interval_ms) * 1000,
        )
        .map_err(HwInitError::TimerCreateFailed)?;

        create_and_start(
            &raw mut HOUSEKEEPING_TIMER,
            Some(housekeeping_tick_cb),
            esp_timer_dispatch_t_ESP_TIMER_TASK,
            b"housekeep\0",
            1_000_000,
        )
        .map_err(HwInitError::TimerCreateFailed)?;

        create_and_start(
            &raw mut TELEMETRY_TIMER,
            Some(telemetry_tick_cb),
            esp_timer_dispatch_t_ESP_TIMER_TASK,
            b"telemetry\0",
            u64::from(config.telemetry_interval_secs) * 1_000_000,
        )
        .map_err(HwInitError::TimerCreateFailed)?;

        info!(
            "hw_timer: phase@{}µs (ISR) + control@{}ms + housekeeping@1s + telemetry@{}s",
            PHASE_TIMER_INTERVAL_US,
            config.control_loop_interval_ms,
            config.telemetry_interval_secs
        );
    }
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_timers(
    _config: &crate::config::SystemConfig,
) -> Result<(), super::hw_init::HwInitError> {
    log::info!("hw_timer(sim): timers not started (events driven by sleep loop)");
    Ok(())
}

/// Stop all timers.  The phase timer stopping leaves every gate in its
/// current state, so callers must drive the outputs low first.
#[cfg(target_os = "espidf")]
pub fn stop_timers() {
    // SAFETY: handles are valid if start_timers() succeeded; null-check
    // prevents stopping a timer that was never created.
    unsafe {
        for handle in [
            PHASE_TIMER,
            CONTROL_TIMER,
            HOUSEKEEPING_TIMER,
            TELEMETRY_TIMER,
        ] {
            if !handle.is_null() {
                esp_timer_stop(handle);
            }
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_timers() {}

/// Push one round of cadence events from the simulation loop.  Mirrors
/// what `control_tick_cb` does on hardware.
#[cfg(not(target_os = "espidf"))]
pub fn simulate_control_tick() {
    push_event(Event::FadeTick);
    push_event(Event::SwitchScanTick);
    push_event(Event::SafetyTick);
}

/// Deadline tracker standing in for one periodic esp_timer on the host.
/// Works for any poll interval, aligned to the period or not.
#[cfg(not(target_os = "espidf"))]
pub struct SimCadence {
    next_ms: u64,
    period_ms: u64,
}

#[cfg(not(target_os = "espidf"))]
impl SimCadence {
    pub fn new(period_ms: u64) -> Self {
        Self {
            next_ms: period_ms,
            period_ms,
        }
    }

    /// True once per elapsed period.
    pub fn due(&mut self, now_ms: u64) -> bool {
        if now_ms >= self.next_ms {
            self.next_ms += self.period_ms;
            return true;
        }
        false
    }
}
