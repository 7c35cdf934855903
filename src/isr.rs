//! Interrupt-context handlers for TRIAC phase control.
//!
//! Two handlers share the device store with the cooperative loop:
//!
//! - [`on_zero_cross`] — GPIO edge at each AC zero-crossing.  Resets the
//!   phase-tick counter, stamps the crossing time, and restates every
//!   output from policy: `Switch` loads commanded on go high immediately,
//!   `Dimmable` loads go low to await their phase delay, everything
//!   commanded off goes low.  A crossing always redefines the outputs —
//!   it never waits on tick progress.
//! - [`on_phase_tick`] — fixed 100 µs timer.  Increments the tick counter
//!   and asserts each commanded-on `Dimmable` gate once its fire delay has
//!   elapsed; the gate stays high until the next crossing clears it.
//!
//! Both run their entire body inside the store's critical section:
//! branch-only, bounded, no allocation, no logging.  Errors never cross
//! this boundary — the only outward signal is the crossing timestamp the
//! safety watchdog polls.
//!
//! The logic is target-independent over [`OutputBank`]; the espidf glue at
//! the bottom binds it to the static registry and the GPIO bank.

use crate::app::ports::OutputBank;
use crate::config::PHASE_STEPS;
use crate::store::{DeviceKind, DeviceStore};

/// Zero-crossing edge handler.
pub fn on_zero_cross(store: &DeviceStore, outputs: &mut impl OutputBank, now_ms: u64) {
    store.with_shared(|shared| {
        shared.tick_counter = 0;
        shared.last_zero_cross_ms = now_ms;
        shared.zero_cross_seen = true;

        for (ch, dev) in shared.devices.iter().enumerate() {
            let high = dev.commanded_on && dev.kind == DeviceKind::Switch;
            outputs.set_channel(ch, high);
        }
    });
}

/// Phase timer tick handler.
pub fn on_phase_tick(store: &DeviceStore, outputs: &mut impl OutputBank) {
    store.with_shared(|shared| {
        let tick = shared.tick_counter.saturating_add(1);
        shared.tick_counter = if tick > PHASE_STEPS { 0 } else { tick };

        for (ch, dev) in shared.devices.iter().enumerate() {
            if dev.commanded_on
                && dev.kind == DeviceKind::Dimmable
                // A delay of PHASE_STEPS means "never fires this half-cycle".
                && dev.fire_delay_ticks < PHASE_STEPS
                && tick >= dev.fire_delay_ticks
            {
                outputs.set_channel(ch, true);
            }
        }
    });
}

// ── ESP-IDF glue ──────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod glue {
    use super::{on_phase_tick, on_zero_cross};
    use crate::adapters::gpio::GpioOutputBank;
    use crate::store::STORE;

    /// GPIO ISR bound to the rising edge of the ZCD input.
    ///
    /// # Safety
    ///
    /// Registered via `gpio_isr_handler_add`; runs in interrupt context.
    pub unsafe extern "C" fn zero_cross_isr(_arg: *mut core::ffi::c_void) {
        let now_ms = (unsafe { esp_idf_svc::sys::esp_timer_get_time() } / 1000) as u64;
        on_zero_cross(&STORE, &mut GpioOutputBank, now_ms);
    }

    /// esp_timer callback for the 100 µs phase timer (ISR dispatch).
    ///
    /// # Safety
    ///
    /// Registered via `esp_timer_create` with `ESP_TIMER_ISR`; runs in
    /// interrupt context.
    pub unsafe extern "C" fn phase_tick_isr(_arg: *mut core::ffi::c_void) {
        on_phase_tick(&STORE, &mut GpioOutputBank);
    }
}

#[cfg(target_os = "espidf")]
pub use glue::{phase_tick_isr, zero_cross_isr};
