//! GPIO output bank adapter for the TRIAC gate pins.
//!
//! On ESP-IDF this maps channel indices to the gate GPIOs and writes the
//! level registers directly; `gpio_set_level` is a bounded register write
//! and is safe from interrupt context, which is where most calls originate
//! (zero-cross and phase-tick handlers).  On the host it degrades to a
//! no-op — host tests use their own recording banks instead.

use crate::app::ports::OutputBank;
use crate::config::CHANNEL_COUNT;
use crate::pins;

/// Zero-sized adapter over the fixed gate pin map.
pub struct GpioOutputBank;

impl OutputBank for GpioOutputBank {
    #[cfg(target_os = "espidf")]
    fn set_channel(&mut self, channel: usize, high: bool) {
        if channel >= CHANNEL_COUNT {
            return;
        }
        // SAFETY: gpio_set_level writes an already-configured output pin's
        // level register; callable from ISR context.
        unsafe {
            esp_idf_svc::sys::gpio_set_level(
                pins::TRIAC_GPIOS[channel],
                if high { 1 } else { 0 },
            );
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn set_channel(&mut self, channel: usize, _high: bool) {
        let _ = channel;
    }

    fn all_low(&mut self) {
        for ch in 0..CHANNEL_COUNT {
            self.set_channel(ch, false);
        }
    }
}
