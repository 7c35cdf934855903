//! Task watchdog for the cooperative control loop.
//!
//! The phase and zero-cross ISRs keep firing even when the main loop
//! wedges, which would leave the TRIAC gates driven with no fade, safety,
//! or persistence supervision behind them.  The TWDT (Task Watchdog Timer)
//! panics-and-resets the device if the loop misses its feed for far longer
//! than the control cadence allows.
//!
//! The main loop must call [`ControlLoopWatchdog::feed`] on every
//! iteration.

use crate::config::SystemConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

use log::info;

/// TWDT timeout: 1000 control periods of headroom, clamped to a range
/// that catches a wedged loop without tripping on NVS commits.
pub(crate) fn timeout_for(control_loop_interval_ms: u32) -> u32 {
    control_loop_interval_ms
        .saturating_mul(1000)
        .clamp(5_000, 30_000)
}

pub struct ControlLoopWatchdog {
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl ControlLoopWatchdog {
    /// Arm the TWDT for the control loop's cadence and subscribe the
    /// calling task (the main loop).
    pub fn new(config: &SystemConfig) -> Self {
        let timeout_ms = timeout_for(config.control_loop_interval_ms);

        #[cfg(target_os = "espidf")]
        {
            unsafe {
                let cfg = esp_task_wdt_config_t {
                    timeout_ms,
                    idle_core_mask: 0,
                    trigger_panic: true,
                };
                let ret = esp_task_wdt_reconfigure(&cfg);
                if ret != ESP_OK {
                    log::warn!(
                        "watchdog: TWDT reconfigure returned {} (may already be configured)",
                        ret
                    );
                }

                let ret = esp_task_wdt_add(core::ptr::null_mut());
                let subscribed = ret == ESP_OK;
                if subscribed {
                    info!(
                        "watchdog: control loop subscribed ({} ms timeout, panic on trigger)",
                        timeout_ms
                    );
                } else {
                    log::warn!("watchdog: failed to subscribe control loop ({})", ret);
                }

                Self { subscribed }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("watchdog(sim): would arm at {} ms", timeout_ms);
            Self {}
        }
    }

    /// Feed the watchdog.  Call once per control-loop iteration.
    pub fn feed(&self) {
        #[cfg(target_os = "espidf")]
        {
            if self.subscribed {
                unsafe {
                    esp_task_wdt_reset();
                }
            }
        }
    }
}
