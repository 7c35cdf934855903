//! Safety monitor.
//!
//! Runs every cooperative tick and owns three duties:
//!
//! 1. **Zero-cross watchdog** — if no crossing edge has been recorded for
//!    longer than the configured threshold, every channel output is driven
//!    low at the hardware level *first*, then the commanded state is
//!    cleared under the guard, and the sticky [`FaultFlag`] is latched.
//!    The shutdown is global: phase timing for every dimmable channel
//!    depends on the same crossing reference.  The transition runs once
//!    per loss episode; polling while still lost does nothing further.
//! 2. **Auto-off** — channels with the auto-off flag that have been on past
//!    the deadline are turned off through the control façade (with a fade),
//!    never by writing the store directly.
//! 3. **Runtime accounting** — once per elapsed second, every commanded-on
//!    channel accrues one second of runtime.
//!
//! The latched fault never clears on its own.  Crossings resuming is not
//! proof the wiring is sound, so a supervisory caller must decide and call
//! [`SafetyMonitor::rearm`] explicitly.

use log::{error, info, warn};

use crate::app::ports::OutputBank;
use crate::config::SystemConfig;
use crate::control::ControlService;
use crate::error::FaultFlag;
use crate::store::DeviceStore;

/// Zero-cross watchdog states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    Healthy,
    SignalLost,
}

pub struct SafetyMonitor {
    watchdog: WatchdogState,
    zc_timeout_ms: u32,
    auto_off_ms: u32,
    /// Latched fault bitmask.
    faults: u8,
    last_runtime_ms: u64,
}

impl SafetyMonitor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            watchdog: WatchdogState::Healthy,
            zc_timeout_ms: config.zc_timeout_ms,
            auto_off_ms: config.auto_off_ms,
            faults: 0,
            last_runtime_ms: 0,
        }
    }

    /// Evaluate all safety duties.  Call once per cooperative tick.
    pub fn poll(
        &mut self,
        store: &DeviceStore,
        outputs: &mut impl OutputBank,
        control: &mut ControlService<'_>,
        now_ms: u64,
    ) {
        self.check_zero_cross(store, outputs, now_ms);
        self.check_auto_off(store, control, now_ms);
        self.update_runtime(store, now_ms);
    }

    /// Current watchdog state.
    pub fn watchdog(&self) -> WatchdogState {
        self.watchdog
    }

    /// Latched fault bitmask.
    pub fn faults(&self) -> u8 {
        self.faults
    }

    pub fn has_fault(&self, fault: FaultFlag) -> bool {
        self.faults & fault.mask() != 0
    }

    /// Explicit re-arm after a signal loss has been investigated.  Clears
    /// the latched fault and lets the watchdog trip again on a new loss.
    pub fn rearm(&mut self) {
        if self.watchdog == WatchdogState::SignalLost {
            info!("safety: watchdog re-armed");
        }
        self.watchdog = WatchdogState::Healthy;
        self.faults &= !FaultFlag::ZeroCrossSignalLost.mask();
    }

    // ── Internal ──────────────────────────────────────────────────

    fn check_zero_cross(
        &mut self,
        store: &DeviceStore,
        outputs: &mut impl OutputBank,
        now_ms: u64,
    ) {
        if self.watchdog == WatchdogState::SignalLost {
            return; // Already latched; one shutdown per loss episode.
        }
        let Some(age_ms) = store.zero_cross_age_ms(now_ms) else {
            return; // No crossing seen yet (boot grace).
        };
        if age_ms <= u64::from(self.zc_timeout_ms) {
            return;
        }

        error!(
            "safety: zero-cross signal lost ({} ms since last edge) — shutting all channels down",
            age_ms
        );

        // Hardware first: the gates must be low before any software state
        // is consistent again.
        outputs.all_low();
        store.force_all_off();

        self.watchdog = WatchdogState::SignalLost;
        self.faults |= FaultFlag::ZeroCrossSignalLost.mask();
    }

    fn check_auto_off(
        &mut self,
        store: &DeviceStore,
        control: &mut ControlService<'_>,
        now_ms: u64,
    ) {
        if self.auto_off_ms == 0 {
            return;
        }
        for (id, dev) in store.snapshot_all().iter().enumerate() {
            if dev.auto_off_enabled
                && dev.commanded_on
                // A ramp already heading out satisfies the deadline.
                && !control.fade_active(id)
                && now_ms.saturating_sub(dev.last_on_ms) > u64::from(self.auto_off_ms)
            {
                info!("safety: auto-off deadline reached for ch{}", id);
                // Through the façade: validation and notification apply.
                if let Err(e) = control.set_device_state(id, false, 0, true, now_ms) {
                    warn!("safety: auto-off for ch{} rejected: {}", id, e);
                }
            }
        }
    }

    fn update_runtime(&mut self, store: &DeviceStore, now_ms: u64) {
        if now_ms.saturating_sub(self.last_runtime_ms) >= 1000 {
            store.tick_runtime();
            self.last_runtime_ms = now_ms;
        }
    }
}
