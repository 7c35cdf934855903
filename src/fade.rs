//! Fade engine — bounded-step brightness ramps.
//!
//! Runs in the cooperative loop.  Each active ramp advances one step when
//! its `step_interval_ms` has elapsed; every step writes brightness (and
//! on the final step, the commanded state) through the store guard in one
//! critical section, so the ISRs always see a consistent pair.
//!
//! Interpolation reads the brightness *currently stored*, not a value
//! captured at ramp start.  A concurrent `set_device_state` therefore
//! shifts the ramp's effective origin — intentional, matching the
//! last-write-wins contract for competing callers.
//!
//! Fade bookkeeping itself is only ever touched from the cooperative loop,
//! so it lives outside the guard; only the device writes are guarded.

use crate::app::ports::DeviceChange;
use crate::config::CHANNEL_COUNT;
use crate::store::DeviceStore;

/// Per-channel ramp bookkeeping.  Not persisted.
#[derive(Debug, Clone, Copy)]
pub struct FadeState {
    pub active: bool,
    pub target_brightness: u8,
    pub current_step: u16,
    pub total_steps: u16,
    pub last_step_ms: u64,
    pub step_interval_ms: u32,
}

impl FadeState {
    const IDLE: Self = Self {
        active: false,
        target_brightness: 0,
        current_step: 0,
        total_steps: 0,
        last_step_ms: 0,
        step_interval_ms: 0,
    };
}

/// Changes produced by one engine poll, for change notification.
pub type FadeChanges = heapless::Vec<DeviceChange, CHANNEL_COUNT>;

pub struct FadeEngine {
    fades: [FadeState; CHANNEL_COUNT],
}

impl FadeEngine {
    pub const fn new() -> Self {
        Self {
            fades: [FadeState::IDLE; CHANNEL_COUNT],
        }
    }

    /// Start (or restart) a ramp.  A ramp already running on this channel
    /// is overwritten unconditionally — last write wins.
    ///
    /// The caller is responsible for holding the device commanded on for
    /// the duration of the ramp; the engine snaps the final state.
    pub fn begin(
        &mut self,
        id: usize,
        target_brightness: u8,
        total_steps: u16,
        step_interval_ms: u32,
        now_ms: u64,
    ) {
        if id >= CHANNEL_COUNT {
            return;
        }
        self.fades[id] = FadeState {
            active: true,
            target_brightness: target_brightness.min(100),
            current_step: 0,
            total_steps: total_steps.max(1),
            last_step_ms: now_ms,
            step_interval_ms,
        };
    }

    /// Drop any ramp on this channel without touching device state.
    pub fn cancel(&mut self, id: usize) {
        if id < CHANNEL_COUNT {
            self.fades[id] = FadeState::IDLE;
        }
    }

    pub fn is_active(&self, id: usize) -> bool {
        id < CHANNEL_COUNT && self.fades[id].active
    }

    /// Advance every due ramp.  Returns the channels whose device state
    /// changed, for the caller to feed into the change sink.
    pub fn poll(&mut self, store: &DeviceStore, now_ms: u64) -> FadeChanges {
        let mut changes = FadeChanges::new();

        for (id, fade) in self.fades.iter_mut().enumerate() {
            if !fade.active {
                continue;
            }
            if now_ms.saturating_sub(fade.last_step_ms) < u64::from(fade.step_interval_ms) {
                continue;
            }

            fade.current_step += 1;
            fade.last_step_ms = now_ms;
            let finished = fade.current_step >= fade.total_steps;

            let written = store.update(id, |dev| {
                if finished {
                    dev.brightness = fade.target_brightness;
                    dev.commanded_on = dev.brightness > 0;
                } else {
                    // Interpolate from the brightness stored right now, with
                    // overall ramp progress.  The gap re-shrinks every step,
                    // so the curve eases into the target; an external write
                    // mid-ramp shifts the origin and the ramp re-aims.
                    let start = i32::from(dev.brightness);
                    let gap = i32::from(fade.target_brightness) - start;
                    let next =
                        start + gap * i32::from(fade.current_step) / i32::from(fade.total_steps);
                    dev.brightness = next.clamp(0, 100) as u8;
                }
                (dev.commanded_on, dev.brightness)
            });

            if finished {
                fade.active = false;
            }

            if let Some((commanded_on, brightness)) = written {
                // Capacity equals channel count, so this cannot fail.
                let _ = changes.push(DeviceChange {
                    id: id as u8,
                    commanded_on,
                    brightness,
                });
            }
        }

        changes
    }
}

impl Default for FadeEngine {
    fn default() -> Self {
        Self::new()
    }
}
