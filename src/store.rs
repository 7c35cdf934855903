//! Device state store.
//!
//! Fixed-size registry of per-channel device state, shared between the
//! interrupt-context handlers (zero-cross, phase timer) and the cooperative
//! control loop.  Every access goes through one `critical_section::Mutex`,
//! which masks the interrupt source for the duration of the critical
//! section, so a task-context writer can never be torn by an ISR reader.
//!
//! Critical sections here are O(CHANNEL_COUNT), branch-only, and never
//! allocate, log, or perform I/O.
//!
//! The phase-tick counter and last-crossing timestamp live in the same
//! guarded block as the devices: the zero-cross handler resets the counter
//! and restates every output in a single critical section, so the phase
//! timer can never observe a crossing without the accompanying reset.

use core::cell::RefCell;

use critical_section::Mutex;
use serde::{Deserialize, Serialize};

use crate::config::{PersistedChannel, SystemConfig, CHANNEL_COUNT, PHASE_STEPS};
use crate::power;

/// Load kind.  Fans share `Dimmable` semantics — both are phase-delayed;
/// `Switch` loads are asserted directly at the crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceKind {
    Switch,
    Dimmable,
}

/// One channel's live state.  `Copy` so guarded reads hand out snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device {
    pub kind: DeviceKind,
    /// Commanded output state.  The hardware level additionally depends on
    /// phase progress for `Dimmable` kinds.
    pub commanded_on: bool,
    /// 0–100.  Turning a channel off does not erase this; it is retained
    /// for power-on restore and the next turn-on.
    pub brightness: u8,
    /// Derived: ticks after a crossing before the gate is asserted.
    /// Always equals `calculate_fire_tick(brightness)`.
    pub fire_delay_ticks: u8,
    /// Monotonic ms of the last off→on transition (auto-off reference).
    pub last_on_ms: u64,
    /// Accumulated seconds spent commanded on.
    pub total_runtime_secs: u32,
    pub child_lock: bool,
    pub auto_off_enabled: bool,
}

impl Device {
    const INIT: Self = Self {
        kind: DeviceKind::Switch,
        commanded_on: false,
        brightness: 100,
        fire_delay_ticks: PHASE_STEPS,
        last_on_ms: 0,
        total_runtime_secs: 0,
        child_lock: false,
        auto_off_enabled: false,
    };
}

/// TRIAC fire delay for a brightness percentage.
///
/// 100 → 0 (fires at the crossing, full power); 0 → 100 (never fires
/// within the half-cycle); otherwise `100 - percent`.  Monotonically
/// non-increasing in its input.
pub fn calculate_fire_tick(percent: u8) -> u8 {
    if percent >= 100 {
        return 0;
    }
    if percent == 0 {
        return PHASE_STEPS;
    }
    PHASE_STEPS - percent
}

/// Everything behind the guard.
pub(crate) struct Shared {
    pub devices: [Device; CHANNEL_COUNT],
    /// Phase ticks since the last zero-crossing.  Reset by the crossing
    /// handler, incremented (wrapping at [`PHASE_STEPS`]) by the phase timer.
    pub tick_counter: u8,
    /// Monotonic ms of the last crossing, for the safety watchdog.
    pub last_zero_cross_ms: u64,
    /// Set on the first crossing; cleared when the watchdog latches a loss.
    pub zero_cross_seen: bool,
}

/// The guarded registry.  One static instance serves the firmware; tests
/// construct their own.
pub struct DeviceStore {
    shared: Mutex<RefCell<Shared>>,
}

/// Registry shared by the ISR glue, the control loop, and the boot path.
pub static STORE: DeviceStore = DeviceStore::new();

impl DeviceStore {
    pub const fn new() -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                devices: [Device::INIT; CHANNEL_COUNT],
                tick_counter: 0,
                last_zero_cross_ms: 0,
                zero_cross_seen: false,
            })),
        }
    }

    /// Run `f` with the whole shared block under the guard.  Crate-internal:
    /// the ISR handlers and safety monitor need multi-field access in one
    /// critical section.
    pub(crate) fn with_shared<R>(&self, f: impl FnOnce(&mut Shared) -> R) -> R {
        critical_section::with(|cs| f(&mut self.shared.borrow_ref_mut(cs)))
    }

    /// Seed the registry from configuration and persisted state.  Runs once
    /// at boot, before the ISRs are attached.
    pub fn seed(
        &self,
        config: &SystemConfig,
        persisted: &[PersistedChannel; CHANNEL_COUNT],
        now_ms: u64,
    ) {
        self.with_shared(|shared| {
            for (i, dev) in shared.devices.iter_mut().enumerate() {
                let cfg = &config.devices[i];
                let (on, brightness) = power::initial_channel_state(
                    cfg.power_on_policy,
                    &persisted[i],
                    cfg.default_brightness,
                );
                *dev = Device {
                    kind: cfg.kind,
                    commanded_on: on,
                    brightness,
                    fire_delay_ticks: calculate_fire_tick(brightness),
                    last_on_ms: now_ms,
                    total_runtime_secs: persisted[i].total_runtime_secs,
                    child_lock: cfg.child_lock,
                    auto_off_enabled: cfg.auto_off_enabled,
                };
            }
        });
    }

    /// Atomic snapshot of one channel.  `None` for an out-of-range id.
    pub fn snapshot(&self, id: usize) -> Option<Device> {
        if id >= CHANNEL_COUNT {
            return None;
        }
        Some(self.with_shared(|shared| shared.devices[id]))
    }

    /// Atomic snapshot of every channel (one critical section).
    pub fn snapshot_all(&self) -> [Device; CHANNEL_COUNT] {
        self.with_shared(|shared| shared.devices)
    }

    /// Immediate state write: commanded state, brightness, and the derived
    /// fire delay change together in one critical section.  Turning off
    /// retains the stored brightness.  Stamps `last_on_ms` on an off→on
    /// transition.  Returns the resulting state, `None` if out of range.
    pub fn apply(&self, id: usize, on: bool, brightness: u8, now_ms: u64) -> Option<Device> {
        if id >= CHANNEL_COUNT {
            return None;
        }
        Some(self.with_shared(|shared| {
            let dev = &mut shared.devices[id];
            if on {
                if !dev.commanded_on {
                    dev.last_on_ms = now_ms;
                }
                dev.brightness = brightness.min(100);
            }
            dev.commanded_on = on;
            dev.fire_delay_ticks = calculate_fire_tick(dev.brightness);
            *dev
        }))
    }

    /// Guarded read-modify-write of one channel.  The fire delay is
    /// recomputed after `f` returns, so no caller can leave `brightness`
    /// paired with a stale `fire_delay_ticks`.
    pub fn update<R>(&self, id: usize, f: impl FnOnce(&mut Device) -> R) -> Option<R> {
        if id >= CHANNEL_COUNT {
            return None;
        }
        Some(self.with_shared(|shared| {
            let dev = &mut shared.devices[id];
            let r = f(dev);
            dev.brightness = dev.brightness.min(100);
            dev.fire_delay_ticks = calculate_fire_tick(dev.brightness);
            r
        }))
    }

    /// Force every channel's commanded state off.  Used by the safety
    /// shutdown *after* the outputs have already been driven low.
    pub fn force_all_off(&self) {
        self.with_shared(|shared| {
            shared.zero_cross_seen = false;
            for dev in &mut shared.devices {
                dev.commanded_on = false;
            }
        });
    }

    /// Add one second of runtime to every channel currently commanded on.
    pub fn tick_runtime(&self) {
        self.with_shared(|shared| {
            for dev in &mut shared.devices {
                if dev.commanded_on {
                    dev.total_runtime_secs = dev.total_runtime_secs.saturating_add(1);
                }
            }
        });
    }

    /// Milliseconds since the last recorded crossing, or `None` if no
    /// crossing has been seen since boot (or since the last latched loss).
    pub fn zero_cross_age_ms(&self, now_ms: u64) -> Option<u64> {
        self.with_shared(|shared| {
            shared
                .zero_cross_seen
                .then(|| now_ms.saturating_sub(shared.last_zero_cross_ms))
        })
    }

    /// Current phase-tick counter (test and diagnostics use).
    pub fn tick_counter(&self) -> u8 {
        self.with_shared(|shared| shared.tick_counter)
    }

    /// Persistable view of every channel.
    pub fn persistable(&self) -> [PersistedChannel; CHANNEL_COUNT] {
        let devices = self.snapshot_all();
        core::array::from_fn(|i| PersistedChannel {
            commanded_on: devices[i].commanded_on,
            brightness: devices[i].brightness,
            total_runtime_secs: devices[i].total_runtime_secs,
        })
    }
}

impl Default for DeviceStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_tick_endpoints() {
        assert_eq!(calculate_fire_tick(100), 0);
        assert_eq!(calculate_fire_tick(0), 100);
        assert_eq!(calculate_fire_tick(50), 50);
        assert_eq!(calculate_fire_tick(255), 0); // saturates above 100
    }

    #[test]
    fn fire_tick_monotonic_non_increasing() {
        for b in 1..=100u8 {
            assert!(calculate_fire_tick(b) <= calculate_fire_tick(b - 1));
        }
    }

    #[test]
    fn apply_then_snapshot_roundtrip() {
        let store = DeviceStore::new();
        for b in [0u8, 1, 50, 99, 100] {
            let dev = store.apply(2, true, b, 10).unwrap();
            assert_eq!((dev.commanded_on, dev.brightness), (true, b));
            assert_eq!(dev.fire_delay_ticks, calculate_fire_tick(b));
            assert_eq!(store.snapshot(2).unwrap(), dev);
        }
    }

    #[test]
    fn turning_off_retains_brightness() {
        let store = DeviceStore::new();
        store.apply(0, true, 40, 10);
        let dev = store.apply(0, false, 0, 20).unwrap();
        assert!(!dev.commanded_on);
        assert_eq!(dev.brightness, 40);
    }

    #[test]
    fn last_on_stamped_only_on_rising_edge() {
        let store = DeviceStore::new();
        let first = store.apply(1, true, 80, 100).unwrap();
        assert_eq!(first.last_on_ms, 100);
        let second = store.apply(1, true, 60, 200).unwrap();
        assert_eq!(second.last_on_ms, 100); // already on — no restamp
        store.apply(1, false, 0, 300);
        let third = store.apply(1, true, 60, 400).unwrap();
        assert_eq!(third.last_on_ms, 400);
    }

    #[test]
    fn out_of_range_id_is_rejected() {
        let store = DeviceStore::new();
        assert!(store.snapshot(CHANNEL_COUNT).is_none());
        assert!(store.apply(CHANNEL_COUNT, true, 50, 0).is_none());
        assert!(store.update(CHANNEL_COUNT, |_| ()).is_none());
    }

    #[test]
    fn update_recomputes_fire_delay() {
        let store = DeviceStore::new();
        store.update(3, |dev| {
            dev.commanded_on = true;
            dev.brightness = 25;
        });
        let dev = store.snapshot(3).unwrap();
        assert_eq!(dev.fire_delay_ticks, 75);
    }

    #[test]
    fn runtime_accrues_only_while_on() {
        let store = DeviceStore::new();
        store.apply(0, true, 100, 0);
        store.tick_runtime();
        store.tick_runtime();
        assert_eq!(store.snapshot(0).unwrap().total_runtime_secs, 2);
        assert_eq!(store.snapshot(1).unwrap().total_runtime_secs, 0);
    }

    #[test]
    fn force_all_off_clears_commanded_state_only() {
        let store = DeviceStore::new();
        store.apply(0, true, 70, 0);
        store.apply(1, true, 30, 0);
        store.force_all_off();
        for dev in store.snapshot_all() {
            assert!(!dev.commanded_on);
        }
        assert_eq!(store.snapshot(0).unwrap().brightness, 70);
    }

    #[test]
    fn seed_applies_power_on_policy() {
        use crate::power::PowerOnPolicy;

        let mut config = SystemConfig::default();
        config.devices[0].power_on_policy = PowerOnPolicy::Last;
        config.devices[1].power_on_policy = PowerOnPolicy::Default;
        config.devices[1].default_brightness = 60;

        let mut persisted = [PersistedChannel::default(); CHANNEL_COUNT];
        persisted[0] = PersistedChannel {
            commanded_on: true,
            brightness: 35,
            total_runtime_secs: 99,
        };

        let store = DeviceStore::new();
        store.seed(&config, &persisted, 1000);

        let d0 = store.snapshot(0).unwrap();
        assert_eq!((d0.commanded_on, d0.brightness), (true, 35));
        assert_eq!(d0.fire_delay_ticks, 65);
        assert_eq!(d0.total_runtime_secs, 99);

        let d1 = store.snapshot(1).unwrap();
        assert_eq!((d1.commanded_on, d1.brightness), (true, 60));

        let d2 = store.snapshot(2).unwrap();
        assert_eq!((d2.commanded_on, d2.brightness), (false, 100));
    }
}
