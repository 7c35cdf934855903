//! System configuration parameters.
//!
//! All tunable parameters for the PhaseHub controller.  Values can be
//! overridden via NVS (non-volatile storage); the hardware-facing constants
//! below are fixed at compile time because the ISR math depends on them.

use serde::{Deserialize, Serialize};

use crate::power::PowerOnPolicy;
use crate::store::DeviceKind;

/// Number of AC load channels on the board.  Fixed — the device registry,
/// TRIAC pins, and wall-switch pins are all sized by this.
pub const CHANNEL_COUNT: usize = 4;

/// Phase timer period in microseconds.  100 ticks span one 10 ms half-cycle
/// at 50 Hz mains, so one tick equals one brightness percent of delay.
pub const PHASE_TIMER_INTERVAL_US: u64 = 100;

/// Ticks per AC half-cycle.  The phase-tick counter wraps here and a fire
/// delay of this value means "never fires within the half-cycle".
pub const PHASE_STEPS: u8 = 100;

/// Name for a single channel (stored in NVS, shown by the API layer).
pub type DeviceName = heapless::String<24>;

/// Per-channel configuration, loaded once at boot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Switch or Dimmable — decides whether phase-delay logic applies.
    pub kind: DeviceKind,
    /// Human-readable channel name.
    pub name: DeviceName,
    /// When set, the control façade rejects all state changes.
    pub child_lock: bool,
    /// Enables the safety monitor's auto-off deadline for this channel.
    pub auto_off_enabled: bool,
    /// Brightness applied by the `On` and `Default` power-on policies.
    pub default_brightness: u8,
    /// What the channel does after a power cycle.
    pub power_on_policy: PowerOnPolicy,
}

/// Last observable channel state, persisted for `PowerOnPolicy::Last`
/// restores and runtime statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedChannel {
    pub commanded_on: bool,
    pub brightness: u8,
    pub total_runtime_secs: u32,
}

/// Core system configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    /// Hub name reported to the network layer.
    pub system_name: heapless::String<32>,

    // --- Fades ---
    /// Total duration of a brightness ramp (milliseconds).
    pub fade_duration_ms: u32,
    /// Number of interpolation steps per ramp.
    pub fade_steps: u16,

    // --- Safety ---
    /// Zero-cross watchdog threshold (milliseconds without an edge).
    pub zc_timeout_ms: u32,
    /// Auto-off deadline for channels with `auto_off_enabled` (milliseconds).
    pub auto_off_ms: u32,

    // --- Timing ---
    /// Cooperative control loop cadence (milliseconds).
    pub control_loop_interval_ms: u32,
    /// Wall-switch debounce window (milliseconds).
    pub switch_debounce_ms: u32,
    /// Quiet period after the last state change before persisting (ms).
    pub state_save_debounce_ms: u32,
    /// Diagnostics report interval (seconds).
    pub telemetry_interval_secs: u32,

    // --- Channels ---
    pub devices: [DeviceConfig; CHANNEL_COUNT],
}

impl Default for SystemConfig {
    fn default() -> Self {
        let device = |kind, name: &str| DeviceConfig {
            kind,
            name: DeviceName::try_from(name).unwrap_or_default(),
            child_lock: false,
            auto_off_enabled: false,
            default_brightness: 100,
            power_on_policy: PowerOnPolicy::Off,
        };

        Self {
            system_name: heapless::String::try_from("PhaseHub").unwrap_or_default(),

            fade_duration_ms: 1000,
            fade_steps: 20,

            zc_timeout_ms: 100,
            auto_off_ms: 3_600_000, // 1 hour

            control_loop_interval_ms: 10,
            switch_debounce_ms: 50,
            state_save_debounce_ms: 5000,
            telemetry_interval_secs: 60,

            devices: [
                device(DeviceKind::Switch, "Light 1"),
                device(DeviceKind::Switch, "Light 2"),
                device(DeviceKind::Dimmable, "Dimmer"),
                device(DeviceKind::Dimmable, "Fan"),
            ],
        }
    }
}

impl SystemConfig {
    /// Fade step cadence derived from duration and step count.
    pub fn fade_step_interval_ms(&self) -> u32 {
        self.fade_duration_ms / u32::from(self.fade_steps.max(1))
    }
}
