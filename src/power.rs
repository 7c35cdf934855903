//! Power-on behavior.
//!
//! Applied exactly once, when the boot path seeds the device registry from
//! persisted configuration.  Kept as a pure function so it stays isolated
//! from the live control path and is trivially table-testable.

use serde::{Deserialize, Serialize};

use crate::config::PersistedChannel;

/// What a channel does after a power cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerOnPolicy {
    /// Always start off.  Brightness is parked at 100 so the first manual
    /// turn-on comes up at full power.
    Off,
    /// Always start on, at the configured default brightness.
    On,
    /// Restore the last persisted state.
    Last,
    /// Start on at the configured default brightness.
    Default,
}

/// Resolve the initial `(commanded_on, brightness)` pair for one channel.
///
/// `stored` is only consulted for [`PowerOnPolicy::Last`].
pub fn initial_channel_state(
    policy: PowerOnPolicy,
    stored: &PersistedChannel,
    default_brightness: u8,
) -> (bool, u8) {
    match policy {
        PowerOnPolicy::Off => (false, 100),
        PowerOnPolicy::On | PowerOnPolicy::Default => (true, default_brightness.min(100)),
        PowerOnPolicy::Last => (stored.commanded_on, stored.brightness.min(100)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(on: bool, brightness: u8) -> PersistedChannel {
        PersistedChannel {
            commanded_on: on,
            brightness,
            total_runtime_secs: 0,
        }
    }

    #[test]
    fn off_policy_parks_brightness_at_full() {
        assert_eq!(
            initial_channel_state(PowerOnPolicy::Off, &stored(true, 40), 60),
            (false, 100)
        );
    }

    #[test]
    fn on_and_default_use_default_brightness() {
        assert_eq!(
            initial_channel_state(PowerOnPolicy::On, &stored(false, 10), 75),
            (true, 75)
        );
        assert_eq!(
            initial_channel_state(PowerOnPolicy::Default, &stored(false, 10), 30),
            (true, 30)
        );
    }

    #[test]
    fn last_policy_restores_stored_state() {
        assert_eq!(
            initial_channel_state(PowerOnPolicy::Last, &stored(true, 55), 100),
            (true, 55)
        );
        assert_eq!(
            initial_channel_state(PowerOnPolicy::Last, &stored(false, 80), 100),
            (false, 80)
        );
    }

    #[test]
    fn out_of_range_inputs_are_clamped() {
        assert_eq!(
            initial_channel_state(PowerOnPolicy::Last, &stored(true, 250), 100),
            (true, 100)
        );
        assert_eq!(
            initial_channel_state(PowerOnPolicy::On, &stored(false, 0), 200),
            (true, 100)
        );
    }
}
