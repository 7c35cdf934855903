//! Debounced wall-switch scanner.
//!
//! Each channel has a conventional two-position wall switch on a dedicated
//! GPIO.  The inputs are polled at control-tick rate; a level change that
//! stays stable for the debounce window counts as one flip, and a flip
//! toggles the channel regardless of which position the switch ends up in.
//! The first scan only seeds the baseline levels so a switch left in the
//! "on" position does not fire a phantom toggle at boot.

use crate::config::CHANNEL_COUNT;
use crate::pins;

#[derive(Debug, Clone, Copy)]
struct ChannelScan {
    /// Last raw sample.
    raw: bool,
    /// Last debounced (accepted) level.
    stable: bool,
    /// When the raw level last changed.
    changed_at_ms: u64,
}

impl ChannelScan {
    const INIT: Self = Self {
        raw: false,
        stable: false,
        changed_at_ms: 0,
    };
}

/// Channels flipped during one scan.
pub type Flipped = heapless::Vec<usize, CHANNEL_COUNT>;

pub struct WallSwitches {
    channels: [ChannelScan; CHANNEL_COUNT],
    debounce_ms: u32,
    seeded: bool,
}

impl WallSwitches {
    pub fn new(debounce_ms: u32) -> Self {
        Self {
            channels: [ChannelScan::INIT; CHANNEL_COUNT],
            debounce_ms,
            seeded: false,
        }
    }

    /// Sample every switch input and return the channels whose level
    /// change survived the debounce window.  `read` maps a channel index
    /// to its current GPIO level.
    pub fn scan(&mut self, now_ms: u64, read: impl Fn(usize) -> bool) -> Flipped {
        let mut flipped = Flipped::new();

        if !self.seeded {
            for (ch, scan) in self.channels.iter_mut().enumerate() {
                let level = read(ch);
                scan.raw = level;
                scan.stable = level;
                scan.changed_at_ms = now_ms;
            }
            self.seeded = true;
            return flipped;
        }

        for (ch, scan) in self.channels.iter_mut().enumerate() {
            let level = read(ch);
            if level != scan.raw {
                scan.raw = level;
                scan.changed_at_ms = now_ms;
                continue;
            }
            if level != scan.stable
                && now_ms.saturating_sub(scan.changed_at_ms) >= u64::from(self.debounce_ms)
            {
                scan.stable = level;
                // Capacity equals channel count, so this cannot fail.
                let _ = flipped.push(ch);
            }
        }

        flipped
    }

    /// Scan against the real GPIO levels.
    pub fn scan_hw(&mut self, now_ms: u64) -> Flipped {
        self.scan(now_ms, |ch| {
            super::hw_init::gpio_read(pins::SWITCH_GPIOS[ch])
        })
    }
}
