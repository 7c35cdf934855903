//! Mock hardware for integration tests.
//!
//! Records every gate-level write so tests can assert on the full output
//! history without touching real GPIO registers.

use phasehub::app::ports::{ChangeSink, DeviceChange, OutputBank};
use phasehub::config::CHANNEL_COUNT;

// ── Output bank call record ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateCall {
    Set { channel: usize, high: bool },
    AllLow,
}

// ── MockOutputBank ────────────────────────────────────────────

#[derive(Default)]
pub struct MockOutputBank {
    pub levels: [bool; CHANNEL_COUNT],
    pub history: Vec<GateCall>,
}

#[allow(dead_code)]
impl MockOutputBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn any_high(&self) -> bool {
        self.levels.iter().any(|&l| l)
    }
}

impl OutputBank for MockOutputBank {
    fn set_channel(&mut self, channel: usize, high: bool) {
        self.levels[channel] = high;
        self.history.push(GateCall::Set { channel, high });
    }

    fn all_low(&mut self) {
        self.levels = [false; CHANNEL_COUNT];
        self.history.push(GateCall::AllLow);
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub changes: Vec<DeviceChange>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeSink for RecordingSink {
    fn device_changed(&mut self, change: &DeviceChange) {
        self.changes.push(*change);
    }
}

// ── Shared sink handle ────────────────────────────────────────
//
// The control façade owns its sink box, so tests that need to inspect the
// notifications afterwards register a clone-able handle instead.

use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct SharedSink(pub Arc<Mutex<Vec<DeviceChange>>>);

#[allow(dead_code)]
impl SharedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<DeviceChange> {
        self.0.lock().unwrap().clone()
    }
}

impl ChangeSink for SharedSink {
    fn device_changed(&mut self, change: &DeviceChange) {
        self.0.lock().unwrap().push(*change);
    }
}
