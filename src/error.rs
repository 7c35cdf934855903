//! Unified error types for the PhaseHub firmware.
//!
//! Follows embedded best practice: a single `Error` enum that every subsystem
//! can convert into, keeping the top-level control loop's error handling
//! uniform.  All variants are `Copy` so they can be cheaply passed around
//! without allocation.  None of these types ever crosses into interrupt
//! context — the ISRs communicate exclusively through shared state.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A control request was rejected before any mutation.
    Control(ControlError),
    /// A latched safety fault is active.
    Fault(FaultFlag),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Control(e) => write!(f, "control: {e}"),
            Self::Fault(e) => write!(f, "fault: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Control façade errors
// ---------------------------------------------------------------------------

/// Caller and policy rejections from the control façade.  Every variant is
/// reported *before* any device field is mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Channel index outside `0..CHANNEL_COUNT`.
    InvalidDeviceId,
    /// Brightness outside the 0–100 range.
    InvalidArgument,
    /// The device's child lock is engaged.
    Locked,
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDeviceId => write!(f, "invalid device id"),
            Self::InvalidArgument => write!(f, "brightness out of range"),
            Self::Locked => write!(f, "device is child-locked"),
        }
    }
}

impl From<ControlError> for Error {
    fn from(e: ControlError) -> Self {
        Self::Control(e)
    }
}

// ---------------------------------------------------------------------------
// Safety faults
// ---------------------------------------------------------------------------

/// Latched safety faults.  A fault forces every channel output low at the
/// hardware level and stays raised until explicitly re-armed.  Faults are
/// kept as a bitmask so future conditions (over-temperature, brownout) can
/// be tracked alongside without restructuring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FaultFlag {
    /// No AC zero-crossing edge seen for longer than the watchdog threshold.
    /// Phase timing for every dimmable channel depends on this reference,
    /// so the shutdown is always global.
    ZeroCrossSignalLost = 0b0000_0001,
}

impl FaultFlag {
    /// Return the bitmask for this fault.
    pub const fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for FaultFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroCrossSignalLost => write!(f, "zero-cross signal lost"),
        }
    }
}

impl From<FaultFlag> for Error {
    fn from(e: FaultFlag) -> Self {
        Self::Fault(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
