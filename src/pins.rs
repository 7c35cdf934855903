//! GPIO pin assignments for the PhaseHub 4-channel controller board.
//!
//! Single source of truth — every driver references this module rather than
//! hard-coding pin numbers.  Change a pin here and it propagates everywhere.

use crate::config::CHANNEL_COUNT;

// ---------------------------------------------------------------------------
// Zero-cross detection
// ---------------------------------------------------------------------------

/// Optocoupler zero-cross detect output.  Rising edge at each AC crossing.
pub const ZCD_GPIO: i32 = 13;

// ---------------------------------------------------------------------------
// TRIAC gate drivers (one per channel)
// ---------------------------------------------------------------------------

/// Digital outputs into the MOC3021 gate drivers.  HIGH = gate asserted.
pub const TRIAC_GPIOS: [i32; CHANNEL_COUNT] = [16, 17, 18, 19];

// ---------------------------------------------------------------------------
// Physical wall switches (active-low, external pull-up)
// ---------------------------------------------------------------------------

/// Two-position wall-switch inputs, one per channel.  Either debounced
/// level change toggles the channel.
pub const SWITCH_GPIOS: [i32; CHANNEL_COUNT] = [32, 33, 25, 26];
