//! Timer-driven event plumbing for the cooperative loop.
//!
//! Events are produced by esp_timer task-dispatch callbacks (and, on the
//! host, by the simulation loop) and consumed one at a time by the main
//! loop.  The hard-real-time work — zero-cross and phase-tick handling —
//! never goes through this queue; those ISRs write the device store
//! directly.  The queue carries only the soft cadences: fade stepping,
//! safety polling, telemetry.
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────┐     ┌──────────────┐
//! │ fade timer       │────▶│              │     │              │
//! │ safety timer     │────▶│  Event Queue │────▶│  Main Loop   │
//! │ telemetry timer  │────▶│  (lock-free) │     │  (consumer)  │
//! │ software         │────▶│              │     │              │
//! └──────────────────┘     └──────────────┘     └──────────────┘
//! ```

use core::sync::atomic::{AtomicU8, Ordering};

/// Maximum number of pending events.
/// Power of 2 for efficient ring buffer modulo.
const EVENT_QUEUE_CAP: usize = 32;

/// System event types, ordered by rough priority.
/// Lower discriminant = higher priority when multiple events
/// are pending simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Event {
    // ── Safety ────────────────────────────────────────────
    /// Safety monitor poll timer fired.
    SafetyTick = 0,

    // ── Control ───────────────────────────────────────────
    /// Fade step timer fired.
    FadeTick = 10,
    /// Wall switch scan timer fired.
    SwitchScanTick = 11,

    // ── Housekeeping ──────────────────────────────────────
    /// Telemetry report timer fired.
    TelemetryTick = 20,
    /// State persistence check timer fired.
    PersistTick = 21,
}

// ── Lock-free SPSC ring buffer ────────────────────────────────
//
// Timer callbacks write (produce), main loop reads (consume).
// Uses atomic head/tail indices.  The buffer is intentionally
// kept in a static so timer callbacks can access it.

static EVENT_HEAD: AtomicU8 = AtomicU8::new(0);
static EVENT_TAIL: AtomicU8 = AtomicU8::new(0);
// SAFETY: EVENT_BUFFER cells are written only by the single producer
// (push_event, timer-dispatch context) before the head store and read only
// by the single consumer (pop_event, main loop) before the tail store.
// The Acquire/Release pairs on head/tail order the accesses.
static mut EVENT_BUFFER: [u8; EVENT_QUEUE_CAP] = [0; EVENT_QUEUE_CAP];

/// Push an event into the queue.
/// Lock-free; safe from timer-dispatch context.
/// Returns `false` if the queue is full (event dropped).
pub fn push_event(event: Event) -> bool {
    let head = EVENT_HEAD.load(Ordering::Relaxed);
    let tail = EVENT_TAIL.load(Ordering::Acquire);
    let next_head = (head + 1) % EVENT_QUEUE_CAP as u8;

    if next_head == tail {
        return false; // Queue full — drop event.
    }

    // SAFETY: single producer; the slot at `head` is not visible to the
    // consumer until the Release store below.
    unsafe {
        EVENT_BUFFER[head as usize] = event as u8;
    }

    EVENT_HEAD.store(next_head, Ordering::Release);
    true
}

/// Pop the next event from the queue.
/// Called from the main loop (single consumer).
/// Returns `None` if the queue is empty.
pub fn pop_event() -> Option<Event> {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);

    if tail == head {
        return None; // Empty.
    }

    let raw = unsafe { EVENT_BUFFER[tail as usize] };
    EVENT_TAIL.store((tail + 1) % EVENT_QUEUE_CAP as u8, Ordering::Release);

    event_from_u8(raw)
}

/// Drain all pending events into a callback, FIFO order.
pub fn drain_events(mut handler: impl FnMut(Event)) {
    while let Some(event) = pop_event() {
        handler(event);
    }
}

/// Check if the event queue is empty.
pub fn queue_is_empty() -> bool {
    let tail = EVENT_TAIL.load(Ordering::Relaxed);
    let head = EVENT_HEAD.load(Ordering::Acquire);
    tail == head
}

/// Number of pending events.
pub fn queue_len() -> usize {
    let head = EVENT_HEAD.load(Ordering::Relaxed) as usize;
    let tail = EVENT_TAIL.load(Ordering::Relaxed) as usize;
    (head + EVENT_QUEUE_CAP - tail) % EVENT_QUEUE_CAP
}

// ── Internal ──────────────────────────────────────────────────

fn event_from_u8(raw: u8) -> Option<Event> {
    match raw {
        0 => Some(Event::SafetyTick),
        10 => Some(Event::FadeTick),
        11 => Some(Event::SwitchScanTick),
        20 => Some(Event::TelemetryTick),
        21 => Some(Event::PersistTick),
        _ => None,
    }
}
