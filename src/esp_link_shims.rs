//! ESP-IDF runtime symbol providers for third-party crates.
//!
//! The `critical-section` 1.x crate expects the embedding to provide the
//! acquire/release pair.  Here the pair wraps a FreeRTOS spinlock via
//! `vPortEnterCritical`, which masks interrupts on the current core —
//! exactly the guarantee the device store needs, since its guard is taken
//! from both the GPIO/phase ISRs and the main task.
//!
//! On the host the `critical-section/std` implementation is linked
//! instead and this module compiles to nothing.

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{portMUX_TYPE, vPortEnterCritical, vPortExitCritical};

// portMUX_INITIALIZER_UNLOCKED expanded: free owner, zero nesting count.
#[cfg(target_os = "espidf")]
const PORT_MUX_FREE: u32 = 0xB33F_FFFF;

#[cfg(target_os = "espidf")]
static mut STORE_MUX: portMUX_TYPE = portMUX_TYPE {
    owner: PORT_MUX_FREE,
    count: 0,
};

/// Runtime-backed critical-section acquire used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_acquire() -> u8 {
    // SAFETY: vPortEnterCritical nests and is callable from task and ISR
    // context on the ESP-IDF port; STORE_MUX is only accessed through it.
    unsafe { vPortEnterCritical(&raw mut STORE_MUX) };
    0
}

/// Runtime-backed critical-section release used by `critical-section` 1.x.
#[cfg(target_os = "espidf")]
#[unsafe(no_mangle)]
pub extern "C" fn _critical_section_1_0_release(_token: u8) {
    // SAFETY: paired with the acquire above; the spinlock tracks nesting.
    unsafe { vPortExitCritical(&raw mut STORE_MUX) };
}
