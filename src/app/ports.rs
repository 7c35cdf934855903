//! Port traits — the boundary between control logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ control core
//! ```
//!
//! Driven adapters (GPIO bank, NVS, change sinks) implement these traits.
//! The ISR handlers, control façade, and safety monitor consume them, so
//! none of the core logic touches hardware directly and all of it runs in
//! host tests against mocks.

use crate::config::{PersistedChannel, SystemConfig, CHANNEL_COUNT};

// ───────────────────────────────────────────────────────────────
// Output bank (ISR + safety → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port for the per-channel TRIAC gate outputs.
///
/// # Interrupt contract
///
/// Implementations are called from interrupt context inside the device
/// store's critical section: they must be bounded-time register writes.
/// No allocation, no logging, no blocking.
pub trait OutputBank {
    /// Drive one channel's gate output.
    fn set_channel(&mut self, channel: usize, high: bool);

    /// Drive every channel low.  The safety shutdown calls this *before*
    /// any software state is touched.
    fn all_low(&mut self) {
        for ch in 0..CHANNEL_COUNT {
            self.set_channel(ch, false);
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Change notification (control façade → network layer)
// ───────────────────────────────────────────────────────────────

/// Payload handed to the registered change sink after each successful
/// mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceChange {
    pub id: u8,
    pub commanded_on: bool,
    pub brightness: u8,
}

/// Consumer of device-state changes (WebSocket broadcaster, logger).
///
/// Invoked synchronously after the mutation, outside the store guard, from
/// the cooperative loop — implementations must return quickly.
pub trait ChangeSink {
    fn device_changed(&mut self, change: &DeviceChange);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (boot path ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration and last channel state.
///
/// Implementations MUST validate configuration before persisting; invalid
/// ranges are rejected with [`ConfigError::ValidationFailed`], not silently
/// clamped.
pub trait ConfigPort {
    /// Load configuration.  Returns [`SystemConfig::default()`] if no
    /// stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;

    /// Load the last persisted per-channel state (power-on restore).
    /// Returns all-default channels if nothing is stored.
    fn load_state(&self) -> Result<[PersistedChannel; CHANNEL_COUNT], ConfigError>;

    /// Persist the current per-channel state and runtime counters.
    fn save_state(&self, state: &[PersistedChannel; CHANNEL_COUNT]) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (raw key-value NVS access)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage.  Keys are namespaced to prevent collisions
/// between subsystems; writes are atomic (ESP-IDF NVS commits natively, the
/// in-memory simulation trivially).
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed integrity / deserialization check.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Underlying storage is full.
    StorageFull,
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}
