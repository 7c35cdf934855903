//! Log-based change sink adapter.
//!
//! Implements [`ChangeSink`] by writing every device-state change to the
//! ESP-IDF logger (which goes to UART / USB-CDC in production).  A future
//! WebSocket or MQTT adapter would implement the same trait.

use log::info;

use crate::app::ports::{ChangeSink, DeviceChange};

/// Adapter that logs every [`DeviceChange`] to the serial console.
pub struct LogChangeSink;

impl LogChangeSink {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LogChangeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeSink for LogChangeSink {
    fn device_changed(&mut self, change: &DeviceChange) {
        info!(
            "CHANGE | ch{} -> {} @ {}%",
            change.id,
            if change.commanded_on { "ON" } else { "off" },
            change.brightness,
        );
    }
}
