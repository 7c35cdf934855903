//! Driven adapters — implementations of the port traits in
//! [`crate::app::ports`] against real peripherals (or their host-side
//! simulations).

pub mod gpio;
pub mod log_sink;
pub mod nvs;
pub mod time;
