//! Application-boundary traits.
//!
//! The control core consumes hardware and storage through the port traits
//! in [`ports`]; adapters implement them.  The network/API layer consumes
//! the control façade and the change-notification sink.

pub mod ports;
