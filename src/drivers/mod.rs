//! Hardware drivers — peripheral init, timers, wall switches, watchdog.

pub mod hw_init;
pub mod hw_timer;
pub mod wall_switch;
pub mod watchdog;
