//! Hardware and service capabilities consumed by the board core.
//!
//! The board core never touches registers. Everything it needs from the
//! platform (reading a GPIO level, mapping and masking an interrupt, a
//! monotonic clock, the hardware watchdog, one-shot timers, a deferred
//! work context and the reboot path) is expressed as a trait here and
//! injected at bring-up.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod error;
pub mod hw;
pub mod services;

pub use error::DriverError;
pub use hw::{
    ClockSource, Direction, Gpio, InterruptController, IrqHandler, IrqReturn, OneShotTimer,
    TimerCallback, TimerService, Watchdog,
};
pub use services::{BoardServices, BoxTask, Work};
