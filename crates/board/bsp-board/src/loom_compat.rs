//! Atomics for the board core's one-shot flags and gate holds.
//!
//! Under `cfg(loom)` or `cfg(shuttle)` these are the checker's atomics, so
//! the fire-once paths (restart scheduling, restore, dying gasp) and the
//! shared-line holds run under its scheduler unchanged.

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, Ordering};

#[cfg(all(shuttle, not(loom)))]
pub(crate) use shuttle::sync::atomic::{AtomicBool, Ordering};

#[cfg(not(any(loom, shuttle)))]
pub(crate) use core::sync::atomic::{AtomicBool, Ordering};
