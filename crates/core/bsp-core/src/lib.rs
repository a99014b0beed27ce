//! Core types and synchronization primitives for the board support core.
//!
//! This crate holds the host-testable pieces shared by the driver API and
//! the board core: typed identifiers for interrupt lines, GPIO pins and
//! logical devices, a millisecond [`time::Timestamp`], and the lock and
//! wait-queue primitives used to hand events from interrupt context to
//! worker tasks.
//!
//! Nothing here touches hardware directly. Interrupt masking in
//! [`sync::IrqSpinLock`] compiles to inline assembly on bare-metal ARM and
//! to a no-op on hosted targets, so everything can be exercised with
//! `cargo test`.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod id;
pub mod sync;
pub mod time;
