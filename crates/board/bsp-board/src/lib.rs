//! Failure-handling and event-dispatch core for Broadcom xDSL/PON
//! home-gateway boards.
//!
//! The board core owns the state machines that sit between raw board
//! interrupts and the rest of the kernel:
//!
//! - [`ext_irq`]: which logical sources share each external interrupt
//!   line, and whether a line was mapped with incompatible trigger types.
//! - [`button`]: per-button press/hold/release machines fed from interrupt
//!   handlers and a poll timer, with hooks run on a dedicated worker task.
//! - [`dying_gasp`]: the one-shot power-loss handler.
//! - [`watchdog`]: the hardware watchdog service loop and its software
//!   escalation layer.
//! - [`moca`]: demultiplexing of a shared line among MoCA chips.
//! - [`gate`]: per-source holds on shared controller IRQs.
//! - [`reset`], [`ses`] and [`control`]: the restore-default line, the
//!   SES button and event window, and the userspace control surface.
//!
//! Hardware and kernel services come in through [`platform::Platform`];
//! [`board::Board::init`] wires everything from a
//! [`desc::BoardDescription`].

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]

extern crate alloc;

pub mod board;
pub mod button;
pub mod config;
pub mod control;
pub mod desc;
pub mod dying_gasp;
pub mod ext_irq;
pub mod gate;
pub mod moca;
pub mod pin;
pub mod platform;
pub mod reset;
pub mod ses;
pub mod watchdog;

mod loom_compat;
mod name;

pub use board::Board;
pub use platform::Platform;
