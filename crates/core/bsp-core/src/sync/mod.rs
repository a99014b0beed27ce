//! Synchronization primitives shared by interrupt handlers and worker tasks.
//!
//! [`SpinLock`] protects state touched only from task context.
//! [`IrqSpinLock`] protects state also touched by interrupt handlers.
//! [`WaitQueue`] and [`HeapWaitQueue`] park async tasks until an interrupt
//! handler or another task wakes them, and [`Channel`] combines a queue of
//! immutable event records with a wait queue so an interrupt handler can
//! publish to a single consuming worker task.

mod channel;
mod heap_waitqueue;
mod irq_spinlock;
pub(crate) mod loom_compat;
mod spinlock;
pub mod waitqueue;

#[cfg(test)]
pub(crate) mod test_waker;

pub use channel::{Channel, RecvFuture};
pub use heap_waitqueue::{HeapWaitFuture, HeapWaitQueue};
pub use irq_spinlock::{IrqSpinLock, IrqSpinLockGuard};
pub use spinlock::{SpinLock, SpinLockGuard};
pub use waitqueue::WaitQueue;
