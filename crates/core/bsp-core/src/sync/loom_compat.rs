//! Model-checker compatibility shim.
//!
//! Under `cfg(loom)` or `cfg(shuttle)` the lock words are the checker's
//! atomics and spinning yields to its scheduler, so locks built on these
//! can be explored by the checker without code changes. Otherwise these
//! are the `core` atomics and `spin_loop`.

// ---------------------------------------------------------------------------
// Loom mode
// ---------------------------------------------------------------------------

#[cfg(loom)]
pub(crate) use loom::sync::atomic::{AtomicBool, Ordering};

#[cfg(loom)]
#[inline]
pub(crate) fn spin_hint() {
    loom::thread::yield_now();
}

// ---------------------------------------------------------------------------
// Shuttle mode
// ---------------------------------------------------------------------------

#[cfg(all(shuttle, not(loom)))]
pub(crate) use shuttle::sync::atomic::{AtomicBool, Ordering};

#[cfg(all(shuttle, not(loom)))]
#[inline]
pub(crate) fn spin_hint() {
    shuttle::thread::yield_now();
}

// ---------------------------------------------------------------------------
// Normal mode
// ---------------------------------------------------------------------------

#[cfg(not(any(loom, shuttle)))]
pub(crate) use core::sync::atomic::{AtomicBool, Ordering};

#[cfg(not(any(loom, shuttle)))]
#[inline]
pub(crate) fn spin_hint() {
    core::hint::spin_loop();
}
