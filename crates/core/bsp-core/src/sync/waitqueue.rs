//! Fixed-capacity wait queue for interrupt-driven wakeups.
//!
//! [`WaitQueue`] stores [`Waker`]s from async tasks that are waiting for
//! an event. Interrupt handlers call [`WaitQueue::wake_one`] or
//! [`WaitQueue::wake_all`] to resume those tasks. Storage is an
//! [`ArrayVec`], so waking from interrupt context never touches the heap.

use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use planck_noalloc::vec::ArrayVec;

use crate::sync::IrqSpinLock;

/// Maximum number of waiters per queue.
pub const MAX_WAITERS: usize = 8;

/// A queue of [`Waker`]s waiting for an event.
pub struct WaitQueue {
    waiters: IrqSpinLock<ArrayVec<Waker, MAX_WAITERS>>,
}

impl WaitQueue {
    /// Creates an empty wait queue.
    pub fn new() -> Self {
        Self {
            waiters: IrqSpinLock::named("waitqueue", ArrayVec::new()),
        }
    }

    /// Returns a future that completes the first time it is polled after a wake.
    pub fn wait(&self) -> WaitFuture<'_> {
        WaitFuture {
            queue: self,
            registered: false,
        }
    }

    /// Registers a waker without creating a future.
    ///
    /// Returns `false` if the queue is full and the waker was dropped.
    pub fn register_waker(&self, waker: &Waker) -> bool {
        let mut waiters = self.waiters.lock();
        if waiters.len() < MAX_WAITERS {
            waiters.push(waker.clone());
            true
        } else {
            false
        }
    }

    /// Wakes the oldest waiting task.
    pub fn wake_one(&self) {
        let mut waiters = self.waiters.lock();
        if !waiters.is_empty() {
            let waker = waiters.swap_remove(0);
            drop(waiters);
            waker.wake();
        }
    }

    /// Wakes all waiting tasks.
    pub fn wake_all(&self) {
        let mut waiters = self.waiters.lock();
        let mut drained = ArrayVec::<Waker, MAX_WAITERS>::new();
        while let Some(w) = waiters.pop() {
            drained.push(w);
        }
        drop(waiters);
        while let Some(w) = drained.pop() {
            w.wake();
        }
    }

    /// Returns the number of registered waiters.
    pub fn len(&self) -> usize {
        self.waiters.lock().len()
    }

    /// Returns `true` if nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.waiters.lock().is_empty()
    }
}

impl Default for WaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`WaitQueue::wait`].
pub struct WaitFuture<'a> {
    queue: &'a WaitQueue,
    registered: bool,
}

impl Future for WaitFuture<'_> {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.registered {
            Poll::Ready(())
        } else {
            self.registered = true;
            self.queue.register_waker(cx.waker());
            Poll::Pending
        }
    }
}
