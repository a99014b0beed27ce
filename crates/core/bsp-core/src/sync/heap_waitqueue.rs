//! Heap-backed wait queue with unbounded capacity.

use alloc::collections::VecDeque;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll, Waker};

use super::IrqSpinLock;

/// Heap-backed wait queue with unbounded capacity.
///
/// Unlike [`super::WaitQueue`] this can hold any number of waiters. Used
/// by the userspace control surface, where any number of open handles may
/// be waiting for a button event at once.
pub struct HeapWaitQueue {
    waiters: IrqSpinLock<VecDeque<Waker>>,
}

impl HeapWaitQueue {
    /// Creates an empty heap-backed wait queue.
    pub fn new() -> Self {
        Self {
            waiters: IrqSpinLock::named("heap-waitqueue", VecDeque::new()),
        }
    }

    /// Returns a future that completes when this queue is woken.
    pub fn wait(&self) -> HeapWaitFuture<'_> {
        HeapWaitFuture {
            queue: self,
            registered: false,
        }
    }

    /// Registers a waker without creating a future.
    pub fn register_waker(&self, waker: &Waker) {
        self.waiters.lock().push_back(waker.clone());
    }

    /// Wakes one waiting task (FIFO order).
    pub fn wake_one(&self) {
        let waker = self.waiters.lock().pop_front();
        if let Some(w) = waker {
            w.wake();
        }
    }

    /// Wakes all waiting tasks.
    pub fn wake_all(&self) {
        let drained = core::mem::take(&mut *self.waiters.lock());
        for w in drained {
            w.wake();
        }
    }
}

impl Default for HeapWaitQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`HeapWaitQueue::wait`].
pub struct HeapWaitFuture<'a> {
    queue: &'a HeapWaitQueue,
    registered: bool,
}

impl Future for HeapWaitFuture<'_> {
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
