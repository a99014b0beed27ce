//! Interrupt-to-task event channel.
//!
//! A [`Channel`] carries immutable event records from a non-blocking
//! producer (an interrupt handler or timer callback) to one consuming
//! async task. `send` never blocks and only takes an [`IrqSpinLock`], so it
//! is safe from interrupt context; `recv` parks the consumer on a
//! [`WaitQueue`] until the next record arrives.

use alloc::collections::VecDeque;
use core::future::Future;
use core::pin::Pin;
use core::task::{Context, Poll};

use super::{IrqSpinLock, WaitQueue};

/// Unbounded FIFO channel with a single async consumer.
pub struct Channel<T> {
    queue: IrqSpinLock<VecDeque<T>>,
    waiters: WaitQueue,
}

impl<T> Channel<T> {
    /// Creates an empty channel.
    pub fn new() -> Self {
        Self {
            queue: IrqSpinLock::named("channel", VecDeque::new()),
            waiters: WaitQueue::new(),
        }
    }

    /// Creates an empty channel with room for `capacity` records before
    /// the queue has to grow.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            queue: IrqSpinLock::named("channel", VecDeque::with_capacity(capacity)),
            waiters: WaitQueue::new(),
        }
    }

    /// Publishes a record and wakes the consumer.
    pub fn send(&self, value: T) {
        self.queue.lock().push_back(value);
        self.waiters.wake_one();
    }

    /// Takes the oldest record, if any.
    pub fn try_recv(&self) -> Option<T> {
        self.queue.lock().pop_front()
    }

    /// Returns a future resolving to the next record.
    pub fn recv(&self) -> RecvFuture<'_, T> {
        RecvFuture { channel: self }
    }

    /// Number of records not yet received.
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Returns `true` if no record is pending.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Future returned by [`Channel::recv`].
pub struct RecvFuture<'a, T> {
    channel: &'a Channel<T>,
}

impl<T> Future for RecvFuture<'_, T> {
    type Output = T;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<T> {
        if let Some(v) = self.channel.try_recv() {
            return Poll::Ready(v);
        }
        self.channel.waiters.register_waker(cx.waker());
        // A send between the first check and registration would be missed.
        match self.channel.try_recv() {
            Some(v) => Poll::Ready(v),
            None => Poll::Pending,
        }
    }
}
