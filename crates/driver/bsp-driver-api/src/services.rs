//! Task-context services provided by the embedding kernel.

use alloc::boxed::Box;
use core::future::Future;
use core::pin::Pin;

use crate::DriverError;

/// A spawned worker task.
pub type BoxTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A unit of deferred work.
pub type Work = Box<dyn FnOnce() + Send + 'static>;

/// Kernel services the board core calls outside interrupt context.
pub trait BoardServices: Send + Sync {
    /// Spawns a long-lived worker task under `name`.
    fn spawn(&self, name: &str, task: BoxTask);

    /// Queues `work` to run once, asynchronously, in a low-priority
    /// context outside interrupt context. Must never drop work.
    fn schedule_work(&self, work: Work);

    /// Restarts the machine. Does not return on real hardware.
    fn restart(&self);

    /// Erases persistent configuration back to factory defaults.
    fn restore_defaults(&self) -> Result<(), DriverError>;
}
