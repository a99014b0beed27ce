//! Injected hardware and kernel capabilities.

use alloc::sync::Arc;

use bsp_core::time::Timestamp;
use bsp_driver_api::{BoardServices, ClockSource, Gpio, InterruptController, TimerService, Watchdog};

/// The capabilities every board-core component is built from.
///
/// Cloning is cheap; each component keeps its own handle.
#[derive(Clone)]
pub struct Platform {
    /// GPIO bank.
    pub gpio: Arc<dyn Gpio>,
    /// Interrupt controller.
    pub irq: Arc<dyn InterruptController>,
    /// Monotonic clock.
    pub clock: Arc<dyn ClockSource>,
    /// Hardware watchdog.
    pub watchdog: Arc<dyn Watchdog>,
    /// Software one-shot timers.
    pub timers: Arc<dyn TimerService>,
    /// Task spawning, deferred work and reboot.
    pub services: Arc<dyn BoardServices>,
}

impl Platform {
    /// Current time at millisecond granularity.
    pub fn now(&self) -> Timestamp {
        Timestamp::from_nanos(self.clock.read_nanos())
    }
}
