//! Hardware abstraction traits for GPIOs, interrupt controllers, clocks,
//! timers and the watchdog.
//!
//! Implementations live in the platform layer; the board core accesses
//! hardware only through these interfaces.

use alloc::boxed::Box;
use alloc::sync::Arc;

use bsp_core::id::{ExtIrqLine, GpioPin, IrqNumber};

use crate::DriverError;

/// GPIO pin direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Pin is sampled.
    Input,
    /// Pin is driven.
    Output,
}

/// Raw GPIO access.
///
/// Levels are electrical (`true` = high). Polarity is applied by the
/// caller. Repeated reads must be side-effect free.
pub trait Gpio: Send + Sync {
    /// Reads the electrical level of `pin`.
    fn read_level(&self, pin: GpioPin) -> bool;
    /// Configures the direction of `pin`.
    fn set_direction(&self, pin: GpioPin, dir: Direction);
    /// Drives `pin` high or low.
    fn set_level(&self, pin: GpioPin, high: bool);
}

/// Result of running an interrupt handler on a (possibly shared) line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrqReturn {
    /// The interrupt was not raised by this handler's device.
    None,
    /// The interrupt was attributed to and serviced by this handler.
    Handled,
}

impl IrqReturn {
    /// Returns `true` for [`IrqReturn::Handled`].
    pub const fn is_handled(self) -> bool {
        matches!(self, Self::Handled)
    }
}

/// Handler invoked by the platform when a mapped IRQ fires.
pub type IrqHandler = Arc<dyn Fn(IrqNumber) -> IrqReturn + Send + Sync>;

/// An interrupt controller that can map handlers and mask lines.
///
/// More than one handler may be mapped on the same [`IrqNumber`] (a shared
/// line); the controller then invokes every handler on each assertion.
/// `enable` and `disable` must tolerate redundant calls.
pub trait InterruptController: Send + Sync {
    /// Resolves an external-interrupt line to a controller IRQ number.
    fn map_external(&self, line: ExtIrqLine) -> Result<IrqNumber, DriverError>;
    /// Attaches `handler` to `irq`.
    fn map(&self, irq: IrqNumber, handler: IrqHandler) -> Result<(), DriverError>;
    /// Detaches every handler from `irq`.
    fn unmap(&self, irq: IrqNumber);
    /// Unmasks `irq`.
    fn enable(&self, irq: IrqNumber);
    /// Masks `irq`.
    fn disable(&self, irq: IrqNumber);
    /// Returns `true` if `irq` is currently asserted at the controller.
    fn is_pending(&self, irq: IrqNumber) -> bool;
}

/// A monotonic clock source that provides a nanosecond timestamp.
pub trait ClockSource: Send + Sync {
    /// Returns the current time in nanoseconds since an arbitrary epoch.
    fn read_nanos(&self) -> u64;
}

/// A hardware watchdog timer that resets the system on expiry.
pub trait Watchdog: Send + Sync {
    /// Arms the watchdog with a timeout in microseconds. Countdown begins immediately.
    fn arm(&self, timeout_us: u32);
    /// Pets (reloads) the watchdog, restarting the countdown.
    fn pet(&self);
    /// Disarms the watchdog, stopping the countdown.
    fn disarm(&self);
}

/// Callback run in timer (softirq) context when a [`OneShotTimer`] expires.
pub type TimerCallback = Arc<dyn Fn() + Send + Sync>;

/// A one-shot software timer.
pub trait OneShotTimer: Send + Sync {
    /// Arms or re-arms the timer to fire `delay_ms` from now.
    ///
    /// Returns `true` if the timer was already pending.
    fn arm(&self, delay_ms: u64) -> bool;
    /// Cancels the timer. Returns `true` if it was pending.
    fn cancel(&self) -> bool;
}

/// Factory for [`OneShotTimer`]s.
pub trait TimerService: Send + Sync {
    /// Creates a disarmed timer that runs `callback` on every expiry.
    fn create_timer(&self, callback: TimerCallback) -> Box<dyn OneShotTimer>;
}
