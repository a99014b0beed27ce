//! SES (wireless setup) button events for userspace.
//!
//! Events come from the board's dedicated SES button ([`SesLine`]) or from
//! any button hook with [`crate::button::ButtonAction::Ses`]. Userspace
//! polls for an event and consumes it with a read. An event left unread
//! for [`SES_EVENT_WINDOW_MS`] expires.

use alloc::boxed::Box;
use alloc::sync::{Arc, Weak};

use bsp_core::id::IrqNumber;
use bsp_core::sync::{HeapWaitFuture, HeapWaitQueue, IrqSpinLock};
use bsp_core::time::Timestamp;
use bsp_driver_api::{DriverError, IrqReturn, OneShotTimer};
use log::{debug, info, warn};

use crate::config::{BUTTON_POLL_INTERVAL_MS, SES_EVENT_WINDOW_MS};
use crate::desc::SesDesc;
use crate::ext_irq::{ExtIrqRegistry, SourceKind};
use crate::gate::{GateHold, GateTable};
use crate::pin::GpioLine;
use crate::platform::Platform;

/// Outstanding SES event, if any.
pub struct SesMonitor {
    last: IrqSpinLock<Option<Timestamp>>,
    waiters: HeapWaitQueue,
}

impl SesMonitor {
    /// Creates a monitor with no event outstanding.
    pub fn new() -> Self {
        Self {
            last: IrqSpinLock::named("ses", None),
            waiters: HeapWaitQueue::new(),
        }
    }

    /// Records a SES button event at `now` and wakes pollers.
    pub fn record(&self, now: Timestamp) {
        *self.last.lock() = Some(now);
        debug!("ses: event at {now}");
        self.waiters.wake_all();
    }

    /// Returns `true` while an unread event younger than the window exists.
    pub fn poll(&self, now: Timestamp) -> bool {
        self.last
            .lock()
            .is_some_and(|at| now.saturating_since(at) < SES_EVENT_WINDOW_MS)
    }

    /// Consumes the outstanding event. Returns `false` if there was none
    /// or it had expired.
    pub fn read(&self, now: Timestamp) -> bool {
        let mut last = self.last.lock();
        match last.take() {
            Some(at) => now.saturating_since(at) < SES_EVENT_WINDOW_MS,
            None => false,
        }
    }

    /// Future completing at the next recorded event.
    pub fn wait(&self) -> HeapWaitFuture<'_> {
        self.waiters.wait()
    }
}

impl Default for SesMonitor {
    fn default() -> Self {
        Self::new()
    }
}

struct SesIrq {
    gate: GateHold,
    shared: bool,
}

/// The dedicated SES button.
///
/// On an interrupt line a press records an event and drops the button's
/// hold on the line; the poll timer restores it once the button is back up. Without an interrupt
/// the GPIO is scanned every [`BUTTON_POLL_INTERVAL_MS`] and each press
/// records one event.
pub struct SesLine {
    gpio: Option<GpioLine>,
    irq: Option<SesIrq>,
    active: IrqSpinLock<bool>,
    poll: Box<dyn OneShotTimer>,
    monitor: Arc<SesMonitor>,
    platform: Platform,
}

impl SesLine {
    /// Registers the button, maps its interrupt or starts its scan timer.
    pub fn register(
        desc: &SesDesc,
        platform: Platform,
        registry: &ExtIrqRegistry,
        gates: &GateTable,
        monitor: Arc<SesMonitor>,
    ) -> Result<Arc<Self>, DriverError> {
        let irq = match desc.irq {
            Some(irq_desc) => {
                if desc.gpio.is_some_and(|g| g.polarity != irq_desc.polarity) {
                    return Err(DriverError::PolarityMismatch);
                }
                registry.register(&irq_desc, SourceKind::Ses, desc.gpio)?;
                if irq_desc.shared && desc.gpio.is_none() {
                    warn!("ses: shared {} without a gpio, every edge counts", irq_desc.line);
                }
                let number = platform.irq.map_external(irq_desc.line)?;
                Some(SesIrq {
                    gate: gates.hold(number),
                    shared: irq_desc.shared,
                })
            }
            None if desc.gpio.is_none() => return Err(DriverError::MissingGpio),
            None => None,
        };
        if let Some(gpio) = desc.gpio {
            gpio.configure_input(&*platform.gpio);
        }

        let line = Arc::new_cyclic(|weak: &Weak<SesLine>| {
            let weak = weak.clone();
            let poll = platform.timers.create_timer(Arc::new(move || {
                if let Some(line) = weak.upgrade() {
                    line.on_poll_timer();
                }
            }));
            SesLine {
                gpio: desc.gpio,
                irq,
                active: IrqSpinLock::named("ses-line", false),
                poll,
                monitor,
                platform: platform.clone(),
            }
        });

        match &line.irq {
            Some(irq) => {
                let weak = Arc::downgrade(&line);
                line.platform.irq.map(
                    irq.gate.irq(),
                    Arc::new(move |_: IrqNumber| {
                        weak.upgrade()
                            .map_or(IrqReturn::None, |l| l.handle_interrupt())
                    }),
                )?;
                irq.gate.enable();
                info!("ses: button on irq {}", irq.gate.irq());
            }
            None => {
                line.poll.arm(BUTTON_POLL_INTERVAL_MS);
                info!("ses: button polled");
            }
        }
        Ok(line)
    }

    /// Fresh GPIO read. A line without a GPIO never reads down.
    pub fn is_down(&self) -> bool {
        self.gpio.is_some_and(|g| g.is_active(&*self.platform.gpio))
    }

    /// Returns `true` from a press until the button is seen up again.
    pub fn is_active(&self) -> bool {
        *self.active.lock()
    }

    /// Entry point for the button's interrupt.
    pub fn handle_interrupt(&self) -> IrqReturn {
        let Some(irq) = &self.irq else {
            return IrqReturn::None;
        };
        if irq.shared && self.gpio.is_some() && !self.is_down() {
            return IrqReturn::None;
        }
        let mut active = self.active.lock();
        if !*active {
            *active = true;
            irq.gate.disable();
            self.poll.arm(BUTTON_POLL_INTERVAL_MS);
            self.monitor.record(self.platform.now());
        }
        IrqReturn::Handled
    }

    /// Entry point for the poll timer.
    pub fn on_poll_timer(&self) {
        let down = self.is_down();
        let mut active = self.active.lock();
        match &self.irq {
            Some(irq) => {
                if down {
                    self.poll.arm(BUTTON_POLL_INTERVAL_MS);
                } else {
                    *active = false;
                    irq.gate.enable();
                }
            }
            None => {
                if down && !*active {
                    self.monitor.record(self.platform.now());
                }
                *active = down;
                self.poll.arm(BUTTON_POLL_INTERVAL_MS);
            }
        }
    }
}
