//! Dying-gasp (imminent power loss) handler.
//!
//! The brownout detector fires once. The handler then:
//!
//! 1. sets the triggered flag, which gates every later firing;
//! 2. runs the shutdown callbacks in registration order, except that
//!    line-card callbacks (names starting with `dsl` or `gpon`) run after
//!    all the others;
//! 3. stops the supervisor and arms the hardware watchdog for
//!    [`DYING_GASP_RESET_TIMEOUT_US`] with nothing left to reload it, so a
//!    hung shutdown still ends in a reset;
//! 4. drops the pass-through GPIO, if the board has one;
//! 5. ends in [`PowerLoss`], a terminal state it never leaves.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use bsp_core::id::IrqNumber;
use bsp_core::sync::IrqSpinLock;
use bsp_driver_api::{DriverError, IrqReturn};
use log::{debug, error, info, warn};

use crate::config::DYING_GASP_RESET_TIMEOUT_US;
use crate::desc::DyingGaspDesc;
use crate::gate::{GateHold, GateTable};
use crate::loom_compat::{AtomicBool, Ordering};
use crate::name::callback_name;
use crate::pin::PinState;
use crate::platform::Platform;
use crate::watchdog::WatchdogSupervisor;

/// Prefixes of callbacks that must run after every other one.
const LINE_CARD_PREFIXES: [&str; 2] = ["dsl", "gpon"];

/// Work a driver must do before power disappears.
///
/// Runs in interrupt context: no blocking, no allocation.
pub trait ShutdownCallback: Send + Sync {
    /// Quiesce the device.
    fn power_lost(&self);
}

impl<F> ShutdownCallback for F
where
    F: Fn() + Send + Sync,
{
    fn power_lost(&self) {
        self();
    }
}

/// The terminal state after a dying gasp: the board is losing power and
/// the watchdog is armed to reset it.
#[derive(Debug)]
#[must_use]
pub struct PowerLoss {
    _private: (),
}

impl PowerLoss {
    /// Parks the CPU until power or the watchdog takes it away. Returning
    /// would resume interrupted work on a dying board.
    pub fn park(self) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }
}

/// Result of [`DyingGasp::handle_interrupt`].
#[derive(Debug)]
pub enum DyingGaspOutcome {
    /// The handler had already fired; nothing was run.
    AlreadyTriggered,
    /// This firing ran the shutdown sequence.
    Terminal(PowerLoss),
}

impl DyingGaspOutcome {
    /// Returns `true` for [`DyingGaspOutcome::Terminal`].
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

struct Entry {
    name: String,
    callback: Arc<dyn ShutdownCallback>,
}

impl Entry {
    fn is_line_card(&self) -> bool {
        LINE_CARD_PREFIXES.iter().any(|p| self.name.starts_with(p))
    }
}

/// The dying-gasp handler and its callback list.
pub struct DyingGasp {
    triggered: AtomicBool,
    entries: IrqSpinLock<Vec<Entry>>,
    desc: Option<DyingGaspDesc>,
    gate: Option<GateHold>,
    mapped: AtomicBool,
    watchdog: Arc<WatchdogSupervisor>,
    platform: Platform,
}

impl DyingGasp {
    /// Creates the handler. Without a description only the callback list
    /// is usable.
    pub fn new(
        desc: Option<DyingGaspDesc>,
        platform: Platform,
        gates: &GateTable,
        watchdog: Arc<WatchdogSupervisor>,
    ) -> Self {
        Self {
            triggered: AtomicBool::new(false),
            entries: IrqSpinLock::named("dying-gasp", Vec::new()),
            gate: desc.map(|d| gates.hold(d.irq)),
            desc,
            mapped: AtomicBool::new(false),
            watchdog,
            platform,
        }
    }

    /// Boot-time setup: drive the pass-through GPIO and enable the
    /// interrupt, unless the board is battery backed or the detector is
    /// already asserted.
    pub fn init(self: &Arc<Self>) -> Result<(), DriverError> {
        let Some(desc) = self.desc else {
            return Ok(());
        };
        if let Some(gpio) = desc.pass_gpio {
            gpio.configure_output(&*self.platform.gpio);
            gpio.set_state(&*self.platform.gpio, PinState::Active);
        }
        if desc.battery_backed {
            info!("dying gasp: battery backed, interrupt left disabled");
            return Ok(());
        }
        if self.platform.irq.is_pending(desc.irq) {
            warn!("dying gasp: asserted at boot, interrupt left disabled");
            return Ok(());
        }
        self.enable_interrupt()
    }

    /// Maps (once) and unmasks the interrupt.
    pub fn enable_interrupt(self: &Arc<Self>) -> Result<(), DriverError> {
        let (Some(desc), Some(gate)) = (self.desc, &self.gate) else {
            return Err(DriverError::Unsupported);
        };
        if !self.mapped.swap(true, Ordering::AcqRel) {
            let weak = Arc::downgrade(self);
            let mapped = self.platform.irq.map(
                desc.irq,
                Arc::new(move |_: IrqNumber| {
                    weak.upgrade().map_or(IrqReturn::None, |dg| dg.on_irq())
                }),
            );
            if let Err(e) = mapped {
                self.mapped.store(false, Ordering::Release);
                return Err(e);
            }
        }
        gate.enable();
        Ok(())
    }

    /// Masks the interrupt.
    pub fn disable_interrupt(&self) {
        if let Some(gate) = &self.gate {
            gate.disable();
        }
    }

    /// Returns `true` while the interrupt is unmasked.
    pub fn is_enabled(&self) -> bool {
        self.gate.as_ref().is_some_and(GateHold::is_held)
    }

    /// Returns `true` once the handler has fired.
    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::Acquire)
    }

    /// Appends a shutdown callback.
    pub fn register(&self, name: &str, callback: Arc<dyn ShutdownCallback>) -> Result<(), DriverError> {
        let name = callback_name(name)?;
        if self.is_triggered() {
            debug!("dying gasp: '{name}' registered after firing");
        }
        self.entries.lock().push(Entry { name, callback });
        Ok(())
    }

    /// Removes the first callback registered under `name`.
    pub fn deregister(&self, name: &str) -> Result<(), DriverError> {
        let name = callback_name(name)?;
        let mut entries = self.entries.lock();
        match entries.iter().position(|e| e.name == name) {
            Some(idx) => {
                entries.remove(idx);
                Ok(())
            }
            None => {
                drop(entries);
                warn!("dying gasp: no callback named '{name}'");
                Err(DriverError::NotFound)
            }
        }
    }

    /// Registered callback names, in registration order.
    pub fn callback_names(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.name.clone()).collect()
    }

    /// Runs the shutdown sequence on the first call.
    pub fn handle_interrupt(&self) -> DyingGaspOutcome {
        if self.triggered.swap(true, Ordering::AcqRel) {
            return DyingGaspOutcome::AlreadyTriggered;
        }
        error!("DYING GASP");

        {
            let entries = self.entries.lock();
            for entry in entries.iter().filter(|e| !e.is_line_card()) {
                entry.callback.power_lost();
            }
            for entry in entries.iter().filter(|e| e.is_line_card()) {
                entry.callback.power_lost();
            }
        }

        self.watchdog.suspend();
        self.watchdog.start(DYING_GASP_RESET_TIMEOUT_US, true);

        if let Some(gpio) = self.desc.and_then(|d| d.pass_gpio) {
            gpio.set_state(&*self.platform.gpio, PinState::Inactive);
        }
        DyingGaspOutcome::Terminal(PowerLoss { _private: () })
    }

    fn on_irq(&self) -> IrqReturn {
        if let DyingGaspOutcome::Terminal(power_loss) = self.handle_interrupt() {
            if self.desc.is_some_and(|d| d.halt) {
                power_loss.park();
            }
        }
        IrqReturn::Handled
    }
}
