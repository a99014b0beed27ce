//! MoCA shared-interrupt demultiplexing.
//!
//! Each MoCA chip's host interrupt may share an external line with other
//! chips or with buttons. A binding with a disambiguation GPIO claims an
//! edge when its GPIO is asserted. Some early board revisions have no GPIO
//! for one sharer; that binding falls back to elimination: it claims the
//! edge only when no other sharer with a GPIO reads asserted. The fallback
//! is degraded-precision: with three or more sources on one line and more
//! than one of them GPIO-less it misattributes, so it is kept to the
//! single case the board description forces on us.
//!
//! Enabling is reference counted per chip. A chip holds the shared line
//! open while its count is non-zero, and the line is only masked once no
//! source on it (MoCA chip, button or reset line) still holds it.

use alloc::sync::Arc;
use alloc::vec::Vec;

use bsp_core::id::{ExtIrqLine, IrqNumber, MocaDevice};
use bsp_core::sync::IrqSpinLock;
use bsp_driver_api::{DriverError, IrqReturn};
use log::{error, info, warn};

use crate::config::MAX_MOCA_DEVICES;
use crate::desc::MocaDesc;
use crate::ext_irq::{ExtIrqRegistry, SourceKind};
use crate::gate::{GateHold, GateTable};
use crate::pin::GpioLine;
use crate::platform::Platform;

/// The MoCA driver's interrupt handler for one chip.
pub trait MocaIrqHandler: Send + Sync {
    /// Called in interrupt context when the chip's interrupt is attributed.
    fn on_interrupt(&self, dev: MocaDevice);
}

impl<F> MocaIrqHandler for F
where
    F: Fn(MocaDevice) + Send + Sync,
{
    fn on_interrupt(&self, dev: MocaDevice) {
        self(dev);
    }
}

/// How a binding decides whether an edge on its line is its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribution {
    /// The line is not shared.
    Exclusive,
    /// The chip's GPIO reports it.
    Gpio(GpioLine),
    /// No GPIO: claim the edge when no other sharer does.
    Elimination,
}

struct Binding {
    dev: MocaDevice,
    line: ExtIrqLine,
    gate: GateHold,
    attribution: Attribution,
    handler: Arc<dyn MocaIrqHandler>,
    enable_count: u32,
}

/// MoCA interrupt bindings.
pub struct MocaInterrupts {
    descs: Vec<MocaDesc>,
    bindings: IrqSpinLock<Vec<Binding>>,
    registry: Arc<ExtIrqRegistry>,
    gates: Arc<GateTable>,
    platform: Platform,
}

impl MocaInterrupts {
    /// Creates an empty binding table for the described chips.
    pub fn new(
        descs: Vec<MocaDesc>,
        platform: Platform,
        registry: Arc<ExtIrqRegistry>,
        gates: Arc<GateTable>,
    ) -> Self {
        Self {
            descs,
            bindings: IrqSpinLock::named("moca", Vec::new()),
            registry,
            gates,
            platform,
        }
    }

    /// Binds `handler` to chip `dev`'s interrupt. The handler ignores the
    /// line until [`enable`](Self::enable).
    pub fn register(
        self: &Arc<Self>,
        dev: MocaDevice,
        handler: Arc<dyn MocaIrqHandler>,
    ) -> Result<(), DriverError> {
        self.try_register(dev, handler)
            .inspect_err(|e| error!("{dev}: interrupt not registered: {e}"))
    }

    fn try_register(
        self: &Arc<Self>,
        dev: MocaDevice,
        handler: Arc<dyn MocaIrqHandler>,
    ) -> Result<(), DriverError> {
        if dev.as_usize() >= MAX_MOCA_DEVICES {
            return Err(DriverError::InvalidId);
        }
        let desc = self
            .descs
            .iter()
            .find(|d| d.dev == dev)
            .ok_or(DriverError::NotConfigured)?;
        let irq_desc = desc.irq.ok_or(DriverError::NotConfigured)?;
        if self.bindings.lock().iter().any(|b| b.dev == dev) {
            return Err(DriverError::AlreadyRegistered);
        }

        self.registry
            .register(&irq_desc, SourceKind::Moca(dev), desc.gpio)?;

        let attribution = match (irq_desc.shared, desc.gpio) {
            (false, _) => Attribution::Exclusive,
            (true, Some(gpio)) => {
                gpio.configure_input(&*self.platform.gpio);
                Attribution::Gpio(gpio)
            }
            (true, None) => {
                warn!(
                    "{dev}: shared {} without a gpio, attributing by elimination",
                    irq_desc.line
                );
                Attribution::Elimination
            }
        };

        let irq = self.platform.irq.map_external(irq_desc.line)?;
        let gate = self.gates.hold(irq);
        let weak = Arc::downgrade(self);
        self.platform.irq.map(
            irq,
            Arc::new(move |_: IrqNumber| {
                weak.upgrade()
                    .map_or(IrqReturn::None, |m| m.handle_interrupt(dev))
            }),
        )?;
        // Another sharer may already hold the line unmasked; until this
        // chip takes a reference its handler ignores edges.

        self.bindings.lock().push(Binding {
            dev,
            line: irq_desc.line,
            gate,
            attribution,
            handler,
            enable_count: 0,
        });
        info!("{dev}: interrupt bound to {} (irq {irq})", irq_desc.line);
        Ok(())
    }

    /// Takes an enable reference and unmasks the line.
    pub fn enable(&self, dev: MocaDevice) -> Result<(), DriverError> {
        let mut bindings = self.bindings.lock();
        let binding = bindings
            .iter_mut()
            .find(|b| b.dev == dev)
            .ok_or(DriverError::NotFound)?;
        binding.enable_count += 1;
        binding.gate.enable();
        Ok(())
    }

    /// Drops an enable reference. The chip lets go of the line when its
    /// count reaches zero; the line stays unmasked while any other source
    /// on it still holds it.
    pub fn disable(&self, dev: MocaDevice) -> Result<(), DriverError> {
        let mut bindings = self.bindings.lock();
        let binding = bindings
            .iter_mut()
            .find(|b| b.dev == dev)
            .ok_or(DriverError::NotFound)?;
        if binding.enable_count == 0 {
            warn!("{dev}: unbalanced interrupt disable");
            return Ok(());
        }
        binding.enable_count -= 1;
        if binding.enable_count == 0 {
            binding.gate.disable();
        }
        Ok(())
    }

    /// Current enable reference count of `dev`.
    pub fn enable_count(&self, dev: MocaDevice) -> Option<u32> {
        self.bindings
            .lock()
            .iter()
            .find(|b| b.dev == dev)
            .map(|b| b.enable_count)
    }

    /// How `dev` attributes edges on its line.
    pub fn attribution(&self, dev: MocaDevice) -> Option<Attribution> {
        self.bindings
            .lock()
            .iter()
            .find(|b| b.dev == dev)
            .map(|b| b.attribution)
    }

    /// Entry point for chip `dev`'s interrupt.
    pub fn handle_interrupt(&self, dev: MocaDevice) -> IrqReturn {
        let (line, attribution, handler, enabled) = {
            let bindings = self.bindings.lock();
            let Some(b) = bindings.iter().find(|b| b.dev == dev) else {
                return IrqReturn::None;
            };
            (b.line, b.attribution, b.handler.clone(), b.enable_count > 0)
        };

        let ours = match attribution {
            Attribution::Exclusive => true,
            Attribution::Gpio(gpio) => gpio.is_active(&*self.platform.gpio),
            Attribution::Elimination => self.claimed_by_elimination(dev, line),
        };
        if ours && enabled {
            handler.on_interrupt(dev);
            IrqReturn::Handled
        } else {
            IrqReturn::None
        }
    }

    /// Degraded-precision fallback for a GPIO-less sharer: the edge is ours
    /// only if no other sharer's GPIO reads asserted.
    fn claimed_by_elimination(&self, dev: MocaDevice, line: ExtIrqLine) -> bool {
        let gpio = &*self.platform.gpio;
        !self
            .registry
            .sharers(line)
            .iter()
            .filter(|s| s.source != SourceKind::Moca(dev))
            .filter_map(|s| s.gpio)
            .any(|g| g.is_active(gpio))
    }
}
