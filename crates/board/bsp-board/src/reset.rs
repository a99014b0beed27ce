//! Restore-to-default line and the restore guard it shares with the
//! [`crate::button::ButtonAction::RestoreDefaults`] hook.

use alloc::boxed::Box;
use alloc::sync::Arc;

use bsp_core::id::IrqNumber;
use bsp_driver_api::{BoardServices, DriverError, IrqReturn};
use log::{error, info, warn};

use crate::desc::ResetDesc;
use crate::ext_irq::{ExtIrqRegistry, SourceKind};
use crate::gate::{GateHold, GateTable};
use crate::loom_compat::{AtomicBool, Ordering};
use crate::pin::GpioLine;
use crate::platform::Platform;

/// Schedules "erase persistent config, then restart" at most once.
pub struct RestoreGuard {
    in_progress: AtomicBool,
    services: Arc<dyn BoardServices>,
}

impl RestoreGuard {
    /// Creates an idle guard.
    pub fn new(services: Arc<dyn BoardServices>) -> Self {
        Self {
            in_progress: AtomicBool::new(false),
            services,
        }
    }

    /// Schedules the restore. Returns `false` if one is already under way.
    pub fn trigger(&self) -> bool {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!("restore to defaults requested");
        let services = self.services.clone();
        self.services.schedule_work(Box::new(move || {
            if let Err(e) = services.restore_defaults() {
                error!("restore to defaults failed: {e}");
            }
            services.restart();
        }));
        true
    }

    /// Returns `true` once a restore has been scheduled.
    pub fn in_progress(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }
}

/// The restore-to-default button line.
pub struct ResetLine {
    irq: IrqNumber,
    gate: GateHold,
    shared: bool,
    gpio: Option<GpioLine>,
    guard: Arc<RestoreGuard>,
    platform: Platform,
}

impl ResetLine {
    /// Registers the line, maps its handler and unmasks it.
    pub fn register(
        desc: &ResetDesc,
        platform: Platform,
        registry: &ExtIrqRegistry,
        gates: &GateTable,
        guard: Arc<RestoreGuard>,
    ) -> Result<Arc<Self>, DriverError> {
        registry.register(&desc.irq, SourceKind::Reset, desc.gpio)?;
        let irq = platform.irq.map_external(desc.irq.line)?;
        if desc.irq.shared && desc.gpio.is_none() {
            warn!("reset: shared {} without a gpio, every edge counts", desc.irq.line);
        }
        if let Some(gpio) = desc.gpio {
            gpio.configure_input(&*platform.gpio);
        }
        let line = Arc::new(Self {
            irq,
            gate: gates.hold(irq),
            shared: desc.irq.shared,
            gpio: desc.gpio,
            guard,
            platform,
        });
        let weak = Arc::downgrade(&line);
        line.platform.irq.map(
            irq,
            Arc::new(move |_: IrqNumber| {
                weak.upgrade()
                    .map_or(IrqReturn::None, |l| l.handle_interrupt())
            }),
        )?;
        line.gate.enable();
        Ok(line)
    }

    /// Entry point for the line's interrupt.
    pub fn handle_interrupt(&self) -> IrqReturn {
        if self.shared {
            if let Some(gpio) = &self.gpio {
                if !gpio.is_active(&*self.platform.gpio) {
                    return IrqReturn::None;
                }
            }
        }
        self.guard.trigger();
        IrqReturn::Handled
    }

    /// The controller IRQ the line is mapped on.
    pub fn irq(&self) -> IrqNumber {
        self.irq
    }
}
