//! Board bring-up.
//!
//! [`Board::init`] turns a [`BoardDescription`] into running services.
//! Every interrupt source is entered in the shared-line registry before
//! any of them is mapped, so a trigger conflict on a line disables all of
//! its sources, not just the ones registered after the mismatch.

use alloc::sync::Arc;

use log::{error, info, warn};

use crate::button::{ButtonSet, ExternalHooks, HookContext};
use crate::control::{BoardControl, EventMonitor};
use crate::desc::{BoardDescription, ButtonTrigger, ExtIrqDesc, SesDesc};
use crate::dying_gasp::DyingGasp;
use crate::ext_irq::{ExtIrqRegistry, SourceKind};
use crate::gate::GateTable;
use crate::moca::MocaInterrupts;
use crate::pin::GpioLine;
use crate::platform::Platform;
use crate::reset::{ResetLine, RestoreGuard};
use crate::ses::{SesLine, SesMonitor};
use crate::watchdog::WatchdogSupervisor;

/// The running board core.
pub struct Board {
    registry: Arc<ExtIrqRegistry>,
    buttons: Arc<ButtonSet>,
    dying_gasp: Arc<DyingGasp>,
    watchdog: Arc<WatchdogSupervisor>,
    moca: Arc<MocaInterrupts>,
    reset: Option<Arc<ResetLine>>,
    ses_line: Option<Arc<SesLine>>,
    control: Arc<BoardControl>,
    ses: Arc<SesMonitor>,
    restore: Arc<RestoreGuard>,
}

impl Board {
    /// Brings up every unit the description names.
    ///
    /// A unit that fails to come up is logged and left out; the rest of
    /// the board still starts.
    pub fn init(desc: &BoardDescription, platform: Platform) -> Self {
        let registry = Arc::new(ExtIrqRegistry::new());
        let gates = Arc::new(GateTable::new(platform.irq.clone()));

        claim_lines(desc, &registry);

        let watchdog = Arc::new(WatchdogSupervisor::new(
            platform.clone(),
            &gates,
            desc.watchdog_irq,
        ));
        let dying_gasp = Arc::new(DyingGasp::new(
            desc.dying_gasp,
            platform.clone(),
            &gates,
            watchdog.clone(),
        ));
        if let Err(e) = dying_gasp.init() {
            error!("dying gasp: interrupt not enabled: {e}");
        }

        let restore = Arc::new(RestoreGuard::new(platform.services.clone()));
        let ses = Arc::new(SesMonitor::new());
        let monitor = Arc::new(EventMonitor::new());
        let ctx = Arc::new(HookContext {
            platform: platform.clone(),
            ses: ses.clone(),
            restore: restore.clone(),
            externals: Arc::new(ExternalHooks::new()),
            monitor: monitor.clone(),
        });

        let buttons = Arc::new(ButtonSet::new(
            platform.clone(),
            registry.clone(),
            gates.clone(),
            ctx,
        ));
        let registered = desc
            .buttons
            .iter()
            .filter(|b| buttons.register(b).is_ok())
            .count();

        let reset = desc.reset.as_ref().and_then(|reset| {
            ResetLine::register(reset, platform.clone(), &registry, &gates, restore.clone())
                .inspect_err(|e| error!("reset: line not registered: {e}"))
                .ok()
        });

        let ses_line = desc.ses.as_ref().and_then(|ses_desc| {
            SesLine::register(ses_desc, platform.clone(), &registry, &gates, ses.clone())
                .inspect_err(|e| error!("ses: button not registered: {e}"))
                .ok()
        });

        let moca = Arc::new(MocaInterrupts::new(
            desc.moca.clone(),
            platform.clone(),
            registry.clone(),
            gates,
        ));
        let control = Arc::new(BoardControl::new(
            watchdog.clone(),
            monitor,
            ses.clone(),
            platform,
        ));

        info!(
            "board: {registered}/{} buttons, reset line {}, ses button {}, {} moca",
            desc.buttons.len(),
            if reset.is_some() { "up" } else { "absent" },
            if ses_line.is_some() { "up" } else { "absent" },
            desc.moca.len()
        );
        Self {
            registry,
            buttons,
            dying_gasp,
            watchdog,
            moca,
            reset,
            ses_line,
            control,
            ses,
            restore,
        }
    }

    /// Shared-line registry.
    pub fn registry(&self) -> &Arc<ExtIrqRegistry> {
        &self.registry
    }

    /// Registered buttons.
    pub fn buttons(&self) -> &Arc<ButtonSet> {
        &self.buttons
    }

    /// Dying-gasp handler.
    pub fn dying_gasp(&self) -> &Arc<DyingGasp> {
        &self.dying_gasp
    }

    /// Watchdog supervisor.
    pub fn watchdog(&self) -> &Arc<WatchdogSupervisor> {
        &self.watchdog
    }

    /// MoCA interrupt bindings.
    pub fn moca(&self) -> &Arc<MocaInterrupts> {
        &self.moca
    }

    /// Restore-to-default line, if it came up.
    pub fn reset(&self) -> Option<&Arc<ResetLine>> {
        self.reset.as_ref()
    }

    /// Dedicated SES button, if it came up.
    pub fn ses_line(&self) -> Option<&Arc<SesLine>> {
        self.ses_line.as_ref()
    }

    /// Userspace control surface.
    pub fn control(&self) -> &Arc<BoardControl> {
        &self.control
    }

    /// SES event window.
    pub fn ses(&self) -> &Arc<SesMonitor> {
        &self.ses
    }

    /// Restore-defaults guard.
    pub fn restore(&self) -> &Arc<RestoreGuard> {
        &self.restore
    }
}

/// Enters every described source in the registry.
fn claim_lines(desc: &BoardDescription, registry: &ExtIrqRegistry) {
    let claim = |line: &ExtIrqDesc, source: SourceKind, gpio: Option<GpioLine>| {
        if let Err(e) = registry.register(line, source, gpio) {
            warn!("{}: {source:?} not claimed: {e}", line.line);
        }
    };
    if let Some(reset) = &desc.reset {
        claim(&reset.irq, SourceKind::Reset, reset.gpio);
    }
    if let Some(SesDesc { irq: Some(irq), gpio }) = &desc.ses {
        claim(irq, SourceKind::Ses, *gpio);
    }
    for button in &desc.buttons {
        if let Some(ButtonTrigger::Interrupt { irq, .. }) = &button.trigger {
            if button.gpio.is_some_and(|g| g.polarity == irq.polarity) {
                claim(irq, SourceKind::Button(button.id), button.gpio);
            }
        }
    }
    for moca in &desc.moca {
        if let Some(irq) = &moca.irq {
            claim(irq, SourceKind::Moca(moca.dev), moca.gpio);
        }
    }
}

