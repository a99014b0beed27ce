//! Push-button state machines.
//!
//! Each registered button has:
//!
//! - a [`ButtonState`] behind an [`IrqSpinLock`], advanced by the button's
//!   interrupt handler and its poll timer;
//! - a [`Channel`] of [`ButtonEvent`]s published by those transitions;
//! - a worker task (`btnhandler<id>`) that drains the channel and runs the
//!   button's hooks.
//!
//! While a button is down the poll timer fires every
//! [`BUTTON_POLL_INTERVAL_MS`]: still down raises a hold, up raises the
//! release. A button wired for both edges may also be released by its
//! interrupt; whichever path clears the active state first wins and the
//! other becomes a no-op. The button drops its hold on the line from the
//! press until the worker has dispatched the release; the line itself stays
//! unmasked while another source on it holds it.

mod hooks;
mod state;
mod worker;

use alloc::boxed::Box;
use alloc::format;
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;

use bsp_core::id::{ButtonId, IrqNumber};
use bsp_core::sync::{Channel, IrqSpinLock, SpinLock};
use bsp_core::time::Timestamp;
use bsp_driver_api::{DriverError, IrqReturn, OneShotTimer};
use log::{error, info, trace};

pub use hooks::{ButtonAction, ButtonHook, ExternalAction, ExternalHooks, Hook, HookCall, HookTrigger};
pub(crate) use hooks::HookContext;
pub use state::{ButtonEvent, ButtonPhase, ButtonState, EventKind};

use crate::config::{BUTTON_POLL_INTERVAL_MS, MAX_BUTTONS};
use crate::desc::{ButtonDesc, ButtonTrigger};
use crate::ext_irq::{ExtIrqRegistry, SourceKind};
use crate::gate::{GateHold, GateTable};
use crate::pin::GpioLine;
use crate::platform::Platform;
use worker::Worker;

struct LineBinding {
    irq: IrqNumber,
    gate: GateHold,
    shared: bool,
    release_edge: bool,
}

/// One registered push-button.
pub struct Button {
    id: ButtonId,
    gpio: GpioLine,
    line: Option<LineBinding>,
    state: IrqSpinLock<ButtonState>,
    events: Channel<ButtonEvent>,
    poll: Box<dyn OneShotTimer>,
    hooks: SpinLock<Vec<Hook>>,
    platform: Platform,
}

impl Button {
    /// Logical id.
    pub fn id(&self) -> ButtonId {
        self.id
    }

    /// Current debounced phase.
    pub fn phase(&self) -> ButtonPhase {
        self.state.lock().phase()
    }

    /// Snapshot of the debounced state.
    pub fn state(&self) -> ButtonState {
        self.state.lock().clone()
    }

    /// Fresh GPIO read: is the button physically down?
    pub fn is_down(&self) -> bool {
        self.gpio.is_active(&*self.platform.gpio)
    }

    /// Events published but not yet taken by the worker.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Adds a hook. Takes effect from the next event the worker handles.
    pub fn add_hook(&self, hook: Hook) {
        self.hooks.lock().push(hook);
    }

    /// Entry point for the button's interrupt.
    pub fn handle_interrupt(&self) -> IrqReturn {
        let Some(line) = &self.line else {
            return IrqReturn::None;
        };
        let down = self.is_down();
        if line.release_edge && !down {
            self.release(self.platform.now());
            return IrqReturn::Handled;
        }
        if line.shared && !down {
            trace!("button {}: shared edge not ours", self.id);
            return IrqReturn::Handled;
        }

        let now = self.platform.now();
        let mut state = self.state.lock();
        if let Some(event) = state.press(now) {
            line.gate.disable();
            self.poll.arm(BUTTON_POLL_INTERVAL_MS);
            self.events.send(event);
        }
        IrqReturn::Handled
    }

    /// Entry point for the poll timer.
    pub fn on_poll_timer(&self) {
        let now = self.platform.now();
        let down = self.is_down();
        let polled = self.line.is_none();

        let mut state = self.state.lock();
        let event = match (state.is_active(), down) {
            (true, true) => state.hold(now),
            (true, false) => state.release(now),
            (false, true) if polled => state.press(now),
            // Released by the other path already.
            (false, _) => None,
        };
        if let Some(event) = event {
            self.events.send(event);
        }
        if polled || state.is_active() {
            self.poll.arm(BUTTON_POLL_INTERVAL_MS);
        }
    }

    fn release(&self, now: Timestamp) {
        let mut state = self.state.lock();
        if let Some(event) = state.release(now) {
            self.poll.cancel();
            self.events.send(event);
        }
    }

    fn hooks(&self) -> Vec<Hook> {
        self.hooks.lock().clone()
    }

    fn has_release_edge(&self) -> bool {
        self.line.as_ref().is_some_and(|l| l.release_edge)
    }

    fn unmask(&self) {
        if let Some(line) = &self.line {
            line.gate.enable();
        }
    }
}

/// The board's buttons.
pub struct ButtonSet {
    platform: Platform,
    registry: Arc<ExtIrqRegistry>,
    gates: Arc<GateTable>,
    ctx: Arc<HookContext>,
    buttons: SpinLock<[Option<Arc<Button>>; MAX_BUTTONS]>,
}

impl ButtonSet {
    pub(crate) fn new(
        platform: Platform,
        registry: Arc<ExtIrqRegistry>,
        gates: Arc<GateTable>,
        ctx: Arc<HookContext>,
    ) -> Self {
        Self {
            platform,
            registry,
            gates,
            ctx,
            buttons: SpinLock::named("buttons", [const { None }; MAX_BUTTONS]),
        }
    }

    /// Registers a button and starts its worker.
    ///
    /// A misconfigured button is rejected as a whole and the error logged;
    /// nothing about it is started.
    pub fn register(&self, desc: &ButtonDesc) -> Result<Arc<Button>, DriverError> {
        self.try_register(desc)
            .inspect_err(|e| error!("button {}: not registered: {e}", desc.id))
    }

    fn try_register(&self, desc: &ButtonDesc) -> Result<Arc<Button>, DriverError> {
        let idx = desc.id.as_usize();
        if idx >= MAX_BUTTONS {
            return Err(DriverError::InvalidId);
        }
        if self.buttons.lock()[idx].is_some() {
            return Err(DriverError::AlreadyRegistered);
        }
        let gpio = desc.gpio.ok_or(DriverError::MissingGpio)?;
        let trigger = desc.trigger.ok_or(DriverError::MissingInterrupt)?;

        let line = match trigger {
            ButtonTrigger::Interrupt { irq, release_edge } => {
                if irq.polarity != gpio.polarity {
                    return Err(DriverError::PolarityMismatch);
                }
                self.registry
                    .register(&irq, SourceKind::Button(desc.id), Some(gpio))?;
                let number = self.platform.irq.map_external(irq.line)?;
                Some(LineBinding {
                    irq: number,
                    gate: self.gates.hold(number),
                    shared: irq.shared,
                    release_edge,
                })
            }
            ButtonTrigger::Polled => None,
        };

        gpio.configure_input(&*self.platform.gpio);
        let button = Arc::new_cyclic(|weak: &Weak<Button>| {
            let weak = weak.clone();
            let poll = self.platform.timers.create_timer(Arc::new(move || {
                if let Some(button) = weak.upgrade() {
                    button.on_poll_timer();
                }
            }));
            Button {
                id: desc.id,
                gpio,
                line,
                state: IrqSpinLock::named("button-state", ButtonState::new(desc.id)),
                events: Channel::with_capacity(8),
                poll,
                hooks: SpinLock::named("button-hooks", desc.hooks.clone()),
                platform: self.platform.clone(),
            }
        });

        {
            let mut buttons = self.buttons.lock();
            if buttons[idx].is_some() {
                return Err(DriverError::AlreadyRegistered);
            }
            buttons[idx] = Some(button.clone());
        }

        match &button.line {
            Some(line) => {
                let weak = Arc::downgrade(&button);
                let mapped = self.platform.irq.map(
                    line.irq,
                    Arc::new(move |_: IrqNumber| {
                        weak.upgrade()
                            .map_or(IrqReturn::None, |b| b.handle_interrupt())
                    }),
                );
                if let Err(e) = mapped {
                    self.buttons.lock()[idx] = None;
                    return Err(e);
                }
                line.gate.enable();
            }
            None => {
                button.poll.arm(BUTTON_POLL_INTERVAL_MS);
            }
        }

        let worker = Worker::new(button.clone(), self.ctx.clone());
        self.platform
            .services
            .spawn(&format!("btnhandler{}", desc.id), Box::pin(worker.run()));
        info!(
            "button {}: registered on {} ({})",
            desc.id,
            gpio.pin,
            if button.line.is_some() { "interrupt" } else { "polled" }
        );
        Ok(button)
    }

    /// Returns the button registered as `id`.
    pub fn get(&self, id: ButtonId) -> Option<Arc<Button>> {
        self.buttons.lock().get(id.as_usize()).cloned().flatten()
    }

    /// Adds a hook to a registered button.
    pub fn register_hook(&self, id: ButtonId, hook: Hook) -> Result<(), DriverError> {
        let button = self.get(id).ok_or(DriverError::NotFound)?;
        button.add_hook(hook);
        Ok(())
    }

    /// Installs the callback behind `action` for every button whose hooks
    /// name it. Replaces any earlier one.
    pub fn register_external(&self, action: ExternalAction, hook: Arc<dyn ButtonHook>) {
        info!("button: {action:?} handler installed");
        self.ctx.externals.register(action, hook);
    }

    /// Slots for the PLC and wireless callbacks reached by button actions.
    pub fn externals(&self) -> &ExternalHooks {
        &self.ctx.externals
    }
}
