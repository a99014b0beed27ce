//! Button hooks: when they fire and what they do.

use alloc::string::String;
use alloc::sync::Arc;
use core::fmt;

use bsp_core::id::ButtonId;
use bsp_core::sync::SpinLock;
use bsp_core::time::Timestamp;
use log::{info, warn};

use super::state::EventKind;
use crate::control::EventMonitor;
use crate::platform::Platform;
use crate::reset::RestoreGuard;
use crate::ses::SesMonitor;

/// Arguments passed to a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookCall {
    /// Button that triggered the hook.
    pub button: ButtonId,
    /// Transition being dispatched.
    pub kind: EventKind,
    /// When the transition was observed.
    pub at: Timestamp,
    /// Milliseconds since the press (zero for the press itself).
    pub held_ms: u64,
    /// Opaque parameter from the hook descriptor.
    pub param: u64,
}

/// Code run on the button worker for a hook.
pub trait ButtonHook: Send + Sync {
    /// Runs the hook. May block or allocate.
    fn call(&self, call: &HookCall);
}

impl<F> ButtonHook for F
where
    F: Fn(&HookCall) + Send + Sync,
{
    fn call(&self, call: &HookCall) {
        self(call);
    }
}

/// When a hook fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookTrigger {
    /// On every press.
    Press,
    /// Once per press, when the held time first reaches `after_ms`.
    Hold {
        /// Threshold in milliseconds.
        after_ms: u64,
    },
    /// On every hold poll once the held time has reached `after_ms`.
    HoldRepeat {
        /// Threshold in milliseconds.
        after_ms: u64,
    },
    /// On release, if `after_ms` is the longest release threshold the
    /// held time reached.
    Release {
        /// Threshold in milliseconds.
        after_ms: u64,
    },
}

/// Callbacks installed by other drivers and reached through a
/// [`ButtonAction`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalAction {
    /// Power-line-communication "unique key exchange".
    PlcUke,
    /// Randomize the PLC network key.
    RandomizePlc,
    /// Bring the wireless interface down.
    WlanDown,
}

impl ExternalAction {
    const COUNT: usize = 3;

    const fn index(self) -> usize {
        match self {
            Self::PlcUke => 0,
            Self::RandomizePlc => 1,
            Self::WlanDown => 2,
        }
    }
}

/// What a hook does.
#[derive(Clone)]
pub enum ButtonAction {
    /// Nothing; placeholder from the board description.
    DoNothing,
    /// Record a SES event for userspace.
    Ses,
    /// Erase persistent configuration and restart.
    RestoreDefaults,
    /// Restart immediately.
    Reset,
    /// Log a message.
    Print(String),
    /// Run the registered [`ExternalAction::PlcUke`] callback.
    PlcUke,
    /// Run the registered [`ExternalAction::RandomizePlc`] callback.
    RandomizePlc,
    /// Run the registered [`ExternalAction::WlanDown`] callback.
    WlanDown,
    /// Run caller-supplied code.
    Custom(Arc<dyn ButtonHook>),
}

impl fmt::Debug for ButtonAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DoNothing => f.write_str("DoNothing"),
            Self::Ses => f.write_str("Ses"),
            Self::RestoreDefaults => f.write_str("RestoreDefaults"),
            Self::Reset => f.write_str("Reset"),
            Self::Print(msg) => f.debug_tuple("Print").field(msg).finish(),
            Self::PlcUke => f.write_str("PlcUke"),
            Self::RandomizePlc => f.write_str("RandomizePlc"),
            Self::WlanDown => f.write_str("WlanDown"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl ButtonAction {
    pub(crate) fn invoke(&self, ctx: &HookContext, call: &HookCall) {
        match self {
            Self::DoNothing => {}
            Self::Ses => ctx.ses.record(call.at),
            Self::RestoreDefaults => {
                ctx.restore.trigger();
            }
            Self::Reset => {
                info!("button {}: restarting", call.button);
                ctx.platform.services.restart();
            }
            Self::Print(msg) => info!("button {}: {msg}", call.button),
            Self::PlcUke => ctx.externals.invoke(ExternalAction::PlcUke, call),
            Self::RandomizePlc => ctx.externals.invoke(ExternalAction::RandomizePlc, call),
            Self::WlanDown => ctx.externals.invoke(ExternalAction::WlanDown, call),
            Self::Custom(hook) => hook.call(call),
        }
    }
}

/// A trigger, an action and the parameter passed to it.
#[derive(Debug, Clone)]
pub struct Hook {
    /// When to fire.
    pub trigger: HookTrigger,
    /// What to do.
    pub action: ButtonAction,
    /// Opaque parameter.
    pub param: u64,
}

impl Hook {
    /// Creates a hook.
    pub fn new(trigger: HookTrigger, action: ButtonAction, param: u64) -> Self {
        Self {
            trigger,
            action,
            param,
        }
    }
}

/// Slots for the callbacks behind [`ExternalAction`]s.
pub struct ExternalHooks {
    slots: SpinLock<[Option<Arc<dyn ButtonHook>>; ExternalAction::COUNT]>,
}

impl ExternalHooks {
    /// Creates empty slots.
    pub fn new() -> Self {
        Self {
            slots: SpinLock::named("button-external-hooks", [const { None }; ExternalAction::COUNT]),
        }
    }

    /// Installs `hook` for `action`, replacing any previous one.
    pub fn register(&self, action: ExternalAction, hook: Arc<dyn ButtonHook>) {
        self.slots.lock()[action.index()] = Some(hook);
    }

    /// Removes the hook for `action`. Returns `true` if one was installed.
    pub fn clear(&self, action: ExternalAction) -> bool {
        self.slots.lock()[action.index()].take().is_some()
    }

    fn invoke(&self, action: ExternalAction, call: &HookCall) {
        let hook = self.slots.lock()[action.index()].clone();
        match hook {
            Some(hook) => hook.call(call),
            None => warn!("button {}: no {action:?} handler registered", call.button),
        }
    }
}

impl Default for ExternalHooks {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a hook action may reach.
pub(crate) struct HookContext {
    pub(crate) platform: Platform,
    pub(crate) ses: Arc<SesMonitor>,
    pub(crate) restore: Arc<RestoreGuard>,
    pub(crate) externals: Arc<ExternalHooks>,
    pub(crate) monitor: Arc<EventMonitor>,
}
