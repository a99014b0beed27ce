//! Watchdog supervisor.
//!
//! The hardware watchdog resets the board unless it is reloaded in time.
//! While enabled, its service interrupt reloads it and then consults the
//! software escalation layer:
//!
//! - registered [`WatchdogCheck`]s, any of which may demand a reboot;
//! - in user mode, a miss counter that every service interrupt increments
//!   and every userspace heartbeat clears.
//!
//! When escalation decides to reboot, the hardware watchdog is suspended
//! and a restart is queued on the deferred-work context exactly once.
//! Later requests are coalesced into the one already queued.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::str::FromStr;

use bsp_core::id::IrqNumber;
use bsp_core::sync::IrqSpinLock;
use bsp_driver_api::{DriverError, IrqReturn};
use log::{error, info, warn};

use crate::config::{
    WATCHDOG_DEFAULT_TIMER_US, WATCHDOG_DEFAULT_USER_THRESHOLD, WATCHDOG_SERVICES_PER_PERIOD,
};
use crate::gate::{GateHold, GateTable};
use crate::loom_compat::{AtomicBool, Ordering};
use crate::name::callback_name;
use crate::platform::Platform;

/// Kernel-side liveness predicate consulted on every service interrupt.
///
/// Runs in interrupt context with the supervisor lock held: it must not
/// block or call back into the supervisor.
pub trait WatchdogCheck: Send + Sync {
    /// Returns `true` if the board must be rebooted.
    fn must_reboot(&self) -> bool;
}

impl<F> WatchdogCheck for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn must_reboot(&self) -> bool {
        self()
    }
}

/// Requested supervisor configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Run the hardware watchdog.
    pub enabled: bool,
    /// Hardware period in microseconds.
    pub timer_us: u32,
    /// Count missed userspace heartbeats.
    pub user_mode: bool,
    /// Missed service interrupts tolerated in user mode.
    pub user_threshold: u32,
}

impl FromStr for WatchdogConfig {
    type Err = DriverError;

    /// Parses `enabled timer_us user_mode user_threshold`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut fields = s.split_whitespace().map(str::parse::<u32>);
        let mut next = || -> Result<u32, DriverError> {
            fields
                .next()
                .ok_or(DriverError::InvalidArgument)?
                .map_err(|_| DriverError::InvalidArgument)
        };
        Ok(Self {
            enabled: next()? != 0,
            timer_us: next()?,
            user_mode: next()? != 0,
            user_threshold: next()?,
        })
    }
}

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogStatus {
    /// Hardware watchdog running.
    pub enabled: bool,
    /// Hardware period in microseconds.
    pub timer_us: u32,
    /// Temporarily stopped.
    pub suspended: bool,
    /// Heartbeat counting active.
    pub user_mode: bool,
    /// Miss threshold, in service interrupts.
    pub user_threshold: u32,
    /// Misses since the last heartbeat, in service interrupts.
    pub user_misses: u32,
}

impl fmt::Display for WatchdogStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "watchdog enabled={} timer={} us suspend={}",
            u8::from(self.enabled),
            self.timer_us,
            u8::from(self.suspended)
        )?;
        writeln!(
            f,
            "         userMode={} userThreshold={} userTimeout={}",
            u8::from(self.user_mode),
            self.user_threshold / WATCHDOG_SERVICES_PER_PERIOD,
            self.user_misses / WATCHDOG_SERVICES_PER_PERIOD
        )
    }
}

struct Check {
    name: String,
    check: Arc<dyn WatchdogCheck>,
}

struct State {
    enabled: bool,
    timer_us: u32,
    suspended: bool,
    user_mode: bool,
    user_threshold: u32,
    user_misses: u32,
    checks: Vec<Check>,
}

/// The watchdog supervisor.
pub struct WatchdogSupervisor {
    state: IrqSpinLock<State>,
    restart_in_progress: AtomicBool,
    irq: Option<IrqNumber>,
    gate: Option<GateHold>,
    mapped: AtomicBool,
    platform: Platform,
}

impl WatchdogSupervisor {
    /// Creates a disabled supervisor. `irq` is the service interrupt.
    pub fn new(platform: Platform, gates: &GateTable, irq: Option<IrqNumber>) -> Self {
        Self {
            state: IrqSpinLock::named(
                "watchdog",
                State {
                    enabled: false,
                    timer_us: WATCHDOG_DEFAULT_TIMER_US,
                    suspended: false,
                    user_mode: false,
                    user_threshold: WATCHDOG_DEFAULT_USER_THRESHOLD,
                    user_misses: 0,
                    checks: Vec::new(),
                },
            ),
            restart_in_progress: AtomicBool::new(false),
            gate: irq.map(|irq| gates.hold(irq)),
            irq,
            mapped: AtomicBool::new(false),
            platform,
        }
    }

    /// Applies a configuration.
    ///
    /// Enabling maps the service interrupt and arms the hardware; disabling
    /// stops it and unmaps the interrupt. Changing only the period while
    /// enabled re-arms with the new period. The miss counter always resets.
    pub fn configure(self: &Arc<Self>, config: WatchdogConfig) -> Result<(), DriverError> {
        if config.enabled && config.timer_us == 0 {
            return Err(DriverError::InvalidArgument);
        }
        let was_enabled = self.state.lock().enabled;
        if config.enabled && !was_enabled {
            self.connect()?;
        }

        let mut state = self.state.lock();
        state.user_mode = config.user_mode;
        state.user_threshold = config.user_threshold;
        state.user_misses = 0;

        if config.enabled != state.enabled {
            state.timer_us = config.timer_us;
            if config.enabled {
                state.enabled = true;
                state.suspended = false;
                self.start_locked(&mut state, config.timer_us, false);
                info!("watchdog: enabled, period {} us", config.timer_us);
            } else {
                self.suspend_locked(&mut state);
                state.enabled = false;
                drop(state);
                self.disconnect();
                info!("watchdog: disabled");
            }
        } else if config.timer_us != state.timer_us {
            state.timer_us = config.timer_us;
            if state.enabled {
                state.suspended = false;
                self.start_locked(&mut state, config.timer_us, false);
                info!("watchdog: period changed to {} us", config.timer_us);
            }
        }
        Ok(())
    }

    /// Arms the hardware with `timer_us`.
    ///
    /// Without `reset` this does nothing unless the supervisor is enabled.
    /// With `reset` the hardware is armed regardless and, if the supervisor
    /// was enabled, its service interrupt is masked so nothing reloads the
    /// watchdog before it fires.
    pub fn start(&self, timer_us: u32, reset: bool) {
        let mut state = self.state.lock();
        self.start_locked(&mut state, timer_us, reset);
    }

    fn start_locked(&self, state: &mut State, timer_us: u32, reset: bool) {
        if !reset && !state.enabled {
            return;
        }
        self.platform.watchdog.arm(timer_us);
        if reset && state.enabled {
            if let Some(gate) = &self.gate {
                gate.disable();
            }
        } else if state.user_mode {
            state.user_misses = 0;
        }
    }

    /// Stops the hardware for a long uninterruptible operation.
    ///
    /// Returns `true` if it was running; only then must the caller
    /// [`resume`](Self::resume).
    pub fn suspend(&self) -> bool {
        let mut state = self.state.lock();
        self.suspend_locked(&mut state)
    }

    fn suspend_locked(&self, state: &mut State) -> bool {
        if state.enabled && !state.suspended {
            self.platform.watchdog.disarm();
            state.suspended = true;
            true
        } else {
            false
        }
    }

    /// Re-arms with the last configured period after [`suspend`](Self::suspend).
    pub fn resume(&self) {
        let mut state = self.state.lock();
        let timer = state.timer_us;
        self.start_locked(&mut state, timer, false);
        state.suspended = false;
    }

    /// Userspace liveness signal: clears the miss counter.
    pub fn heartbeat(&self) {
        self.state.lock().user_misses = 0;
    }

    /// Adds a liveness predicate.
    pub fn register_callback(
        &self,
        name: &str,
        check: Arc<dyn WatchdogCheck>,
    ) -> Result<(), DriverError> {
        let name = callback_name(name)?;
        self.state.lock().checks.push(Check { name, check });
        Ok(())
    }

    /// Removes the first predicate registered under `name`.
    pub fn deregister_callback(&self, name: &str) -> Result<(), DriverError> {
        let name = callback_name(name)?;
        let mut state = self.state.lock();
        match state.checks.iter().position(|c| c.name == name) {
            Some(idx) => {
                state.checks.remove(idx);
                Ok(())
            }
            None => {
                drop(state);
                warn!("watchdog: no callback named '{name}'");
                Err(DriverError::NotFound)
            }
        }
    }

    /// Service interrupt: reload the hardware, then run escalation.
    pub fn handle_interrupt(&self) -> IrqReturn {
        let mut state = self.state.lock();
        if !state.enabled {
            return IrqReturn::None;
        }
        self.platform.watchdog.pet();

        let mut reboot = false;
        if let Some(c) = state.checks.iter().find(|c| c.check.must_reboot()) {
            error!("watchdog: callback '{}' requested reboot", c.name);
            reboot = true;
        } else if state.user_mode {
            state.user_misses = state.user_misses.saturating_add(1);
            if state.user_misses >= state.user_threshold {
                error!(
                    "watchdog: {} service intervals without a heartbeat",
                    state.user_misses
                );
                reboot = true;
            }
        }

        if reboot {
            self.suspend_locked(&mut state);
            drop(state);
            self.schedule_restart();
        }
        IrqReturn::Handled
    }

    /// Queues the restart unless one is already queued.
    ///
    /// Returns `true` if this call queued it.
    pub fn schedule_restart(&self) -> bool {
        if self.restart_in_progress.swap(true, Ordering::AcqRel) {
            return false;
        }
        info!("watchdog: scheduling restart");
        let services = self.platform.services.clone();
        self.platform
            .services
            .schedule_work(Box::new(move || services.restart()));
        true
    }

    /// Returns `true` once a restart has been queued.
    pub fn restart_pending(&self) -> bool {
        self.restart_in_progress.load(Ordering::Acquire)
    }

    /// Current state.
    pub fn status(&self) -> WatchdogStatus {
        let state = self.state.lock();
        WatchdogStatus {
            enabled: state.enabled,
            timer_us: state.timer_us,
            suspended: state.suspended,
            user_mode: state.user_mode,
            user_threshold: state.user_threshold,
            user_misses: state.user_misses,
        }
    }

    fn connect(self: &Arc<Self>) -> Result<(), DriverError> {
        let (Some(irq), Some(gate)) = (self.irq, &self.gate) else {
            return Err(DriverError::Unsupported);
        };
        if !self.mapped.swap(true, Ordering::AcqRel) {
            let weak = Arc::downgrade(self);
            let mapped = self.platform.irq.map(
                irq,
                Arc::new(move |_: IrqNumber| {
                    weak.upgrade()
                        .map_or(IrqReturn::None, |w| w.handle_interrupt())
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

    fn disconnect(&self) {
        if let Some(gate) = &self.gate {
            gate.disable();
        }
        if let Some(irq) = self.irq {
            if self.mapped.swap(false, Ordering::AcqRel) {
                self.platform.irq.unmap(irq);
            }
        }
    }
}
