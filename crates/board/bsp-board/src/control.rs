//! Userspace control surface.
//!
//! The character-device glue (ioctl numbers, proc files, copy to and from
//! user memory) belongs to the embedding kernel. It forwards to
//! [`BoardControl`], which implements the semantics: watchdog control
//! writes and status reads, per-handle button event masks, and the SES
//! event window.

use alloc::string::{String, ToString};
use alloc::sync::{Arc, Weak};
use alloc::vec::Vec;
use core::fmt;
use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicU32, Ordering};
use core::task::{Context, Poll};

use bitflags::bitflags;
use bsp_core::sync::{HeapWaitQueue, SpinLock};
use log::debug;

use crate::button::EventKind;
use crate::config::{WATCHDOG_CONTROL_MAX, WATCHDOG_SERVICES_PER_PERIOD};
use crate::platform::Platform;
use crate::ses::SesMonitor;
use crate::watchdog::{WatchdogConfig, WatchdogSupervisor};

bitflags! {
    /// Button trigger events a handle can subscribe to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ButtonEvents: u32 {
        /// A button was pressed.
        const PRESSED = 0x1;
        /// A button is being held.
        const HOLD = 0x2;
        /// A button was released.
        const RELEASED = 0x4;
    }
}

impl From<EventKind> for ButtonEvents {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Press => Self::PRESSED,
            EventKind::Hold => Self::HOLD,
            EventKind::Release => Self::RELEASED,
        }
    }
}

/// Errors returned to userspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlError {
    /// Input could not be read or parsed.
    Fault,
    /// Input parsed but was rejected.
    Invalid,
}

impl ControlError {
    /// The errno value reported to userspace.
    pub const fn errno(self) -> i32 {
        match self {
            Self::Fault => 14,
            Self::Invalid => 22,
        }
    }
}

impl fmt::Display for ControlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fault => f.write_str("bad address or format"),
            Self::Invalid => f.write_str("invalid argument"),
        }
    }
}

struct HandleState {
    mask: AtomicU32,
    pending: AtomicU32,
}

/// Fans button events out to open control handles.
pub struct EventMonitor {
    handles: SpinLock<Vec<Weak<HandleState>>>,
    waiters: HeapWaitQueue,
}

impl EventMonitor {
    /// Creates a monitor with no handles.
    pub fn new() -> Self {
        Self {
            handles: SpinLock::named("event-handles", Vec::new()),
            waiters: HeapWaitQueue::new(),
        }
    }

    /// Latches `events` on every handle whose mask includes them.
    pub fn publish(&self, events: ButtonEvents) {
        let mut delivered = false;
        self.handles.lock().retain(|weak| {
            let Some(handle) = weak.upgrade() else {
                return false;
            };
            let hit = handle.mask.load(Ordering::Acquire) & events.bits();
            if hit != 0 {
                handle.pending.fetch_or(hit, Ordering::AcqRel);
                delivered = true;
            }
            true
        });
        if delivered {
            self.waiters.wake_all();
        }
    }

    fn attach(&self) -> Arc<HandleState> {
        let state = Arc::new(HandleState {
            mask: AtomicU32::new(0),
            pending: AtomicU32::new(0),
        });
        let mut handles = self.handles.lock();
        handles.retain(|weak| weak.strong_count() > 0);
        handles.push(Arc::downgrade(&state));
        state
    }
}

impl Default for EventMonitor {
    fn default() -> Self {
        Self::new()
    }
}

/// One open handle on the board control device.
pub struct ControlHandle {
    state: Arc<HandleState>,
    monitor: Arc<EventMonitor>,
}

impl ControlHandle {
    /// Sets which button events this handle receives.
    pub fn set_event_mask(&self, mask: ButtonEvents) {
        self.state.mask.store(mask.bits(), Ordering::Release);
        debug!("control: event mask {mask:?}");
    }

    /// Events this handle receives.
    pub fn event_mask(&self) -> ButtonEvents {
        ButtonEvents::from_bits_truncate(self.state.mask.load(Ordering::Acquire))
    }

    /// Latched events, without consuming them.
    pub fn poll(&self) -> ButtonEvents {
        ButtonEvents::from_bits_truncate(self.state.pending.load(Ordering::Acquire))
    }

    /// Consumes latched events.
    pub fn read(&self) -> Option<ButtonEvents> {
        let bits = self.state.pending.swap(0, Ordering::AcqRel);
        (bits != 0).then(|| ButtonEvents::from_bits_truncate(bits))
    }

    /// Future completing with the next latched events.
    pub fn wait(&self) -> WaitEvents<'_> {
        WaitEvents { handle: self }
    }
}

/// Future returned by [`ControlHandle::wait`].
pub struct WaitEvents<'a> {
    handle: &'a ControlHandle,
}

impl Future for WaitEvents<'_> {
    type Output = ButtonEvents;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<ButtonEvents> {
        if let Some(events) = self.handle.read() {
            return Poll::Ready(events);
        }
        self.handle.monitor.waiters.register_waker(cx.waker());
        match self.handle.read() {
            Some(events) => Poll::Ready(events),
            None => Poll::Pending,
        }
    }
}

/// Userspace-facing operations.
pub struct BoardControl {
    watchdog: Arc<WatchdogSupervisor>,
    monitor: Arc<EventMonitor>,
    ses: Arc<SesMonitor>,
    platform: Platform,
}

impl BoardControl {
    pub(crate) fn new(
        watchdog: Arc<WatchdogSupervisor>,
        monitor: Arc<EventMonitor>,
        ses: Arc<SesMonitor>,
        platform: Platform,
    ) -> Self {
        Self {
            watchdog,
            monitor,
            ses,
            platform,
        }
    }

    /// Handles a write to the watchdog control file.
    ///
    /// Input starting with `OK` (any case) is a liveness heartbeat; the
    /// rest of it is ignored. Anything else must be
    /// `enabled timer_us user_mode user_threshold`, with the threshold in
    /// watchdog periods. Returns the number of bytes consumed.
    pub fn watchdog_write(&self, input: &[u8]) -> Result<usize, ControlError> {
        let len = input.len();
        let input = &input[..len.min(WATCHDOG_CONTROL_MAX)];
        if input.get(..2).is_some_and(|p| p.eq_ignore_ascii_case(b"OK")) {
            self.watchdog.heartbeat();
            return Ok(len);
        }

        let text = core::str::from_utf8(input).map_err(|_| ControlError::Fault)?;
        let text = text.trim_end_matches(['\0', '\n', '\r', ' ', '\t']);

        let mut config: WatchdogConfig = text.parse().map_err(|_| ControlError::Fault)?;
        config.user_threshold = config
            .user_threshold
            .saturating_mul(WATCHDOG_SERVICES_PER_PERIOD);
        self.watchdog
            .configure(config)
            .map_err(|_| ControlError::Invalid)?;
        Ok(len)
    }

    /// Renders the watchdog status file.
    pub fn watchdog_read(&self) -> String {
        self.watchdog.status().to_string()
    }

    /// Sends a liveness heartbeat.
    pub fn heartbeat(&self) {
        self.watchdog.heartbeat();
    }

    /// Opens a handle with an empty event mask.
    pub fn open(&self) -> ControlHandle {
        ControlHandle {
            state: self.monitor.attach(),
            monitor: self.monitor.clone(),
        }
    }

    /// Is a SES event waiting?
    pub fn ses_poll(&self) -> bool {
        self.ses.poll(self.platform.now())
    }

    /// Consumes the SES event.
    pub fn ses_read(&self) -> Result<(), ControlError> {
        if self.ses.read(self.platform.now()) {
            Ok(())
        } else {
            Err(ControlError::Invalid)
        }
    }
}
