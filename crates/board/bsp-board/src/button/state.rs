//! Per-button debounced state and its transitions.
//!
//! Every transition is a check-and-set: it returns the event to publish,
//! or `None` when the button is not in a state the transition applies to.
//! Interrupt handlers and the poll timer race to apply transitions under
//! the button's lock, and whichever loses sees `None` and does nothing.

use bsp_core::id::ButtonId;
use bsp_core::time::Timestamp;

/// Debounced button phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    /// Not pressed.
    Idle,
    /// Pressed, no hold observed yet.
    Pressed,
    /// Still down at one or more polls after the press.
    Held,
}

/// What happened to a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Idle to pressed.
    Press,
    /// Still down at a poll.
    Hold,
    /// Back to idle.
    Release,
}

/// Immutable record handed from interrupt context to the button worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    /// Source button.
    pub button: ButtonId,
    /// Transition.
    pub kind: EventKind,
    /// When the transition was observed.
    pub at: Timestamp,
}

/// Debounced state of one button.
#[derive(Debug, Clone)]
pub struct ButtonState {
    id: ButtonId,
    phase: ButtonPhase,
    last_press: Timestamp,
    last_hold: Timestamp,
    last_release: Timestamp,
}

impl ButtonState {
    /// Creates an idle state for `id`.
    pub const fn new(id: ButtonId) -> Self {
        Self {
            id,
            phase: ButtonPhase::Idle,
            last_press: Timestamp::ZERO,
            last_hold: Timestamp::ZERO,
            last_release: Timestamp::ZERO,
        }
    }

    /// Current phase.
    pub const fn phase(&self) -> ButtonPhase {
        self.phase
    }

    /// `true` between a press and its release.
    pub const fn is_active(&self) -> bool {
        !matches!(self.phase, ButtonPhase::Idle)
    }

    /// Time of the last accepted press.
    pub const fn last_press(&self) -> Timestamp {
        self.last_press
    }

    /// Time of the last hold.
    pub const fn last_hold(&self) -> Timestamp {
        self.last_hold
    }

    /// Time of the last release.
    pub const fn last_release(&self) -> Timestamp {
        self.last_release
    }

    /// Idle to pressed. Ignored while already active.
    pub fn press(&mut self, now: Timestamp) -> Option<ButtonEvent> {
        if self.is_active() {
            return None;
        }
        self.phase = ButtonPhase::Pressed;
        self.last_press = now;
        Some(self.event(EventKind::Press, now))
    }

    /// Pressed or held to held. Ignored while idle.
    pub fn hold(&mut self, now: Timestamp) -> Option<ButtonEvent> {
        if !self.is_active() {
            return None;
        }
        self.phase = ButtonPhase::Held;
        self.last_hold = now;
        Some(self.event(EventKind::Hold, now))
    }

    /// Back to idle. Only the first caller after a press gets the event.
    pub fn release(&mut self, now: Timestamp) -> Option<ButtonEvent> {
        if !self.is_active() {
            return None;
        }
        self.phase = ButtonPhase::Idle;
        self.last_release = now;
        Some(self.event(EventKind::Release, now))
    }

    fn event(&self, kind: EventKind, at: Timestamp) -> ButtonEvent {
        ButtonEvent {
            button: self.id,
            kind,
            at,
        }
    }
}
