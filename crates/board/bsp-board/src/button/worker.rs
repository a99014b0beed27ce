//! The per-button worker task.
//!
//! Interrupt handlers and the poll timer only publish [`ButtonEvent`]s.
//! This task is the single consumer for its button: it runs hooks in event
//! order, never two at once, and is the only place hooks may block.

use alloc::sync::Arc;

use bsp_core::time::Timestamp;
use log::trace;

use super::Button;
use super::hooks::{Hook, HookCall, HookContext, HookTrigger};
use super::state::{ButtonEvent, EventKind};

pub(crate) struct Worker {
    button: Arc<Button>,
    ctx: Arc<HookContext>,
    pressed_at: Timestamp,
    /// Held time already covered by once-per-press hold hooks.
    holds_through: Option<u64>,
}

impl Worker {
    pub(crate) fn new(button: Arc<Button>, ctx: Arc<HookContext>) -> Self {
        Self {
            button,
            ctx,
            pressed_at: Timestamp::ZERO,
            holds_through: None,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            let event = self.button.events.recv().await;
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: ButtonEvent) {
        trace!("button {}: {:?} at {}", event.button, event.kind, event.at);
        let hooks = self.button.hooks();
        match event.kind {
            EventKind::Press => {
                self.pressed_at = event.at;
                self.holds_through = None;
                for hook in hooks.iter().filter(|h| h.trigger == HookTrigger::Press) {
                    self.fire(hook, event, 0);
                }
                self.ctx.monitor.publish(event.kind.into());
                if self.button.has_release_edge() {
                    self.button.unmask();
                }
            }
            EventKind::Hold => {
                let held = event.at.saturating_since(self.pressed_at);
                let through = self.holds_through;
                for hook in &hooks {
                    let due = match hook.trigger {
                        HookTrigger::Hold { after_ms } => {
                            after_ms <= held && through.is_none_or(|t| after_ms > t)
                        }
                        HookTrigger::HoldRepeat { after_ms } => after_ms <= held,
                        _ => false,
                    };
                    if due {
                        self.fire(hook, event, held);
                    }
                }
                self.holds_through = Some(held);
                self.ctx.monitor.publish(event.kind.into());
            }
            EventKind::Release => {
                let held = event.at.saturating_since(self.pressed_at);
                let chosen = longest_release_threshold(&hooks, held);
                for hook in &hooks {
                    if let HookTrigger::Release { after_ms } = hook.trigger {
                        if Some(after_ms) == chosen {
                            self.fire(hook, event, held);
                        }
                    }
                }
                self.ctx.monitor.publish(event.kind.into());
                self.button.unmask();
            }
        }
    }

    fn fire(&self, hook: &Hook, event: ButtonEvent, held_ms: u64) {
        let call = HookCall {
            button: event.button,
            kind: event.kind,
            at: event.at,
            held_ms,
            param: hook.param,
        };
        hook.action.invoke(&self.ctx, &call);
    }
}

/// The largest release threshold not above `held`.
fn longest_release_threshold(hooks: &[Hook], held: u64) -> Option<u64> {
    hooks
        .iter()
        .filter_map(|h| match h.trigger {
            HookTrigger::Release { after_ms } if after_ms <= held => Some(after_ms),
            _ => None,
        })
        .max()
}
