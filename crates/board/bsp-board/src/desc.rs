//! Board description supplied by the platform at bring-up.
//!
//! Plain data: the platform fills it from whatever board parameter store
//! it has. A missing or inconsistent entry only disables the unit it
//! describes.

use alloc::vec::Vec;

use bsp_core::id::{ButtonId, ExtIrqLine, IrqNumber, MocaDevice};

use crate::button::Hook;
use crate::pin::{GpioLine, Polarity};

/// An external-interrupt binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtIrqDesc {
    /// Line index.
    pub line: ExtIrqLine,
    /// Trigger polarity.
    pub polarity: Polarity,
    /// Whether other sources are wired onto the same line.
    pub shared: bool,
}

impl ExtIrqDesc {
    /// Describes a line used by a single source.
    pub const fn exclusive(line: ExtIrqLine, polarity: Polarity) -> Self {
        Self {
            line,
            polarity,
            shared: false,
        }
    }

    /// Describes a line shared with other sources.
    pub const fn shared(line: ExtIrqLine, polarity: Polarity) -> Self {
        Self {
            line,
            polarity,
            shared: true,
        }
    }
}

/// How a button reports presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTrigger {
    /// Edge interrupt on an external line.
    Interrupt {
        /// Line binding.
        irq: ExtIrqDesc,
        /// The line also fires on the release edge.
        release_edge: bool,
    },
    /// No interrupt; the GPIO is scanned every poll interval.
    Polled,
}

/// One push-button.
#[derive(Clone)]
pub struct ButtonDesc {
    /// Logical id.
    pub id: ButtonId,
    /// GPIO reporting the button level.
    pub gpio: Option<GpioLine>,
    /// Press detection.
    pub trigger: Option<ButtonTrigger>,
    /// Hooks installed at registration.
    pub hooks: Vec<Hook>,
}

/// The restore-to-default button line.
#[derive(Debug, Clone, Copy)]
pub struct ResetDesc {
    /// Line binding.
    pub irq: ExtIrqDesc,
    /// GPIO used to attribute edges on a shared line.
    pub gpio: Option<GpioLine>,
}

/// The wireless-setup (SES) button.
#[derive(Debug, Clone, Copy)]
pub struct SesDesc {
    /// GPIO reporting the button level.
    pub gpio: Option<GpioLine>,
    /// Edge interrupt. Without one the GPIO is polled.
    pub irq: Option<ExtIrqDesc>,
}

/// One MoCA chip's host interrupt.
#[derive(Debug, Clone, Copy)]
pub struct MocaDesc {
    /// Chip index.
    pub dev: MocaDevice,
    /// Host interrupt line, if wired.
    pub irq: Option<ExtIrqDesc>,
    /// Disambiguation GPIO for a shared line.
    pub gpio: Option<GpioLine>,
}

/// Dying-gasp wiring.
#[derive(Debug, Clone, Copy)]
pub struct DyingGaspDesc {
    /// Brownout detector interrupt.
    pub irq: IrqNumber,
    /// GPIO forwarding the power-loss signal to a companion device; driven
    /// inactive once the callbacks have run.
    pub pass_gpio: Option<GpioLine>,
    /// The board runs from a battery, so the interrupt stays off.
    pub battery_backed: bool,
    /// Park the CPU after firing. Only hosted simulations clear this.
    pub halt: bool,
}

/// Everything the board core needs to know about the board.
#[derive(Clone, Default)]
pub struct BoardDescription {
    /// Push-buttons.
    pub buttons: Vec<ButtonDesc>,
    /// Restore-to-default line.
    pub reset: Option<ResetDesc>,
    /// Wireless-setup button.
    pub ses: Option<SesDesc>,
    /// MoCA chips.
    pub moca: Vec<MocaDesc>,
    /// Dying-gasp detector.
    pub dying_gasp: Option<DyingGaspDesc>,
    /// Watchdog service interrupt.
    pub watchdog_irq: Option<IrqNumber>,
}
