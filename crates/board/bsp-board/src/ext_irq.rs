//! Shared external-interrupt registry.
//!
//! Records, per external line, the trigger polarity and sharing mode of
//! the first registration and which logical sources sit on the line. A
//! later registration whose trigger type differs marks the line
//! conflicted for the rest of the module lifetime: every source on it
//! must then be refused the interrupt.
//!
//! The registry is filled during bring-up and only read afterwards. Line
//! flags are atomics so an early interrupt always observes a complete
//! value.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicU8, Ordering};

use bitflags::bitflags;
use bsp_core::id::{ButtonId, ExtIrqLine, MocaDevice};
use bsp_core::sync::IrqSpinLock;
use bsp_driver_api::DriverError;
use log::error;

use crate::config::MAX_EXT_IRQ_LINES;
use crate::desc::ExtIrqDesc;
use crate::pin::{GpioLine, Polarity};

bitflags! {
    /// Per-line registration state.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LineFlags: u8 {
        /// At least one source registered the line.
        const REGISTERED = 1 << 0;
        /// Trigger is active-high.
        const ACTIVE_HIGH = 1 << 1;
        /// Line is shared between sources.
        const SHARED = 1 << 2;
        /// Sources disagreed on the trigger type.
        const CONFLICT = 1 << 3;
    }
}

impl LineFlags {
    fn for_desc(desc: &ExtIrqDesc) -> Self {
        let mut flags = Self::REGISTERED;
        if desc.polarity == Polarity::ActiveHigh {
            flags |= Self::ACTIVE_HIGH;
        }
        if desc.shared {
            flags |= Self::SHARED;
        }
        flags
    }
}

/// The logical source behind a registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A push-button.
    Button(ButtonId),
    /// The restore-to-default line.
    Reset,
    /// The wireless-setup button.
    Ses,
    /// A MoCA chip.
    Moca(MocaDevice),
}

/// A source registered on a line, with the GPIO that tells whether it is
/// the one asserting the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sharer {
    /// Source identity.
    pub source: SourceKind,
    /// Disambiguation GPIO, if the board has one for this source.
    pub gpio: Option<GpioLine>,
}

/// Registry of external-interrupt lines.
pub struct ExtIrqRegistry {
    lines: [AtomicU8; MAX_EXT_IRQ_LINES],
    sharers: IrqSpinLock<Vec<(ExtIrqLine, Sharer)>>,
}

impl ExtIrqRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            lines: [const { AtomicU8::new(0) }; MAX_EXT_IRQ_LINES],
            sharers: IrqSpinLock::named("ext-irq-sharers", Vec::new()),
        }
    }

    /// Registers `source` on the line described by `desc`.
    ///
    /// Registering the same source twice is harmless. Fails with
    /// [`DriverError::IrqConflict`] if the line is, or becomes, conflicted.
    pub fn register(
        &self,
        desc: &ExtIrqDesc,
        source: SourceKind,
        gpio: Option<GpioLine>,
    ) -> Result<(), DriverError> {
        let slot = self.slot(desc.line)?;
        let want = LineFlags::for_desc(desc);

        let mut current = LineFlags::from_bits_retain(slot.load(Ordering::Acquire));
        loop {
            if current.contains(LineFlags::CONFLICT) {
                return Err(DriverError::IrqConflict);
            }
            if current.contains(LineFlags::REGISTERED) {
                if current != want {
                    slot.fetch_or(LineFlags::CONFLICT.bits(), Ordering::AcqRel);
                    error!(
                        "{}: conflicting trigger types ({:?} vs {:?}), line disabled",
                        desc.line, current, want
                    );
                    return Err(DriverError::IrqConflict);
                }
                break;
            }
            match slot.compare_exchange(
                current.bits(),
                want.bits(),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(seen) => current = LineFlags::from_bits_retain(seen),
            }
        }

        let mut sharers = self.sharers.lock();
        if !sharers
            .iter()
            .any(|(line, s)| *line == desc.line && s.source == source)
        {
            sharers.push((desc.line, Sharer { source, gpio }));
        }
        Ok(())
    }

    /// Returns the flags recorded for `line` (empty if out of range).
    pub fn flags(&self, line: ExtIrqLine) -> LineFlags {
        self.lines.get(line.as_usize()).map_or(LineFlags::empty(), |slot| {
            LineFlags::from_bits_retain(slot.load(Ordering::Acquire))
        })
    }

    /// Returns `true` once any source registered `line`.
    pub fn is_registered(&self, line: ExtIrqLine) -> bool {
        self.flags(line).contains(LineFlags::REGISTERED)
    }

    /// Returns `true` if `line` was registered as shared.
    pub fn is_shared(&self, line: ExtIrqLine) -> bool {
        self.flags(line).contains(LineFlags::SHARED)
    }

    /// Returns `true` if `line` saw incompatible registrations.
    pub fn is_conflicted(&self, line: ExtIrqLine) -> bool {
        self.flags(line).contains(LineFlags::CONFLICT)
    }

    /// Trigger polarity recorded for `line`.
    pub fn polarity(&self, line: ExtIrqLine) -> Option<Polarity> {
        let flags = self.flags(line);
        if !flags.contains(LineFlags::REGISTERED) {
            None
        } else if flags.contains(LineFlags::ACTIVE_HIGH) {
            Some(Polarity::ActiveHigh)
        } else {
            Some(Polarity::ActiveLow)
        }
    }

    /// Snapshot of the sources registered on `line`.
    pub fn sharers(&self, line: ExtIrqLine) -> Vec<Sharer> {
        self.sharers
            .lock()
            .iter()
            .filter(|(l, _)| *l == line)
            .map(|(_, s)| *s)
            .collect()
    }

    fn slot(&self, line: ExtIrqLine) -> Result<&AtomicU8, DriverError> {
        self.lines.get(line.as_usize()).ok_or(DriverError::InvalidId)
    }
}

impl Default for ExtIrqRegistry {
    fn default() -> Self {
        Self::new()
    }
}
