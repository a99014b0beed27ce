//! Shared interrupt enable/disable.
//!
//! Several sources may sit on one controller IRQ: buttons, the reset line
//! and MoCA chips wired onto a shared external line. Each source takes a
//! [`GateHold`] on the line's [`IrqGate`] and enables or disables only its
//! own hold. The controller line is unmasked while at least one hold is
//! enabled and masked when the last one drops, so one source masking
//! itself never leaves the others deaf.

use alloc::sync::Arc;
use alloc::vec::Vec;

use bsp_core::id::IrqNumber;
use bsp_core::sync::{IrqSpinLock, SpinLock};
use bsp_driver_api::InterruptController;

use crate::loom_compat::{AtomicBool, Ordering};

/// Enable state of one controller IRQ.
pub struct IrqGate {
    irq: IrqNumber,
    /// Enabled holds.
    holders: IrqSpinLock<u32>,
    ctrl: Arc<dyn InterruptController>,
}

impl IrqGate {
    /// Creates a gate and forces the line masked so the tracked state matches.
    pub fn new(ctrl: Arc<dyn InterruptController>, irq: IrqNumber) -> Self {
        ctrl.disable(irq);
        Self {
            irq,
            holders: IrqSpinLock::named("irq-gate", 0),
            ctrl,
        }
    }

    /// The gated IRQ.
    pub fn irq(&self) -> IrqNumber {
        self.irq
    }

    /// Returns `true` while the line is unmasked.
    pub fn is_enabled(&self) -> bool {
        *self.holders.lock() > 0
    }

    /// Number of holds currently keeping the line unmasked.
    pub fn holders(&self) -> u32 {
        *self.holders.lock()
    }
}

/// One source's claim on a shared [`IrqGate`].
///
/// Enabling and disabling a hold is idempotent. Dropping an enabled hold
/// releases it.
pub struct GateHold {
    gate: Arc<IrqGate>,
    held: AtomicBool,
}

impl GateHold {
    /// Creates a disabled hold on `gate`.
    pub fn new(gate: Arc<IrqGate>) -> Self {
        Self {
            gate,
            held: AtomicBool::new(false),
        }
    }

    /// The gated IRQ.
    pub fn irq(&self) -> IrqNumber {
        self.gate.irq
    }

    /// The shared gate.
    pub fn gate(&self) -> &Arc<IrqGate> {
        &self.gate
    }

    /// Enables this hold, unmasking the line if it was the first. Returns
    /// `false` if the hold already was enabled.
    pub fn enable(&self) -> bool {
        let mut holders = self.gate.holders.lock();
        if self.held.swap(true, Ordering::AcqRel) {
            return false;
        }
        *holders += 1;
        if *holders == 1 {
            self.gate.ctrl.enable(self.gate.irq);
        }
        true
    }

    /// Disables this hold, masking the line if it was the last. Returns
    /// `false` if the hold already was disabled.
    pub fn disable(&self) -> bool {
        let mut holders = self.gate.holders.lock();
        if !self.held.swap(false, Ordering::AcqRel) {
            return false;
        }
        *holders = holders.saturating_sub(1);
        if *holders == 0 {
            self.gate.ctrl.disable(self.gate.irq);
        }
        true
    }

    /// Returns `true` while this hold is enabled.
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl Drop for GateHold {
    fn drop(&mut self) {
        self.disable();
    }
}

/// One [`IrqGate`] per controller IRQ.
pub struct GateTable {
    ctrl: Arc<dyn InterruptController>,
    gates: SpinLock<Vec<Arc<IrqGate>>>,
}

impl GateTable {
    /// Creates an empty table over `ctrl`.
    pub fn new(ctrl: Arc<dyn InterruptController>) -> Self {
        Self {
            ctrl,
            gates: SpinLock::named("irq-gates", Vec::new()),
        }
    }

    /// Returns the gate for `irq`, creating it (masked) on first use.
    pub fn gate(&self, irq: IrqNumber) -> Arc<IrqGate> {
        let mut gates = self.gates.lock();
        if let Some(g) = gates.iter().find(|g| g.irq == irq) {
            return g.clone();
        }
        let gate = Arc::new(IrqGate::new(self.ctrl.clone(), irq));
        gates.push(gate.clone());
        gate
    }

    /// Takes a new, disabled hold on `irq`'s gate.
    pub fn hold(&self, irq: IrqNumber) -> GateHold {
        GateHold::new(self.gate(irq))
    }
}
