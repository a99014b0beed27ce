//! Hosted simulation of the board platform.
//!
//! Every capability is a fake driven by the test: GPIO levels are set
//! directly, interrupts are raised with [`FakeIrq::fire`], time moves only
//! through [`Sim::advance`], and spawned tasks and deferred work run when
//! the test asks.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Waker};

use bsp_board::Platform;
use bsp_board::button::{ButtonAction, EventKind, Hook, HookCall, HookTrigger};
use bsp_board::pin::{GpioLine, Polarity};
use bsp_core::id::{ExtIrqLine, GpioPin, IrqNumber};
use bsp_driver_api::{
    BoardServices, BoxTask, ClockSource, Direction, DriverError, Gpio, InterruptController,
    IrqHandler, IrqReturn, OneShotTimer, TimerCallback, TimerService, Watchdog, Work,
};

/// First controller IRQ number external lines map to.
pub const EXT_IRQ_BASE: u32 = 32;

#[derive(Default)]
pub struct FakeGpio {
    levels: Mutex<HashMap<u16, bool>>,
    directions: Mutex<HashMap<u16, Direction>>,
}

impl FakeGpio {
    pub fn set(&self, pin: u16, high: bool) {
        self.levels.lock().unwrap().insert(pin, high);
    }

    pub fn level(&self, pin: u16) -> bool {
        self.levels.lock().unwrap().get(&pin).copied().unwrap_or(false)
    }

    pub fn direction(&self, pin: u16) -> Option<Direction> {
        self.directions.lock().unwrap().get(&pin).copied()
    }
}

impl Gpio for FakeGpio {
    fn read_level(&self, pin: GpioPin) -> bool {
        self.level(pin.as_u16())
    }

    fn set_direction(&self, pin: GpioPin, dir: Direction) {
        self.directions.lock().unwrap().insert(pin.as_u16(), dir);
    }

    fn set_level(&self, pin: GpioPin, high: bool) {
        self.set(pin.as_u16(), high);
    }
}

#[derive(Default)]
pub struct FakeIrq {
    handlers: Mutex<HashMap<u32, Vec<IrqHandler>>>,
    enabled: Mutex<HashSet<u32>>,
    pending: Mutex<HashSet<u32>>,
    enables: AtomicUsize,
    disables: AtomicUsize,
}

impl FakeIrq {
    /// Delivers `irq` to every attached handler, unless it is masked.
    pub fn fire(&self, irq: IrqNumber) -> Vec<IrqReturn> {
        if !self.is_enabled(irq) {
            return Vec::new();
        }
        let handlers = self
            .handlers
            .lock()
            .unwrap()
            .get(&irq.as_u32())
            .cloned()
            .unwrap_or_default();
        handlers.iter().map(|h| h(irq)).collect()
    }

    /// Raises external line `line`.
    pub fn fire_line(&self, line: u8) -> Vec<IrqReturn> {
        self.fire(ext_irq(line))
    }

    pub fn is_enabled(&self, irq: IrqNumber) -> bool {
        self.enabled.lock().unwrap().contains(&irq.as_u32())
    }

    pub fn is_mapped(&self, irq: IrqNumber) -> bool {
        self.handlers
            .lock()
            .unwrap()
            .get(&irq.as_u32())
            .is_some_and(|h| !h.is_empty())
    }

    pub fn set_pending(&self, irq: IrqNumber, pending: bool) {
        let mut set = self.pending.lock().unwrap();
        if pending {
            set.insert(irq.as_u32());
        } else {
            set.remove(&irq.as_u32());
        }
    }

    pub fn enable_calls(&self) -> usize {
        self.enables.load(Ordering::SeqCst)
    }

    pub fn disable_calls(&self) -> usize {
        self.disables.load(Ordering::SeqCst)
    }
}

impl InterruptController for FakeIrq {
    fn map_external(&self, line: ExtIrqLine) -> Result<IrqNumber, DriverError> {
        if line.as_usize() >= 8 {
            return Err(DriverError::InvalidId);
        }
        Ok(IrqNumber::new(EXT_IRQ_BASE + u32::from(line.as_u8())))
    }

    fn map(&self, irq: IrqNumber, handler: IrqHandler) -> Result<(), DriverError> {
        self.handlers
            .lock()
            .unwrap()
            .entry(irq.as_u32())
            .or_default()
            .push(handler);
        Ok(())
    }

    fn unmap(&self, irq: IrqNumber) {
        self.handlers.lock().unwrap().remove(&irq.as_u32());
    }

    fn enable(&self, irq: IrqNumber) {
        self.enables.fetch_add(1, Ordering::SeqCst);
        self.enabled.lock().unwrap().insert(irq.as_u32());
    }

    fn disable(&self, irq: IrqNumber) {
        self.disables.fetch_add(1, Ordering::SeqCst);
        self.enabled.lock().unwrap().remove(&irq.as_u32());
    }

    fn is_pending(&self, irq: IrqNumber) -> bool {
        self.pending.lock().unwrap().contains(&irq.as_u32())
    }
}

#[derive(Default)]
pub struct FakeClock {
    ms: AtomicU64,
}

impl FakeClock {
    pub fn now_ms(&self) -> u64 {
        self.ms.load(Ordering::SeqCst)
    }

    fn set_ms(&self, ms: u64) {
        self.ms.store(ms, Ordering::SeqCst);
    }
}

impl ClockSource for FakeClock {
    fn read_nanos(&self) -> u64 {
        self.now_ms() * 1_000_000
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WdOp {
    Arm(u32),
    Pet,
    Disarm,
}

#[derive(Default)]
pub struct FakeWatchdog {
    ops: Mutex<Vec<WdOp>>,
}

impl FakeWatchdog {
    pub fn ops(&self) -> Vec<WdOp> {
        self.ops.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<WdOp> {
        self.ops.lock().unwrap().last().copied()
    }

    pub fn pets(&self) -> usize {
        self.ops().iter().filter(|op| **op == WdOp::Pet).count()
    }
}

impl Watchdog for FakeWatchdog {
    fn arm(&self, timeout_us: u32) {
        self.ops.lock().unwrap().push(WdOp::Arm(timeout_us));
    }

    fn pet(&self) {
        self.ops.lock().unwrap().push(WdOp::Pet);
    }

    fn disarm(&self) {
        self.ops.lock().unwrap().push(WdOp::Disarm);
    }
}

struct TimerSlot {
    deadline: Option<u64>,
    callback: TimerCallback,
}

pub struct FakeTimers {
    clock: Arc<FakeClock>,
    slots: Arc<Mutex<Vec<TimerSlot>>>,
}

impl FakeTimers {
    fn new(clock: Arc<FakeClock>) -> Self {
        Self {
            clock,
            slots: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Fires the earliest timer due at or before `until`, moving the clock
    /// to its deadline. Returns `false` if none is due.
    fn fire_next(&self, until: u64) -> bool {
        let due = {
            let mut slots = self.slots.lock().unwrap();
            let next = slots
                .iter_mut()
                .filter(|s| s.deadline.is_some_and(|d| d <= until))
                .min_by_key(|s| s.deadline);
            match next {
                Some(slot) => {
                    let deadline = slot.deadline.take().unwrap_or(until);
                    Some((deadline, slot.callback.clone()))
                }
                None => None,
            }
        };
        match due {
            Some((deadline, callback)) => {
                self.clock.set_ms(deadline.max(self.clock.now_ms()));
                callback();
                true
            }
            None => false,
        }
    }

    pub fn armed(&self) -> usize {
        self.slots
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.deadline.is_some())
            .count()
    }
}

struct FakeTimer {
    index: usize,
    clock: Arc<FakeClock>,
    slots: Arc<Mutex<Vec<TimerSlot>>>,
}

impl OneShotTimer for FakeTimer {
    fn arm(&self, delay_ms: u64) -> bool {
        let deadline = self.clock.now_ms() + delay_ms;
        self.slots.lock().unwrap()[self.index]
            .deadline
            .replace(deadline)
            .is_some()
    }

    fn cancel(&self) -> bool {
        self.slots.lock().unwrap()[self.index].deadline.take().is_some()
    }
}

impl TimerService for FakeTimers {
    fn create_timer(&self, callback: TimerCallback) -> Box<dyn OneShotTimer> {
        let mut slots = self.slots.lock().unwrap();
        slots.push(TimerSlot {
            deadline: None,
            callback,
        });
        Box::new(FakeTimer {
            index: slots.len() - 1,
            clock: self.clock.clone(),
            slots: self.slots.clone(),
        })
    }
}

#[derive(Default)]
pub struct FakeServices {
    tasks: Mutex<Vec<(String, BoxTask)>>,
    work: Mutex<VecDeque<Work>>,
    restarts: AtomicUsize,
    restores: AtomicUsize,
    fail_restore: std::sync::atomic::AtomicBool,
}

impl FakeServices {
    /// Polls every task until none makes progress.
    pub fn run_tasks(&self) {
        let waker = Waker::noop();
        let mut cx = Context::from_waker(waker);
        for _ in 0..4 {
            let mut tasks = std::mem::take(&mut *self.tasks.lock().unwrap());
            tasks.retain_mut(|(_, task)| task.as_mut().poll(&mut cx).is_pending());
            let mut slot = self.tasks.lock().unwrap();
            tasks.append(&mut slot);
            *slot = tasks;
        }
    }

    /// Runs queued deferred work, including work queued while running.
    pub fn run_work(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.work.lock().unwrap().pop_front();
            match next {
                Some(work) => {
                    work();
                    ran += 1;
                }
                None => return ran,
            }
        }
    }

    pub fn task_names(&self) -> Vec<String> {
        self.tasks
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect()
    }

    pub fn queued_work(&self) -> usize {
        self.work.lock().unwrap().len()
    }

    pub fn restarts(&self) -> usize {
        self.restarts.load(Ordering::SeqCst)
    }

    pub fn restores(&self) -> usize {
        self.restores.load(Ordering::SeqCst)
    }

    pub fn fail_restore(&self) {
        self.fail_restore.store(true, Ordering::SeqCst);
    }
}

impl BoardServices for FakeServices {
    fn spawn(&self, name: &str, task: BoxTask) {
        self.tasks.lock().unwrap().push((name.to_owned(), task));
    }

    fn schedule_work(&self, work: Work) {
        self.work.lock().unwrap().push_back(work);
    }

    fn restart(&self) {
        self.restarts.fetch_add(1, Ordering::SeqCst);
    }

    fn restore_defaults(&self) -> Result<(), DriverError> {
        self.restores.fetch_add(1, Ordering::SeqCst);
        if self.fail_restore.load(Ordering::SeqCst) {
            Err(DriverError::Unsupported)
        } else {
            Ok(())
        }
    }
}

/// All fakes, wired together.
pub struct Sim {
    pub gpio: Arc<FakeGpio>,
    pub irq: Arc<FakeIrq>,
    pub clock: Arc<FakeClock>,
    pub watchdog: Arc<FakeWatchdog>,
    pub timers: Arc<FakeTimers>,
    pub services: Arc<FakeServices>,
}

impl Sim {
    pub fn new() -> Self {
        let clock = Arc::new(FakeClock::default());
        Self {
            gpio: Arc::new(FakeGpio::default()),
            irq: Arc::new(FakeIrq::default()),
            timers: Arc::new(FakeTimers::new(clock.clone())),
            clock,
            watchdog: Arc::new(FakeWatchdog::default()),
            services: Arc::new(FakeServices::default()),
        }
    }

    pub fn platform(&self) -> Platform {
        Platform {
            gpio: self.gpio.clone(),
            irq: self.irq.clone(),
            clock: self.clock.clone(),
            watchdog: self.watchdog.clone(),
            timers: self.timers.clone(),
            services: self.services.clone(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Moves time forward by `ms`, firing timers in deadline order and
    /// letting workers run after each one.
    pub fn advance(&self, ms: u64) {
        let until = self.clock.now_ms() + ms;
        while self.timers.fire_next(until) {
            self.services.run_tasks();
        }
        self.clock.set_ms(until);
        self.services.run_tasks();
    }
}

impl Default for Sim {
    fn default() -> Self {
        Self::new()
    }
}

/// IRQ number external line `line` maps to.
pub fn ext_irq(line: u8) -> IrqNumber {
    IrqNumber::new(EXT_IRQ_BASE + u32::from(line))
}

pub fn active_high(pin: u16) -> GpioLine {
    GpioLine::new(GpioPin::new(pin), Polarity::ActiveHigh)
}

pub fn active_low(pin: u16) -> GpioLine {
    GpioLine::new(GpioPin::new(pin), Polarity::ActiveLow)
}

/// One observed hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub kind: EventKind,
    pub at_ms: u64,
    pub held_ms: u64,
    pub param: u64,
}

/// Records every hook call it is attached to.
#[derive(Default, Clone)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Fired>>>,
}

impl Recorder {
    pub fn hook(&self, trigger: HookTrigger, param: u64) -> Hook {
        let calls = self.calls.clone();
        let action = ButtonAction::Custom(Arc::new(move |call: &HookCall| {
            calls.lock().unwrap().push(Fired {
                kind: call.kind,
                at_ms: call.at.as_millis(),
                held_ms: call.held_ms,
                param: call.param,
            });
        }));
        Hook::new(trigger, action, param)
    }

    pub fn calls(&self) -> Vec<Fired> {
        self.calls.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.calls().iter().map(|c| c.kind).collect()
    }
}
