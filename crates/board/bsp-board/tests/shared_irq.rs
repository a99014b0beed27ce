//! Shared external lines across buttons, the reset line and MoCA.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use bsp_board::Board;
use bsp_board::button::{EventKind, HookTrigger};
use bsp_board::desc::{
    BoardDescription, ButtonDesc, ButtonTrigger, ExtIrqDesc, MocaDesc, ResetDesc,
};
use bsp_board::ext_irq::{LineFlags, SourceKind};
use bsp_board::moca::MocaIrqHandler;
use bsp_board::pin::Polarity;
use bsp_core::id::{ButtonId, ExtIrqLine, MocaDevice};
use bsp_driver_api::IrqReturn;
use common::{Recorder, Sim, active_high, active_low, ext_irq};

fn button(id: u8, pin: u16, irq: ExtIrqDesc, rec: &Recorder) -> ButtonDesc {
    let gpio = match irq.polarity {
        Polarity::ActiveHigh => active_high(pin),
        Polarity::ActiveLow => active_low(pin),
    };
    ButtonDesc {
        id: ButtonId::new(id),
        gpio: Some(gpio),
        trigger: Some(ButtonTrigger::Interrupt {
            irq,
            release_edge: false,
        }),
        hooks: vec![rec.hook(HookTrigger::Press, 0)],
    }
}

#[test]
fn conflict_disables_every_source_on_the_line() {
    let sim = Sim::new();
    let rec = Recorder::default();
    let bad = ExtIrqLine::new(3);
    sim.gpio.set(4, true);
    let desc = BoardDescription {
        buttons: vec![
            button(0, 4, ExtIrqDesc::shared(bad, Polarity::ActiveLow), &rec),
            button(1, 5, ExtIrqDesc::exclusive(ExtIrqLine::new(0), Polarity::ActiveHigh), &rec),
        ],
        reset: Some(ResetDesc {
            irq: ExtIrqDesc::shared(bad, Polarity::ActiveHigh),
            gpio: Some(active_high(11)),
        }),
        ..BoardDescription::default()
    };
    let board = Board::init(&desc, sim.platform());

    assert!(board.registry().is_conflicted(bad));
    assert!(board.registry().flags(bad).contains(LineFlags::CONFLICT));
    assert!(board.buttons().get(ButtonId::new(0)).is_none());
    assert!(board.reset().is_none());
    assert!(!sim.irq.is_mapped(ext_irq(3)));

    // The healthy line is unaffected.
    sim.gpio.set(5, true);
    assert_eq!(sim.irq.fire_line(0), vec![IrqReturn::Handled]);
    sim.services.run_tasks();
    assert_eq!(rec.kinds(), vec![EventKind::Press]);
}

#[test]
fn compatible_sharers_are_recorded() {
    let sim = Sim::new();
    let rec = Recorder::default();
    let line = ExtIrqLine::new(2);
    let shared = ExtIrqDesc::shared(line, Polarity::ActiveLow);
    let desc = BoardDescription {
        buttons: vec![button(0, 4, shared, &rec)],
        reset: Some(ResetDesc {
            irq: shared,
            gpio: Some(active_low(11)),
        }),
        ..BoardDescription::default()
    };
    sim.gpio.set(4, true);
    sim.gpio.set(11, true);
    let board = Board::init(&desc, sim.platform());

    let registry = board.registry();
    assert!(registry.is_shared(line));
    assert!(!registry.is_conflicted(line));
    assert_eq!(registry.polarity(line), Some(Polarity::ActiveLow));
    let sources: Vec<SourceKind> = registry.sharers(line).iter().map(|s| s.source).collect();
    assert_eq!(sources, vec![SourceKind::Reset, SourceKind::Button(ButtonId::new(0))]);

    // Reset asserted: the button ignores the edge, the reset line takes it.
    sim.gpio.set(11, false);
    let results = sim.irq.fire_line(2);
    assert!(results.iter().all(|r| r.is_handled()));
    sim.services.run_tasks();
    assert!(rec.calls().is_empty());
    assert!(board.restore().in_progress());
}

#[test]
fn exclusive_and_shared_claims_conflict() {
    let sim = Sim::new();
    let rec = Recorder::default();
    let line = ExtIrqLine::new(1);
    let desc = BoardDescription {
        buttons: vec![
            button(0, 4, ExtIrqDesc::exclusive(line, Polarity::ActiveHigh), &rec),
            button(1, 5, ExtIrqDesc::shared(line, Polarity::ActiveHigh), &rec),
        ],
        ..BoardDescription::default()
    };
    let board = Board::init(&desc, sim.platform());
    assert!(board.registry().is_conflicted(line));
    assert!(board.buttons().get(ButtonId::new(0)).is_none());
    assert!(board.buttons().get(ButtonId::new(1)).is_none());
}

const MIXED_LINE: u8 = 4;
const BUTTON_PIN: u16 = 7;
const MOCA_PIN: u16 = 30;
const RESET_PIN: u16 = 11;
const CHIP: MocaDevice = MocaDevice::new(0);

/// Button 0, MoCA chip 0 and the reset line, all on one active-low line.
fn mixed_board(sim: &Sim, rec: &Recorder, with_reset: bool) -> Board {
    let shared = ExtIrqDesc::shared(ExtIrqLine::new(MIXED_LINE), Polarity::ActiveLow);
    let desc = BoardDescription {
        buttons: vec![button(0, BUTTON_PIN, shared, rec)],
        reset: with_reset.then_some(ResetDesc {
            irq: shared,
            gpio: Some(active_low(RESET_PIN)),
        }),
        moca: vec![MocaDesc {
            dev: CHIP,
            irq: Some(shared),
            gpio: Some(active_high(MOCA_PIN)),
        }],
        ..BoardDescription::default()
    };
    sim.gpio.set(BUTTON_PIN, true);
    sim.gpio.set(RESET_PIN, true);
    Board::init(&desc, sim.platform())
}

fn counting_handler(count: &Arc<AtomicUsize>) -> Arc<dyn MocaIrqHandler> {
    let count = count.clone();
    Arc::new(move |_: MocaDevice| {
        count.fetch_add(1, Ordering::SeqCst);
    })
}

#[test]
fn moca_disable_leaves_button_listening() {
    let sim = Sim::new();
    let rec = Recorder::default();
    let board = mixed_board(&sim, &rec, false);
    let moca_hits = Arc::new(AtomicUsize::new(0));
    board.moca().register(CHIP, counting_handler(&moca_hits)).unwrap();
    let irq = ext_irq(MIXED_LINE);
    assert!(sim.irq.is_enabled(irq));

    board.moca().enable(CHIP).unwrap();
    board.moca().disable(CHIP).unwrap();
    assert!(sim.irq.is_enabled(irq), "button still holds the line");

    sim.gpio.set(BUTTON_PIN, false);
    let results = sim.irq.fire_line(MIXED_LINE);
    assert!(results.contains(&IrqReturn::Handled));
    sim.services.run_tasks();
    assert_eq!(rec.kinds(), vec![EventKind::Press]);
    assert_eq!(moca_hits.load(Ordering::SeqCst), 0);
}

#[test]
fn pressed_button_does_not_mask_moca() {
    let sim = Sim::new();
    let rec = Recorder::default();
    let board = mixed_board(&sim, &rec, false);
    let moca_hits = Arc::new(AtomicUsize::new(0));
    board.moca().register(CHIP, counting_handler(&moca_hits)).unwrap();
    board.moca().enable(CHIP).unwrap();
    let irq = ext_irq(MIXED_LINE);

    // The button lets go of the line while it is down; the chip keeps it.
    sim.gpio.set(BUTTON_PIN, false);
    sim.irq.fire_line(MIXED_LINE);
    sim.services.run_tasks();
    assert!(sim.irq.is_enabled(irq));

    sim.gpio.set(MOCA_PIN, true);
    sim.irq.fire_line(MIXED_LINE);
    assert_eq!(moca_hits.load(Ordering::SeqCst), 1);
    sim.gpio.set(MOCA_PIN, false);

    // The second edge did not restart the press.
    sim.gpio.set(BUTTON_PIN, true);
    sim.advance(100);
    assert_eq!(rec.kinds(), vec![EventKind::Press]);
    assert_eq!(sim.irq.disable_calls(), 1, "only the gate's initial mask");

    board.moca().disable(CHIP).unwrap();
    assert!(sim.irq.is_enabled(irq), "button unmasked after its release");
    assert_eq!(board.registry().sharers(ExtIrqLine::new(MIXED_LINE)).len(), 2);
}

#[test]
fn pressed_button_does_not_mask_reset() {
    let sim = Sim::new();
    let rec = Recorder::default();
    let board = mixed_board(&sim, &rec, true);
    let irq = ext_irq(MIXED_LINE);

    sim.gpio.set(BUTTON_PIN, false);
    sim.irq.fire_line(MIXED_LINE);
    sim.services.run_tasks();
    assert_eq!(rec.kinds(), vec![EventKind::Press]);
    assert!(sim.irq.is_enabled(irq), "reset line still holds it");
    assert!(!board.restore().in_progress());

    sim.gpio.set(RESET_PIN, false);
    sim.irq.fire_line(MIXED_LINE);
    assert!(board.restore().in_progress());
    // Still down: the edge is not a second press.
    sim.services.run_tasks();
    assert_eq!(rec.kinds(), vec![EventKind::Press]);
}
