//! Restore-to-default line.

mod common;

use bsp_board::Board;
use bsp_board::desc::{BoardDescription, ExtIrqDesc, ResetDesc};
use bsp_board::pin::Polarity;
use bsp_core::id::ExtIrqLine;
use bsp_driver_api::IrqReturn;
use common::{Sim, active_low, ext_irq};

fn board(sim: &Sim, irq: ExtIrqDesc, gpio_pin: Option<u16>) -> Board {
    let desc = BoardDescription {
        reset: Some(ResetDesc {
            irq,
            gpio: gpio_pin.map(active_low),
        }),
        ..BoardDescription::default()
    };
    Board::init(&desc, sim.platform())
}

#[test]
fn edge_restores_then_restarts_once() {
    let sim = Sim::new();
    let board = board(
        &sim,
        ExtIrqDesc::exclusive(ExtIrqLine::new(6), Polarity::ActiveLow),
        None,
    );
    assert_eq!(board.reset().unwrap().irq(), ext_irq(6));

    assert_eq!(sim.irq.fire_line(6), vec![IrqReturn::Handled]);
    assert_eq!(sim.irq.fire_line(6), vec![IrqReturn::Handled]);
    assert_eq!(sim.services.queued_work(), 1);
    assert_eq!(sim.services.run_work(), 1);
    assert_eq!(sim.services.restores(), 1);
    assert_eq!(sim.services.restarts(), 1);
}

#[test]
fn failed_restore_still_restarts() {
    let sim = Sim::new();
    sim.services.fail_restore();
    let _board = board(
        &sim,
        ExtIrqDesc::exclusive(ExtIrqLine::new(6), Polarity::ActiveLow),
        None,
    );
    sim.irq.fire_line(6);
    sim.services.run_work();
    assert_eq!(sim.services.restarts(), 1);
}

#[test]
fn shared_line_checks_gpio() {
    let sim = Sim::new();
    sim.gpio.set(11, true);
    let board = board(
        &sim,
        ExtIrqDesc::shared(ExtIrqLine::new(2), Polarity::ActiveLow),
        Some(11),
    );

    assert_eq!(sim.irq.fire_line(2), vec![IrqReturn::None]);
    assert!(!board.restore().in_progress());

    sim.gpio.set(11, false);
    assert_eq!(sim.irq.fire_line(2), vec![IrqReturn::Handled]);
    assert!(board.restore().in_progress());
}
