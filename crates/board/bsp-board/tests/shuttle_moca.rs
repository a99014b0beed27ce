//! Randomized interleavings of MoCA enable references and the other
//! sources on a shared line.
//!
//! Run with `RUSTFLAGS="--cfg shuttle" cargo test -p bsp-board --test shuttle_moca`.

#![cfg(shuttle)]

mod common;

use std::sync::{Arc, Mutex};

use shuttle::thread;

use bsp_board::Board;
use bsp_board::button::{EventKind, HookTrigger};
use bsp_board::desc::{BoardDescription, ButtonDesc, ButtonTrigger, ExtIrqDesc, MocaDesc};
use bsp_board::pin::Polarity;
use bsp_core::id::{ButtonId, ExtIrqLine, MocaDevice};
use common::{Recorder, Sim, active_high, active_low, ext_irq};

const ITERATIONS: usize = 500;

fn board(sim: &Sim) -> Board {
    let line = ExtIrqDesc::shared(ExtIrqLine::new(4), Polarity::ActiveLow);
    let desc = BoardDescription {
        moca: vec![
            MocaDesc {
                dev: MocaDevice::new(0),
                irq: Some(line),
                gpio: Some(active_high(30)),
            },
            MocaDesc {
                dev: MocaDevice::new(1),
                irq: Some(line),
                gpio: None,
            },
        ],
        ..BoardDescription::default()
    };
    Board::init(&desc, sim.platform())
}

#[test]
fn balanced_references_leave_line_masked() {
    shuttle::check_random(
        || {
            let sim = Sim::new();
            let board = board(&sim);
            let moca = board.moca().clone();
            let hits = Arc::new(Mutex::new(0usize));
            for dev in [MocaDevice::new(0), MocaDevice::new(1)] {
                let hits = hits.clone();
                moca.register(dev, Arc::new(move |_: MocaDevice| *hits.lock().unwrap() += 1))
                    .unwrap();
            }

            let workers: Vec<_> = [MocaDevice::new(0), MocaDevice::new(1)]
                .into_iter()
                .map(|dev| {
                    let moca = moca.clone();
                    thread::spawn(move || {
                        for _ in 0..2 {
                            moca.enable(dev).unwrap();
                            thread::yield_now();
                            moca.handle_interrupt(dev);
                            moca.disable(dev).unwrap();
                            thread::yield_now();
                        }
                    })
                })
                .collect();
            for w in workers {
                w.join().unwrap();
            }

            assert_eq!(moca.enable_count(MocaDevice::new(0)), Some(0));
            assert_eq!(moca.enable_count(MocaDevice::new(1)), Some(0));
            assert!(!sim.irq.is_enabled(ext_irq(4)));
            // Chip 0's GPIO never asserts, so every attributed edge was chip 1's.
            assert!(*hits.lock().unwrap() <= 4);
        },
        ITERATIONS,
    );
}

#[test]
fn held_reference_keeps_line_unmasked() {
    shuttle::check_random(
        || {
            let sim = Sim::new();
            let board = board(&sim);
            let moca = board.moca().clone();
            for dev in [MocaDevice::new(0), MocaDevice::new(1)] {
                moca.register(dev, Arc::new(|_: MocaDevice| {})).unwrap();
            }
            moca.enable(MocaDevice::new(1)).unwrap();

            let toggler = {
                let moca = moca.clone();
                thread::spawn(move || {
                    for _ in 0..3 {
                        moca.enable(MocaDevice::new(0)).unwrap();
                        thread::yield_now();
                        moca.disable(MocaDevice::new(0)).unwrap();
                    }
                })
            };
            thread::yield_now();
            assert!(sim.irq.is_enabled(ext_irq(4)));
            toggler.join().unwrap();
            assert!(sim.irq.is_enabled(ext_irq(4)));
        },
        ITERATIONS,
    );
}

#[test]
fn button_and_chip_hold_line_independently() {
    const BUTTON_PIN: u16 = 7;
    shuttle::check_random(
        || {
            let sim = Sim::new();
            let rec = Recorder::default();
            let line = ExtIrqDesc::shared(ExtIrqLine::new(4), Polarity::ActiveLow);
            let desc = BoardDescription {
                buttons: vec![ButtonDesc {
                    id: ButtonId::new(0),
                    gpio: Some(active_low(BUTTON_PIN)),
                    trigger: Some(ButtonTrigger::Interrupt {
                        irq: line,
                        release_edge: false,
                    }),
                    hooks: vec![
                        rec.hook(HookTrigger::Press, 0),
                        rec.hook(HookTrigger::Release { after_ms: 0 }, 0),
                    ],
                }],
                moca: vec![MocaDesc {
                    dev: MocaDevice::new(0),
                    irq: Some(line),
                    gpio: Some(active_high(30)),
                }],
                ..BoardDescription::default()
            };
            sim.gpio.set(BUTTON_PIN, true);
            let board = Board::init(&desc, sim.platform());
            let moca = board.moca().clone();
            moca.register(MocaDevice::new(0), Arc::new(|_: MocaDevice| {}))
                .unwrap();
            let button = board.buttons().get(ButtonId::new(0)).unwrap();

            let chip = {
                let moca = moca.clone();
                thread::spawn(move || {
                    for _ in 0..2 {
                        moca.enable(MocaDevice::new(0)).unwrap();
                        thread::yield_now();
                        moca.disable(MocaDevice::new(0)).unwrap();
                    }
                })
            };
            let presser = {
                let (button, gpio) = (button.clone(), sim.gpio.clone());
                thread::spawn(move || {
                    gpio.set(BUTTON_PIN, false);
                    button.handle_interrupt();
                    thread::yield_now();
                    gpio.set(BUTTON_PIN, true);
                    button.on_poll_timer();
                })
            };
            chip.join().unwrap();
            presser.join().unwrap();
            sim.services.run_tasks();

            assert_eq!(rec.kinds(), vec![EventKind::Press, EventKind::Release]);
            assert_eq!(moca.enable_count(MocaDevice::new(0)), Some(0));
            assert!(sim.irq.is_enabled(ext_irq(4)), "button holds the line again");
        },
        ITERATIONS,
    );
}
