mod common;

use std::thread::{self, JoinHandle};

use common::*;
use doorbell433::consts::{ADEN, PRTIM0, PRTIM1, PRUSI, WDE, bv};
use doorbell433::control::{self, LoopConfig};
use doorbell433::doorbell::Doorbell;
use doorbell433::power::{LowPowerController, PowerConfig, PowerController, PowerState};
use doorbell433::sim::{Registers, SimMcu, SimPin, SimTimer};

const TX: u8 = 1;
const EMITTER: u8 = 0;

struct Rig {
    board: SimBoard,
    power: PowerController<SimMcu>,
    doorbell: Doorbell<'static, SimPin, SimPin, SimTimer>,
}

fn rig() -> Rig {
    let board = SimBoard::with_registers(Registers::awake());
    let tick = tick_flag();
    let doorbell = Doorbell::new(
        board.output_pin(TX),
        board.timer(tick),
        tick,
        board.output_pin(EMITTER),
    )
    .expect("doorbell builds");
    let mut power = PowerController::new(board.mcu(), PowerConfig::default());
    control::setup(&mut power);
    Rig {
        board,
        power,
        doorbell,
    }
}

/// Presses the button once the CPU has halted.
fn press_when_halted(board: &SimBoard) -> JoinHandle<()> {
    let board = board.clone();
    thread::spawn(move || {
        while !board.events().contains(&Event::Halted) {
            thread::yield_now();
        }
        board.wake_line().press();
    })
}

/// Runs one wake cycle with the press arriving mid-sleep and returns what
/// happened during it.
fn cycle(rig: &mut Rig, config: &LoopConfig) -> Vec<Event> {
    let _ = rig.board.take_events();
    let presser = press_when_halted(&rig.board);
    control::service_wake(
        &mut rig.power,
        &mut rig.doorbell,
        &mut rig.board.delay(),
        config,
    )
    .expect("wake cycle succeeds");
    presser.join().expect("presser thread");
    rig.board.take_events()
}

fn rung_codes(events: &[Event]) -> Vec<u32> {
    let protocol = Protocol::BLYSS;
    sends(events, TX)
        .iter()
        .map(|levels| {
            let frames = decode_frames(levels, &protocol);
            assert_eq!(frames.len(), 16, "every ring repeats its code 16 times");
            assert!(frames.iter().all(|&f| f == frames[0]));
            frames[0]
        })
        .collect()
}

#[test]
fn test_setup_reaches_low_power_configuration() {
    let rig = rig();
    let regs = rig.board.registers();

    assert_eq!(regs.adcsra & bv(ADEN), 0);
    assert_eq!(regs.wdtcr & bv(WDE), 0);
    assert_eq!(regs.prr & (bv(PRTIM0) | bv(PRTIM1) | bv(PRUSI)), bv(PRTIM0) | bv(PRTIM1) | bv(PRUSI));
    // TX and emitter power stay driven outputs; everything else pulled up.
    assert_eq!(regs.ddrb, bv(TX) | bv(EMITTER));
    assert_eq!(regs.portb, 0b0011_1100);
    assert!(regs.wake_armed());
    assert!(!regs.sleep_enabled());
    assert!(rig.power.is_configured() && rig.power.is_armed());
}

#[test]
fn test_wake_rings_twice_and_sleeps_again() {
    let mut rig = rig();
    let config = LoopConfig::default();

    let events = cycle(&mut rig, &config);

    assert_eq!(events[0], Event::Halted);
    assert_eq!(events[1], Event::Resumed);
    assert_eq!(rig.power.state(), PowerState::Active);
    assert!(!rig.board.registers().sleep_enabled());

    // Toggle starts true, so the first ring after power-on sends the second code.
    assert_eq!(rung_codes(&events), [CODE_B, CODE_A]);

    let delays: Vec<&Event> = events
        .iter()
        .filter(|e| matches!(e, Event::Delay { .. }))
        .collect();
    assert_eq!(delays, [&Event::Delay { ns: 500_000_000 }]);

    // Emitter power brackets each ring.
    let emitter: Vec<PinState> = events
        .iter()
        .filter_map(|e| match *e {
            Event::Level { pin: EMITTER, state } => Some(state),
            _ => None,
        })
        .collect();
    assert_eq!(
        emitter,
        [PinState::High, PinState::Low, PinState::High, PinState::Low]
    );

    let regs = rig.board.registers();
    assert_eq!(regs.portb & (bv(TX) | bv(EMITTER)), 0);
    assert!(!regs.timer1_powered());

    // Back to sleep on the next cycle.
    let events = cycle(&mut rig, &config);
    assert_eq!(events[0], Event::Halted);
}

#[test]
fn test_alternation_persists_across_wakes() {
    let mut rig = rig();
    let config = LoopConfig {
        rings_per_wake: 1,
        ..LoopConfig::default()
    };

    let mut codes = Vec::new();
    for _ in 0..3 {
        codes.extend(rung_codes(&cycle(&mut rig, &config)));
    }

    assert_eq!(codes, [CODE_B, CODE_A, CODE_B]);
}

#[test]
fn test_press_before_sleep_still_wakes() {
    let mut rig = rig();
    let config = LoopConfig {
        rings_per_wake: 1,
        ..LoopConfig::default()
    };

    rig.board.wake_line().press();
    control::service_wake(
        &mut rig.power,
        &mut rig.doorbell,
        &mut rig.board.delay(),
        &config,
    )
    .expect("latched edge wakes the CPU");

    assert!(!rig.board.wake_line().is_pending());
    assert_eq!(rung_codes(&rig.board.events()), [CODE_B]);
}

#[test]
fn test_sleep_without_setup_is_refused() {
    let board = SimBoard::new();
    let mut power = PowerController::new(board.mcu(), PowerConfig::default());

    assert_eq!(power.sleep(), Err(doorbell433::Error::WakeSourceNotArmed));
    assert_eq!(power.state(), PowerState::Active);
    assert!(board.events().is_empty());
}
