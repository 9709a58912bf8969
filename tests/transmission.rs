mod common;

use common::*;
use doorbell433::Error;
use doorbell433::transmitter::Transmitter;

#[test]
fn test_blyss_ring_code_pin_sequence() {
    let board = SimBoard::new();
    let tick = tick_flag();
    let protocol = Protocol::BLYSS;

    let expected = expected_transactions(&protocol, CODE_A, 32, 16);
    // Construction write, 16 frames of 143 ticks, carrier off.
    assert_eq!(expected.len(), 1 + 16 * 143 + 1);

    let mut transmitter = Transmitter::new(PinMock::new(&expected), board.timer(tick), tick)
        .expect("valid protocol");
    transmitter.send(CODE_A, 32).expect("send completes");
    transmitter.tx.done();

    assert_eq!(
        board.events(),
        [Event::TimerStarted { tick_us: 500 }, Event::TimerStopped]
    );
}

#[test]
fn test_inverted_levels_keep_tick_counts() {
    let board = SimBoard::new();
    let tick = tick_flag();
    let protocol = Protocol::BLYSS.with_inverted(true);

    let plain = expected_levels(&Protocol::BLYSS, CODE_A, 32, 16);
    let inverted = expected_levels(&protocol, CODE_A, 32, 16);
    assert_eq!(plain.len(), inverted.len());
    // Every level but the final carrier-off write is swapped.
    let last = plain.len() - 1;
    assert!(plain[..last].iter().zip(&inverted[..last]).all(|(a, b)| *a == !*b));
    assert_eq!(inverted[last], PinState::Low);

    let expected = expected_transactions(&protocol, CODE_A, 32, 16);
    let mut transmitter =
        Transmitter::with_protocol(PinMock::new(&expected), board.timer(tick), tick, protocol)
            .expect("valid protocol");
    transmitter.send(CODE_A, 32).expect("send completes");
    transmitter.tx.done();
}

#[test]
fn test_pulse_counts_for_assorted_codes() {
    let cases: [(u32, u8, u8); 6] = [
        (0, 0, 1),
        (0b1, 1, 3),
        (0b1011, 4, 2),
        (0xA5, 8, 1),
        (0xFFFF_FFFF, 32, 1),
        (CODE_B, 32, 4),
    ];
    let protocol = Protocol::BLYSS;

    for (code, length, repeat) in cases {
        let board = SimBoard::new();
        let tick = tick_flag();
        let ring_code = RingCode::new(code, length).expect("length within 32 bits");

        let mut transmitter = Transmitter::new(board.output_pin(1), board.timer(tick), tick)
            .expect("valid protocol");
        transmitter.set_repeat_count(repeat);
        transmitter.send(code, length).expect("send completes");

        let sends = sends(&board.events(), 1);
        assert_eq!(sends.len(), 1);
        let levels = &sends[0];
        assert_eq!(
            levels.len() as u32,
            u32::from(repeat) * protocol.frame_ticks(ring_code) + 1,
            "code {code:#x}/{length} x{repeat}"
        );
        assert_eq!(*levels, expected_levels(&protocol, code, length, repeat));
        assert_eq!(decode_frames(levels, &protocol), vec![code; usize::from(repeat)]);
        assert_eq!(board.registers().portb & 0b10, 0);
    }
}

#[test]
fn test_configure_twice_sends_the_same() {
    let protocol = Protocol::BLYSS.with_inverted(true);
    let mut runs = Vec::new();

    for configure_count in 1..=2 {
        let board = SimBoard::new();
        let tick = tick_flag();
        let mut transmitter = Transmitter::new(board.output_pin(1), board.timer(tick), tick)
            .expect("valid protocol");
        for _ in 0..configure_count {
            transmitter.configure(protocol).expect("valid protocol");
        }
        transmitter.set_repeat_count(2);
        transmitter.send(0b0110, 4).expect("send completes");
        runs.push(sends(&board.events(), 1));
    }

    assert_eq!(runs[0], runs[1]);
}

#[test]
fn test_back_to_back_sends_rearm_the_timer() {
    let board = SimBoard::new();
    let tick = tick_flag();
    let mut transmitter = Transmitter::new(board.output_pin(1), board.timer(tick), tick)
        .expect("valid protocol");
    transmitter.set_repeat_count(1);

    transmitter.send(0b10, 2).expect("first send");
    transmitter.send(0b01, 2).expect("second send");

    let protocol = Protocol::BLYSS;
    let sends = sends(&board.events(), 1);
    assert_eq!(sends.len(), 2);
    assert_eq!(decode_frames(&sends[0], &protocol), [0b10_u32]);
    assert_eq!(decode_frames(&sends[1], &protocol), [0b01_u32]);
    assert!(!board.registers().timer1_powered());
}

#[test]
fn test_real_time_ticks_take_real_time() {
    let board = SimBoard::new();
    let tick = tick_flag();
    let mut transmitter =
        Transmitter::new(board.output_pin(1), board.real_time_timer(tick), tick)
            .expect("valid protocol");
    transmitter.set_repeat_count(1);
    transmitter.set_tick_length(100).expect("non-zero tick");

    let started = std::time::Instant::now();
    // 4 bits + sync = 4 * 4 + 15 ticks, plus the trailing one.
    transmitter.send(0b1001, 4).expect("send completes");
    assert!(started.elapsed() >= std::time::Duration::from_micros(32 * 100));
}

#[test]
fn test_length_above_code_width_is_rejected() {
    let board = SimBoard::new();
    let tick = tick_flag();
    let mut transmitter = Transmitter::new(board.output_pin(1), board.timer(tick), tick)
        .expect("valid protocol");

    assert_eq!(transmitter.send(CODE_A, 33), Err(Error::CodeLength(33)));
    assert!(sends(&board.events(), 1).is_empty());
}
