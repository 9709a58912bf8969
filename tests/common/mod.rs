//! Common test utilities for the transmitter and doorbell integration tests

// Shared across several test files; not every helper is used in each of them.
#[allow(unused_imports)]
pub use doorbell433::protocol::{Protocol, PulseTiming, RingCode};
#[allow(unused_imports)]
pub use doorbell433::sim::{Event, SimBoard, tick_flag};
#[allow(unused_imports)]
pub use embedded_hal::digital::PinState;
#[allow(unused_imports)]
pub use embedded_hal_mock::eh1::digital::{
    Mock as PinMock, State as MockState, Transaction as PinTransaction,
};

/// The first ring code of the Blyss doorbell
#[allow(dead_code)]
pub const CODE_A: u32 = 0x44E5_85D3;
/// The second ring code of the Blyss doorbell
#[allow(dead_code)]
pub const CODE_B: u32 = 0x566A_D593;

#[allow(dead_code)]
pub fn mock_state(level: PinState) -> MockState {
    match level {
        PinState::High => MockState::High,
        PinState::Low => MockState::Low,
    }
}

/// One level per tick for a single send: `repeat` frames of `code`, then the
/// final carrier-off write.
#[allow(dead_code)]
pub fn expected_levels(protocol: &Protocol, code: u32, length: u8, repeat: u8) -> Vec<PinState> {
    let (active, idle) = protocol.levels();
    let code = RingCode::new(code, length).expect("code length within 32 bits");
    let mut levels = Vec::new();
    for _ in 0..repeat {
        for pulse in protocol.frame(code) {
            levels.extend((0..pulse.high).map(|_| active));
            levels.extend((0..pulse.low).map(|_| idle));
        }
    }
    levels.push(PinState::Low);
    levels
}

/// Pin transactions of a freshly built transmitter sending once.
#[allow(dead_code)]
pub fn expected_transactions(
    protocol: &Protocol,
    code: u32,
    length: u8,
    repeat: u8,
) -> Vec<PinTransaction> {
    core::iter::once(PinState::Low)
        .chain(expected_levels(protocol, code, length, repeat))
        .map(|level| PinTransaction::set(mock_state(level)))
        .collect()
}

/// Levels written to `pin` while the tick timer was running, one list per
/// send.
#[allow(dead_code)]
pub fn sends(events: &[Event], pin: u8) -> Vec<Vec<PinState>> {
    let mut sends = Vec::new();
    let mut current: Option<Vec<PinState>> = None;
    for event in events {
        match *event {
            Event::TimerStarted { .. } => current = Some(Vec::new()),
            Event::TimerStopped => sends.extend(current.take()),
            Event::Level { pin: p, state } if p == pin => {
                if let Some(levels) = current.as_mut() {
                    levels.push(state);
                }
            }
            _ => {}
        }
    }
    sends
}

/// Decodes the frames of one send back into code values.
///
/// Each write is one tick, so runs of equal levels are segment lengths. A
/// pulse whose idle run reaches the sync length closes a frame.
#[allow(dead_code)]
pub fn decode_frames(levels: &[PinState], protocol: &Protocol) -> Vec<u32> {
    let (active, _) = protocol.levels();
    let mut pulses: Vec<(u32, u32)> = Vec::new();
    let mut idle = true;
    for &level in levels {
        if level == active {
            if idle {
                pulses.push((0, 0));
                idle = false;
            }
            if let Some(pulse) = pulses.last_mut() {
                pulse.0 += 1;
            }
        } else {
            idle = true;
            if let Some(pulse) = pulses.last_mut() {
                pulse.1 += 1;
            }
        }
    }

    let sync_low = u32::from(protocol.sync.low);
    let mut frames = Vec::new();
    let mut code = 0u32;
    for (high, low) in pulses {
        if low >= sync_low {
            frames.push(code);
            code = 0;
        } else {
            code = (code << 1) | u32::from(high > low);
        }
    }
    frames
}
