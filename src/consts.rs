//! Compile-time configuration for the doorbell transmitter.
//!
//! The device has no runtime configuration surface: everything the firmware
//! needs to know about its receiver, its board wiring and its microcontroller
//! lives here.
//!
//! ## Key Concepts
//!
//! - **Blyss timings**: the tick length and pulse shapes understood by the
//!   Blyss DC6-FR-WH 656185 receiver.
//! - **Ring codes**: the two 32-bit codes the receiver accepts as a ring;
//!   they are sent alternately.
//! - **Pins**: the ATtiny85 `PORTB` pin numbers for the emitter power switch,
//!   the RF data line and the wake button.
//! - **Register bits**: ATtiny85 bit positions used by the power controller
//!   and reproduced by the simulation board.

/// Base tick length of the Blyss protocol, in microseconds.
pub const BLYSS_TICK_US: u16 = 500;

/// Sync pulse of the Blyss protocol: 1 high tick, 14 low ticks.
pub const BLYSS_SYNC: (u8, u8) = (1, 14);

/// Zero bit of the Blyss protocol: 1 high tick, 3 low ticks.
pub const BLYSS_ZERO: (u8, u8) = (1, 3);

/// One bit of the Blyss protocol: 3 high ticks, 1 low tick.
pub const BLYSS_ONE: (u8, u8) = (3, 1);

/// First ring code (`0b1000100111001011000010111010011`).
pub const RING_CODE_A: u32 = 0x44E5_85D3;

/// Second ring code (`0b1010110011010101101010110010011`).
pub const RING_CODE_B: u32 = 0x566A_D593;

/// Bit length of both ring codes.
pub const RING_CODE_BITS: u8 = 32;

/// Width of the integer holding a code, in bits.
pub const CODE_WIDTH: u8 = u32::BITS as u8;

/// Number of times a full frame is retransmitted per `send`.
pub const DEFAULT_REPEAT: u8 = 16;

/// Rings emitted per wake event.
pub const RINGS_PER_WAKE: u8 = 2;

/// Busy-wait between two rings of the same wake event, in milliseconds.
pub const RING_GAP_MS: u32 = 500;

/// Maximum pulses in a single frame: one per code bit plus the sync pulse.
pub const MAX_FRAME_PULSES: usize = CODE_WIDTH as usize + 1;

/// `PB0`: switches the 433 MHz emitter supply.
pub const EMITTER_POWER_PIN: u8 = 0;
/// `PB1`: RF data line keyed by the emitter.
pub const TX_PIN: u8 = 1;
/// `PB2`/`INT0`: wake button, active low.
pub const BUTTON_PIN: u8 = 2;
/// Mask of every `PORTB` pin (`PB0`..`PB5`).
pub const PORTB_MASK: u8 = 0b0011_1111;

/// `ADCSRA.ADEN`: ADC enable.
pub const ADEN: u8 = 7;
/// `ACSR.ACD`: analog comparator disable.
pub const ACD: u8 = 7;
/// `WDTCR.WDE`: watchdog enable.
pub const WDE: u8 = 3;
/// `MCUCR.PUD`: global pull-up disable.
pub const PUD: u8 = 6;
/// `MCUCR.SE`: sleep enable latch.
pub const SE: u8 = 5;
/// `MCUCR.SM1`: sleep mode select, bit 1.
pub const SM1: u8 = 4;
/// `MCUCR.SM0`: sleep mode select, bit 0.
pub const SM0: u8 = 3;
/// `MCUCR.ISC01`: interrupt sense control, bit 1.
pub const ISC01: u8 = 1;
/// `MCUCR.ISC00`: interrupt sense control, bit 0.
pub const ISC00: u8 = 0;
/// `GIMSK.PCIE`: pin change interrupt enable.
pub const PCIE: u8 = 5;
/// `PRR.PRTIM1`: Timer/Counter1 power reduction.
pub const PRTIM1: u8 = 3;
/// `PRR.PRTIM0`: Timer/Counter0 power reduction.
pub const PRTIM0: u8 = 2;
/// `PRR.PRUSI`: USI power reduction.
pub const PRUSI: u8 = 1;
/// `PRR.PRADC`: ADC power reduction.
pub const PRADC: u8 = 0;

/// Bit value helper, the `_BV` of AVR C.
pub const fn bv(bit: u8) -> u8 {
    1 << bit
}
