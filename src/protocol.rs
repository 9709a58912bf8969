//! Pulse protocol table and frame construction.
//!
//! A [`Protocol`] describes how zero and one bits are turned into high/low
//! pulses, each measured in whole ticks of the transmit timer:
//!
//! ```text
//! sync {1, 14}:  _
//!               | |______________
//! zero {1, 3}:   _
//!               | |___
//! one  {3, 1}:   ___
//!               |   |_
//! ```
//!
//! A frame is one pulse per code bit, most significant bit first, followed by
//! a single sync pulse so the receiver can find frame boundaries. The
//! transmitter sends the same frame several times per ring.
//!
//! When [`Protocol::inverted`] is set the physical levels of every segment are
//! swapped. Tick counts and ordering stay the same.

use embedded_hal::digital::PinState;
use heapless::Vec;

use crate::consts::{
    BLYSS_ONE, BLYSS_SYNC, BLYSS_TICK_US, BLYSS_ZERO, CODE_WIDTH, MAX_FRAME_PULSES,
    RING_CODE_BITS,
};
use crate::error::{Error, Result};

/// A single pulse: `high` ticks at the active level, then `low` ticks at the
/// idle level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct PulseTiming {
    /// Ticks spent at the active level.
    pub high: u8,
    /// Ticks spent at the idle level.
    pub low: u8,
}

impl PulseTiming {
    /// Creates a timing of `high` active ticks followed by `low` idle ticks.
    pub const fn new(high: u8, low: u8) -> Self {
        Self { high, low }
    }

    /// Builds a timing from a `(high, low)` pair as stored in [`crate::consts`].
    pub const fn from_pair(pair: (u8, u8)) -> Self {
        Self::new(pair.0, pair.1)
    }

    /// A `(0, 0)` timing emits nothing and must never be transmitted.
    pub const fn is_degenerate(&self) -> bool {
        self.high == 0 && self.low == 0
    }

    /// Total length of the pulse in ticks.
    pub const fn ticks(&self) -> u16 {
        self.high as u16 + self.low as u16
    }
}

/// Timing parameters of one wire encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct Protocol {
    /// Length of one tick in microseconds.
    pub tick_us: u16,
    /// Pulse sent once after every full bit sequence.
    pub sync: PulseTiming,
    /// Pulse for a `0` bit.
    pub zero: PulseTiming,
    /// Pulse for a `1` bit.
    pub one: PulseTiming,
    /// Swap active and idle logic levels for every segment.
    pub inverted: bool,
}

/// The pulses of a single frame: one per bit plus the trailing sync.
pub type Frame = Vec<PulseTiming, MAX_FRAME_PULSES>;

impl Protocol {
    /// Blyss doorbell, ref. DC6-FR-WH 656185.
    pub const BLYSS: Protocol = Protocol {
        tick_us: BLYSS_TICK_US,
        sync: PulseTiming::from_pair(BLYSS_SYNC),
        zero: PulseTiming::from_pair(BLYSS_ZERO),
        one: PulseTiming::from_pair(BLYSS_ONE),
        inverted: false,
    };

    /// Returns a copy of this protocol with the polarity set to `inverted`.
    pub const fn with_inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    /// Checks that the protocol can be transmitted.
    ///
    /// # Errors
    /// - [`Error::InvalidTickLength`] if `tick_us` is zero
    /// - [`Error::DegenerateTiming`] if any of the three timings is `(0, 0)`
    pub fn validate(&self) -> Result<()> {
        if self.tick_us == 0 {
            return Err(Error::InvalidTickLength);
        }
        if self.sync.is_degenerate() || self.zero.is_degenerate() || self.one.is_degenerate() {
            return Err(Error::DegenerateTiming);
        }
        Ok(())
    }

    /// Physical `(active, idle)` levels for this protocol.
    ///
    /// The two are always different; both flip with [`Protocol::inverted`].
    pub fn levels(&self) -> (PinState, PinState) {
        let active = PinState::from(!self.inverted);
        (active, !active)
    }

    /// Pulse used for a bit value.
    pub fn timing_for(&self, bit: bool) -> PulseTiming {
        if bit { self.one } else { self.zero }
    }

    /// Builds the pulse list for one transmission of `code`.
    pub fn frame(&self, code: RingCode) -> Frame {
        let mut frame = Frame::new();
        for bit in code.bits() {
            let _ = frame.push(self.timing_for(bit));
        }
        let _ = frame.push(self.sync);
        frame
    }

    /// Number of ticks one frame of `code` occupies on air.
    pub fn frame_ticks(&self, code: RingCode) -> u32 {
        self.frame(code).iter().map(|p| u32::from(p.ticks())).sum()
    }

    /// Wall-clock duration of a pulse in microseconds.
    pub fn pulse_duration_us(&self, timing: PulseTiming) -> u32 {
        u32::from(timing.ticks()) * u32::from(self.tick_us)
    }
}

impl Default for Protocol {
    fn default() -> Self {
        Self::BLYSS
    }
}

/// Every encoding this firmware knows how to speak.
pub static PROTOCOLS: [Protocol; 1] = [
    Protocol::BLYSS, // protocol 0: Blyss doorbell
];

/// A code value together with the number of low-order bits to transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub struct RingCode {
    value: u32,
    length: u8,
}

impl RingCode {
    /// Creates a code sending the `length` low-order bits of `value`.
    ///
    /// # Errors
    /// [`Error::CodeLength`] if `length` exceeds the 32-bit code width.
    pub fn new(value: u32, length: u8) -> Result<Self> {
        if length > CODE_WIDTH {
            return Err(Error::CodeLength(length));
        }
        Ok(Self { value, length })
    }

    /// A full-width code, as used by the Blyss receiver.
    pub const fn full(value: u32) -> Self {
        Self {
            value,
            length: RING_CODE_BITS,
        }
    }

    /// The raw code value.
    pub const fn value(&self) -> u32 {
        self.value
    }

    /// Number of bits transmitted.
    pub const fn length(&self) -> u8 {
        self.length
    }

    /// The transmitted bits, most significant first.
    ///
    /// Bits of `value` at or above `length` are never yielded.
    pub fn bits(&self) -> impl Iterator<Item = bool> + '_ {
        (0..self.length).rev().map(move |i| self.value & (1 << i) != 0)
    }
}
