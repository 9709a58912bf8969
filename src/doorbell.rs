//! Ring sequencing.
//!
//! A [`Doorbell`] owns the transmitter and the emitter power switch. Each
//! [`ring`](Doorbell::ring) powers the emitter, picks the next of its two
//! codes and sends it. The codes alternate on every ring for the lifetime of
//! the doorbell; nothing resets the alternation between wake cycles.

use embedded_hal::digital::OutputPin;

use crate::consts::{RING_CODE_A, RING_CODE_B, RING_CODE_BITS};
use crate::error::{Error, Result};
use crate::protocol::RingCode;
use crate::timer::{TickFlag, TickTimer};
use crate::transmitter::Transmitter;

/// The codes a doorbell alternates between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Sent when the toggle flips to `true`, then when it flips to `false`.
    pub codes: [u32; 2],
    /// Bits sent of each code.
    pub code_bits: u8,
}

impl Default for Config {
    /// The two codes of the Blyss receiver, 32 bits each.
    fn default() -> Self {
        Self {
            codes: [RING_CODE_A, RING_CODE_B],
            code_bits: RING_CODE_BITS,
        }
    }
}

/// Emitter supply held on for as long as the guard lives.
struct EmitterPower<'p, P: OutputPin> {
    pin: &'p mut P,
}

impl<'p, P: OutputPin> EmitterPower<'p, P> {
    fn on(pin: &'p mut P) -> Result<Self> {
        if let Err(err) = pin.set_high() {
            let _ = pin.set_low();
            return Err(Error::pin(err));
        }
        Ok(Self { pin })
    }
}

impl<P: OutputPin> Drop for EmitterPower<'_, P> {
    fn drop(&mut self) {
        let _ = self.pin.set_low();
    }
}

/// Sends alternating ring codes with the emitter powered only while sending.
///
/// ## Type Parameters
///
/// - `TX`: RF data pin
/// - `EP`: emitter power pin, high = powered
/// - `T`: tick timer of the transmitter
#[derive(Debug)]
pub struct Doorbell<'a, TX, EP, T>
where
    TX: OutputPin,
    EP: OutputPin,
    T: TickTimer,
{
    /// The pulse transmitter
    pub transmitter: Transmitter<'a, TX, T>,
    /// Emitter power pin
    pub emitter_power: EP,
    codes: [RingCode; 2],
    toggle: bool,
}

impl<'a, TX, EP, T> Doorbell<'a, TX, EP, T>
where
    TX: OutputPin,
    EP: OutputPin,
    T: TickTimer,
{
    /// Creates a Blyss doorbell: Blyss protocol, 16 repeats, the two Blyss
    /// ring codes.
    ///
    /// # Arguments
    /// - `tx`: RF data pin, driven low here.
    /// - `timer`: tick timer, stopped.
    /// - `tick`: the flag the timer interrupt signals.
    /// - `emitter_power`: emitter supply switch, driven low here.
    pub fn new(tx: TX, timer: T, tick: &'a TickFlag, emitter_power: EP) -> Result<Self> {
        let transmitter = Transmitter::new(tx, timer, tick)?;
        Self::with_transmitter(transmitter, emitter_power, Config::default())
    }

    /// Creates a doorbell around an already configured transmitter.
    ///
    /// # Errors
    /// - [`Error::CodeLength`] if `config.code_bits` exceeds 32
    /// - [`Error::Pin`] if the emitter power pin cannot be driven low
    pub fn with_transmitter(
        transmitter: Transmitter<'a, TX, T>,
        mut emitter_power: EP,
        config: Config,
    ) -> Result<Self> {
        let codes = [
            RingCode::new(config.codes[0], config.code_bits)?,
            RingCode::new(config.codes[1], config.code_bits)?,
        ];
        emitter_power.set_low().map_err(Error::pin)?;
        Ok(Self {
            transmitter,
            emitter_power,
            codes,
            toggle: true,
        })
    }

    /// Current toggle state.
    pub fn toggle(&self) -> bool {
        self.toggle
    }

    /// The code the next [`ring`](Self::ring) will send.
    pub fn next_code(&self) -> RingCode {
        code_for(&self.codes, !self.toggle)
    }

    /// Powers the emitter, flips the toggle and sends the selected code.
    ///
    /// Returns the code that was sent. The emitter is powered down again on
    /// every path out of this function, errors included.
    pub fn ring(&mut self) -> Result<RingCode> {
        let _power = EmitterPower::on(&mut self.emitter_power)?;

        self.toggle = !self.toggle;
        let code = code_for(&self.codes, self.toggle);
        debug!("ring: code {}", code.value());

        self.transmitter.send_code(code)?;
        Ok(code)
    }
}

fn code_for(codes: &[RingCode; 2], toggle: bool) -> RingCode {
    if toggle { codes[0] } else { codes[1] }
}
