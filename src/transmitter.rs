//! Tick-paced pulse transmitter.
//!
//! This module provides the [`Transmitter`] struct, which turns a code into a
//! pulse train on a single digital output. The only time base is a periodic
//! timer interrupt that sets a [`TickFlag`]; every pin write happens right
//! after a tick has been consumed, so a segment of `n` ticks lasts exactly `n`
//! timer periods no matter how long each wait took in the foreground.
//!
//! ## Waveform
//!
//! For each of `repeat` repeats, every code bit (most significant first) is
//! sent as the protocol's `one` or `zero` pulse, followed by one `sync` pulse.
//! A pulse `(h, l)` is `h` times "wait for tick, drive active level" followed
//! by `l` times "wait for tick, drive idle level". One more tick is awaited
//! after the last pulse so the final segment keeps its length, then the
//! output is driven low (carrier off) and the timer is released.
//!
//! ## Example
//!
//! ```rust
//! use doorbell433::sim::{tick_flag, SimBoard};
//! use doorbell433::transmitter::Transmitter;
//!
//! let board = SimBoard::new();
//! let tick = tick_flag();
//! let mut transmitter = Transmitter::new(board.output_pin(1), board.timer(tick), tick).unwrap();
//!
//! transmitter.set_repeat_count(1);
//! transmitter.send(0b1010, 4).unwrap();
//! ```
//!
//! ## Design Notes
//!
//! The timer is powered only between arming and disarming inside
//! [`send`](Transmitter::send). There is no cancellation: once a send has
//! started it runs to completion. Without a tick timeout, a tick source that
//! never fires blocks forever.

use embedded_hal::digital::{OutputPin, PinState};
use nb::block;

use crate::consts::DEFAULT_REPEAT;
use crate::error::{Error, Result};
use crate::protocol::{Protocol, PulseTiming, RingCode};
use crate::timer::{TickFlag, TickTimer};

/// Sends codes as tick-timed pulse trains on one output pin.
///
/// ## Type Parameters
///
/// - `TX`: the data line of the RF emitter, an [`OutputPin`]
/// - `T`: the periodic [`TickTimer`] that signals `tick`
///
/// ## Notes
///
/// - The output and the timer are owned exclusively by the transmitter.
/// - `tick` must be the flag the timer's interrupt signals.
#[derive(Debug)]
pub struct Transmitter<'a, TX, T>
where
    TX: OutputPin,
    T: TickTimer,
{
    /// RF data pin
    pub tx: TX,
    /// Tick timer, armed only while sending
    pub timer: T,
    tick: &'a TickFlag,
    protocol: Protocol,
    active_level: PinState,
    idle_level: PinState,
    repeat: u8,
    tick_timeout: Option<u32>,
}

impl<'a, TX, T> Transmitter<'a, TX, T>
where
    TX: OutputPin,
    T: TickTimer,
{
    /// Creates a transmitter speaking the Blyss protocol, repeating each
    /// frame 16 times.
    ///
    /// # Arguments
    /// - `tx`: The output pin keying the 433 MHz emitter.
    /// - `timer`: The tick timer, stopped.
    /// - `tick`: The flag the timer interrupt signals.
    ///
    /// # Notes
    /// TX is driven `LOW` initially (carrier off).
    pub fn new(tx: TX, timer: T, tick: &'a TickFlag) -> Result<Self> {
        Self::with_protocol(tx, timer, tick, Protocol::BLYSS)
    }

    /// Creates a transmitter for an arbitrary protocol.
    ///
    /// # Errors
    /// Any error of [`configure`](Self::configure), or [`Error::Pin`] if the
    /// output cannot be driven low.
    pub fn with_protocol(tx: TX, timer: T, tick: &'a TickFlag, protocol: Protocol) -> Result<Self> {
        protocol.validate()?;
        let (active_level, idle_level) = protocol.levels();
        let mut transmitter = Self {
            tx,
            timer,
            tick,
            protocol,
            active_level,
            idle_level,
            repeat: DEFAULT_REPEAT,
            tick_timeout: None,
        };
        transmitter.write_tx(PinState::Low)?;
        Ok(transmitter)
    }

    /// Installs a protocol and precomputes its logic levels.
    ///
    /// Touches no hardware. Configuring the same protocol twice changes
    /// nothing.
    ///
    /// # Errors
    /// [`Error::InvalidTickLength`] or [`Error::DegenerateTiming`]; the
    /// previous protocol stays installed.
    pub fn configure(&mut self, protocol: Protocol) -> Result<()> {
        protocol.validate()?;
        let (active, idle) = protocol.levels();
        self.protocol = protocol;
        self.active_level = active;
        self.idle_level = idle;
        debug!(
            "protocol: tick {}us, inverted {}",
            protocol.tick_us, protocol.inverted
        );
        Ok(())
    }

    /// Changes the tick length of the installed protocol, in microseconds.
    pub fn set_tick_length(&mut self, tick_us: u16) -> Result<()> {
        if tick_us == 0 {
            return Err(Error::InvalidTickLength);
        }
        self.protocol.tick_us = tick_us;
        Ok(())
    }

    /// Number of frames sent per [`send`](Self::send). Zero sends no pulses.
    pub fn set_repeat_count(&mut self, repeat: u8) {
        self.repeat = repeat;
    }

    /// Bounds every tick wait to `polls` polls of the flag.
    ///
    /// `None` (the default) waits forever, as a missing tick source is a
    /// configuration error rather than something to recover from.
    pub fn set_tick_timeout(&mut self, polls: Option<u32>) {
        self.tick_timeout = polls;
    }

    /// The installed protocol.
    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    /// Level driven during the high segment of a pulse.
    pub fn active_level(&self) -> PinState {
        self.active_level
    }

    /// Level driven during the low segment of a pulse.
    pub fn idle_level(&self) -> PinState {
        self.idle_level
    }

    /// Frames sent per call to [`send`](Self::send).
    pub fn repeat_count(&self) -> u8 {
        self.repeat
    }

    /// Transmits the `length` low-order bits of `code`, most significant first.
    ///
    /// Blocks until the whole pulse train, all repeats included, is on air.
    ///
    /// # Errors
    /// - [`Error::CodeLength`] if `length` exceeds 32; nothing is transmitted
    /// - see [`send_code`](Self::send_code)
    pub fn send(&mut self, code: u32, length: u8) -> Result<()> {
        let code = RingCode::new(code, length)?;
        self.send_code(code)
    }

    /// Transmits `code` `repeat` times, each copy followed by a sync pulse.
    ///
    /// # Errors
    /// - [`Error::Timer`] if the timer cannot be armed or disarmed
    /// - [`Error::Pin`] if the output cannot be written
    /// - [`Error::TickTimeout`] if a tick timeout is set and a tick is late
    ///
    /// Whatever fails after the timer was armed, the output is still driven
    /// low and the timer disarmed before returning.
    pub fn send_code(&mut self, code: RingCode) -> Result<()> {
        // Built before the timer runs, so each tick only costs a poll and a write.
        let frame = self.protocol.frame(code);
        debug!(
            "sending {} ({} bits) x{}",
            code.value(),
            code.length(),
            self.repeat
        );

        self.enable_transmit()?;

        let sent = self
            .transmit_frames(&frame)
            // The last segment lasts until the next tick.
            .and_then(|()| self.wait_tick());
        // Carrier off, also for inverted protocols.
        let released = self.write_tx(PinState::Low);
        let disabled = self.disable_transmit();

        debug!("send finished, ok: {}", sent.is_ok());
        sent.and(released).and(disabled)
    }

    fn enable_transmit(&mut self) -> Result<()> {
        self.tick.clear();
        self.timer
            .start(self.protocol.tick_us)
            .map_err(|_| Error::Timer)
    }

    fn disable_transmit(&mut self) -> Result<()> {
        self.timer.stop().map_err(|_| Error::Timer)
    }

    fn transmit_frames(&mut self, frame: &[PulseTiming]) -> Result<()> {
        for _ in 0..self.repeat {
            for &pulse in frame {
                self.transmit(pulse)?;
            }
        }
        Ok(())
    }

    /// Emits one pulse: `high` ticks active, then `low` ticks idle.
    fn transmit(&mut self, pulse: PulseTiming) -> Result<()> {
        trace!("pulse {}/{}", pulse.high, pulse.low);
        for _ in 0..pulse.high {
            self.wait_tick()?;
            self.write_tx(self.active_level)?;
        }
        for _ in 0..pulse.low {
            self.wait_tick()?;
            self.write_tx(self.idle_level)?;
        }
        Ok(())
    }

    fn wait_tick(&mut self) -> Result<()> {
        match self.tick_timeout {
            None => {
                let _ = block!(self.tick.poll());
                Ok(())
            }
            Some(polls) => {
                for _ in 0..polls {
                    if self.tick.poll().is_ok() {
                        return Ok(());
                    }
                }
                Err(Error::TickTimeout)
            }
        }
    }

    fn write_tx(&mut self, level: PinState) -> Result<()> {
        self.tx.set_state(level).map_err(Error::pin)
    }
}
