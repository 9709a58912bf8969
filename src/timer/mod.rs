//! Tick source for the transmitter.
//!
//! All pulse widths are counted in ticks of one periodic hardware timer. The
//! timer interrupt does exactly one thing: set a [`TickFlag`]. The transmitter
//! polls and clears that flag between pin writes, so the flag is the only
//! state shared between interrupt and foreground context.
//!
//! Contains:
//! - [`TickFlag`]: the single-bit interrupt flag
//! - [`TickTimer`]: the seam a HAL timer implements to be armed and disarmed
//!   around each transmission (including powering the peripheral up and down)
//! - `compute_compare_value` / `const_compare_value`: CTC compare register
//!   values for a tick length
//! - `isr` (feature `timer-isr`): global tick-handler registration for
//!   interrupt vectors that cannot carry state
//!
//! Common prescalers for a 500 µs tick: (For use with `compute_compare_value`
//! and `const_compare_value`)
//!
//! | F_CPU   | PRESCALER | COMPARE |
//! |---------|-----------|---------|
//! |  1 MHz  |         8 |      63 |
//! |  8 MHz  |        64 |      63 |
//! | 16 MHz  |        64 |     125 |

use core::convert::Infallible;
use core::fmt::Debug;
use core::sync::atomic::{AtomicBool, Ordering};

use libm::round;

#[cfg(feature = "timer-isr")]
mod isr;
#[cfg_attr(feature = "timer-isr", allow(unused_imports))]
#[cfg(feature = "timer-isr")]
pub use isr::*;

/// 1,000,000 microseconds = 1 second
pub const MICROSECONDS_PER_SECOND: u32 = 1_000_000;

/// Single-bit flag set by the tick interrupt and consumed by the transmitter.
///
/// There is no queue and no counter. A tick that fires while the flag is
/// still set is lost without trace, so the tick period has to be comfortably
/// longer than the foreground work done per tick.
///
/// Only atomic `load` and `store` are used; AVR cores have no atomic swap.
#[derive(Debug, Default)]
pub struct TickFlag {
    pending: AtomicBool,
}

impl TickFlag {
    /// Creates a cleared flag. Usable in a `static`.
    pub const fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
        }
    }

    /// Marks a tick as elapsed. Call this, and nothing else, from the timer ISR.
    pub fn signal(&self) {
        self.pending.store(true, Ordering::SeqCst);
    }

    /// Drops a pending tick, if any.
    pub fn clear(&self) {
        self.pending.store(false, Ordering::SeqCst);
    }

    /// Whether a tick is waiting to be consumed.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::SeqCst)
    }

    /// Consumes a pending tick.
    ///
    /// Returns `WouldBlock` until the interrupt has fired, so it composes with
    /// [`nb::block!`].
    pub fn poll(&self) -> nb::Result<(), Infallible> {
        if self.pending.load(Ordering::SeqCst) {
            self.pending.store(false, Ordering::SeqCst);
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }
}

/// A periodic hardware timer that drives a [`TickFlag`].
///
/// Implementations power the timer peripheral up in [`start`](TickTimer::start)
/// and back down in [`stop`](TickTimer::stop); outside a transmission it must
/// draw no current. The interrupt handler attached in `start` must call
/// [`TickFlag::signal`] on the flag the transmitter was built with, for
/// example through [`on_timer_interrupt`] with the `timer-isr` feature.
pub trait TickTimer {
    /// HAL specific failure.
    type Error: Debug;

    /// Powers the timer, arms a periodic interrupt every `tick_us`
    /// microseconds and attaches the tick handler.
    fn start(&mut self, tick_us: u16) -> Result<(), Self::Error>;

    /// Detaches the handler, stops the timer and powers it down.
    fn stop(&mut self) -> Result<(), Self::Error>;
}

impl<T: TickTimer + ?Sized> TickTimer for &mut T {
    type Error = T::Error;

    fn start(&mut self, tick_us: u16) -> Result<(), Self::Error> {
        T::start(self, tick_us)
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        T::stop(self)
    }
}

/// Computes the compare value for a timer in CTC mode.
///
/// # Arguments
/// - `f_cpu`: CPU frequency in Hz
/// - `prescaler`: timer prescaler (e.g., 8, 64, 256)
/// - `tick_us`: desired tick interval in microseconds (e.g., 500)
///
/// # Returns
/// - Compare value for OCRnA/OCR1C (rounds to nearest integer), saturating
///   at `u16::MAX`. A zero `prescaler` therefore yields `u16::MAX`.
pub fn compute_compare_value(f_cpu: u32, prescaler: u32, tick_us: u16) -> u16 {
    let counts_per_second = f64::from(f_cpu) / f64::from(prescaler);
    let counts_per_tick = counts_per_second * f64::from(tick_us) / f64::from(MICROSECONDS_PER_SECOND);
    round(counts_per_tick) as u16
}

/// Compile-time compare value calculator.
///
/// Same arguments as [`compute_compare_value`], using integer arithmetic
/// rounded half up, so both agree for every non-zero `prescaler`.
///
/// # Panics
/// If `prescaler` is zero. In a `const` item this is a compile error.
pub const fn const_compare_value(f_cpu: u32, prescaler: u32, tick_us: u16) -> u16 {
    let scaled = (f_cpu as u64) * (tick_us as u64) * 2 / (prescaler as u64);
    let rounded = (scaled / (MICROSECONDS_PER_SECOND as u64) + 1) / 2;
    rounded as u16
}

/// Ticks per second for a tick length in microseconds.
///
/// # Panics
/// If `tick_us` is zero. [`Protocol::validate`](crate::protocol::Protocol::validate)
/// rejects such a tick before it can reach a timer.
pub const fn tick_frequency_hz(tick_us: u16) -> u32 {
    MICROSECONDS_PER_SECOND / tick_us as u32
}
