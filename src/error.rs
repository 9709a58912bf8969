//! Error type shared by every part of the doorbell core.
//!
//! On the device nothing is reported anywhere: a missing tick source is a
//! hang, a spurious wake is a ring. These values exist so that the
//! transmitter can release the timer and emitter on the way out, and so
//! host tests can assert on what went wrong.

use embedded_hal::digital::ErrorKind;

/// Everything that can go wrong while configuring, transmitting or sleeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Error {
    /// Writing an output pin failed.
    #[error("output pin write failed: {0:?}")]
    Pin(ErrorKind),

    /// The tick timer could not be armed or disarmed.
    #[error("tick timer could not be armed or disarmed")]
    Timer,

    /// The bounded tick wait expired before the interrupt fired.
    ///
    /// Only returned when a tick timeout was set with
    /// [`Transmitter::set_tick_timeout`](crate::transmitter::Transmitter::set_tick_timeout).
    #[error("no tick within the configured number of polls")]
    TickTimeout,

    /// A protocol entry used for transmission has a `(0, 0)` timing.
    #[error("pulse timing with zero high and zero low ticks")]
    DegenerateTiming,

    /// The protocol tick length is zero microseconds.
    #[error("tick length must be at least one microsecond")]
    InvalidTickLength,

    /// A code bit length larger than the code width was requested.
    #[error("bit length {0} exceeds the 32-bit code width")]
    CodeLength(u8),

    /// Sleep was requested without an armed wake source.
    #[error("refusing to sleep without an armed wake source")]
    WakeSourceNotArmed,
}

impl Error {
    /// Converts a HAL pin error into [`Error::Pin`].
    pub fn pin<E: embedded_hal::digital::Error>(err: E) -> Self {
        Error::Pin(err.kind())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = core::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_error_keeps_kind() {
        assert_eq!(Error::pin(ErrorKind::Other), Error::Pin(ErrorKind::Other));
    }

    #[cfg(feature = "std")]
    #[test]
    fn test_error_messages() {
        assert_eq!(
            Error::CodeLength(40).to_string(),
            "bit length 40 exceeds the 32-bit code width"
        );
        assert_eq!(
            Error::TickTimeout.to_string(),
            "no tick within the configured number of polls"
        );
    }
}
