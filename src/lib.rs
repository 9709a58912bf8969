//! # doorbell433
//!
//! A portable, no_std firmware core for battery-powered 433 MHz ASK/OOK doorbell
//! buttons, built for an ATtiny85 keying a cheap emitter module such as the FS1000A.
//!
//! The button spends its life in power-down sleep. A press wakes it, the doorbell
//! rings twice and the chip goes back to sleep. Each ring powers the emitter, sends
//! one of two ring codes 16 times and powers the emitter down again.
//!
//! This crate implements that firmware using:
//! - `embedded-hal` traits for digital output and the inter-ring delay
//! - one periodic timer interrupt as the only time base for pulse widths
//! - interrupt-safe handler registration with `critical-section`
//! - a register-level power controller behind the [`power::SleepMcu`] trait
//!
//! ## Crate features
//! | Feature               | Description |
//! |-----------------------|-------------|
//! | `std`                 | Disables `#![no_std]` and enables the [`sim`] board |
//! | `timer-isr` (default) | Global tick handler slot guarded by `critical_section::with` |
//! | `defmt-0-3`           | Uses `defmt` logging |
//! | `log`                 | Uses `log` logging |
//!
//! ## Software Features
//!
//! - **Tick-paced transmitter**: every pin write follows one timer tick, no delay loops
//! - Blyss doorbell protocol (DC6-FR-WH 656185) with alternating ring codes
//! - Deep-sleep power control with a single falling-edge wake source
//! - Emitter supply held only while a code is on air, on error paths too
//! - Hosted simulation of the board for tests and experiments
//!
//! ## Usage
//!
//! ```rust,ignore
//! use doorbell433::control::{self, LoopConfig};
//! use doorbell433::doorbell::Doorbell;
//! use doorbell433::power::{PowerConfig, PowerController};
//! use doorbell433::timer::TickFlag;
//!
//! static TICK: TickFlag = TickFlag::new();
//!
//! let mut power = PowerController::new(mcu, PowerConfig::default());
//! control::setup(&mut power);
//!
//! let doorbell = Doorbell::new(tx_pin, timer1, &TICK, emitter_power_pin)?;
//! control::run(&mut power, doorbell, &mut delay, LoopConfig::default());
//! ```
//!
//! The timer compare interrupt forwards to the transmitter's tick flag:
//!
//! ```rust,ignore
//! #[avr_device::interrupt(attiny85)]
//! fn TIMER1_COMPA() {
//!     doorbell433::timer::on_timer_interrupt();
//! }
//! ```
//!
//! ## Integration Notes
//!
//! - Blyss pulses are counted in 500 µs ticks; the timer must fire at 2 kHz
//! - A tick that fires while the previous one is still pending is lost
//! - Only one transmitter should be attached to the tick handler at a time
//!
//! --
//! Designed for `#![no_std]` use in resource-constrained embedded environments.

#![deny(
    bad_style,
    dead_code,
    improper_ctypes,
    non_shorthand_field_patterns,
    no_mangle_generic_items,
    overflowing_literals,
    path_statements,
    patterns_in_fns_without_body,
    unconditional_recursion,
    unused,
    while_true,
    missing_debug_implementations,
    missing_docs,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications,
    unused_results
)]
#![cfg_attr(not(any(feature = "std", test)), no_std)]

#[macro_use]
mod fmt;

#[cfg(feature = "timer-isr")]
pub use critical_section;

pub use heapless;

pub mod consts;
pub mod control;
pub mod doorbell;
pub mod error;
pub mod power;
pub mod protocol;
#[cfg(any(test, feature = "std"))]
pub mod sim;
pub mod timer;
pub mod transmitter;

pub use error::{Error, Result};
