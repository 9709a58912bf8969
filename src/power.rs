//! Deep-sleep power control.
//!
//! The device spends nearly all its life halted in power-down mode, with a
//! single pin-change interrupt armed to resume it. This module splits that
//! job in two:
//!
//! - [`SleepMcu`] is the register-level capability set of the
//!   microcontroller (gate a peripheral, pull pins up, select the sleep mode,
//!   arm the edge interrupt, toggle the sleep-enable latch, halt).
//! - [`PowerController`] sequences those capabilities into the power state
//!   machine and implements [`LowPowerController`], the interface the control
//!   loop drives.
//!
//! ```text
//! Active --sleep()--> PoweredDown --edge--> WokenTransient --wake()--> Active
//! ```
//!
//! The sleep-enable latch is set only immediately before the halt and cleared
//! by [`LowPowerController::wake`] right after it, so a stray halt elsewhere
//! in the firmware cannot put the device to sleep.
//!
//! Edges are not debounced and not recorded. Any interrupt resumes the CPU,
//! whether it came from a button press or from noise.

use crate::consts::{BUTTON_PIN, EMITTER_POWER_PIN, PORTB_MASK, TX_PIN, bv};
use crate::error::{Error, Result};

/// Where the power state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum PowerState {
    /// Running normally.
    #[default]
    Active,
    /// Sleep latch set and halt executed; only the wake source runs.
    PoweredDown,
    /// Resumed from halt; the sleep latch is still set until `wake()`.
    WokenTransient,
}

/// CPU sleep modes, in the `SM1:SM0` encoding of the ATtiny25/45/85.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum SleepMode {
    /// CPU halted, peripherals clocked.
    Idle,
    /// CPU and I/O clocks halted, ADC running.
    AdcNoiseReduction,
    /// Every clock halted; only asynchronous wake sources remain.
    PowerDown,
}

impl SleepMode {
    /// Value of the `SM1:SM0` field.
    pub const fn bits(self) -> u8 {
        match self {
            SleepMode::Idle => 0b00,
            SleepMode::AdcNoiseReduction => 0b01,
            SleepMode::PowerDown => 0b10,
        }
    }
}

/// Interrupt sense control for the wake pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Edge {
    /// Level-triggered while low.
    Low,
    /// Any logical change.
    Any,
    /// High-to-low transition.
    Falling,
    /// Low-to-high transition.
    Rising,
}

impl Edge {
    /// Value of the `ISC01:ISC00` field.
    pub const fn bits(self) -> u8 {
        match self {
            Edge::Low => 0b00,
            Edge::Any => 0b01,
            Edge::Falling => 0b10,
            Edge::Rising => 0b11,
        }
    }
}

/// On-chip peripherals that can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-0-3", derive(defmt::Format))]
pub enum Peripheral {
    /// Analog to digital converter.
    Adc,
    /// Analog comparator.
    AnalogComparator,
    /// Watchdog timer.
    Watchdog,
    /// Timer/Counter0.
    Timer0,
    /// Timer/Counter1. Powered back up by the transmitter's tick timer.
    Timer1,
    /// Universal serial interface.
    Usi,
}

/// Every peripheral the doorbell does not need while asleep.
pub const UNUSED_PERIPHERALS: [Peripheral; 6] = [
    Peripheral::Adc,
    Peripheral::AnalogComparator,
    Peripheral::Watchdog,
    Peripheral::Timer0,
    Peripheral::Timer1,
    Peripheral::Usi,
];

/// Register-level power capabilities of the microcontroller.
///
/// A HAL implements this on top of its PAC; the [`sim`](crate::sim) board
/// implements it on a simulated register file.
pub trait SleepMcu {
    /// Switches a peripheral off and stops its clock.
    fn power_down(&mut self, peripheral: Peripheral);

    /// Makes every pin in `pins` an input with its pull-up enabled.
    fn pull_up_inputs(&mut self, pins: u8);

    /// Selects the mode the next halt enters.
    fn select_sleep_mode(&mut self, mode: SleepMode);

    /// Enables the external interrupt on `pin` for `edge`. Its handler is
    /// empty: it exists only to resume the CPU.
    fn enable_wake_interrupt(&mut self, pin: u8, edge: Edge);

    /// Sets or clears the sleep-enable latch.
    fn set_sleep_enable(&mut self, enabled: bool);

    /// Executes the sleep instruction. Returns once any armed interrupt fires,
    /// or immediately if the sleep-enable latch is clear.
    fn halt(&mut self);
}

/// Power state transitions used by the control loop.
///
/// Simulation or test harnesses can implement this directly as a no-op.
pub trait LowPowerController {
    /// Disables unused peripherals, pulls up unused pins and selects the
    /// deepest sleep mode. Idempotent; does not sleep.
    fn enter_low_power_configuration(&mut self);

    /// Arms the single wake source.
    fn arm_wake_source(&mut self);

    /// Halts until the wake source fires.
    ///
    /// # Errors
    /// [`Error::WakeSourceNotArmed`] if nothing could ever wake the device;
    /// the CPU is not halted.
    fn sleep(&mut self) -> Result<()>;

    /// Post-wake cleanup; call immediately after [`sleep`](Self::sleep)
    /// returns. Clears the sleep-enable latch.
    fn wake(&mut self);
}

/// Which pins, peripherals and sleep mode the controller uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerConfig {
    /// Pin whose edge resumes the CPU.
    pub wake_pin: u8,
    /// Edge that resumes the CPU.
    pub wake_edge: Edge,
    /// Pins turned into pulled-up inputs; everything not driven as an output.
    pub pull_up_pins: u8,
    /// Mode entered on halt.
    pub sleep_mode: SleepMode,
    /// Peripherals switched off at startup.
    pub peripherals: &'static [Peripheral],
}

impl Default for PowerConfig {
    /// Doorbell board: button on `PB2`, falling edge, everything except the
    /// TX and emitter power pins pulled up, power-down mode.
    fn default() -> Self {
        Self {
            wake_pin: BUTTON_PIN,
            wake_edge: Edge::Falling,
            pull_up_pins: PORTB_MASK & !(bv(TX_PIN) | bv(EMITTER_POWER_PIN)),
            sleep_mode: SleepMode::PowerDown,
            peripherals: &UNUSED_PERIPHERALS,
        }
    }
}

/// [`LowPowerController`] built on a [`SleepMcu`].
#[derive(Debug)]
pub struct PowerController<M: SleepMcu> {
    /// The microcontroller
    pub mcu: M,
    config: PowerConfig,
    state: PowerState,
    configured: bool,
    armed: bool,
}

impl<M: SleepMcu> PowerController<M> {
    /// Creates a controller in the [`PowerState::Active`] state. Nothing is
    /// written to the MCU yet.
    pub fn new(mcu: M, config: PowerConfig) -> Self {
        Self {
            mcu,
            config,
            state: PowerState::Active,
            configured: false,
            armed: false,
        }
    }

    /// Current power state.
    pub fn state(&self) -> PowerState {
        self.state
    }

    /// Whether the low-power configuration has been applied.
    pub fn is_configured(&self) -> bool {
        self.configured
    }

    /// Whether the wake source is armed.
    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// The configuration in use.
    pub fn config(&self) -> &PowerConfig {
        &self.config
    }
}

impl<M: SleepMcu> LowPowerController for PowerController<M> {
    fn enter_low_power_configuration(&mut self) {
        for &peripheral in self.config.peripherals {
            self.mcu.power_down(peripheral);
        }
        self.mcu.pull_up_inputs(self.config.pull_up_pins);
        self.mcu.select_sleep_mode(self.config.sleep_mode);
        self.configured = true;
        debug!("low power configuration applied");
    }

    fn arm_wake_source(&mut self) {
        self.mcu
            .enable_wake_interrupt(self.config.wake_pin, self.config.wake_edge);
        self.armed = true;
        debug!("wake source armed on pin {}", self.config.wake_pin);
    }

    fn sleep(&mut self) -> Result<()> {
        if !self.armed {
            return Err(Error::WakeSourceNotArmed);
        }
        if !self.configured {
            warn!("sleeping without low power configuration");
        }
        self.state = PowerState::PoweredDown;
        self.mcu.set_sleep_enable(true);
        self.mcu.halt();
        self.state = PowerState::WokenTransient;
        Ok(())
    }

    fn wake(&mut self) {
        self.mcu.set_sleep_enable(false);
        self.state = PowerState::Active;
        debug!("awake");
    }
}
