//! Top-level firmware loop.
//!
//! The device spends its life asleep. Every wake edge rings the doorbell a
//! fixed number of times, with a busy-wait gap between rings, and goes back
//! to sleep:
//!
//! ```rust,ignore
//! let mut power = PowerController::new(mcu, PowerConfig::default());
//! let doorbell = Doorbell::new(tx, timer, &TICK, emitter_power)?;
//!
//! doorbell433::control::run(&mut power, doorbell, &mut delay, LoopConfig::default());
//! ```

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::consts::{RING_GAP_MS, RINGS_PER_WAKE};
use crate::doorbell::Doorbell;
use crate::error::{Error, Result};
use crate::power::LowPowerController;
use crate::timer::TickTimer;

/// What happens on each wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Rings sent per wake edge.
    pub rings_per_wake: u8,
    /// Busy-wait between two rings, in milliseconds.
    pub ring_gap_ms: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            rings_per_wake: RINGS_PER_WAKE,
            ring_gap_ms: RING_GAP_MS,
        }
    }
}

/// One-time startup: low-power configuration, then the wake source.
///
/// With `timer-isr` both steps run inside a critical section, so no
/// interrupt can observe a half-configured chip.
pub fn setup<P: LowPowerController>(power: &mut P) {
    #[cfg(feature = "timer-isr")]
    critical_section::with(|_| configure(power));
    #[cfg(not(feature = "timer-isr"))]
    configure(power);
}

fn configure<P: LowPowerController>(power: &mut P) {
    power.enter_low_power_configuration();
    power.arm_wake_source();
    debug!("setup done, wake source armed");
}

/// Sleeps until the wake edge, then rings `config.rings_per_wake` times.
///
/// Every ring is attempted even if an earlier one failed; the first error
/// is returned.
///
/// # Errors
/// - [`Error::WakeSourceNotArmed`](crate::Error::WakeSourceNotArmed) if
///   [`setup`] was never run; nothing is rung
/// - any error of [`Doorbell::ring`]
pub fn service_wake<P, TX, EP, T, D>(
    power: &mut P,
    doorbell: &mut Doorbell<'_, TX, EP, T>,
    delay: &mut D,
    config: &LoopConfig,
) -> Result<()>
where
    P: LowPowerController,
    TX: OutputPin,
    EP: OutputPin,
    T: TickTimer,
    D: DelayNs,
{
    power.sleep()?;
    power.wake();

    let mut result = Ok(());
    for i in 0..config.rings_per_wake {
        if i > 0 {
            delay.delay_ms(config.ring_gap_ms);
        }
        if let Err(err) = doorbell.ring() {
            warn!("ring {} failed: {}", i, err);
            result = result.and(Err(err));
        }
    }
    result
}

/// One iteration of [`run`]: services a wake and logs what went wrong.
///
/// A controller that refused to sleep because nothing was armed is set up
/// again, so the next iteration sleeps instead of failing straight away.
pub fn run_once<P, TX, EP, T, D>(
    power: &mut P,
    doorbell: &mut Doorbell<'_, TX, EP, T>,
    delay: &mut D,
    config: &LoopConfig,
) where
    P: LowPowerController,
    TX: OutputPin,
    EP: OutputPin,
    T: TickTimer,
    D: DelayNs,
{
    match service_wake(power, doorbell, delay, config) {
        Ok(()) => {}
        Err(Error::WakeSourceNotArmed) => {
            warn!("wake source not armed, running setup");
            setup(power);
        }
        Err(err) => warn!("wake cycle failed: {}", err),
    }
}

/// Runs [`setup`], then the doorbell forever.
///
/// Errors are logged and otherwise ignored: the device goes straight back to
/// sleep and waits for the next press.
pub fn run<P, TX, EP, T, D>(
    power: &mut P,
    mut doorbell: Doorbell<'_, TX, EP, T>,
    delay: &mut D,
    config: LoopConfig,
) -> !
where
    P: LowPowerController,
    TX: OutputPin,
    EP: OutputPin,
    T: TickTimer,
    D: DelayNs,
{
    setup(power);
    loop {
        run_once(power, &mut doorbell, delay, &config);
    }
}
