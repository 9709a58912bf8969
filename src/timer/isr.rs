use crate::timer::TickFlag;
use core::cell::Cell;
use critical_section::Mutex;

/// The flag signalled by [`on_timer_interrupt`], if a handler is attached.
static TICK_HANDLER: Mutex<Cell<Option<&'static TickFlag>>> = Mutex::new(Cell::new(None));

/// Attaches `flag` as the target of the timer interrupt.
///
/// Called by a [`TickTimer`](crate::timer::TickTimer) implementation from
/// `start`. Replaces any previously attached flag.
///
/// # Example
/// ```rust
/// use doorbell433::timer::{attach_tick_handler, TickFlag};
///
/// static TICK: TickFlag = TickFlag::new();
///
/// attach_tick_handler(&TICK);
/// ```
pub fn attach_tick_handler(flag: &'static TickFlag) {
    critical_section::with(|cs| {
        TICK_HANDLER.borrow(cs).set(Some(flag));
    });
}

/// Detaches the current handler. Ticks that fire afterwards are ignored.
///
/// Called by a [`TickTimer`](crate::timer::TickTimer) implementation from
/// `stop`.
pub fn detach_tick_handler() {
    critical_section::with(|cs| {
        TICK_HANDLER.borrow(cs).set(None);
    });
}

/// Whether a handler is currently attached.
pub fn tick_handler_attached() -> bool {
    critical_section::with(|cs| TICK_HANDLER.borrow(cs).get().is_some())
}

/// Runs the tick handler. Call this from the timer compare interrupt.
///
/// # Example
/// ```rust,ignore
/// #[avr_device::interrupt(attiny85)]
/// fn TIMER1_COMPA() {
///     doorbell433::timer::on_timer_interrupt();
/// }
/// ```
///
/// # Notes
/// - Safe to call before anything is attached; it does nothing.
pub fn on_timer_interrupt() {
    critical_section::with(|cs| {
        if let Some(flag) = TICK_HANDLER.borrow(cs).get() {
            flag.signal();
        }
    });
}
