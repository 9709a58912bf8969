//! Hosted simulation of the doorbell board.
//!
//! Runs the real transmitter and power controller on a desktop: the ATtiny85
//! registers touched by the firmware are kept in a [`Registers`] file, the
//! tick interrupt is a thread signalling the [`TickFlag`], and the halt
//! instruction waits on a condition variable that [`WakeLine::press`]
//! notifies.
//!
//! Every pin level change, timer arm/disarm, halt/resume and delay is
//! appended to an [`Event`] log so tests can check the order things happened
//! in.
//!
//! ## Example
//!
//! ```rust
//! use doorbell433::power::{LowPowerController, PowerConfig, PowerController};
//! use doorbell433::sim::SimBoard;
//!
//! let board = SimBoard::new();
//! let mut power = PowerController::new(board.mcu(), PowerConfig::default());
//! power.enter_low_power_configuration();
//! power.arm_wake_source();
//!
//! board.wake_line().press();
//! power.sleep().unwrap();
//! power.wake();
//! ```

use core::convert::Infallible;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, OutputPin, PinState};

use crate::consts::{
    ACD, ADEN, ISC00, ISC01, PCIE, PRADC, PRTIM0, PRTIM1, PRUSI, PUD, SE, SM0, SM1, WDE, bv,
};
use crate::power::{Edge, Peripheral, SleepMcu, SleepMode};
use crate::timer::{TickFlag, TickTimer};
#[cfg(feature = "timer-isr")]
use crate::timer::{attach_tick_handler, detach_tick_handler, on_timer_interrupt};

/// Leaks a fresh [`TickFlag`] so a ticker thread can hold on to it.
pub fn tick_flag() -> &'static TickFlag {
    Box::leak(Box::default())
}

/// The slice of the ATtiny85 register file the firmware writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    /// ADC control and status register A
    pub adcsra: u8,
    /// Analog comparator control and status register
    pub acsr: u8,
    /// Watchdog timer control register
    pub wdtcr: u8,
    /// Port B data direction register
    pub ddrb: u8,
    /// Port B data register
    pub portb: u8,
    /// MCU control register
    pub mcucr: u8,
    /// Power reduction register
    pub prr: u8,
    /// General interrupt mask register
    pub gimsk: u8,
    /// Pin change mask register
    pub pcmsk: u8,
}

impl Registers {
    /// State left behind by a bootloader that enabled the ADC and watchdog.
    pub fn awake() -> Self {
        Self {
            adcsra: bv(ADEN),
            wdtcr: bv(WDE),
            ..Self::default()
        }
    }

    /// Whether the pin-change interrupt can resume the CPU.
    pub fn wake_armed(&self) -> bool {
        self.gimsk & bv(PCIE) != 0 && self.pcmsk != 0
    }

    /// Whether the sleep-enable latch is set.
    pub fn sleep_enabled(&self) -> bool {
        self.mcucr & bv(SE) != 0
    }

    /// Whether Timer/Counter1 is clocked.
    pub fn timer1_powered(&self) -> bool {
        self.prr & bv(PRTIM1) == 0
    }
}

/// Something observable that happened on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// An output pin was written.
    Level {
        /// `PORTB` pin number
        pin: u8,
        /// Level written
        state: PinState,
    },
    /// The tick timer was powered and armed.
    TimerStarted {
        /// Requested tick length
        tick_us: u16,
    },
    /// The tick timer was disarmed and powered down.
    TimerStopped,
    /// The CPU executed the sleep instruction with the latch set.
    Halted,
    /// The CPU resumed after a halt.
    Resumed,
    /// A busy-wait delay.
    Delay {
        /// Length in nanoseconds
        ns: u64,
    },
}

#[derive(Debug, Default)]
struct BoardState {
    regs: Registers,
    events: Vec<Event>,
    wake_pending: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<BoardState>,
    wake: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, event: Event) {
        self.lock().events.push(event);
    }
}

/// A simulated doorbell board. Cloning shares the same board.
#[derive(Debug, Clone, Default)]
pub struct SimBoard {
    shared: Arc<Shared>,
}

impl SimBoard {
    /// A board with every register at its reset value of zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// A board starting from the given register values.
    pub fn with_registers(regs: Registers) -> Self {
        let board = Self::default();
        board.shared.lock().regs = regs;
        board
    }

    /// Snapshot of the register file.
    pub fn registers(&self) -> Registers {
        self.shared.lock().regs
    }

    /// Every event recorded so far.
    pub fn events(&self) -> Vec<Event> {
        self.shared.lock().events.clone()
    }

    /// Drains the event log.
    pub fn take_events(&self) -> Vec<Event> {
        core::mem::take(&mut self.shared.lock().events)
    }

    /// The power capabilities of the MCU.
    pub fn mcu(&self) -> SimMcu {
        SimMcu {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Configures `pin` as an output and hands it out.
    pub fn output_pin(&self, pin: u8) -> SimPin {
        self.shared.lock().regs.ddrb |= bv(pin);
        SimPin {
            shared: Arc::clone(&self.shared),
            pin,
        }
    }

    /// Timer/Counter1, signalling `flag` as fast as the consumer polls it.
    pub fn timer(&self, flag: &'static TickFlag) -> SimTimer {
        SimTimer::new(Arc::clone(&self.shared), Some(flag), TickRate::Free, TickRoute::Direct)
    }

    /// Timer/Counter1 wired like the device: `start` attaches `flag` as the
    /// global tick handler, the ticker thread enters through
    /// [`on_timer_interrupt`] and `stop` detaches the handler again.
    ///
    /// The handler slot is process-global, so only one of these may run at a
    /// time.
    #[cfg(feature = "timer-isr")]
    pub fn isr_timer(&self, flag: &'static TickFlag) -> SimTimer {
        SimTimer::new(Arc::clone(&self.shared), Some(flag), TickRate::Free, TickRoute::Interrupt)
    }

    /// Timer/Counter1, signalling `flag` once per requested tick length of
    /// wall-clock time.
    pub fn real_time_timer(&self, flag: &'static TickFlag) -> SimTimer {
        SimTimer::new(Arc::clone(&self.shared), Some(flag), TickRate::RealTime, TickRoute::Direct)
    }

    /// A timer that powers up but whose interrupt never fires.
    pub fn stalled_timer(&self) -> SimTimer {
        SimTimer::new(Arc::clone(&self.shared), None, TickRate::Free, TickRoute::Direct)
    }

    /// A timer that refuses to start.
    pub fn broken_timer(&self) -> SimTimer {
        let mut timer = self.stalled_timer();
        timer.refuse_start = true;
        timer
    }

    /// Busy-wait delay provider.
    pub fn delay(&self) -> SimDelay {
        SimDelay {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The wake button.
    pub fn wake_line(&self) -> WakeLine {
        WakeLine {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// [`SleepMcu`] over the simulated register file.
#[derive(Debug)]
pub struct SimMcu {
    shared: Arc<Shared>,
}

impl SleepMcu for SimMcu {
    fn power_down(&mut self, peripheral: Peripheral) {
        let mut board = self.shared.lock();
        let regs = &mut board.regs;
        match peripheral {
            Peripheral::Adc => {
                // ADC has to be disabled before its clock is gated.
                regs.adcsra &= !bv(ADEN);
                regs.prr |= bv(PRADC);
            }
            Peripheral::AnalogComparator => regs.acsr |= bv(ACD),
            Peripheral::Watchdog => regs.wdtcr &= !bv(WDE),
            Peripheral::Timer0 => regs.prr |= bv(PRTIM0),
            Peripheral::Timer1 => regs.prr |= bv(PRTIM1),
            Peripheral::Usi => regs.prr |= bv(PRUSI),
        }
    }

    fn pull_up_inputs(&mut self, pins: u8) {
        let mut board = self.shared.lock();
        let regs = &mut board.regs;
        regs.ddrb &= !pins;
        regs.mcucr &= !bv(PUD);
        regs.portb |= pins;
    }

    fn select_sleep_mode(&mut self, mode: SleepMode) {
        let mut board = self.shared.lock();
        let regs = &mut board.regs;
        regs.mcucr = (regs.mcucr & !(bv(SM1) | bv(SM0))) | (mode.bits() << SM0);
    }

    fn enable_wake_interrupt(&mut self, pin: u8, edge: Edge) {
        let mut board = self.shared.lock();
        let regs = &mut board.regs;
        regs.mcucr = (regs.mcucr & !(bv(ISC01) | bv(ISC00))) | (edge.bits() << ISC00);
        regs.gimsk |= bv(PCIE);
        regs.pcmsk |= bv(pin);
    }

    fn set_sleep_enable(&mut self, enabled: bool) {
        let mut board = self.shared.lock();
        let regs = &mut board.regs;
        if enabled {
            regs.mcucr |= bv(SE);
        } else {
            regs.mcucr &= !bv(SE);
        }
    }

    fn halt(&mut self) {
        let mut state = self.shared.lock();
        if !state.regs.sleep_enabled() {
            return;
        }
        state.events.push(Event::Halted);
        while !(state.wake_pending && state.regs.wake_armed()) {
            state = self
                .shared
                .wake
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        state.wake_pending = false;
        state.events.push(Event::Resumed);
    }
}

/// An output pin of port B.
#[derive(Debug)]
pub struct SimPin {
    shared: Arc<Shared>,
    pin: u8,
}

impl SimPin {
    fn write(&mut self, state: PinState) {
        let mut board = self.shared.lock();
        match state {
            PinState::High => board.regs.portb |= bv(self.pin),
            PinState::Low => board.regs.portb &= !bv(self.pin),
        }
        board.events.push(Event::Level {
            pin: self.pin,
            state,
        });
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.write(PinState::Low);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.write(PinState::High);
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickRate {
    Free,
    RealTime,
}

/// How a tick reaches the flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickRoute {
    Direct,
    #[cfg(feature = "timer-isr")]
    Interrupt,
}

/// Why a [`SimTimer`] refused to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRefused;

/// Timer/Counter1 with a ticker thread standing in for the compare interrupt.
#[derive(Debug)]
pub struct SimTimer {
    shared: Arc<Shared>,
    flag: Option<&'static TickFlag>,
    rate: TickRate,
    route: TickRoute,
    refuse_start: bool,
    running: Arc<AtomicBool>,
    ticker: Option<JoinHandle<()>>,
}

impl SimTimer {
    fn new(
        shared: Arc<Shared>,
        flag: Option<&'static TickFlag>,
        rate: TickRate,
        route: TickRoute,
    ) -> Self {
        Self {
            shared,
            flag,
            rate,
            route,
            refuse_start: false,
            running: Arc::new(AtomicBool::new(false)),
            ticker: None,
        }
    }

    /// Whether the ticker is running.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn join_ticker(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(ticker) = self.ticker.take() {
            let _ = ticker.join();
            #[cfg(feature = "timer-isr")]
            if self.route == TickRoute::Interrupt {
                detach_tick_handler();
            }
        }
    }
}

impl TickTimer for SimTimer {
    type Error = TimerRefused;

    fn start(&mut self, tick_us: u16) -> Result<(), Self::Error> {
        if self.refuse_start {
            return Err(TimerRefused);
        }
        self.join_ticker();
        {
            let mut board = self.shared.lock();
            board.regs.prr &= !bv(PRTIM1);
            board.events.push(Event::TimerStarted { tick_us });
        }
        self.running.store(true, Ordering::SeqCst);
        if let Some(flag) = self.flag {
            #[cfg(feature = "timer-isr")]
            if self.route == TickRoute::Interrupt {
                attach_tick_handler(flag);
            }
            let route = self.route;
            let running = Arc::clone(&self.running);
            let period = match self.rate {
                TickRate::Free => None,
                TickRate::RealTime => Some(Duration::from_micros(u64::from(tick_us))),
            };
            self.ticker = Some(thread::spawn(move || {
                while running.load(Ordering::SeqCst) {
                    match period {
                        Some(period) => thread::sleep(period),
                        None => thread::yield_now(),
                    }
                    match route {
                        TickRoute::Direct => flag.signal(),
                        #[cfg(feature = "timer-isr")]
                        TickRoute::Interrupt => on_timer_interrupt(),
                    }
                }
            }));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), Self::Error> {
        self.join_ticker();
        let mut board = self.shared.lock();
        board.regs.prr |= bv(PRTIM1);
        board.events.push(Event::TimerStopped);
        Ok(())
    }
}

impl Drop for SimTimer {
    fn drop(&mut self) {
        self.join_ticker();
    }
}

/// Busy-wait delay that only records how long it was asked to wait.
#[derive(Debug)]
pub struct SimDelay {
    shared: Arc<Shared>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.shared.record(Event::Delay { ns: u64::from(ns) });
    }

    fn delay_us(&mut self, us: u32) {
        self.shared.record(Event::Delay {
            ns: u64::from(us) * 1_000,
        });
    }

    fn delay_ms(&mut self, ms: u32) {
        self.shared.record(Event::Delay {
            ns: u64::from(ms) * 1_000_000,
        });
    }
}

/// The wake button. Pressing it produces a falling edge.
#[derive(Debug, Clone)]
pub struct WakeLine {
    shared: Arc<Shared>,
}

impl WakeLine {
    /// Produces one falling edge.
    ///
    /// The edge is latched like the pin-change flag: pressing before the CPU
    /// halts still wakes it.
    pub fn press(&self) {
        self.shared.lock().wake_pending = true;
        self.shared.wake.notify_all();
    }

    /// Whether an edge is latched and not yet serviced.
    pub fn is_pending(&self) -> bool {
        self.shared.lock().wake_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{BUTTON_PIN, PORTB_MASK};

    #[test]
    fn test_power_down_clears_enables_and_gates_clocks() {
        let board = SimBoard::with_registers(Registers::awake());
        let mut mcu = board.mcu();
        mcu.power_down(Peripheral::Adc);
        mcu.power_down(Peripheral::Watchdog);
        mcu.power_down(Peripheral::AnalogComparator);

        let regs = board.registers();
        assert_eq!(regs.adcsra & bv(ADEN), 0);
        assert_ne!(regs.prr & bv(PRADC), 0);
        assert_eq!(regs.wdtcr & bv(WDE), 0);
        assert_ne!(regs.acsr & bv(ACD), 0);
    }

    #[test]
    fn test_pull_ups_and_mode_bits() {
        let board = SimBoard::new();
        let _tx = board.output_pin(1);
        let mut mcu = board.mcu();
        mcu.pull_up_inputs(PORTB_MASK & !bv(1));
        mcu.select_sleep_mode(SleepMode::PowerDown);
        mcu.enable_wake_interrupt(BUTTON_PIN, Edge::Falling);

        let regs = board.registers();
        assert_eq!(regs.ddrb, bv(1));
        assert_eq!(regs.portb, 0b0011_1101);
        assert_eq!(regs.mcucr & (bv(SM1) | bv(SM0)), bv(SM1));
        assert_eq!(regs.mcucr & (bv(ISC01) | bv(ISC00)), bv(ISC01));
        assert!(regs.wake_armed());
    }

    #[test]
    fn test_halt_without_latch_is_a_no_op() {
        let board = SimBoard::new();
        board.mcu().halt();
        assert!(board.events().is_empty());
    }

    #[test]
    fn test_latched_press_wakes_halt() {
        let board = SimBoard::new();
        let mut mcu = board.mcu();
        mcu.enable_wake_interrupt(BUTTON_PIN, Edge::Falling);
        mcu.set_sleep_enable(true);

        board.wake_line().press();
        mcu.halt();

        assert_eq!(board.events(), [Event::Halted, Event::Resumed]);
        assert!(!board.wake_line().is_pending());
    }

    #[test]
    fn test_timer_gates_timer1_clock() {
        let board = SimBoard::with_registers(Registers {
            prr: bv(PRTIM1),
            ..Registers::default()
        });
        let mut timer = board.timer(tick_flag());

        assert!(timer.start(500).is_ok());
        assert!(board.registers().timer1_powered());
        assert!(timer.is_running());
        assert!(timer.stop().is_ok());
        assert!(!board.registers().timer1_powered());
        assert!(!timer.is_running());
        assert_eq!(
            board.events(),
            [Event::TimerStarted { tick_us: 500 }, Event::TimerStopped]
        );
    }

    #[test]
    fn test_delay_records_duration() {
        let board = SimBoard::new();
        board.delay().delay_ms(500);
        assert_eq!(board.events(), [Event::Delay { ns: 500_000_000 }]);
    }
}
