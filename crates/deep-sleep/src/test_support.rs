//! Register emulation harness shared by the unit tests
//!
//! Every fake collaborator writes into one journal so the tests can check
//! the exact order of hardware calls and observer notifications.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

use embedded_hal::delay::DelayNs;
use time::macros::datetime;
use time::PrimitiveDateTime;
use time::Time;

use crate::alarm::AlarmHandler;
use crate::clocks::ClockRegister;
use crate::wake::WakeHandler;
use crate::AlarmTime;
use crate::AlarmTimer;
use crate::ClockControl;
use crate::Config;
use crate::DormantTrigger;
use crate::EdgeTrigger;
use crate::Error;
use crate::ExternalClock;
use crate::Observer;
use crate::SleepController;
use crate::WakePins;

/// Value of the system control register after reset
pub const RESET_SYSTEM_CONTROL: u32 = 0x0000_0000;

/// Value of the first sleep enable mask after reset
pub const RESET_SLEEP_ENABLE0: u32 = 0xFFFF_FFFF;

/// Value of the second sleep enable mask after reset
pub const RESET_SLEEP_ENABLE1: u32 = 0x0000_7FFF;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Write(ClockRegister, u32),
    SelectSleepOscillator,
    EnableRingOscillator,
    WaitForInterrupt,
    DormantUntilPin(u8, DormantTrigger),
    ReinitClocks,
    ReinitConsole,

    ConfigureInputWithPullup(u8),
    EnableEdgeInterrupt {
        pad: u8,
        edges: EdgeTrigger,
        own_handler: bool,
    },
    DisableInterrupt(u8),
    ReleasePulls(u8),

    AlarmInit,
    AlarmSetDatetime(PrimitiveDateTime),
    AlarmSet(AlarmTime),
    AlarmDisable,
    DelayNs(u32),

    ExternalClearAlarm,
    ExternalSetDelay(u32),

    ObserverDormant(&'static str, u32),
    ObserverWake(&'static str, u32),
}

impl Call {
    pub fn is_pin_call(&self) -> bool {
        matches!(
            self,
            Call::ConfigureInputWithPullup(_)
                | Call::EnableEdgeInterrupt { .. }
                | Call::DisableInterrupt(_)
                | Call::ReleasePulls(_)
        )
    }

    pub fn is_external_clock_call(&self) -> bool {
        matches!(self, Call::ExternalClearAlarm | Call::ExternalSetDelay(_))
    }

    pub fn is_observer_call(&self) -> bool {
        matches!(self, Call::ObserverDormant(..) | Call::ObserverWake(..))
    }
}

#[derive(Debug)]
pub struct BoardState {
    pub journal: Vec<Call>,
    pub system_control: u32,
    pub sleep_enable0: u32,
    pub sleep_enable1: u32,

    /// Register values seen at the moment the core started waiting
    pub registers_at_wait: Option<(u32, u32, u32)>,

    pub alarm_running: bool,
    pub alarm_now: PrimitiveDateTime,
    pub alarm_read_fails: bool,
    pub alarm_write_fails: bool,

    pub external_clear_fails: bool,
    pub external_set_fails: bool,
}

impl BoardState {
    fn register(&mut self, register: ClockRegister) -> &mut u32 {
        match register {
            ClockRegister::SystemControl => &mut self.system_control,
            ClockRegister::SleepEnable0 => &mut self.sleep_enable0,
            ClockRegister::SleepEnable1 => &mut self.sleep_enable1,
        }
    }
}

/// A fake chip. Cloning shares the state.
#[derive(Clone)]
pub struct Board {
    state: Arc<Mutex<BoardState>>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BoardState {
                journal: Vec::new(),
                system_control: RESET_SYSTEM_CONTROL,
                sleep_enable0: RESET_SLEEP_ENABLE0,
                sleep_enable1: RESET_SLEEP_ENABLE1,
                registers_at_wait: None,
                alarm_running: true,
                alarm_now: datetime!(2024-07-16 10:23:41),
                alarm_read_fails: false,
                alarm_write_fails: false,
                external_clear_fails: false,
                external_set_fails: false,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap()
    }

    pub fn journal(&self) -> Vec<Call> {
        self.state().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.state().journal.clear();
    }

    fn record(&self, call: Call) {
        self.state().journal.push(call);
    }

    pub fn clocks(&self) -> FakeClocks {
        FakeClocks(self.clone())
    }

    pub fn pins(&self) -> FakePins {
        FakePins(self.clone())
    }

    pub fn alarm(&self) -> FakeAlarm {
        FakeAlarm(self.clone())
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay(self.clone())
    }

    pub fn external_clock(&self) -> FakeExternalClock {
        FakeExternalClock(self.clone())
    }

    pub fn observer(&self, name: &'static str) -> RecordingObserver {
        RecordingObserver {
            name,
            board: self.clone(),
        }
    }

    pub fn controller<'a>(&self) -> TestController<'a> {
        self.controller_with(Config::default())
    }

    pub fn controller_with<'a>(&self, config: Config) -> TestController<'a> {
        SleepController::new(self.clocks(), self.pins(), self.alarm(), self.delay(), config)
    }
}

pub type TestController<'a> = SleepController<'a, FakeClocks, FakePins, FakeAlarm, FakeDelay>;

pub struct FakeClocks(Board);

impl ClockControl for FakeClocks {
    fn read(&self, register: ClockRegister) -> u32 {
        *self.0.state().register(register)
    }

    fn write(&mut self, register: ClockRegister, value: u32) {
        let mut state = self.0.state();
        *state.register(register) = value;
        state.journal.push(Call::Write(register, value));
    }

    fn select_sleep_oscillator(&mut self) {
        self.0.record(Call::SelectSleepOscillator);
    }

    fn enable_ring_oscillator(&mut self) {
        self.0.record(Call::EnableRingOscillator);
    }

    fn wait_for_interrupt(&mut self) {
        let mut state = self.0.state();
        state.registers_at_wait = Some((
            state.system_control,
            state.sleep_enable0,
            state.sleep_enable1,
        ));
        state.journal.push(Call::WaitForInterrupt);
    }

    fn dormant_until_pin(&mut self, pad: u8, trigger: DormantTrigger) {
        self.0.record(Call::DormantUntilPin(pad, trigger));
    }

    fn reinit_clocks(&mut self) {
        self.0.record(Call::ReinitClocks);
    }

    fn reinit_console(&mut self) {
        self.0.record(Call::ReinitConsole);
    }
}

pub struct FakePins(Board);

impl WakePins for FakePins {
    fn configure_input_with_pullup(&mut self, pad: u8) {
        self.0.record(Call::ConfigureInputWithPullup(pad));
    }

    fn enable_edge_interrupt(&mut self, pad: u8, edges: EdgeTrigger, handler: Option<WakeHandler>) {
        if let Some(handler) = handler {
            // The handler must be callable from the interrupt vector
            handler(pad, edges.bits());
        }

        self.0.record(Call::EnableEdgeInterrupt {
            pad,
            edges,
            own_handler: handler.is_some(),
        });
    }

    fn disable_interrupt(&mut self, pad: u8) {
        self.0.record(Call::DisableInterrupt(pad));
    }

    fn release_pulls(&mut self, pad: u8) {
        self.0.record(Call::ReleasePulls(pad));
    }
}

pub struct FakeAlarm(Board);

impl AlarmTimer for FakeAlarm {
    fn is_running(&self) -> bool {
        self.0.state().alarm_running
    }

    fn init(&mut self) {
        self.0.record(Call::AlarmInit);
    }

    fn set_datetime(&mut self, time: &PrimitiveDateTime) -> Result<(), Error> {
        let mut state = self.0.state();
        state.journal.push(Call::AlarmSetDatetime(*time));
        if state.alarm_write_fails {
            return Err(Error::ClockUnwritable);
        }

        state.alarm_running = true;
        state.alarm_now = *time;
        Ok(())
    }

    fn datetime(&self) -> Result<PrimitiveDateTime, Error> {
        let state = self.0.state();
        if state.alarm_read_fails {
            Err(Error::ClockUnreadable)
        } else {
            Ok(state.alarm_now)
        }
    }

    fn set_alarm(&mut self, alarm: &AlarmTime, handler: Option<AlarmHandler>) {
        if let Some(handler) = handler {
            handler();
        }

        self.0.record(Call::AlarmSet(*alarm));
    }

    fn disable_alarm(&mut self) {
        self.0.record(Call::AlarmDisable);
    }
}

pub struct FakeDelay(Board);

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.record(Call::DelayNs(ns));
    }
}

pub struct FakeExternalClock(Board);

impl ExternalClock for FakeExternalClock {
    fn clear_alarm(&mut self) -> Result<(), Error> {
        let mut state = self.0.state();
        state.journal.push(Call::ExternalClearAlarm);
        if state.external_clear_fails {
            Err(Error::ClockUnwritable)
        } else {
            Ok(())
        }
    }

    fn set_delay(&mut self, minutes: u32) -> Result<(), Error> {
        let mut state = self.0.state();
        state.journal.push(Call::ExternalSetDelay(minutes));
        if state.external_set_fails {
            Err(Error::ClockUnwritable)
        } else {
            Ok(())
        }
    }

    fn time(&mut self) -> Result<Time, Error> {
        Ok(self.0.state().alarm_now.time())
    }
}

pub struct RecordingObserver {
    name: &'static str,
    board: Board,
}

impl Observer for RecordingObserver {
    fn notify_dormant(&self, minutes: u32) {
        self.board.record(Call::ObserverDormant(self.name, minutes));
    }

    fn notify_wake(&self, minutes: u32) {
        self.board.record(Call::ObserverWake(self.name, minutes));
    }
}
