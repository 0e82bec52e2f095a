//! The sleep state machine
//!
//! Every sleep walks `Awake -> Entering -> Asleep -> Recovering -> Awake`.
//! Nothing on the way is allowed to fail hard: the chip has no supervisor
//! that could restart it, so a broken alarm only narrows the ways the core
//! can be woken and the clocks are always restored after the wait.

use embedded_hal::delay::DelayNs;
use log::debug;
use log::error;
use log::info;
use log::log_enabled;
use log::warn;
use log::Level;

use crate::alarm::AlarmTime;
use crate::alarm::AlarmTimer;
use crate::alarm::ExternalClock;
use crate::clocks::ClockControl;
use crate::clocks::ClockDomain;
use crate::clocks::ClockDomainPolicy;
use crate::clocks::ClockRegister;
use crate::clocks::ClockSnapshot;
use crate::clocks::DormantTrigger;
use crate::clocks::SLEEP_DEEP_BIT;
use crate::config::Config;
use crate::observer::Observer;
use crate::observer::ObserverId;
use crate::observer::ObserverRegistry;
use crate::observer::Transition;
use crate::wake::PinWakeSource;
use crate::wake::WakePad;
use crate::wake::WakePins;
use crate::Error;
use crate::DEFAULT_OBSERVER_CAPACITY;

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;

/// Where the controller is in a sleep cycle
///
/// Sleeps hold the controller mutably, so callers only ever see `Awake`. The
/// other states show up in the debug log of each transition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SleepState {
    /// Running normally
    Awake,

    /// Observers are being told and wake sources armed
    Entering,

    /// Waiting for a wake source
    Asleep,

    /// Restoring clocks and tearing down wake sources
    Recovering,
}

impl SleepState {
    /// The state that follows this one in a sleep cycle
    pub const fn next(self) -> Self {
        match self {
            Self::Awake => Self::Entering,
            Self::Entering => Self::Asleep,
            Self::Asleep => Self::Recovering,
            Self::Recovering => Self::Awake,
        }
    }
}

/// Moves the core in and out of deep sleep and dormant mode
///
/// The clock state is captured when the controller is built. Build exactly
/// one per chip, before anything changes the sleep registers, and pass it by
/// reference to whatever needs to sleep. [`Singleton`](crate::Singleton) can
/// hold it when a global is unavoidable.
///
/// Sleeping takes `&mut self`, so an observer can never start a nested sleep
/// through the controller it is registered with.
pub struct SleepController<'a, C, P, A, D, const N: usize = DEFAULT_OBSERVER_CAPACITY> {
    clocks: C,
    pins: P,
    alarm: A,
    delay: D,
    config: Config,
    snapshot: ClockSnapshot,
    policy: ClockDomainPolicy,
    observers: ObserverRegistry<'a, N>,
    external_clock: Option<&'a mut dyn ExternalClock>,
    wake_source: PinWakeSource,
    state: SleepState,
}

impl<'a, C, P, A, D, const N: usize> SleepController<'a, C, P, A, D, N>
where
    C: ClockControl,
    P: WakePins,
    A: AlarmTimer,
    D: DelayNs,
{
    /// Create the controller and capture the current clock state
    pub fn new(clocks: C, pins: P, alarm: A, delay: D, config: Config) -> Self {
        let snapshot = ClockSnapshot::capture(&clocks);
        let wake_source = PinWakeSource::new(config.wake_edges, config.own_wake_handler);

        Self {
            clocks,
            pins,
            alarm,
            delay,
            config,
            snapshot,
            policy: ClockDomainPolicy::new(),
            observers: ObserverRegistry::new(),
            external_clock: None,
            wake_source,
            state: SleepState::Awake,
        }
    }

    /// Hand timed wakes to an external real-time clock
    pub fn bind_external_clock(&mut self, clock: &'a mut dyn ExternalClock) {
        info!("External clock bound. Timed wakes use its alarm");
        self.external_clock = Some(clock);
    }

    /// Go back to the internal alarm peripheral for timed wakes
    pub fn unbind_external_clock(&mut self) -> Option<&'a mut dyn ExternalClock> {
        info!("External clock unbound. Timed wakes use the internal alarm");
        self.external_clock.take()
    }

    pub fn has_external_clock(&self) -> bool {
        self.external_clock.is_some()
    }

    /// Keep `domain` clocked while asleep. Cannot be undone.
    pub fn enable(&mut self, domain: ClockDomain) {
        debug!("Keeping {domain:?} clocked during sleep");
        self.policy.enable(domain);
    }

    pub fn policy(&self) -> &ClockDomainPolicy {
        &self.policy
    }

    /// The policy itself only allows domains to be added
    pub fn policy_mut(&mut self) -> &mut ClockDomainPolicy {
        &mut self.policy
    }

    pub fn add_observer(&mut self, observer: &'a dyn Observer) -> Result<ObserverId, Error> {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> Result<(), Error> {
        self.observers.remove(id)
    }

    /// Remove every registration of `observer`
    pub fn remove_observer_instance(&mut self, observer: &dyn Observer) -> Result<(), Error> {
        self.observers.remove_observer(observer)
    }

    pub fn observers(&self) -> &ObserverRegistry<'a, N> {
        &self.observers
    }

    pub fn state(&self) -> SleepState {
        self.state
    }

    /// Clock state restored after every wake
    pub fn snapshot(&self) -> &ClockSnapshot {
        &self.snapshot
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Deep sleep until `pad` sees an edge
    ///
    /// No alarm is armed and no observer is told. With
    /// [`WakePad::TimerOnly`] the core only wakes on an alarm that was armed
    /// elsewhere.
    pub fn sleep_until_pin(&mut self, pad: impl Into<WakePad>) {
        let pad = pad.into();
        self.transition(SleepState::Entering);
        self.sleep_until_interrupt(pad);
        self.transition(SleepState::Awake);
    }

    /// Deep sleep for `minutes`, or until `pad` sees an edge
    ///
    /// With an external clock bound its alarm is armed for `minutes`.
    /// Otherwise the internal alarm is set to the minute of the hour that is
    /// `minutes` away. That alarm ignores the hour, so durations of 60
    /// minutes or more wrap around. If the internal alarm cannot be read or
    /// set the sleep still happens and only `pad` can end it.
    ///
    /// A `minutes` of zero arms no alarm at all.
    pub fn sleep_for(&mut self, minutes: u32, pad: impl Into<WakePad>) {
        let pad = pad.into();

        self.transition(SleepState::Entering);
        info!("Sleeping for {minutes} minutes, wake pad {pad:?}");
        self.observers.notify(minutes, Transition::Dormant);

        let internal_alarm_armed = if let Some(clock) = self.external_clock.as_deref_mut() {
            arm_external_alarm(clock, minutes);
            false
        } else if minutes > 0 {
            self.arm_internal_alarm(minutes)
        } else {
            false
        };

        self.sleep_until_interrupt(pad);

        if let Some(clock) = self.external_clock.as_deref_mut() {
            if let Err(error) = clock.clear_alarm() {
                warn!("Could not clear the external clock alarm: {error:?}");
            }

            if log_enabled!(Level::Debug) {
                match clock.time() {
                    Ok(time) => debug!("Woken at {time}"),
                    Err(error) => debug!("Woken, time unavailable: {error:?}"),
                }
            }
        }

        if internal_alarm_armed {
            self.alarm.disable_alarm();
        }

        self.observers.notify(minutes, Transition::Wake);
        self.transition(SleepState::Awake);
    }

    /// Deep sleep for `minutes` with no wake pin
    pub fn sleep_minutes(&mut self, minutes: u32) {
        self.sleep_for(minutes, WakePad::TimerOnly);
    }

    /// Stop every oscillator until `pad` meets `trigger`
    ///
    /// Dormant mode draws less than deep sleep but only a pin can end it. No
    /// observer is told.
    pub fn dormant_until_pin(&mut self, pad: u8, trigger: DormantTrigger) {
        self.transition(SleepState::Entering);
        info!("Dormant until pad {pad} is {trigger:?}");

        self.transition(SleepState::Asleep);

        self.clocks.select_sleep_oscillator();
        self.clocks.dormant_until_pin(pad, trigger);

        self.transition(SleepState::Recovering);
        self.clocks.enable_ring_oscillator();
        self.snapshot.restore(&mut self.clocks);

        self.transition(SleepState::Awake);
    }

    /// Arm `pad`, wait for any wake source and restore the clocks
    ///
    /// Expects [`SleepState::Entering`] and leaves the controller in
    /// [`SleepState::Recovering`].
    fn sleep_until_interrupt(&mut self, pad: WakePad) {
        let pad_armed = self.wake_source.arm(&mut self.pins, pad);

        self.transition(SleepState::Asleep);
        self.clocks.select_sleep_oscillator();

        let (sleep_enable0, sleep_enable1) = self.policy.effective(self.external_clock.is_some());
        self.clocks.write(ClockRegister::SleepEnable0, sleep_enable0);
        self.clocks.write(ClockRegister::SleepEnable1, sleep_enable1);

        let system_control = self.clocks.read(ClockRegister::SystemControl);
        self.clocks
            .write(ClockRegister::SystemControl, system_control | SLEEP_DEEP_BIT);

        self.clocks.wait_for_interrupt();

        self.transition(SleepState::Recovering);
        self.clocks.enable_ring_oscillator();
        self.snapshot.restore(&mut self.clocks);

        if pad_armed {
            self.wake_source.disarm(&mut self.pins, pad);
        }
    }

    /// Start the internal alarm if needed and arm it `minutes` ahead
    ///
    /// Returns false if no alarm could be armed.
    fn arm_internal_alarm(&mut self, minutes: u32) -> bool {
        if !self.alarm.is_running() {
            info!(
                "Starting the internal alarm at {}",
                self.config.fallback_epoch
            );
            self.alarm.init();
            if let Err(error) = self.alarm.set_datetime(&self.config.fallback_epoch) {
                error!("Could not start the internal alarm: {error:?}. Waking on pin only");
                return false;
            }

            self.delay.delay_us(self.config.alarm_settle_delay_us);
        }

        let now = match self.alarm.datetime() {
            Ok(now) => now,
            Err(error) => {
                error!("Internal alarm broken: {error:?}. Waking on pin only");
                return false;
            }
        };

        let alarm = AlarmTime::minutes_after(&now, minutes);
        debug!("Internal alarm set for {alarm:?}, now {now}");
        self.alarm.set_alarm(&alarm, Some(ignore_alarm_interrupt));

        true
    }

    fn transition(&mut self, state: SleepState) {
        debug_assert_eq!(self.state.next(), state, "Sleep states must not be skipped");
        debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }
}

/// Clear the external clock's pending alarm and arm a new one
fn arm_external_alarm(clock: &mut dyn ExternalClock, minutes: u32) {
    if let Err(error) = clock.clear_alarm() {
        warn!("Could not clear the external clock alarm: {error:?}");
    }

    if minutes == 0 {
        return;
    }

    if let Err(error) = clock.set_delay(minutes) {
        error!("Could not arm the external clock alarm: {error:?}. Waking on pin only");
    }
}

fn ignore_alarm_interrupt() {}
