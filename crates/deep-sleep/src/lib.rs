#![cfg_attr(not(test), no_std)]

//! Deep sleep and dormant mode for single-core microcontrollers
//!
//! [`SleepController`] puts the core into deep sleep and brings it back with
//! the clock tree exactly as it was before. It arms the wake sources for each
//! sleep: a GPIO edge, the alarm of an external real-time clock, or the
//! chip's own alarm peripheral when no external clock is bound. Components
//! that must shut down or restart around a sleep register an [`Observer`].
//!
//! The crate never touches registers itself. The chip support layer
//! implements [`ClockControl`], [`WakePins`] and [`AlarmTimer`], and an
//! optional real-time clock driver implements [`ExternalClock`].
//!
//! Flow of a timed sleep:
//! - Tell every observer that the core is about to sleep
//! - Arm the external clock alarm, or the internal alarm as a fallback
//! - Arm the wake pin, if there is one
//! - Switch to the sleep oscillator, gate all clocks outside the policy and
//!   wait for an interrupt
//! - Restore the captured clock state, restart the clock tree and console
//! - Disarm the wake pin and clear the alarm
//! - Tell every observer that the core is awake

pub mod alarm;
pub mod clocks;
pub mod config;
pub mod controller;
mod error;
pub mod logging;
pub mod observer;
pub mod singleton;
pub mod wake;

#[cfg(test)]
mod test_support;

pub use alarm::AlarmTime;
pub use alarm::AlarmTimer;
pub use alarm::ExternalClock;
pub use clocks::ClockControl;
pub use clocks::ClockDomain;
pub use clocks::ClockDomainPolicy;
pub use clocks::ClockSnapshot;
pub use clocks::DormantTrigger;
pub use config::Config;
pub use controller::SleepController;
pub use controller::SleepState;
pub use error::Error;
pub use observer::Observer;
pub use observer::ObserverId;
pub use singleton::Singleton;
pub use wake::EdgeTrigger;
pub use wake::WakePad;
pub use wake::WakePins;

// CONSTANTS

/// Raw wake pad value meaning "no wake pin, alarm only"
pub const WAKE_PAD_TIMER_ONLY: u8 = 0xFF;

/// Number of observers a controller can hold unless told otherwise
pub const DEFAULT_OBSERVER_CAPACITY: usize = 8;
