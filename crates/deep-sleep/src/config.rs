//! Controller configuration

use time::macros::datetime;
use time::PrimitiveDateTime;

use crate::wake::EdgeTrigger;

/// Time loaded into the internal alarm peripheral when it has never run.
///
/// 2020-06-05 was a Friday. The value is arbitrary: the fallback alarm only
/// matches on the minute field so the calendar date never matters.
pub const FALLBACK_EPOCH: PrimitiveDateTime = datetime!(2020-06-05 15:45:00);

/// Time to wait after loading the internal alarm peripheral before reading it back
pub const ALARM_SETTLE_DELAY_IN_MICROSECONDS: u32 = 64;

/// Configuration of a [`SleepController`](crate::SleepController)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// When set the controller installs its own no-op handler for the wake
    /// pin interrupt. Otherwise the caller's interrupt vector stays in charge.
    pub own_wake_handler: bool,

    /// Edges of the wake pin that end the sleep
    pub wake_edges: EdgeTrigger,

    /// Time used to start the internal alarm peripheral on first use
    pub fallback_epoch: PrimitiveDateTime,

    /// Delay after starting the internal alarm peripheral
    pub alarm_settle_delay_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            own_wake_handler: false,
            wake_edges: EdgeTrigger::Both,
            fallback_epoch: FALLBACK_EPOCH,
            alarm_settle_delay_us: ALARM_SETTLE_DELAY_IN_MICROSECONDS,
        }
    }
}

impl Config {
    /// Return a config in which the controller owns the wake pin interrupt handler
    pub fn with_own_wake_handler(mut self, own_wake_handler: bool) -> Self {
        self.own_wake_handler = own_wake_handler;
        self
    }

    /// Return a config waking on the given edges
    pub fn with_wake_edges(mut self, wake_edges: EdgeTrigger) -> Self {
        self.wake_edges = wake_edges;
        self
    }

    /// Return a config with a different fallback epoch
    pub fn with_fallback_epoch(mut self, fallback_epoch: PrimitiveDateTime) -> Self {
        self.fallback_epoch = fallback_epoch;
        self
    }
}
