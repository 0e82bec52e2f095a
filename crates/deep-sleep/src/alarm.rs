//! Timed wake sources: the internal alarm peripheral and an external real-time clock

use time::Month;
use time::PrimitiveDateTime;
use time::Time;
use time::Weekday;

use crate::Error;

#[cfg(test)]
#[path = "alarm_tests.rs"]
mod alarm_tests;

/// Interrupt handler for the internal alarm
pub type AlarmHandler = fn();

/// A partially specified alarm time
///
/// Fields set to `None` match any value. An alarm with only the minute set
/// fires once every hour when the minute comes round, so it behaves as a
/// repeating countdown and not as a calendar accurate one-shot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AlarmTime {
    pub year: Option<i32>,
    pub month: Option<Month>,
    pub day: Option<u8>,
    pub weekday: Option<Weekday>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
}

impl AlarmTime {
    /// Alarm that fires whenever the minute of the hour equals `minute`
    pub fn every_hour_at(minute: u8) -> Self {
        Self {
            minute: Some(minute % 60),
            ..Self::default()
        }
    }

    /// Alarm for the minute `minutes` after `now`, ignoring every other field
    pub fn minutes_after(now: &PrimitiveDateTime, minutes: u32) -> Self {
        let minute = (u32::from(now.minute()) + minutes % 60) % 60;

        // `minute` is below 60
        Self::every_hour_at(minute as u8)
    }

    /// Return true if `time` satisfies every field that is set
    pub fn matches(&self, time: &PrimitiveDateTime) -> bool {
        fn field<T: PartialEq>(expected: Option<T>, actual: T) -> bool {
            expected.map_or(true, |expected| expected == actual)
        }

        field(self.year, time.year())
            && field(self.month, time.month())
            && field(self.day, time.day())
            && field(self.weekday, time.weekday())
            && field(self.hour, time.hour())
            && field(self.minute, time.minute())
            && field(self.second, time.second())
    }
}

/// The alarm peripheral built into the chip
pub trait AlarmTimer {
    /// Return true if the peripheral is counting
    fn is_running(&self) -> bool;

    /// Power up and reset the peripheral
    fn init(&mut self);

    /// Load the current time
    fn set_datetime(&mut self, time: &PrimitiveDateTime) -> Result<(), Error>;

    /// Read the current time
    fn datetime(&self) -> Result<PrimitiveDateTime, Error>;

    /// Arm the alarm, replacing any previous one
    fn set_alarm(&mut self, alarm: &AlarmTime, handler: Option<AlarmHandler>);

    /// Disarm the alarm
    fn disable_alarm(&mut self);
}

/// Driver of a real-time clock chip whose alarm output is wired to a wake pin
///
/// The controller only tells the driver when to fire. The wire protocol and
/// register encoding stay in the driver.
pub trait ExternalClock: Send {
    /// Clear a pending alarm flag
    fn clear_alarm(&mut self) -> Result<(), Error>;

    /// Arm a repeating alarm `minutes` from now
    fn set_delay(&mut self, minutes: u32) -> Result<(), Error>;

    /// Read the time of day
    fn time(&mut self) -> Result<Time, Error>;
}
