//! Clock state capture, restore and the sleep clock domain policy

use log::debug;

#[cfg(test)]
#[path = "clocks_tests.rs"]
mod clocks_tests;

/// Deep sleep bit of the processor system control register
pub const SLEEP_DEEP_BIT: u32 = 1 << 2;

/// Clock registers that the controller saves and restores
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockRegister {
    /// Processor system control register (holds the deep sleep bit)
    SystemControl,

    /// First mask of clocks left running while the core sleeps
    SleepEnable0,

    /// Second mask of clocks left running while the core sleeps
    SleepEnable1,
}

/// Condition that wakes the chip from dormant mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DormantTrigger {
    /// Rising edge on the pin
    EdgeHigh,

    /// Falling edge on the pin
    #[default]
    EdgeLow,

    /// Pin held high
    LevelHigh,

    /// Pin held low
    LevelLow,
}

impl DormantTrigger {
    /// Return true if the trigger fires on an edge rather than a level
    pub fn is_edge(self) -> bool {
        matches!(self, Self::EdgeHigh | Self::EdgeLow)
    }

    /// Return true if the trigger fires on the high side
    pub fn is_high(self) -> bool {
        matches!(self, Self::EdgeHigh | Self::LevelHigh)
    }
}

/// Clock and power layer of the chip
///
/// Implementations talk to the real clock and system control blocks. The
/// controller never touches registers directly.
pub trait ClockControl {
    /// Read one of the saved clock registers
    fn read(&self, register: ClockRegister) -> u32;

    /// Write one of the saved clock registers
    fn write(&mut self, register: ClockRegister, value: u32);

    /// Switch the clock tree to the oscillator that keeps running during sleep
    fn select_sleep_oscillator(&mut self);

    /// Re-enable the ring oscillator control after a wake
    fn enable_ring_oscillator(&mut self);

    /// Block until an enabled interrupt fires
    fn wait_for_interrupt(&mut self);

    /// Stop all oscillators until `pad` meets `trigger`
    fn dormant_until_pin(&mut self, pad: u8, trigger: DormantTrigger);

    /// Rebuild the clock tree from its power-on configuration
    fn reinit_clocks(&mut self);

    /// Restart the serial console, which depends on the clock tree
    fn reinit_console(&mut self);
}

/// Clock register values captured before the first sleep
///
/// The snapshot is taken once and never updated, so each wake restores the
/// state the chip had before any sleep setup touched it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClockSnapshot {
    system_control: u32,
    sleep_enable0: u32,
    sleep_enable1: u32,
}

impl ClockSnapshot {
    /// Capture the current register values
    pub fn capture<C: ClockControl>(clocks: &C) -> Self {
        let snapshot = Self {
            system_control: clocks.read(ClockRegister::SystemControl),
            sleep_enable0: clocks.read(ClockRegister::SleepEnable0),
            sleep_enable1: clocks.read(ClockRegister::SleepEnable1),
        };
        debug!("Captured clock state: {snapshot:?}");

        snapshot
    }

    /// Write the captured values back and restart the clock tree and console
    pub fn restore<C: ClockControl>(&self, clocks: &mut C) {
        clocks.write(ClockRegister::SystemControl, self.system_control);
        clocks.write(ClockRegister::SleepEnable0, self.sleep_enable0);
        clocks.write(ClockRegister::SleepEnable1, self.sleep_enable1);

        clocks.reinit_clocks();
        clocks.reinit_console();
    }

    /// Processor system control value
    pub fn system_control(&self) -> u32 {
        self.system_control
    }

    /// First sleep enable mask
    pub fn sleep_enable0(&self) -> u32 {
        self.sleep_enable0
    }

    /// Second sleep enable mask
    pub fn sleep_enable1(&self) -> u32 {
        self.sleep_enable1
    }
}

/// A peripheral clock that can be kept running during sleep
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClockDomain {
    Dma,
    Jtag,
    Pio0,
    Pio1,
    Pwm,
    Rtc,
    Timer,
    Uart0,
    Uart1,
    Usb,
}

impl ClockDomain {
    /// Every supported domain
    pub const ALL: [ClockDomain; 10] = [
        Self::Dma,
        Self::Jtag,
        Self::Pio0,
        Self::Pio1,
        Self::Pwm,
        Self::Rtc,
        Self::Timer,
        Self::Uart0,
        Self::Uart1,
        Self::Usb,
    ];

    /// Return the sleep enable register and bit mask of the domain
    pub const fn bit(self) -> (ClockRegister, u32) {
        match self {
            Self::Dma => (ClockRegister::SleepEnable0, 1 << 5),
            Self::Jtag => (ClockRegister::SleepEnable0, 1 << 9),
            Self::Pio0 => (ClockRegister::SleepEnable0, 1 << 12),
            Self::Pio1 => (ClockRegister::SleepEnable0, 1 << 13),
            Self::Pwm => (ClockRegister::SleepEnable0, 1 << 17),
            Self::Rtc => (ClockRegister::SleepEnable0, RTC_CLOCK_BIT),
            Self::Timer => (ClockRegister::SleepEnable1, 1 << 5),
            Self::Uart0 => (ClockRegister::SleepEnable1, 1 << 6),
            Self::Uart1 => (ClockRegister::SleepEnable1, 1 << 8),
            Self::Usb => (ClockRegister::SleepEnable1, 1 << 11),
        }
    }
}

/// Clock of the internal alarm peripheral in the first sleep enable mask
pub const RTC_CLOCK_BIT: u32 = 1 << 21;

/// Clock domains that stay powered while the core sleeps
///
/// Domains can only be added. Different subsystems each add what they need
/// and nothing takes a domain away again until the next reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ClockDomainPolicy {
    sleep_enable0: u32,
    sleep_enable1: u32,
}

impl ClockDomainPolicy {
    /// Create a policy with no domains
    pub const fn new() -> Self {
        Self {
            sleep_enable0: 0,
            sleep_enable1: 0,
        }
    }

    /// Keep `domain` running during sleep
    pub fn enable(&mut self, domain: ClockDomain) -> &mut Self {
        match domain.bit() {
            (ClockRegister::SleepEnable1, bit) => self.sleep_enable1 |= bit,
            (_, bit) => self.sleep_enable0 |= bit,
        }

        self
    }

    pub fn enable_timer(&mut self) -> &mut Self {
        self.enable(ClockDomain::Timer)
    }

    pub fn enable_pwm(&mut self) -> &mut Self {
        self.enable(ClockDomain::Pwm)
    }

    pub fn enable_jtag(&mut self) -> &mut Self {
        self.enable(ClockDomain::Jtag)
    }

    pub fn enable_uart0(&mut self) -> &mut Self {
        self.enable(ClockDomain::Uart0)
    }

    pub fn enable_uart1(&mut self) -> &mut Self {
        self.enable(ClockDomain::Uart1)
    }

    pub fn enable_usb(&mut self) -> &mut Self {
        self.enable(ClockDomain::Usb)
    }

    pub fn enable_pio0(&mut self) -> &mut Self {
        self.enable(ClockDomain::Pio0)
    }

    pub fn enable_pio1(&mut self) -> &mut Self {
        self.enable(ClockDomain::Pio1)
    }

    pub fn enable_dma(&mut self) -> &mut Self {
        self.enable(ClockDomain::Dma)
    }

    pub fn enable_rtc(&mut self) -> &mut Self {
        self.enable(ClockDomain::Rtc)
    }

    /// Return true if `domain` has been enabled
    pub fn is_enabled(&self, domain: ClockDomain) -> bool {
        match domain.bit() {
            (ClockRegister::SleepEnable1, bit) => self.sleep_enable1 & bit != 0,
            (_, bit) => self.sleep_enable0 & bit != 0,
        }
    }

    /// Requested bits of the first sleep enable mask
    pub fn sleep_enable0(&self) -> u32 {
        self.sleep_enable0
    }

    /// Requested bits of the second sleep enable mask
    pub fn sleep_enable1(&self) -> u32 {
        self.sleep_enable1
    }

    /// Masks to write before sleeping
    ///
    /// Without an external clock the internal alarm peripheral is the only
    /// timed wake source, so its clock is forced on.
    pub fn effective(&self, external_clock_bound: bool) -> (u32, u32) {
        let sleep_enable0 = if external_clock_bound {
            self.sleep_enable0
        } else {
            self.sleep_enable0 | RTC_CLOCK_BIT
        };

        (sleep_enable0, self.sleep_enable1)
    }
}
