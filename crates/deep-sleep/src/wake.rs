//! GPIO wake source configuration

use log::debug;

use crate::WAKE_PAD_TIMER_ONLY;

#[cfg(test)]
#[path = "wake_tests.rs"]
mod wake_tests;

/// Interrupt handler for a wake pin, called with the pad and the event bits
pub type WakeHandler = fn(pad: u8, events: u32);

/// Pin edges that raise the wake interrupt
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EdgeTrigger {
    Falling,
    Rising,
    #[default]
    Both,
}

impl EdgeTrigger {
    /// Event bits in the layout of the GPIO interrupt registers
    pub const fn bits(self) -> u32 {
        const EDGE_FALL: u32 = 0x4;
        const EDGE_RISE: u32 = 0x8;

        match self {
            Self::Falling => EDGE_FALL,
            Self::Rising => EDGE_RISE,
            Self::Both => EDGE_FALL | EDGE_RISE,
        }
    }
}

/// The pin that may end a sleep
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WakePad {
    /// No pin. Only an alarm ends the sleep.
    TimerOnly,

    /// The GPIO with this number
    Gpio(u8),
}

impl From<u8> for WakePad {
    fn from(value: u8) -> Self {
        if value == WAKE_PAD_TIMER_ONLY {
            Self::TimerOnly
        } else {
            Self::Gpio(value)
        }
    }
}

impl From<WakePad> for u8 {
    fn from(value: WakePad) -> Self {
        match value {
            WakePad::TimerOnly => WAKE_PAD_TIMER_ONLY,
            WakePad::Gpio(pad) => pad,
        }
    }
}

/// GPIO and interrupt layer of the chip
pub trait WakePins {
    /// Make `pad` an input with its pull-up enabled
    fn configure_input_with_pullup(&mut self, pad: u8);

    /// Raise an interrupt on `edges` of `pad`
    ///
    /// With `handler` set to `None` the interrupt goes to whatever vector the
    /// application installed.
    fn enable_edge_interrupt(&mut self, pad: u8, edges: EdgeTrigger, handler: Option<WakeHandler>);

    /// Stop raising interrupts for `pad`
    fn disable_interrupt(&mut self, pad: u8);

    /// Disconnect both pull resistors of `pad`
    fn release_pulls(&mut self, pad: u8);
}

/// Arms and disarms a GPIO pin as a wake source
///
/// The interrupt only has to bring the core out of its wait, so when the
/// controller owns the handler it installs one that does nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PinWakeSource {
    edges: EdgeTrigger,
    own_handler: bool,
}

impl PinWakeSource {
    pub fn new(edges: EdgeTrigger, own_handler: bool) -> Self {
        Self { edges, own_handler }
    }

    /// Configure `pad` to wake the core. Returns true if a pin was armed.
    pub fn arm<P: WakePins>(&self, pins: &mut P, pad: WakePad) -> bool {
        let WakePad::Gpio(pad) = pad else {
            return false;
        };

        debug!("Arming wake pad {pad} on {:?} edges", self.edges);
        pins.configure_input_with_pullup(pad);

        let handler: Option<WakeHandler> = if self.own_handler {
            Some(ignore_wake_interrupt)
        } else {
            None
        };
        pins.enable_edge_interrupt(pad, self.edges, handler);

        true
    }

    /// Undo [`arm`](Self::arm) for `pad`
    pub fn disarm<P: WakePins>(&self, pins: &mut P, pad: WakePad) {
        let WakePad::Gpio(pad) = pad else {
            return;
        };

        debug!("Disarming wake pad {pad}");
        pins.disable_interrupt(pad);
        pins.release_pulls(pad);
    }
}

fn ignore_wake_interrupt(_pad: u8, _events: u32) {}
