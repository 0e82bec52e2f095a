//! Observers notified around every sleep

use heapless::Vec;
use log::debug;

use crate::Error;

#[cfg(test)]
#[path = "observer_tests.rs"]
mod observer_tests;

/// A component that needs to know when the core goes to sleep and wakes again
///
/// Hooks run synchronously on the caller of the sleep, right before the core
/// stops and right after it has been restored. They should return quickly
/// and must never start another sleep.
pub trait Observer: Sync {
    /// Called before sleeping for `minutes`
    fn notify_dormant(&self, _minutes: u32) {}

    /// Called after waking from a sleep of `minutes`
    fn notify_wake(&self, _minutes: u32) {}
}

/// Handle of a registration in an [`ObserverRegistry`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// Which side of a sleep is being announced
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Dormant,
    Wake,
}

struct Registration<'a> {
    id: ObserverId,
    observer: &'a dyn Observer,
}

/// Ordered list of observers
///
/// The registry borrows its observers and never creates or drops one. The
/// same observer may be registered more than once, it is then notified once
/// per registration.
pub struct ObserverRegistry<'a, const N: usize> {
    registrations: Vec<Registration<'a>, N>,
    next_id: u32,
}

impl<'a, const N: usize> Default for ObserverRegistry<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> ObserverRegistry<'a, N> {
    pub const fn new() -> Self {
        Self {
            registrations: Vec::new(),
            next_id: 0,
        }
    }

    /// Append `observer` to the end of the list
    pub fn add(&mut self, observer: &'a dyn Observer) -> Result<ObserverId, Error> {
        let id = ObserverId(self.next_id);
        self.registrations
            .push(Registration { id, observer })
            .map_err(|_| Error::RegistryFull)?;
        self.next_id = self.next_id.wrapping_add(1);

        debug!("Registered observer {id:?}");
        Ok(id)
    }

    /// Remove the registration `id`
    pub fn remove(&mut self, id: ObserverId) -> Result<(), Error> {
        let index = self
            .registrations
            .iter()
            .position(|registration| registration.id == id)
            .ok_or(Error::UnknownObserver)?;
        self.registrations.remove(index);

        debug!("Removed observer {id:?}");
        Ok(())
    }

    /// Remove every registration of `observer`
    ///
    /// Identity is the address together with the concrete type. Zero-sized
    /// observers of different types can share an address, while two values of
    /// the same zero-sized type cannot be told apart and are removed together.
    /// Use [`remove`](Self::remove) to drop a single registration.
    pub fn remove_observer(&mut self, observer: &dyn Observer) -> Result<(), Error> {
        let before = self.registrations.len();
        self.registrations
            .retain(|registration| !same_observer(registration.observer, observer));

        if self.registrations.len() == before {
            Err(Error::UnknownObserver)
        } else {
            Ok(())
        }
    }

    /// Call the hook for `transition` on every observer in registration order
    pub fn notify(&self, minutes: u32, transition: Transition) {
        for registration in &self.registrations {
            match transition {
                Transition::Dormant => registration.observer.notify_dormant(minutes),
                Transition::Wake => registration.observer.notify_wake(minutes),
            }
        }
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

/// Zero-sized values can share an address with anything, so the vtable
/// decides for them. Everything else is compared by address alone.
#[allow(ambiguous_wide_pointer_comparisons)]
fn same_observer(left: &dyn Observer, right: &dyn Observer) -> bool {
    if core::mem::size_of_val(left) == 0 || core::mem::size_of_val(right) == 0 {
        core::ptr::eq(left, right)
    } else {
        core::ptr::addr_eq(left, right)
    }
}
