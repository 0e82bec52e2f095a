//! Process wide storage for the one sleep controller

use core::cell::RefCell;

use critical_section::Mutex;
use scopeguard::guard;
use scopeguard::ScopeGuard;
use static_cell::StaticCell;

use crate::Error;

#[cfg(test)]
#[path = "singleton_tests.rs"]
mod singleton_tests;

enum Slot<T: 'static> {
    Empty,
    Idle(&'static mut T),
    Lent,
}

/// Lazily built value that lives for the rest of the program
///
/// The value is lent out through a guard and returned when the guard drops.
/// Asking for it while it is lent fails with [`Error::ControllerBusy`], which
/// stops an observer hook from starting a second sleep in the middle of the
/// first one.
///
/// ```ignore
/// static CONTROLLER: Singleton<Controller> = Singleton::new();
///
/// let mut controller = CONTROLLER.instance(build_controller)?;
/// controller.sleep_for(5, 10);
/// ```
pub struct Singleton<T: 'static> {
    cell: StaticCell<T>,
    slot: Mutex<RefCell<Slot<T>>>,
}

impl<T: 'static> Default for Singleton<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> Singleton<T> {
    pub const fn new() -> Self {
        Self {
            cell: StaticCell::new(),
            slot: Mutex::new(RefCell::new(Slot::Empty)),
        }
    }

    /// Borrow the value, building it with `init` on the first call
    ///
    /// Every call hands out the same instance. `init` only runs while no value
    /// has been built, so it runs again on the next call if it panicked.
    pub fn instance<F>(
        &'static self,
        init: F,
    ) -> Result<ScopeGuard<&'static mut T, impl FnOnce(&'static mut T)>, Error>
    where
        F: FnOnce() -> T,
    {
        let lent = critical_section::with(|cs| {
            let mut slot = self.slot.borrow_ref_mut(cs);
            match core::mem::replace(&mut *slot, Slot::Lent) {
                Slot::Idle(instance) => Ok(Some(instance)),
                Slot::Lent => Err(Error::ControllerBusy),
                Slot::Empty => {
                    *slot = Slot::Empty;
                    Ok(None)
                }
            }
        })?;

        let instance = match lent {
            Some(instance) => instance,
            None => {
                // Built outside the critical section. A panicking `init`
                // leaves the slot empty for the next caller.
                let value = init();
                critical_section::with(|cs| {
                    let mut slot = self.slot.borrow_ref_mut(cs);
                    if !matches!(*slot, Slot::Empty) {
                        return Err(Error::ControllerBusy);
                    }

                    *slot = Slot::Lent;
                    Ok(self.cell.init(value))
                })?
            }
        };

        Ok(guard(instance, move |instance| {
            critical_section::with(|cs| {
                *self.slot.borrow_ref_mut(cs) = Slot::Idle(instance);
            });
        }))
    }

    /// Return true once the value has been built
    pub fn is_initialized(&self) -> bool {
        critical_section::with(|cs| !matches!(*self.slot.borrow_ref(cs), Slot::Empty))
    }

    /// Return true while a guard from [`instance`](Self::instance) is alive
    pub fn is_lent(&self) -> bool {
        critical_section::with(|cs| matches!(*self.slot.borrow_ref(cs), Slot::Lent))
    }
}
