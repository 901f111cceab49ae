use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::cast::FlagValue;

/// A shared, writable cell that a flag or setting writes its value into.
///
/// Cloning a `Destination` yields another handle to the same cell, so the
/// caller keeps one handle while the flag set keeps another.
pub struct Destination<T>(Rc<RefCell<T>>);

impl<T> Destination<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(value)))
    }

    pub fn set(&self, value: T) {
        *self.0.borrow_mut() = value;
    }

    /// Run `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Whether two handles point at the same cell.
    pub fn same_cell(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T: Clone> Destination<T> {
    pub fn get(&self) -> T {
        self.0.borrow().clone()
    }
}

impl<T: FlagValue> Destination<T> {
    pub fn zeroed() -> Self {
        Self::new(T::zero())
    }
}

impl<T> Clone for Destination<T> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<T: fmt::Debug> fmt::Debug for Destination<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Destination").field(&self.0.borrow()).finish()
    }
}
