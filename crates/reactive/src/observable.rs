//! Single-value observable cell.

use crate::subscription::{Listeners, Subscription};
use alloc::boxed::Box;
use alloc::rc::Rc;
use core::cell::RefCell;
use core::fmt;
use rdb_core::Result;

/// Callback invoked with the new value after an `Observable` changes.
pub type ChangeListener<T> = dyn Fn(&T) -> Result<()>;

/// A shared cell holding one value and notifying listeners when it changes.
///
/// Cloning an `Observable` clones the handle; every clone sees the same value.
///
/// # Example
///
/// ```rust
/// use rdb_reactive::Observable;
///
/// let name = Observable::new(String::from("Ann"));
/// name.on_change(|v| {
///     assert_eq!(v, "Anna");
///     Ok(())
/// });
/// name.set(String::from("Anna")).unwrap();
/// assert_eq!(name.get(), "Anna");
/// ```
pub struct Observable<T: 'static> {
    value: Rc<RefCell<T>>,
    listeners: Listeners<ChangeListener<T>>,
}

impl<T: 'static> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            listeners: self.listeners.clone(),
        }
    }
}

impl<T: 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Rc::new(RefCell::new(value)),
            listeners: Listeners::new(),
        }
    }

    /// Runs `f` against the current value without cloning it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.value.borrow())
    }

    /// Registers a listener called after every change.
    pub fn on_change(&self, listener: impl Fn(&T) -> Result<()> + 'static) -> Subscription {
        self.listeners.subscribe(Box::new(listener))
    }

    /// Returns true if both handles point at the same cell.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.value, &other.value)
    }

    /// Returns the number of attached listeners.
    #[inline]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<T: Clone + 'static> Observable<T> {
    /// Returns a clone of the current value.
    pub fn get(&self) -> T {
        self.value.borrow().clone()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Stores `value` and notifies listeners if it differs from the current one.
    ///
    /// The value stays stored even when a listener fails; the error is returned.
    pub fn set(&self, value: T) -> Result<()> {
        {
            let mut slot = self.value.borrow_mut();
            if *slot == value {
                return Ok(());
            }
            *slot = value.clone();
        }
        self.listeners.emit(|listener| listener(&value))
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Observable").field(&*self.value.borrow()).finish()
    }
}
