//! Ordered observable collection.

use crate::subscription::{Listeners, Subscription};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use rdb_core::Result;

/// Callback invoked with `(index, item)` after an insertion or a deletion.
pub type ItemListener<T> = dyn Fn(usize, &T) -> Result<()>;

/// A shared ordered list that notifies listeners of insertions and deletions.
///
/// Insert listeners receive the index the item now occupies; delete listeners
/// receive the index the item occupied right before it was removed.
pub struct ObservableList<T: 'static> {
    items: Rc<RefCell<Vec<T>>>,
    inserts: Listeners<ItemListener<T>>,
    deletes: Listeners<ItemListener<T>>,
}

impl<T: 'static> Clone for ObservableList<T> {
    fn clone(&self) -> Self {
        Self {
            items: self.items.clone(),
            inserts: self.inserts.clone(),
            deletes: self.deletes.clone(),
        }
    }
}

impl<T: 'static> Default for ObservableList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: 'static> ObservableList<T> {
    pub fn new() -> Self {
        Self::from_vec(Vec::new())
    }

    /// Creates a list seeded with `items` without emitting notifications.
    pub fn from_vec(items: Vec<T>) -> Self {
        Self {
            items: Rc::new(RefCell::new(items)),
            inserts: Listeners::new(),
            deletes: Listeners::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }

    /// Runs `f` against the current items.
    pub fn with<R>(&self, f: impl FnOnce(&[T]) -> R) -> R {
        f(&self.items.borrow())
    }

    /// Returns the index of the first item matching `pred`.
    pub fn position(&self, pred: impl FnMut(&T) -> bool) -> Option<usize> {
        self.items.borrow().iter().position(pred)
    }

    pub fn on_insert(&self, listener: impl Fn(usize, &T) -> Result<()> + 'static) -> Subscription {
        self.inserts.subscribe(Box::new(listener))
    }

    pub fn on_delete(&self, listener: impl Fn(usize, &T) -> Result<()> + 'static) -> Subscription {
        self.deletes.subscribe(Box::new(listener))
    }

    /// Returns the number of attached insert and delete listeners.
    pub fn listener_count(&self) -> usize {
        self.inserts.len() + self.deletes.len()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.items, &other.items)
    }
}

impl<T: Clone + 'static> ObservableList<T> {
    pub fn get(&self, index: usize) -> Option<T> {
        self.items.borrow().get(index).cloned()
    }

    /// Returns a snapshot of the items.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    /// Appends an item.
    pub fn push(&self, item: T) -> Result<()> {
        let index = self.len();
        self.insert_at(index, item)
    }

    /// Inserts an item at `index`, clamped to the list length.
    pub fn insert_at(&self, index: usize, item: T) -> Result<()> {
        let index = {
            let mut items = self.items.borrow_mut();
            let index = index.min(items.len());
            items.insert(index, item.clone());
            index
        };
        self.inserts.emit(|listener| listener(index, &item))
    }

    /// Removes the item at `index`.
    pub fn remove_at(&self, index: usize) -> Result<Option<T>> {
        let removed = {
            let mut items = self.items.borrow_mut();
            if index >= items.len() {
                return Ok(None);
            }
            items.remove(index)
        };
        self.deletes.emit(|listener| listener(index, &removed))?;
        Ok(Some(removed))
    }

    /// Removes every item matching `pred`, front to back, one notification each.
    ///
    /// Returns the number of removed items.
    pub fn remove_where(&self, mut pred: impl FnMut(&T) -> bool) -> Result<usize> {
        let mut removed = 0;
        let mut from = 0;
        loop {
            let found = {
                let items = self.items.borrow();
                items.iter().skip(from).position(&mut pred).map(|p| p + from)
            };
            match found {
                Some(index) => {
                    self.remove_at(index)?;
                    removed += 1;
                    from = index;
                }
                None => return Ok(removed),
            }
        }
    }

    /// Removes every item from the front, one notification each.
    pub fn clear(&self) -> Result<()> {
        while self.remove_at(0)?.is_some() {}
        Ok(())
    }
}

impl<T: Clone + PartialEq + 'static> ObservableList<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.items.borrow().contains(item)
    }

    /// Removes every occurrence of `item`. Returns true if any was present.
    pub fn remove(&self, item: &T) -> Result<bool> {
        Ok(self.remove_where(|x| x == item)? > 0)
    }
}

impl<T: fmt::Debug + 'static> fmt::Debug for ObservableList<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.items.borrow().iter()).finish()
    }
}
