//! Subscription management for observable values.
//!
//! Every observable entity owns one or more `Listeners` lists. Subscribing
//! returns a `Subscription` handle that can later detach the listener. Handles
//! are not RAII guards: dropping one leaves the listener attached, so a
//! subscription lives until it is explicitly cancelled or its source is dropped.

use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashMap;
use rdb_core::Result;

/// Unique identifier of a listener within one listener list.
pub type SubscriptionId = u64;

/// A registered callback.
pub struct Listener<F: ?Sized> {
    id: SubscriptionId,
    active: Cell<bool>,
    callback: Box<F>,
}

impl<F: ?Sized> Listener<F> {
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Returns whether this listener is still attached.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    #[inline]
    fn deactivate(&self) {
        self.active.set(false);
    }

    #[inline]
    pub fn callback(&self) -> &F {
        &self.callback
    }
}

/// Ordered listener storage.
///
/// Delivery order is subscription order, so listeners live in a `Vec` rather
/// than a map.
pub struct SubscriptionManager<F: ?Sized> {
    listeners: Vec<Rc<Listener<F>>>,
    next_id: SubscriptionId,
}

impl<F: ?Sized> Default for SubscriptionManager<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized> SubscriptionManager<F> {
    /// Creates a new subscription manager.
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
            next_id: 1,
        }
    }

    /// Appends a callback and returns its id.
    pub fn subscribe(&mut self, callback: Box<F>) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.push(Rc::new(Listener {
            id,
            active: Cell::new(true),
            callback,
        }));
        id
    }

    /// Detaches a listener by id.
    ///
    /// Returns true if the listener was found and removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        match self.listeners.iter().position(|l| l.id == id) {
            Some(pos) => {
                self.listeners.remove(pos).deactivate();
                true
            }
            None => false,
        }
    }

    /// Returns the current listeners in delivery order.
    pub fn snapshot(&self) -> Vec<Rc<Listener<F>>> {
        self.listeners.clone()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Detaches every listener.
    pub fn clear(&mut self) {
        for listener in self.listeners.drain(..) {
            listener.deactivate();
        }
    }
}

/// Type-erased detach hook held by `Subscription`.
trait Detach {
    fn detach(&self, id: SubscriptionId) -> bool;
}

impl<F: ?Sized> Detach for RefCell<SubscriptionManager<F>> {
    fn detach(&self, id: SubscriptionId) -> bool {
        self.borrow_mut().unsubscribe(id)
    }
}

/// A shared, ordered listener list.
pub struct Listeners<F: ?Sized + 'static> {
    manager: Rc<RefCell<SubscriptionManager<F>>>,
}

impl<F: ?Sized + 'static> Clone for Listeners<F> {
    fn clone(&self) -> Self {
        Self {
            manager: self.manager.clone(),
        }
    }
}

impl<F: ?Sized + 'static> Default for Listeners<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: ?Sized + 'static> Listeners<F> {
    pub fn new() -> Self {
        Self {
            manager: Rc::new(RefCell::new(SubscriptionManager::new())),
        }
    }

    /// Registers a callback at the end of the list.
    pub fn subscribe(&self, callback: Box<F>) -> Subscription {
        let id = self.manager.borrow_mut().subscribe(callback);
        let source: Weak<dyn Detach> = Rc::downgrade(&self.manager) as Weak<dyn Detach>;
        Subscription { id, source }
    }

    /// Delivers an event to every listener attached when the event fires.
    ///
    /// No borrow is held while a callback runs. Listeners detached by an
    /// earlier callback of the same event are skipped. The first error stops
    /// delivery and is returned.
    pub fn emit(&self, mut deliver: impl FnMut(&F) -> Result<()>) -> Result<()> {
        let listeners = self.manager.borrow().snapshot();
        for listener in listeners {
            if listener.is_active() {
                deliver(listener.callback())?;
            }
        }
        Ok(())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.manager.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.manager.borrow().is_empty()
    }

    pub fn clear(&self) {
        self.manager.borrow_mut().clear();
    }
}

/// Handle to one registered listener.
pub struct Subscription {
    id: SubscriptionId,
    source: Weak<dyn Detach>,
}

impl Subscription {
    #[inline]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Detaches the listener. Returns false if it was already detached or the
    /// source no longer exists.
    pub fn cancel(&self) -> bool {
        match self.source.upgrade() {
            Some(source) => source.detach(self.id),
            None => false,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("source_alive", &(self.source.strong_count() > 0))
            .finish()
    }
}

/// A shared group of subscriptions, optionally keyed, cancelled together.
#[derive(Clone, Default)]
pub struct SubscriptionSet {
    entries: Rc<RefCell<Entries>>,
}

#[derive(Default)]
struct Entries {
    unkeyed: Vec<Subscription>,
    keyed: HashMap<u64, Vec<Subscription>>,
    len: usize,
}

impl SubscriptionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, subscription: Subscription) {
        let mut entries = self.entries.borrow_mut();
        entries.unkeyed.push(subscription);
        entries.len += 1;
    }

    /// Adds a subscription that can be cancelled with `cancel_key`.
    pub fn add_keyed(&self, key: u64, subscription: Subscription) {
        let mut entries = self.entries.borrow_mut();
        entries.keyed.entry(key).or_default().push(subscription);
        entries.len += 1;
    }

    /// Cancels every subscription added under `key`. Returns how many there were.
    pub fn cancel_key(&self, key: u64) -> usize {
        let removed = {
            let mut entries = self.entries.borrow_mut();
            let removed = entries.keyed.remove(&key).unwrap_or_default();
            entries.len -= removed.len();
            removed
        };
        for subscription in &removed {
            subscription.cancel();
        }
        removed.len()
    }

    /// Cancels every subscription in the set.
    pub fn cancel_all(&self) {
        let entries = core::mem::take(&mut *self.entries.borrow_mut());
        for subscription in entries.unkeyed {
            subscription.cancel();
        }
        for subscription in entries.keyed.into_values().flatten() {
            subscription.cancel();
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.borrow().len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
