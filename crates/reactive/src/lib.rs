//! RDB Reactive - Observable primitives for the RDB reactive store.
//!
//! Everything above this crate (rows, tables, live views) is built from two
//! primitives:
//!
//! - `Observable<T>`: a single value with change notification
//! - `ObservableList<T>`: an ordered collection with insert/delete notification
//!
//! Delivery is synchronous and depth-first: a mutation returns only after
//! every listener, and every reaction those listeners trigger, has run.
//! Listeners are fallible; the first error aborts the rest of the event and
//! is returned to the mutator.
//!
//! # Example
//!
//! ```rust
//! use rdb_reactive::ObservableList;
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! let list = ObservableList::new();
//! let inserted = Rc::new(Cell::new(0));
//! let counter = inserted.clone();
//! let sub = list.on_insert(move |_, _: &i32| {
//!     counter.set(counter.get() + 1);
//!     Ok(())
//! });
//!
//! list.push(1).unwrap();
//! list.push(2).unwrap();
//! sub.cancel();
//! list.push(3).unwrap();
//!
//! assert_eq!(inserted.get(), 2);
//! assert_eq!(list.to_vec(), vec![1, 2, 3]);
//! ```

#![no_std]

extern crate alloc;

pub mod list;
pub mod observable;
pub mod subscription;

pub use list::{ItemListener, ObservableList};
pub use observable::{ChangeListener, Observable};
pub use subscription::{Listeners, Subscription, SubscriptionId, SubscriptionManager, SubscriptionSet};
