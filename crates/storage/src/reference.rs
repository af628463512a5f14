//! Table reference cells.
//!
//! Reference columns name their target table. The name is resolved through a
//! `TableReference`, an observable slot that starts out `Pending` when the
//! target does not exist yet and flips to `Ready` once it is created.

use crate::table::Table;
use alloc::string::String;
use core::fmt;
use rdb_reactive::Observable;

/// Either a live table or the name of a table still awaited.
#[derive(Clone)]
pub enum TableSlot {
    /// The awaited table name.
    Pending(String),
    /// The resolved table.
    Ready(Table),
}

impl TableSlot {
    /// Returns the table if the slot is resolved.
    pub fn table(&self) -> Option<&Table> {
        match self {
            TableSlot::Ready(table) => Some(table),
            TableSlot::Pending(_) => None,
        }
    }

    #[inline]
    pub fn is_ready(&self) -> bool {
        matches!(self, TableSlot::Ready(_))
    }
}

impl PartialEq for TableSlot {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TableSlot::Pending(a), TableSlot::Pending(b)) => a == b,
            (TableSlot::Ready(a), TableSlot::Ready(b)) => a.ptr_eq(b),
            _ => false,
        }
    }
}

impl fmt::Debug for TableSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableSlot::Pending(name) => f.debug_tuple("Pending").field(name).finish(),
            TableSlot::Ready(table) => f.debug_tuple("Ready").field(&table.id()).finish(),
        }
    }
}

/// Observable slot resolving a table name to a table.
pub type TableReference = Observable<TableSlot>;
