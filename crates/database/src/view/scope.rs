//! Identity cache of projected rows.

use super::view_row::ViewRow;
use alloc::rc::Rc;
use alloc::vec::Vec;
use core::cell::RefCell;
use hashbrown::HashMap;
use rdb_core::RowHandle;

/// Maps source rows to their projection within one view or one join field.
///
/// Clones share the same map.
#[derive(Clone, Default)]
pub(crate) struct Scope {
    entries: Rc<RefCell<HashMap<RowHandle, ViewRow>>>,
}

impl Scope {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn get(&self, handle: RowHandle) -> Option<ViewRow> {
        self.entries.borrow().get(&handle).cloned()
    }

    pub(crate) fn contains(&self, handle: RowHandle) -> bool {
        self.entries.borrow().contains_key(&handle)
    }

    pub(crate) fn insert(&self, handle: RowHandle, row: ViewRow) {
        self.entries.borrow_mut().insert(handle, row);
    }

    pub(crate) fn take(&self, handle: RowHandle) -> Option<ViewRow> {
        self.entries.borrow_mut().remove(&handle)
    }

    /// Empties the scope and returns the cached rows.
    pub(crate) fn drain(&self) -> Vec<ViewRow> {
        self.entries.borrow_mut().drain().map(|(_, row)| row).collect()
    }
}
