//! Reverse joins: rows of another table pointing back at a projected row.

use super::cascade::remove_deeper;
use super::projection::{Projector, Terms};
use super::scope::Scope;
use super::view_row::ViewRow;
use alloc::rc::Rc;
use alloc::string::String;
use rdb_core::{Error, Result, RowHandle};
use rdb_reactive::{ObservableList, SubscriptionSet};
use rdb_storage::{FieldValue, Row};

/// State of one reverse join field.
///
/// Watchers on individual rows are keyed by the watched row's handle so they
/// can be cancelled when that row is deleted.
pub(crate) struct ReverseJoin {
    pub(crate) projector: Projector,
    pub(crate) origin: RowHandle,
    pub(crate) column: String,
    pub(crate) terms: Terms,
    pub(crate) scope: Scope,
    pub(crate) out: ObservableList<ViewRow>,
    pub(crate) watchers: SubscriptionSet,
}

impl ReverseJoin {
    /// Starts following the reference column of `watched`.
    pub(crate) fn watch(self: &Rc<Self>, watched: &Row) -> Result<()> {
        let handle = watched.handle();
        match watched.get(&self.column) {
            Some(FieldValue::Ref(cell)) => {
                if cell.with(|target| self.points_here(target.as_ref())) {
                    self.include(watched)?;
                }
                let join = self.clone();
                let weak = watched.downgrade();
                self.watchers.add_keyed(
                    handle,
                    cell.on_change(move |target| {
                        if join.points_here(target.as_ref()) {
                            match weak.upgrade() {
                                Some(watched) => join.include(&watched),
                                None => Ok(()),
                            }
                        } else {
                            join.exclude(handle)
                        }
                    }),
                );
                Ok(())
            }
            Some(FieldValue::Refs(list)) => {
                if list.with(|targets| self.listed_here(targets)) {
                    self.include(watched)?;
                }
                let join = self.clone();
                let weak = watched.downgrade();
                self.watchers.add_keyed(
                    handle,
                    list.on_insert(move |_, target| match weak.upgrade() {
                        Some(watched) if target.handle() == join.origin => join.include(&watched),
                        _ => Ok(()),
                    }),
                );
                let join = self.clone();
                let weak = watched.downgrade();
                self.watchers.add_keyed(
                    handle,
                    list.on_delete(move |_, target| {
                        if target.handle() != join.origin {
                            return Ok(());
                        }
                        let still_listed = weak
                            .upgrade()
                            .and_then(|watched| watched.references(&join.column))
                            .is_some_and(|remaining| remaining.with(|targets| join.listed_here(targets)));
                        if still_listed {
                            Ok(())
                        } else {
                            join.exclude(handle)
                        }
                    }),
                );
                Ok(())
            }
            _ => Err(Error::column_is_not_a_reference(self.column.as_str())),
        }
    }

    /// Drops the watchers and the projection of a deleted row.
    pub(crate) fn forget(&self, deleted: &Row) -> Result<()> {
        self.watchers.cancel_key(deleted.handle());
        self.exclude(deleted.handle())
    }

    fn points_here(&self, target: Option<&Row>) -> bool {
        target.is_some_and(|target| target.handle() == self.origin)
    }

    fn listed_here(&self, targets: &[Row]) -> bool {
        targets.iter().any(|target| self.points_here(Some(target)))
    }

    fn include(&self, watched: &Row) -> Result<()> {
        if self.scope.contains(watched.handle()) {
            return Ok(());
        }
        let projected = self.projector.copy_selected(watched, &self.terms, &self.scope)?;
        self.out.push(projected)
    }

    fn exclude(&self, watched: RowHandle) -> Result<()> {
        remove_deeper(&self.out, watched, &self.scope).map(|_| ())
    }
}
