//! Forward joins: the rows a reference column of a projected row points at.
//!
//! A forward join follows two sources. Writes to the reference column move
//! the join, and deletions in the target table drop the deleted row's
//! projection even though the column itself still names it. A multi-ref
//! join list mirrors the column entry by entry, skipping targets that are no
//! longer stored.

use super::cascade::remove_deeper;
use super::projection::{Projector, Terms};
use super::view_row::{JoinParts, ViewField, ViewRow};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use rdb_core::Result;
use rdb_reactive::{Observable, ObservableList};
use rdb_storage::{Row, TableReference};

type DeleteHandler = dyn Fn(&Row) -> Result<()>;

/// State shared by the listeners of one forward join field.
pub(crate) struct ForwardJoin {
    pub(crate) projector: Projector,
    pub(crate) terms: Terms,
    pub(crate) target: TableReference,
    pub(crate) join: JoinParts,
}

impl ForwardJoin {
    /// Follows a single-reference column.
    pub(crate) fn single(self: &Rc<Self>, source: Observable<Option<Row>>) -> Result<ViewField> {
        let initial = match source.get() {
            Some(target) if self.stored(&target) => Some(self.project(&target)?),
            _ => None,
        };
        let cell = Observable::new(initial);

        let join = self.clone();
        let out = cell.clone();
        self.join.subscriptions.add(source.on_change(move |target| {
            let next = match target {
                Some(target) if join.stored(target) => Some(join.project(target)?),
                _ => None,
            };
            join.replace(&out, next)
        }));

        let join = self.clone();
        let out = cell.clone();
        self.follow_deletes(Rc::new(move |deleted: &Row| {
            let current = out.with(|current| current.as_ref().map(ViewRow::source));
            if current == Some(deleted.handle()) {
                join.replace(&out, None)
            } else {
                Ok(())
            }
        }));
        Ok(ViewField::Ref(cell))
    }

    /// Follows the multi-reference column `column` of `origin`.
    pub(crate) fn multiple(
        self: &Rc<Self>,
        origin: &Row,
        column: &str,
        source: ObservableList<Row>,
    ) -> Result<ViewField> {
        let mut seeded = Vec::with_capacity(source.len());
        for target in source.to_vec() {
            if self.stored(&target) {
                seeded.push(self.project(&target)?);
            }
        }
        let list = ObservableList::from_vec(seeded);

        let join = self.clone();
        let out = list.clone();
        let weak = origin.downgrade();
        let name = String::from(column);
        self.join.subscriptions.add(source.on_insert(move |index, target| {
            let Some(source) = weak.upgrade().and_then(|origin| origin.references(&name)) else {
                return Ok(());
            };
            if !join.stored(target) {
                return Ok(());
            }
            let at = join.position(&source, index);
            let projected = join.project(target)?;
            out.insert_at(at, projected)
        }));

        let join = self.clone();
        let out = list.clone();
        let weak = origin.downgrade();
        let name = String::from(column);
        self.join.subscriptions.add(source.on_delete(move |index, target| {
            let Some(source) = weak.upgrade().and_then(|origin| origin.references(&name)) else {
                return Ok(());
            };
            if !join.stored(target) {
                return Ok(());
            }
            let at = join.position(&source, index);
            if out.get(at).is_some_and(|entry| entry.source() == target.handle()) {
                out.remove_at(at)?;
            }
            if !source.contains(target) {
                if let Some(stale) = join.join.scope.take(target.handle()) {
                    stale.dispose()?;
                }
            }
            Ok(())
        }));

        let join = self.clone();
        let out = list.clone();
        self.follow_deletes(Rc::new(move |deleted: &Row| {
            remove_deeper(&out, deleted.handle(), &join.join.scope).map(|_| ())
        }));
        Ok(ViewField::List(list))
    }

    fn project(&self, target: &Row) -> Result<ViewRow> {
        self.projector.copy_selected(target, &self.terms, &self.join.scope)
    }

    /// Returns false once `row` was deleted from the target table.
    fn stored(&self, row: &Row) -> bool {
        self.target
            .with(|slot| slot.table().map_or(true, |table| table.holds(row)))
    }

    /// Maps an index of the source list to the join list, which holds only
    /// stored targets.
    fn position(&self, source: &ObservableList<Row>, index: usize) -> usize {
        source.with(|items| items.iter().take(index).filter(|target| self.stored(target)).count())
    }

    /// Sets the join cell and disposes the projection it held before.
    fn replace(&self, out: &Observable<Option<ViewRow>>, next: Option<ViewRow>) -> Result<()> {
        let previous = out.get();
        out.set(next.clone())?;
        match previous {
            Some(previous) if next.as_ref() != Some(&previous) => {
                if let Some(stale) = self.join.scope.take(previous.source()) {
                    stale.dispose()?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Calls `handler` for every row deleted from the target table, waiting
    /// for the table to be created if the reference is still pending.
    fn follow_deletes(&self, handler: Rc<DeleteHandler>) {
        let ready = self.target.with(|slot| slot.table().cloned());
        match ready {
            Some(table) => self.join.subscriptions.add(table.on_delete(move |row| handler(row))),
            None => {
                let subscriptions = self.join.subscriptions.clone();
                self.join.subscriptions.add(self.target.on_change(move |slot| {
                    if let Some(table) = slot.table() {
                        let handler = handler.clone();
                        subscriptions.add(table.on_delete(move |row| handler(row)));
                    }
                    Ok(())
                }));
            }
        }
    }
}
