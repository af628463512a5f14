//! Projection of source rows into `ViewRow`s.
//!
//! Every projection runs against an explicit `Scope`. A row already cached in
//! the scope is returned as is; otherwise its fields are built from the query
//! terms, join fields open scopes of their own, and the result is cached.

use super::forward::ForwardJoin;
use super::query::{JoinKind, Query};
use super::reverse::ReverseJoin;
use super::scope::Scope;
use super::view_row::{JoinParts, Parts, ViewField, ViewRow};
use crate::database::WeakDatabase;
use alloc::rc::Rc;
use alloc::vec::Vec;
use rdb_core::{Error, Result, Value};
use rdb_reactive::{Observable, ObservableList};
use rdb_storage::{FieldValue, Row, RowPattern};

/// Projection terms shared by the listeners of one join field.
pub(crate) type Terms = Rc<[Query]>;

#[derive(Clone)]
pub(crate) struct Projector {
    db: WeakDatabase,
}

impl Projector {
    pub(crate) fn new(db: WeakDatabase) -> Self {
        Self { db }
    }

    /// Returns the projection of `row` in `scope`, building it if needed.
    pub(crate) fn copy_selected(&self, row: &Row, terms: &[Query], scope: &Scope) -> Result<ViewRow> {
        if let Some(cached) = scope.get(row.handle()) {
            return Ok(cached);
        }

        let mut parts = Parts::default();
        if let Err(error) = self.project(row, terms, &mut parts) {
            parts.discard();
            return Err(error);
        }

        let cells = parts.value_cells();
        parts.subscriptions.add(row.on_update(move |column, value| {
            for (name, cell) in &cells {
                if name == column {
                    cell.set(value.clone())?;
                }
            }
            Ok(())
        }));

        let projected = ViewRow::new(row.id().into(), row.handle(), parts);
        scope.insert(row.handle(), projected.clone());
        Ok(projected)
    }

    fn project(&self, row: &Row, terms: &[Query], parts: &mut Parts) -> Result<()> {
        if terms.is_empty() {
            return self.select_all_plain(row, parts);
        }
        for term in terms {
            match term {
                Query::All => self.select_all_plain(row, parts)?,
                Query::Id => {}
                Query::Column(name) => {
                    let column = row
                        .schema()
                        .get_column(name)
                        .ok_or_else(|| Error::not_a_valid_column(name.as_str()))?;
                    if column.is_reference() {
                        let terms = Terms::from(Vec::new());
                        attach_join(parts, name, |join| self.select_ref(row, name, terms, join))?;
                    } else {
                        let value = row.value(name).unwrap_or(Value::Null);
                        parts.set_field(name, ViewField::Value(Observable::new(value)))?;
                    }
                }
                Query::Join { name, terms } => {
                    let terms: Terms = terms.iter().cloned().collect();
                    match Query::join_kind(name) {
                        JoinKind::Reverse { column, table } => attach_join(parts, name, |join| {
                            self.select_reverse(row, column, table, terms, join)
                        })?,
                        JoinKind::AllReferences => self.select_all_refs(row, terms, parts)?,
                        JoinKind::Forward(column) => {
                            if !row.has(column) {
                                return Err(Error::not_a_valid_column(column));
                            }
                            attach_join(parts, name, |join| self.select_ref(row, column, terms, join))?;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn select_all_plain(&self, row: &Row, parts: &mut Parts) -> Result<()> {
        for column in row.columns().iter().filter(|column| column.is_plain()) {
            let value = row.value(column.name()).unwrap_or(Value::Null);
            parts.set_field(column.name(), ViewField::Value(Observable::new(value)))?;
        }
        Ok(())
    }

    fn select_all_refs(&self, row: &Row, terms: Terms, parts: &mut Parts) -> Result<()> {
        for column in row.columns().iter().filter(|column| column.is_reference()) {
            let name = column.name();
            attach_join(parts, name, |join| self.select_ref(row, name, terms.clone(), join))?;
        }
        Ok(())
    }

    /// Projects the target of a reference column through the join's scope,
    /// following later changes of the column and deletions of its targets.
    fn select_ref(&self, row: &Row, column: &str, terms: Terms, join: &JoinParts) -> Result<ViewField> {
        let target = row
            .table_reference(column)
            .ok_or_else(|| Error::unresolved_reference_type(column))?;
        let forward = Rc::new(ForwardJoin {
            projector: self.clone(),
            terms,
            target,
            join: join.clone(),
        });
        match row.get(column) {
            Some(FieldValue::Ref(source)) => forward.single(source),
            Some(FieldValue::Refs(source)) => forward.multiple(row, column, source),
            _ => Err(Error::unresolved_reference_type(column)),
        }
    }

    /// Projects the rows of `table` whose `column` references `row`.
    fn select_reverse(
        &self,
        row: &Row,
        column: &str,
        table: &str,
        terms: Terms,
        join: &JoinParts,
    ) -> Result<ViewField> {
        let db = self
            .db
            .upgrade()
            .ok_or_else(|| Error::invalid_operation("Database was dropped"))?;
        let table = db.select_table(table)?;
        match table.schema().get_column(column) {
            Some(target) if target.is_reference() => {}
            _ => return Err(Error::column_is_not_a_reference(column)),
        }

        let list = ObservableList::new();
        let reverse = Rc::new(ReverseJoin {
            projector: self.clone(),
            origin: row.handle(),
            column: column.into(),
            terms,
            scope: join.scope.clone(),
            out: list.clone(),
            watchers: join.subscriptions.clone(),
        });

        let watcher = reverse.clone();
        join.subscriptions
            .add(table.select_rows(RowPattern::All, move |watched| watcher.watch(watched))?);
        join.subscriptions
            .add(table.on_delete(move |deleted| reverse.forget(deleted)));
        Ok(ViewField::List(list))
    }
}

/// Builds a join field with fresh resources and attaches it to `parts`.
/// Resources of a join that failed to build are released.
fn attach_join(
    parts: &mut Parts,
    name: &str,
    build: impl FnOnce(&JoinParts) -> Result<ViewField>,
) -> Result<()> {
    let join = JoinParts::default();
    match build(&join) {
        Ok(field) => parts.set_join(name, field, join),
        Err(error) => {
            join.discard();
            Err(error)
        }
    }
}
