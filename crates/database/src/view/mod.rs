//! Live views.
//!
//! A `View` materializes a projection of a table into an
//! `ObservableList<ViewRow>` and keeps it current:
//!
//! - rows enter when inserted, or when an update makes the filter pass
//! - rows leave when deleted, or when an update makes the filter fail
//! - an update of the sort field moves the row by removing and re-inserting it
//!
//! Removal cascades through every join nested under the removed projection.

mod cascade;
mod forward;
mod projection;
mod query;
mod reverse;
mod scope;
mod view_row;

pub use query::Query;
pub use view_row::{ViewField, ViewRow};

use crate::database::Database;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use cascade::remove_deeper;
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::HashSet;
use projection::{Projector, Terms};
use rdb_core::{Result, RowHandle};
use rdb_reactive::{ObservableList, SubscriptionSet};
use rdb_storage::{Row, RowPattern, Table};
use scope::Scope;
use tracing::{debug, trace, warn};

/// Row predicate deciding view membership.
pub type RowFilter = dyn Fn(&Row) -> bool;

/// Sort direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

struct ViewInner {
    projector: Projector,
    query: Terms,
    filter: Option<Rc<RowFilter>>,
    sort: Option<(String, SortOrder)>,
    rows: ObservableList<ViewRow>,
    scope: Scope,
    members: RefCell<HashSet<RowHandle>>,
    subscriptions: SubscriptionSet,
    disposed: Cell<bool>,
}

impl ViewInner {
    fn admits(&self, row: &Row) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(row))
    }

    fn is_member(&self, handle: RowHandle) -> bool {
        self.members.borrow().contains(&handle)
    }

    fn watch_row(self: &Rc<Self>, row: &Row) -> Result<()> {
        if self.admits(row) {
            self.insert(row)?;
        }
        let view = Rc::downgrade(self);
        let source = row.downgrade();
        self.subscriptions.add_keyed(
            row.handle(),
            row.on_update(move |column, _| match (view.upgrade(), source.upgrade()) {
                (Some(view), Some(row)) => view.on_row_update(&row, column),
                _ => Ok(()),
            }),
        );
        Ok(())
    }

    fn on_row_update(&self, row: &Row, column: &str) -> Result<()> {
        let handle = row.handle();
        if self.is_member(handle) {
            if !self.admits(row) {
                return self.remove(handle);
            }
            if self.sort.as_ref().is_some_and(|(field, _)| field == column) {
                self.remove(handle)?;
                self.insert(row)?;
            }
        } else if self.filter.is_some() && self.admits(row) {
            self.insert(row)?;
        }
        Ok(())
    }

    fn on_row_delete(&self, row: &Row) -> Result<()> {
        self.subscriptions.cancel_key(row.handle());
        if self.scope.contains(row.handle()) {
            self.remove(row.handle())?;
        }
        Ok(())
    }

    fn insert(&self, row: &Row) -> Result<()> {
        let projected = self.projector.copy_selected(row, &self.query, &self.scope)?;
        self.members.borrow_mut().insert(row.handle());
        let index = match &self.sort {
            Some((field, order)) => self.position_for(&projected, field, *order),
            None => self.rows.len(),
        };
        trace!(row = %row.id(), index, "view row inserted");
        self.rows.insert_at(index, projected)
    }

    /// Returns the index before the first entry the new row sorts ahead of.
    fn position_for(&self, projected: &ViewRow, field: &str, order: SortOrder) -> usize {
        let Some(key) = projected.value(field) else {
            return self.rows.len();
        };
        self.rows.with(|rows| {
            rows.iter()
                .position(|entry| match entry.value(field) {
                    Some(existing) => match order {
                        SortOrder::Asc => key < existing,
                        SortOrder::Desc => key > existing,
                    },
                    None => false,
                })
                .unwrap_or(rows.len())
        })
    }

    fn remove(&self, handle: RowHandle) -> Result<()> {
        self.members.borrow_mut().remove(&handle);
        trace!(source = handle, "view row removed");
        remove_deeper(&self.rows, handle, &self.scope).map(|_| ())
    }

    /// Detaches from every source and disposes every projection.
    fn teardown(&self) -> Result<()> {
        if self.disposed.replace(true) {
            return Ok(());
        }
        self.subscriptions.cancel_all();
        self.members.borrow_mut().clear();
        let mut outcome = Ok(());
        for row in self.scope.drain() {
            let disposed = row.dispose();
            if outcome.is_ok() {
                outcome = disposed;
            }
        }
        outcome
    }
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        if let Err(error) = self.teardown() {
            warn!(%error, "view teardown failed");
        }
    }
}

/// A live, filtered, sorted projection of a table.
///
/// Cloning a `View` clones the handle. Dropping the last handle detaches the
/// view from its sources.
///
/// # Example
///
/// ```rust
/// use rdb_core::schema::Schema;
/// use rdb_core::{DataType, Value};
/// use rdb_database::{Database, SortOrder};
///
/// let db = Database::new();
/// let schema = Schema::builder()
///     .add_column("name", DataType::String)
///     .unwrap()
///     .add_column("age", DataType::Int32)
///     .unwrap()
///     .build();
/// let users = db.create_table("Users", schema).unwrap();
///
/// let adults = db
///     .view("Users")
///     .unwrap()
///     .select("name")
///     .select("age")
///     .filter(|row| row.value("age").and_then(|v| v.as_i64()).unwrap_or(0) >= 18)
///     .sort_by("age", SortOrder::Asc)
///     .build()
///     .unwrap();
///
/// users.insert("u1", [("name", Value::from("Ann")), ("age", Value::Int32(30))]).unwrap();
/// users.insert("u2", [("name", Value::from("Bob")), ("age", Value::Int32(12))]).unwrap();
/// assert_eq!(adults.len(), 1);
///
/// users.get("u2").unwrap().set("age", 20).unwrap();
/// let names: Vec<_> = adults.to_vec().iter().map(|r| r.value("name").unwrap()).collect();
/// assert_eq!(names, vec![Value::from("Bob"), Value::from("Ann")]);
/// ```
#[derive(Clone)]
pub struct View {
    inner: Rc<ViewInner>,
}

impl View {
    /// Builds a view over `table`, projecting existing rows immediately.
    pub fn new(
        db: &Database,
        table: &Table,
        query: Vec<Query>,
        filter: Option<Rc<RowFilter>>,
        sort: Option<(String, SortOrder)>,
    ) -> Result<View> {
        let inner = Rc::new(ViewInner {
            projector: Projector::new(db.downgrade()),
            query: query.into(),
            filter,
            sort,
            rows: ObservableList::new(),
            scope: Scope::new(),
            members: RefCell::new(HashSet::new()),
            subscriptions: SubscriptionSet::new(),
            disposed: Cell::new(false),
        });

        let view = Rc::downgrade(&inner);
        let watch = table.select_rows(RowPattern::All, move |row| match view.upgrade() {
            Some(view) => view.watch_row(row),
            None => Ok(()),
        })?;
        inner.subscriptions.add(watch);

        let view: Weak<ViewInner> = Rc::downgrade(&inner);
        inner.subscriptions.add(table.on_delete(move |row| match view.upgrade() {
            Some(view) => view.on_row_delete(row),
            None => Ok(()),
        }));

        debug!(table = table.id(), terms = inner.query.len(), rows = inner.rows.len(), "view built");
        Ok(View { inner })
    }

    /// Returns the materialized list.
    pub fn rows(&self) -> ObservableList<ViewRow> {
        self.inner.rows.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.rows.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<ViewRow> {
        self.inner.rows.get(index)
    }

    pub fn to_vec(&self) -> Vec<ViewRow> {
        self.inner.rows.to_vec()
    }

    /// Returns true if `row` is currently part of the view.
    pub fn contains(&self, row: &Row) -> bool {
        self.inner.is_member(row.handle())
    }

    /// Returns the projection of `row` if it is part of the view.
    pub fn find(&self, row: &Row) -> Option<ViewRow> {
        self.inner.scope.get(row.handle())
    }

    /// Returns true once the view was disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Empties the list, one notification per row, and detaches the view.
    pub fn dispose(&self) -> Result<()> {
        if self.inner.disposed.get() {
            return Ok(());
        }
        self.inner.subscriptions.cancel_all();
        let cleared = self.inner.rows.clear();
        let torn_down = self.inner.teardown();
        cleared?;
        torn_down
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("rows", &self.len())
            .field("sort", &self.inner.sort)
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Options of a view, collected before it is built.
pub struct ViewBuilder {
    db: Database,
    table: Table,
    query: Vec<Query>,
    filter: Option<Rc<RowFilter>>,
    sort: Option<(String, SortOrder)>,
}

impl ViewBuilder {
    pub fn new(db: &Database, table: &Table) -> Self {
        Self {
            db: db.clone(),
            table: table.clone(),
            query: Vec::new(),
            filter: None,
            sort: None,
        }
    }

    /// Appends a projection term.
    pub fn select(mut self, term: impl Into<Query>) -> Self {
        self.query.push(term.into());
        self
    }

    /// Appends several projection terms.
    pub fn select_all<T: Into<Query>>(mut self, terms: impl IntoIterator<Item = T>) -> Self {
        self.query.extend(terms.into_iter().map(Into::into));
        self
    }

    pub fn filter(mut self, filter: impl Fn(&Row) -> bool + 'static) -> Self {
        self.filter = Some(Rc::new(filter));
        self
    }

    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort = Some((field.into(), order));
        self
    }

    pub fn build(self) -> Result<View> {
        View::new(&self.db, &self.table, self.query, self.filter, self.sort)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use rdb_core::schema::Schema;
    use rdb_core::{DataType, Error, Value};
    use rdb_storage::ColumnInput;

    fn setup() -> (Database, Table) {
        let db = Database::new();
        let schema = Schema::builder()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("age", DataType::Int32)
            .unwrap()
            .build();
        let users = db.create_table("Users", schema).unwrap();
        (db, users)
    }

    fn person(name: &str, age: i32) -> [(&'static str, ColumnInput); 2] {
        [("name", name.into()), ("age", age.into())]
    }

    fn ids(view: &View) -> Vec<String> {
        view.to_vec().iter().map(|row| row.id().to_string()).collect()
    }

    fn record(list: &ObservableList<ViewRow>) -> Rc<RefCell<Vec<String>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        list.on_insert(move |index, row| {
            sink.borrow_mut().push(alloc::format!("+{}@{}", row.id(), index));
            Ok(())
        });
        let sink = events.clone();
        list.on_delete(move |index, row| {
            sink.borrow_mut().push(alloc::format!("-{}@{}", row.id(), index));
            Ok(())
        });
        events
    }

    #[test]
    fn test_existing_rows_are_projected() {
        let (db, users) = setup();
        users.insert("u1", person("Ann", 30)).unwrap();
        users.insert("u2", person("Bob", 20)).unwrap();

        let view = db.view("Users").unwrap().build().unwrap();
        assert_eq!(ids(&view), vec!["u1", "u2"]);
        let first = view.get(0).unwrap();
        assert_eq!(first.field_names().collect::<Vec<_>>(), vec!["name", "age"]);
        assert_eq!(first.value("age"), Some(Value::Int32(30)));
    }

    #[test]
    fn test_filter_transitions() {
        let (db, users) = setup();
        let view = db
            .view("Users")
            .unwrap()
            .filter(|row| row.value("age").and_then(|v| v.as_i64()).unwrap_or(0) >= 18)
            .build()
            .unwrap();

        let kid = users.insert("u1", person("Kid", 10)).unwrap();
        assert!(view.is_empty());
        assert!(!view.contains(&kid));

        kid.set("age", 18).unwrap();
        assert_eq!(ids(&view), vec!["u1"]);
        assert!(view.contains(&kid));

        kid.set("name", "Grown").unwrap();
        assert_eq!(view.len(), 1);
        assert_eq!(view.get(0).unwrap().value("name"), Some(Value::from("Grown")));

        kid.set("age", 3).unwrap();
        assert!(view.is_empty());
        assert!(view.find(&kid).is_none());
    }

    #[test]
    fn test_sort_field_update_removes_then_inserts() {
        let (db, users) = setup();
        let view = db
            .view("Users")
            .unwrap()
            .sort_by("age", SortOrder::Asc)
            .build()
            .unwrap();
        let a = users.insert("a", person("A", 10)).unwrap();
        users.insert("b", person("B", 20)).unwrap();
        let events = record(&view.rows());

        a.set("age", 25).unwrap();
        assert_eq!(ids(&view), vec!["b", "a"]);
        assert_eq!(*events.borrow(), vec!["-a@0", "+a@1"]);

        a.set("name", "AA").unwrap();
        assert_eq!(events.borrow().len(), 2);
    }

    #[test]
    fn test_descending_with_ties() {
        let (db, users) = setup();
        let view = db
            .view("Users")
            .unwrap()
            .sort_by("age", SortOrder::Desc)
            .build()
            .unwrap();
        users.insert("a", person("A", 20)).unwrap();
        users.insert("b", person("B", 30)).unwrap();
        users.insert("c", person("C", 20)).unwrap();
        assert_eq!(ids(&view), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_delete_removes_and_detaches() {
        let (db, users) = setup();
        let view = db.view("Users").unwrap().build().unwrap();
        let ann = users.insert("u1", person("Ann", 30)).unwrap();
        let projected = view.get(0).unwrap();
        assert_eq!(ann.update_listener_count(), 2);

        users.delete("u1").unwrap();
        assert!(view.is_empty());
        assert!(projected.is_disposed());
        assert_eq!(ann.update_listener_count(), 0);
    }

    #[test]
    fn test_invalid_column_fails_build() {
        let (db, users) = setup();
        users.insert("u1", person("Ann", 30)).unwrap();
        let result = db.view("Users").unwrap().select("email").build();
        assert!(matches!(result, Err(Error::NotAValidColumn { .. })));
        assert_eq!(users.listener_count(), 0);
    }

    #[test]
    fn test_dispose_and_drop_detach() {
        let (db, users) = setup();
        users.insert("u1", person("Ann", 30)).unwrap();
        let view = db.view("Users").unwrap().build().unwrap();
        let events = record(&view.rows());
        assert_eq!(users.listener_count(), 2);

        view.dispose().unwrap();
        assert!(view.is_empty());
        assert_eq!(*events.borrow(), vec!["-u1@0"]);
        assert_eq!(users.listener_count(), 0);
        users.insert("u2", person("Bob", 1)).unwrap();
        assert!(view.is_empty());

        let other = db.view("Users").unwrap().build().unwrap();
        assert_eq!(users.listener_count(), 2);
        drop(other);
        assert_eq!(users.listener_count(), 0);
        assert_eq!(users.get("u1").unwrap().update_listener_count(), 0);
    }
}
