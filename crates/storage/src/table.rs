//! Tables: id-keyed row stores with insert and delete notification.

use crate::reference::TableReference;
use crate::row::{ColumnInput, Row};
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::{Cell, RefCell};
use core::fmt;
use hashbrown::hash_map::DefaultHashBuilder;
use indexmap::IndexMap;
use rdb_core::schema::Schema;
use rdb_core::{next_table_id, Error, Result, TableId, Value};
use rdb_reactive::{Listeners, Subscription};

/// Callback invoked with a row after it was inserted or deleted.
pub type RowListener = dyn Fn(&Row) -> Result<()>;

/// Rows keyed by id, in insertion order.
type RowMap = IndexMap<String, Row, DefaultHashBuilder>;

/// Structure shared by a table and all of its rows.
pub(crate) struct Layout {
    pub(crate) table_id: TableId,
    pub(crate) schema: Schema,
    references: Vec<Option<TableReference>>,
}

impl Layout {
    /// Returns the table reference of the column at `index`.
    pub(crate) fn reference(&self, index: usize) -> Option<&TableReference> {
        self.references.get(index).and_then(Option::as_ref)
    }
}

/// Selects rows of a table.
#[derive(Clone, Debug, PartialEq)]
pub enum RowPattern {
    /// Every row.
    All,
    /// The row with this id.
    Id(String),
    /// Rows whose plain column equals the value.
    Eq(String, Value),
}

impl RowPattern {
    pub fn matches(&self, row: &Row) -> bool {
        match self {
            RowPattern::All => true,
            RowPattern::Id(id) => row.id() == id,
            RowPattern::Eq(column, value) => row.value(column).as_ref() == Some(value),
        }
    }
}

struct TableInner {
    layout: Rc<Layout>,
    rows: RefCell<RowMap>,
    inserts: Listeners<RowListener>,
    deletes: Listeners<RowListener>,
    dropped: Cell<bool>,
}

/// A shared table handle.
///
/// # Example
///
/// ```rust
/// use rdb_core::schema::Schema;
/// use rdb_core::DataType;
/// use rdb_reactive::Observable;
/// use rdb_storage::{Table, TableSlot};
///
/// let schema = Schema::builder()
///     .add_column("name", DataType::String)
///     .unwrap()
///     .build();
/// let users = Table::new(schema, |name| Observable::new(TableSlot::Pending(name.into())));
///
/// let ann = users.insert("u1", [("name", "Ann")]).unwrap();
/// assert_eq!(users.get("u1"), Some(ann));
/// users.delete("u1").unwrap();
/// assert!(users.is_empty());
/// ```
#[derive(Clone)]
pub struct Table {
    inner: Rc<TableInner>,
}

impl Table {
    /// Creates a table. `resolve` is called once per reference column with
    /// the target table name and returns the slot the column validates against.
    pub fn new(schema: Schema, mut resolve: impl FnMut(&str) -> TableReference) -> Table {
        let references = schema
            .columns()
            .iter()
            .map(|column| column.target_table().map(&mut resolve))
            .collect();
        let layout = Rc::new(Layout {
            table_id: next_table_id(),
            schema,
            references,
        });
        Table {
            inner: Rc::new(TableInner {
                layout,
                rows: RefCell::new(IndexMap::with_hasher(DefaultHashBuilder::default())),
                inserts: Listeners::new(),
                deletes: Listeners::new(),
                dropped: Cell::new(false),
            }),
        }
    }

    #[inline]
    pub fn id(&self) -> TableId {
        self.inner.layout.table_id
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.inner.layout.schema
    }

    /// Returns the reference slot of a reference column.
    pub fn reference(&self, column: &str) -> Option<TableReference> {
        let index = self.schema().get_column_index(column)?;
        self.inner.layout.reference(index).cloned()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.rows.borrow().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.rows.borrow().is_empty()
    }

    /// Returns true once the table was closed.
    #[inline]
    pub fn is_dropped(&self) -> bool {
        self.inner.dropped.get()
    }

    pub fn get(&self, id: &str) -> Option<Row> {
        self.inner.rows.borrow().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.inner.rows.borrow().contains_key(id)
    }

    /// Returns true if `row` itself, not just a row with its id, is stored here.
    pub fn holds(&self, row: &Row) -> bool {
        self.inner
            .rows
            .borrow()
            .get(row.id())
            .is_some_and(|stored| stored.ptr_eq(row))
    }

    /// Returns a snapshot of all rows in insertion order.
    pub fn rows(&self) -> Vec<Row> {
        self.inner.rows.borrow().values().cloned().collect()
    }

    /// Calls `f` for each row of a snapshot; `f` may mutate the table.
    pub fn each_row(&self, mut f: impl FnMut(&Row)) {
        for row in self.rows() {
            f(&row);
        }
    }

    /// Inserts a row built from `(column, input)` pairs.
    ///
    /// Unset columns receive their default. Fails on a duplicate id, an
    /// unknown column or an invalid value, leaving the table unchanged.
    pub fn insert<I, K, V>(&self, id: impl Into<String>, values: I) -> Result<Row>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ColumnInput>,
    {
        self.check_open()?;
        let id = id.into();
        if self.contains(&id) {
            return Err(Error::unique_constraint("id", Value::String(id)));
        }
        let row = Row::build(self.inner.layout.clone(), id.clone(), values)?;
        self.inner.rows.borrow_mut().insert(id, row.clone());
        tracing::trace!(table = self.id(), row = %row.id(), "row inserted");
        self.inner.inserts.emit(|listener| listener(&row))?;
        Ok(row)
    }

    /// Deletes the row with `id` and notifies delete listeners.
    pub fn delete(&self, id: &str) -> Result<Row> {
        let row = self
            .inner
            .rows
            .borrow_mut()
            .shift_remove(id)
            .ok_or_else(|| Error::not_found(Value::from(id)))?;
        tracing::trace!(table = self.id(), row = %row.id(), "row deleted");
        self.inner.deletes.emit(|listener| listener(&row))?;
        Ok(row)
    }

    /// Deletes `row` if it is stored in this table.
    pub fn delete_row(&self, row: &Row) -> Result<()> {
        match self.get(row.id()) {
            Some(stored) if stored.ptr_eq(row) => self.delete(row.id()).map(|_| ()),
            _ => Err(Error::not_found(Value::from(row.id()))),
        }
    }

    /// Deletes every row in insertion order, one notification each.
    pub fn clear(&self) -> Result<()> {
        let ids: Vec<String> = self.inner.rows.borrow().keys().cloned().collect();
        for id in ids {
            if self.contains(&id) {
                self.delete(&id)?;
            }
        }
        Ok(())
    }

    /// Empties the table and refuses further inserts.
    pub fn close(&self) -> Result<()> {
        self.clear()?;
        self.inner.dropped.set(true);
        tracing::debug!(table = self.id(), "table closed");
        Ok(())
    }

    /// Calls `listener` for every existing row matching `pattern` and then for
    /// every matching row inserted later.
    ///
    /// The listener is registered only if every existing row was accepted.
    pub fn select_rows(
        &self,
        pattern: RowPattern,
        listener: impl Fn(&Row) -> Result<()> + 'static,
    ) -> Result<Subscription> {
        for row in self.rows() {
            if pattern.matches(&row) {
                listener(&row)?;
            }
        }
        Ok(self.on_insert(move |row| {
            if pattern.matches(row) {
                listener(row)
            } else {
                Ok(())
            }
        }))
    }

    pub fn on_insert(&self, listener: impl Fn(&Row) -> Result<()> + 'static) -> Subscription {
        self.inner.inserts.subscribe(Box::new(listener))
    }

    pub fn on_delete(&self, listener: impl Fn(&Row) -> Result<()> + 'static) -> Subscription {
        self.inner.deletes.subscribe(Box::new(listener))
    }

    /// Returns the number of attached insert and delete listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.inserts.len() + self.inner.deletes.len()
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Table) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn check_open(&self) -> Result<()> {
        if self.is_dropped() {
            return Err(Error::invalid_operation("Table was dropped"));
        }
        Ok(())
    }
}

impl fmt::Debug for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Table")
            .field("id", &self.id())
            .field("rows", &self.len())
            .field("dropped", &self.is_dropped())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::TableSlot;
    use alloc::vec;
    use rdb_core::DataType;
    use rdb_reactive::Observable;

    fn pending(name: &str) -> TableReference {
        Observable::new(TableSlot::Pending(name.into()))
    }

    fn users() -> Table {
        let schema = Schema::builder()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("age", DataType::Int32)
            .unwrap()
            .build();
        Table::new(schema, pending)
    }

    fn posts(users: &Table) -> Table {
        let schema = Schema::builder()
            .add_column("title", DataType::String)
            .unwrap()
            .add_ref("author", "Users")
            .unwrap()
            .add_refs("readers", "Users")
            .unwrap()
            .build();
        let users = users.clone();
        Table::new(schema, move |_| Observable::new(TableSlot::Ready(users.clone())))
    }

    fn ids(rows: &RefCell<Vec<String>>) -> Vec<String> {
        rows.borrow().clone()
    }

    #[test]
    fn test_insert_and_get() {
        let table = users();
        let row = table.insert("u1", [("name", "Ann")]).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("u1"), Some(row.clone()));
        assert_eq!(row.table_id(), table.id());
        assert!(table.get("u2").is_none());
    }

    #[test]
    fn test_insert_rejects_duplicate_id() {
        let table = users();
        table.insert("u1", [("name", "Ann")]).unwrap();
        let result = table.insert("u1", [("name", "Bob")]);
        assert!(matches!(result, Err(Error::UniqueConstraint { .. })));
        assert_eq!(table.get("u1").unwrap().value("name"), Some(Value::from("Ann")));
    }

    #[test]
    fn test_insert_rejects_unknown_column() {
        let table = users();
        let result = table.insert("u1", [("email", "a@b")]);
        assert!(matches!(result, Err(Error::ColumnNotFound { .. })));
        assert!(table.is_empty());
    }

    #[test]
    fn test_select_rows_existing_then_future() {
        let table = users();
        table.insert("u1", [("name", "Ann")]).unwrap();
        table.insert("u2", [("name", "Bob")]).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let sub = table
            .select_rows(RowPattern::Eq("name".into(), Value::from("Bob")), move |row| {
                sink.borrow_mut().push(String::from(row.id()));
                Ok(())
            })
            .unwrap();
        table.insert("u3", [("name", "Bob")]).unwrap();
        table.insert("u4", [("name", "Cid")]).unwrap();
        assert_eq!(ids(&seen), vec![String::from("u2"), String::from("u3")]);

        sub.cancel();
        table.insert("u5", [("name", "Bob")]).unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn test_select_rows_failure_registers_nothing() {
        let table = users();
        table.insert("u1", [("name", "Ann")]).unwrap();
        let result = table.select_rows(RowPattern::All, |_| Err(Error::invalid_operation("no")));
        assert!(result.is_err());
        assert_eq!(table.listener_count(), 0);
    }

    #[test]
    fn test_delete_and_clear_notify() {
        let table = users();
        for id in ["a", "b", "c"] {
            table.insert(id, [("name", id)]).unwrap();
        }
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        table.on_delete(move |row| {
            sink.borrow_mut().push(String::from(row.id()));
            Ok(())
        });

        table.delete("b").unwrap();
        assert!(matches!(table.delete("b"), Err(Error::NotFound { .. })));
        table.clear().unwrap();
        assert!(table.is_empty());
        assert_eq!(
            ids(&seen),
            vec![String::from("b"), String::from("a"), String::from("c")]
        );
    }

    #[test]
    fn test_holds_tracks_stored_row() {
        let people = users();
        let ann = people.insert("u1", [("name", "Ann")]).unwrap();
        let posts = posts(&people);
        let post = posts.insert("p1", [("author", ColumnInput::from(&ann))]).unwrap();
        assert!(people.holds(&ann));
        assert!(!posts.holds(&ann));

        let target = post.table_reference("author").unwrap();
        assert!(target.with(|slot| slot.table().is_some_and(|t| t.ptr_eq(&people))));
        assert!(post.table_reference("title").is_none());

        people.delete("u1").unwrap();
        let again = people.insert("u1", [("name", "Ann")]).unwrap();
        assert!(!people.holds(&ann));
        assert!(people.holds(&again));
    }

    #[test]
    fn test_close_refuses_inserts() {
        let table = users();
        table.insert("u1", [("name", "Ann")]).unwrap();
        table.close().unwrap();
        assert!(table.is_dropped());
        assert!(table.is_empty());
        assert!(matches!(
            table.insert("u2", [("name", "Bob")]),
            Err(Error::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_reference_validation() {
        let people = users();
        let other = users();
        let ann = people.insert("u1", [("name", "Ann")]).unwrap();
        let stranger = other.insert("x1", [("name", "X")]).unwrap();
        let posts = posts(&people);

        let post = posts
            .insert(
                "p1",
                [
                    ("title", ColumnInput::from("Hello")),
                    ("author", ColumnInput::from(&ann)),
                ],
            )
            .unwrap();
        assert_eq!(post.reference("author").unwrap().get(), Some(ann.clone()));

        assert!(matches!(
            post.set_ref("author", Some(&stranger)),
            Err(Error::ReferenceMismatch { .. })
        ));
        assert!(matches!(
            post.push_ref("title", &ann),
            Err(Error::ColumnIsNotAReference { .. })
        ));
        post.push_ref("readers", &ann).unwrap();
        assert_eq!(post.references("readers").unwrap().to_vec(), vec![ann.clone()]);
        assert!(post.remove_ref("readers", &ann).unwrap());
        post.set_ref("author", None).unwrap();
        assert_eq!(post.reference("author").unwrap().get(), None);
    }

    #[test]
    fn test_pending_reference_refuses_targets() {
        let people = users();
        let ann = people.insert("u1", [("name", "Ann")]).unwrap();
        let schema = Schema::builder().add_ref("owner", "Owners").unwrap().build();
        let pets = Table::new(schema, pending);

        let result = pets.insert("p1", [("owner", ColumnInput::from(&ann))]);
        assert!(matches!(result, Err(Error::UnresolvedReference { .. })));
        let pet = pets.insert("p2", [("owner", ColumnInput::Ref(None))]).unwrap();
        assert_eq!(pet.reference("owner").unwrap().get(), None);
    }
}
