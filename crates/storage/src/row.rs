//! Rows with per-column reactive cells.

use crate::constraint::ConstraintChecker;
use crate::reference::TableReference;
use crate::table::Layout;
use alloc::boxed::Box;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use rdb_core::schema::{Column, ColumnKind, Schema};
use rdb_core::{next_row_handle, Error, Result, RowHandle, TableId, Value};
use rdb_reactive::{Listeners, Observable, ObservableList, Subscription};

/// Callback invoked with `(column, new value)` after a plain column changes.
pub type UpdateListener = dyn Fn(&str, &Value) -> Result<()>;

/// Storage cell of one column.
pub(crate) enum Field {
    Plain(RefCell<Value>),
    Ref(Observable<Option<Row>>),
    Refs(ObservableList<Row>),
}

/// A column value handed out by `Row::get`.
///
/// Reference cells are returned as handles, so listeners attached to them
/// observe later writes.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Plain(Value),
    Ref(Observable<Option<Row>>),
    Refs(ObservableList<Row>),
}

impl FieldValue {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Plain(value) => Some(value),
            _ => None,
        }
    }
}

/// Initial content for one column of an inserted row.
#[derive(Clone, Debug)]
pub enum ColumnInput {
    Value(Value),
    Ref(Option<Row>),
    Refs(Vec<Row>),
}

impl From<Value> for ColumnInput {
    fn from(value: Value) -> Self {
        ColumnInput::Value(value)
    }
}

macro_rules! input_from_value {
    ($($t:ty),*) => {
        $(impl From<$t> for ColumnInput {
            fn from(value: $t) -> Self {
                ColumnInput::Value(Value::from(value))
            }
        })*
    };
}

input_from_value!(&str, String, i32, i64, f64, bool);

impl From<Row> for ColumnInput {
    fn from(row: Row) -> Self {
        ColumnInput::Ref(Some(row))
    }
}

impl From<&Row> for ColumnInput {
    fn from(row: &Row) -> Self {
        ColumnInput::Ref(Some(row.clone()))
    }
}

impl From<Option<Row>> for ColumnInput {
    fn from(row: Option<Row>) -> Self {
        ColumnInput::Ref(row)
    }
}

impl From<Vec<Row>> for ColumnInput {
    fn from(rows: Vec<Row>) -> Self {
        ColumnInput::Refs(rows)
    }
}

struct RowInner {
    handle: RowHandle,
    id: String,
    layout: Rc<Layout>,
    fields: Vec<Field>,
    updates: Listeners<UpdateListener>,
}

/// A shared row handle.
///
/// Equality is identity: two handles are equal only if they point at the same
/// row.
#[derive(Clone)]
pub struct Row {
    inner: Rc<RowInner>,
}

/// A non-owning row handle.
#[derive(Clone)]
pub struct WeakRow {
    inner: Weak<RowInner>,
}

impl WeakRow {
    pub fn upgrade(&self) -> Option<Row> {
        self.inner.upgrade().map(|inner| Row { inner })
    }
}

impl Row {
    /// Builds a row from `(column, input)` pairs, filling unset columns with
    /// their defaults.
    pub(crate) fn build<I, K, V>(layout: Rc<Layout>, id: String, values: I) -> Result<Row>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<ColumnInput>,
    {
        let schema = &layout.schema;
        let mut inputs: Vec<Option<ColumnInput>> = (0..schema.len()).map(|_| None).collect();
        for (name, input) in values {
            let name = name.as_ref();
            let index = schema
                .get_column_index(name)
                .ok_or_else(|| Error::column_not_found(name))?;
            inputs[index] = Some(input.into());
        }

        let mut fields = Vec::with_capacity(inputs.len());
        for (column, input) in schema.columns().iter().zip(inputs) {
            fields.push(Self::build_field(&layout, column, input)?);
        }

        Ok(Row {
            inner: Rc::new(RowInner {
                handle: next_row_handle(),
                id,
                layout,
                fields,
                updates: Listeners::new(),
            }),
        })
    }

    fn build_field(layout: &Layout, column: &Column, input: Option<ColumnInput>) -> Result<Field> {
        match (column.kind(), input) {
            (ColumnKind::Plain(_), None) => Ok(Field::Plain(RefCell::new(column.get_default_value()))),
            (ColumnKind::Plain(_), Some(ColumnInput::Value(value))) => {
                ConstraintChecker::check_value(column, &value)?;
                Ok(Field::Plain(RefCell::new(value)))
            }
            (ColumnKind::Ref(_), None) | (ColumnKind::Ref(_), Some(ColumnInput::Value(Value::Null))) => {
                Ok(Field::Ref(Observable::new(None)))
            }
            (ColumnKind::Ref(_), Some(ColumnInput::Ref(target))) => {
                if let Some(target) = &target {
                    ConstraintChecker::check_reference(layout, column, target)?;
                }
                Ok(Field::Ref(Observable::new(target)))
            }
            (ColumnKind::Refs(_), None) => Ok(Field::Refs(ObservableList::new())),
            (ColumnKind::Refs(_), Some(ColumnInput::Refs(targets))) => {
                for target in &targets {
                    ConstraintChecker::check_reference(layout, column, target)?;
                }
                Ok(Field::Refs(ObservableList::from_vec(targets)))
            }
            (_, Some(_)) => Err(Error::invalid_operation(alloc::format!(
                "Column {} cannot hold the given input",
                column.name()
            ))),
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.inner.id
    }

    #[inline]
    pub fn handle(&self) -> RowHandle {
        self.inner.handle
    }

    /// Returns the id of the table the row was created in.
    #[inline]
    pub fn table_id(&self) -> TableId {
        self.inner.layout.table_id
    }

    #[inline]
    pub fn schema(&self) -> &Schema {
        &self.inner.layout.schema
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        self.schema().columns()
    }

    pub fn each_column(&self, mut f: impl FnMut(&Column)) {
        for column in self.columns() {
            f(column);
        }
    }

    /// Returns true if `column` is part of the row's structure.
    pub fn has(&self, column: &str) -> bool {
        self.schema().get_column_index(column).is_some()
    }

    /// Returns the content of `column`.
    pub fn get(&self, column: &str) -> Option<FieldValue> {
        let index = self.schema().get_column_index(column)?;
        Some(match &self.inner.fields[index] {
            Field::Plain(cell) => FieldValue::Plain(cell.borrow().clone()),
            Field::Ref(cell) => FieldValue::Ref(cell.clone()),
            Field::Refs(list) => FieldValue::Refs(list.clone()),
        })
    }

    /// Returns the value of a plain column.
    pub fn value(&self, column: &str) -> Option<Value> {
        match self.field(column).ok()? {
            (_, Field::Plain(cell)) => Some(cell.borrow().clone()),
            _ => None,
        }
    }

    /// Returns the cell of a single-reference column.
    pub fn reference(&self, column: &str) -> Option<Observable<Option<Row>>> {
        match self.field(column).ok()? {
            (_, Field::Ref(cell)) => Some(cell.clone()),
            _ => None,
        }
    }

    /// Returns the list of a multi-reference column.
    pub fn references(&self, column: &str) -> Option<ObservableList<Row>> {
        match self.field(column).ok()? {
            (_, Field::Refs(list)) => Some(list.clone()),
            _ => None,
        }
    }

    /// Returns the slot of the table a reference column points into.
    pub fn table_reference(&self, column: &str) -> Option<TableReference> {
        let index = self.schema().get_column_index(column)?;
        self.inner.layout.reference(index).cloned()
    }

    /// Writes a plain column and notifies update listeners if the value changed.
    pub fn set(&self, column: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let (column, field) = self.field(column)?;
        let Field::Plain(cell) = field else {
            return Err(Error::invalid_operation(alloc::format!(
                "Column {} is a reference column",
                column.name()
            )));
        };
        ConstraintChecker::check_value(column, &value)?;
        {
            let mut current = cell.borrow_mut();
            if *current == value {
                return Ok(());
            }
            *current = value.clone();
        }
        tracing::trace!(row = %self.id(), column = column.name(), "row updated");
        let name = column.name();
        self.inner.updates.emit(|listener| listener(name, &value))
    }

    /// Points a single-reference column at `target`, or clears it.
    pub fn set_ref(&self, column: &str, target: Option<&Row>) -> Result<()> {
        let (column, field) = self.field(column)?;
        let Field::Ref(cell) = field else {
            return Err(Error::column_is_not_a_reference(column.name()));
        };
        if let Some(target) = target {
            ConstraintChecker::check_reference(&self.inner.layout, column, target)?;
        }
        cell.set(target.cloned())
    }

    /// Appends `target` to a multi-reference column.
    pub fn push_ref(&self, column: &str, target: &Row) -> Result<()> {
        let (column, list) = self.refs_field(column)?;
        ConstraintChecker::check_reference(&self.inner.layout, column, target)?;
        list.push(target.clone())
    }

    /// Removes every occurrence of `target` from a multi-reference column.
    pub fn remove_ref(&self, column: &str, target: &Row) -> Result<bool> {
        let (_, list) = self.refs_field(column)?;
        list.remove(target)
    }

    /// Registers a listener called after each plain column change.
    pub fn on_update(&self, listener: impl Fn(&str, &Value) -> Result<()> + 'static) -> Subscription {
        self.inner.updates.subscribe(Box::new(listener))
    }

    /// Returns the number of attached update listeners.
    pub fn update_listener_count(&self) -> usize {
        self.inner.updates.len()
    }

    pub fn downgrade(&self) -> WeakRow {
        WeakRow {
            inner: Rc::downgrade(&self.inner),
        }
    }

    #[inline]
    pub fn ptr_eq(&self, other: &Row) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    fn field(&self, column: &str) -> Result<(&Column, &Field)> {
        let index = self
            .schema()
            .get_column_index(column)
            .ok_or_else(|| Error::column_not_found(column))?;
        Ok((&self.schema().columns()[index], &self.inner.fields[index]))
    }

    fn refs_field(&self, column: &str) -> Result<(&Column, &ObservableList<Row>)> {
        match self.field(column)? {
            (column, Field::Refs(list)) => Ok((column, list)),
            (column, _) => Err(Error::column_is_not_a_reference(column.name())),
        }
    }
}

impl PartialEq for Row {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Row {}

impl fmt::Debug for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Row")
            .field("id", &self.inner.id)
            .field("handle", &self.inner.handle)
            .field("table", &self.table_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::TableSlot;
    use crate::table::Table;
    use rdb_core::DataType;

    fn users() -> Table {
        let schema = Schema::builder()
            .add_column("name", DataType::String)
            .unwrap()
            .add_column("age", DataType::Int32)
            .unwrap()
            .build();
        Table::new(schema, |name| Observable::new(TableSlot::Pending(name.into())))
    }

    #[test]
    fn test_defaults_fill_unset_columns() {
        let table = users();
        let row = table.insert("u1", [("name", "Ann")]).unwrap();
        assert_eq!(row.id(), "u1");
        assert_eq!(row.value("name"), Some(Value::from("Ann")));
        assert_eq!(row.value("age"), Some(Value::Int32(0)));
        assert!(row.has("age"));
        assert!(!row.has("email"));
    }

    #[test]
    fn test_set_notifies_on_change_only() {
        let table = users();
        let row = table.insert("u1", [("name", "Ann")]).unwrap();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        row.on_update(move |column, value| {
            sink.borrow_mut().push((String::from(column), value.clone()));
            Ok(())
        });

        row.set("name", "Ann").unwrap();
        row.set("age", 30).unwrap();
        assert_eq!(*seen.borrow(), alloc::vec![(String::from("age"), Value::Int32(30))]);
    }

    #[test]
    fn test_set_rejects_bad_writes() {
        let table = users();
        let row = table.insert("u1", [("name", "Ann")]).unwrap();
        assert!(matches!(row.set("email", "x"), Err(Error::ColumnNotFound { .. })));
        assert!(matches!(row.set("age", "x"), Err(Error::TypeMismatch { .. })));
        assert!(matches!(row.set("name", Value::Null), Err(Error::NullConstraint { .. })));
        assert_eq!(row.value("name"), Some(Value::from("Ann")));
    }

    #[test]
    fn test_row_identity() {
        let table = users();
        let a = table.insert("a", [("name", "A")]).unwrap();
        let b = table.insert("b", [("name", "A")]).unwrap();
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a.handle(), b.handle());
        assert!(a.downgrade().upgrade().unwrap().ptr_eq(&a));
    }
}
