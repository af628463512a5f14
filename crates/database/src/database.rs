//! Database - Table registry and forward-reference resolution.
//!
//! The `Database` owns every table by name. Reference columns and views look
//! tables up through it; a reference to a table that does not exist yet is
//! handed out as a pending `TableReference` and completed when the table is
//! created.

use crate::view::ViewBuilder;
use alloc::rc::{Rc, Weak};
use alloc::string::String;
use alloc::vec::Vec;
use core::cell::RefCell;
use core::fmt;
use hashbrown::hash_map::DefaultHashBuilder;
use hashbrown::HashMap;
use indexmap::IndexMap;
use rdb_core::schema::Schema;
use rdb_core::{Error, Result, TableId};
use rdb_reactive::{Listeners, Observable};
use rdb_storage::{Table, TableReference, TableSlot};
use tracing::{debug, instrument};

/// Callback invoked with `(name, table)` after a table is created or dropped.
pub type TableListener = dyn Fn(&str, &Table) -> Result<()>;

/// Callback invoked with `(old name, new name, table)` on rename.
pub type RenameListener = dyn Fn(&str, &str, &Table) -> Result<()>;

#[derive(Default)]
struct Registry {
    tables: IndexMap<String, Table, DefaultHashBuilder>,
    names: HashMap<TableId, String>,
    waiting: HashMap<String, Vec<TableReference>>,
}

struct DatabaseInner {
    registry: RefCell<Registry>,
    on_create: Listeners<TableListener>,
    on_drop: Listeners<TableListener>,
    on_rename: Listeners<RenameListener>,
}

/// The table registry.
///
/// Cloning a `Database` clones the handle.
///
/// # Example
///
/// ```rust
/// use rdb_core::schema::Schema;
/// use rdb_core::DataType;
/// use rdb_database::Database;
/// use rdb_storage::TableSlot;
///
/// let db = Database::new();
/// let early = db.table_reference("Users");
/// assert!(!early.get().is_ready());
///
/// let schema = Schema::builder()
///     .add_column("name", DataType::String)
///     .unwrap()
///     .build();
/// let users = db.create_table("Users", schema).unwrap();
///
/// assert_eq!(early.get(), TableSlot::Ready(users));
/// assert_eq!(db.table_names(), vec!["Users".to_string()]);
/// ```
#[derive(Clone)]
pub struct Database {
    inner: Rc<DatabaseInner>,
}

/// A non-owning registry handle.
#[derive(Clone)]
pub struct WeakDatabase {
    inner: Weak<DatabaseInner>,
}

impl WeakDatabase {
    pub fn upgrade(&self) -> Option<Database> {
        self.inner.upgrade().map(|inner| Database { inner })
    }
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(DatabaseInner {
                registry: RefCell::new(Registry::default()),
                on_create: Listeners::new(),
                on_drop: Listeners::new(),
                on_rename: Listeners::new(),
            }),
        }
    }

    /// Creates and registers a table.
    ///
    /// Pending references to `name`, including those made by the new table's
    /// own reference columns, are completed before create listeners run.
    #[instrument(skip(self, schema))]
    pub fn create_table(&self, name: &str, schema: Schema) -> Result<Table> {
        if self.has_table(name) {
            return Err(Error::table_exists(name));
        }
        let table = Table::new(schema, |target| self.table_reference(target));

        let waiting = {
            let mut registry = self.inner.registry.borrow_mut();
            registry.tables.insert(name.into(), table.clone());
            registry.names.insert(table.id(), name.into());
            registry.waiting.remove(name).unwrap_or_default()
        };
        debug!(table = table.id(), resolved = waiting.len(), "table created");

        for reference in waiting {
            reference.set(TableSlot::Ready(table.clone()))?;
        }
        self.inner.on_create.emit(|listener| listener(name, &table))?;
        Ok(table)
    }

    /// Deletes every row of the table, one notification each, then removes
    /// it from the registry.
    #[instrument(skip(self))]
    pub fn drop_table(&self, name: &str) -> Result<()> {
        let table = self
            .get(name)
            .ok_or_else(|| Error::table_drop_not_exists(name))?;
        table.close()?;
        {
            let mut registry = self.inner.registry.borrow_mut();
            registry.tables.shift_remove(name);
            registry.names.remove(&table.id());
        }
        debug!(table = table.id(), "table dropped");
        self.inner.on_drop.emit(|listener| listener(name, &table))
    }

    /// Renames a table, keeping its position in the registry order.
    ///
    /// Rename listeners are not invoked.
    #[instrument(skip(self))]
    pub fn rename_table(&self, old: &str, new: &str) -> Result<()> {
        let mut registry = self.inner.registry.borrow_mut();
        let index = registry
            .tables
            .get_index_of(old)
            .ok_or_else(|| Error::table_rename_not_exists(old, new))?;
        if registry.tables.contains_key(new) {
            return Err(Error::table_name_conflict(old, new));
        }
        if let Some(table) = registry.tables.shift_remove(old) {
            registry.names.insert(table.id(), new.into());
            registry.tables.shift_insert(index, new.into(), table);
        }
        debug!(old, new, "table renamed");
        Ok(())
    }

    pub fn select_table(&self, name: &str) -> Result<Table> {
        self.get(name).ok_or_else(|| Error::table_not_exists(name))
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.inner.registry.borrow().tables.contains_key(name)
    }

    /// Returns the registered name of `table`.
    pub fn table_name(&self, table: &Table) -> Option<String> {
        self.inner.registry.borrow().names.get(&table.id()).cloned()
    }

    /// Returns table names in registration order.
    pub fn table_names(&self) -> Vec<String> {
        self.inner.registry.borrow().tables.keys().cloned().collect()
    }

    pub fn table_count(&self) -> usize {
        self.inner.registry.borrow().tables.len()
    }

    /// Returns a slot holding the table named `name`, or a pending slot
    /// completed once such a table is created.
    pub fn table_reference(&self, name: &str) -> TableReference {
        if let Some(table) = self.get(name) {
            return Observable::new(TableSlot::Ready(table));
        }
        let reference = Observable::new(TableSlot::Pending(name.into()));
        self.inner
            .registry
            .borrow_mut()
            .waiting
            .entry(name.into())
            .or_default()
            .push(reference.clone());
        reference
    }

    /// Returns the number of references waiting on `name`.
    pub fn pending_references(&self, name: &str) -> usize {
        self.inner
            .registry
            .borrow()
            .waiting
            .get(name)
            .map_or(0, Vec::len)
    }

    pub fn on_table_create(&self, listener: impl Fn(&str, &Table) -> Result<()> + 'static) {
        self.inner.on_create.subscribe(alloc::boxed::Box::new(listener));
    }

    pub fn on_table_drop(&self, listener: impl Fn(&str, &Table) -> Result<()> + 'static) {
        self.inner.on_drop.subscribe(alloc::boxed::Box::new(listener));
    }

    pub fn on_table_rename(&self, listener: impl Fn(&str, &str, &Table) -> Result<()> + 'static) {
        self.inner.on_rename.subscribe(alloc::boxed::Box::new(listener));
    }

    /// Calls `f` for each table of a snapshot, in registration order.
    pub fn each_table(&self, mut f: impl FnMut(&str, &Table)) {
        let tables: Vec<(String, Table)> = self
            .inner
            .registry
            .borrow()
            .tables
            .iter()
            .map(|(name, table)| (name.clone(), table.clone()))
            .collect();
        for (name, table) in &tables {
            f(name, table);
        }
    }

    /// Starts a view over the table named `table`.
    pub fn view(&self, table: &str) -> Result<ViewBuilder> {
        let table = self.select_table(table)?;
        Ok(ViewBuilder::new(self, &table))
    }

    pub fn downgrade(&self) -> WeakDatabase {
        WeakDatabase {
            inner: Rc::downgrade(&self.inner),
        }
    }

    fn get(&self, name: &str) -> Option<Table> {
        self.inner.registry.borrow().tables.get(name).cloned()
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("tables", &self.table_names())
            .finish()
    }
}
