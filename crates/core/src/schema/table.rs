//! Table structure and its builder.

use super::column::{Column, ColumnKind};
use crate::error::{Error, Result};
use crate::types::DataType;
use crate::value::Value;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// Name reserved for the row identifier.
const ID_COLUMN: &str = "id";

/// The ordered column declarations of a table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Schema {
    columns: Vec<Column>,
}

impl Schema {
    /// Starts a schema declaration.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::new()
    }

    #[inline]
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Gets a column by name.
    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    /// Gets a column position by name.
    pub fn get_column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name() == name)
    }

    /// Returns the `ref`/`refs` columns.
    pub fn reference_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|c| c.is_reference())
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Builder for schema declarations.
#[derive(Default)]
pub struct SchemaBuilder {
    columns: Vec<Column>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates that a name follows naming rules.
    ///
    /// Names never contain `#` or `*`, which carry meaning in view queries.
    fn check_naming_rules(name: &str) -> Result<()> {
        let first = match name.chars().next() {
            Some(c) => c,
            None => return Err(Error::invalid_schema("Name cannot be empty")),
        };
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(Error::invalid_schema(format!(
                "Name must start with letter or underscore: {}",
                name
            )));
        }
        if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(Error::invalid_schema(format!(
                "Name contains invalid characters: {}",
                name
            )));
        }
        Ok(())
    }

    /// Adds a fully configured column.
    pub fn add(mut self, column: Column) -> Result<Self> {
        let name = column.name();
        Self::check_naming_rules(name)?;
        if name == ID_COLUMN {
            return Err(Error::invalid_schema("Column name 'id' is reserved"));
        }
        if let Some(target) = column.target_table() {
            Self::check_naming_rules(target)?;
        }
        if self.columns.iter().any(|c| c.name() == name) {
            return Err(Error::invalid_schema(format!("Column already exists: {}", name)));
        }
        if let (Some(dt), Some(default)) = (column.data_type(), column.default_value_ref()) {
            if !dt.accepts(default) {
                return Err(Error::invalid_schema(format!(
                    "Default value of column {} does not match {:?}",
                    name, dt
                )));
            }
        }
        let index = self.columns.len();
        self.columns.push(column.with_index(index));
        Ok(self)
    }

    /// Adds a plain column.
    pub fn add_column(self, name: impl Into<String>, data_type: DataType) -> Result<Self> {
        self.add(Column::new(name, data_type))
    }

    /// Adds a single-reference column targeting `table`.
    pub fn add_ref(self, name: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        self.add(Column::with_kind(name, ColumnKind::Ref(table.into())))
    }

    /// Adds a multi-reference column targeting `table`.
    pub fn add_refs(self, name: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        self.add(Column::with_kind(name, ColumnKind::Refs(table.into())))
    }

    /// Marks existing plain columns nullable.
    pub fn add_nullable(mut self, columns: &[&str]) -> Self {
        for name in columns {
            if let Some(col) = self.columns.iter_mut().find(|c| c.name() == *name) {
                *col = col.clone().nullable(true);
            }
        }
        self
    }

    /// Sets the default of an existing plain column.
    pub fn with_default(mut self, column: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let col = self
            .columns
            .iter_mut()
            .find(|c| c.name() == column)
            .ok_or_else(|| Error::invalid_schema(format!("Column not found: {}", column)))?;
        match col.data_type() {
            Some(dt) if dt.accepts(&value) => {
                *col = col.clone().default_value(value);
                Ok(self)
            }
            _ => Err(Error::invalid_schema(format!(
                "Default value does not fit column {}",
                column
            ))),
        }
    }

    pub fn build(self) -> Schema {
        Schema {
            columns: self.columns,
        }
    }
}
