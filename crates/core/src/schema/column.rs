//! Column declarations.

use crate::types::DataType;
use crate::value::Value;
use alloc::string::String;

/// What a column stores.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    /// A stored value of the given type.
    Plain(DataType),
    /// A single optional reference to a row of the named table.
    Ref(String),
    /// An ordered list of references to rows of the named table.
    Refs(String),
}

/// A column declaration in a table schema.
#[derive(Clone, Debug)]
pub struct Column {
    /// Column name.
    name: String,
    /// What the column stores.
    kind: ColumnKind,
    /// Whether this column allows null values.
    nullable: bool,
    /// Default value for plain columns.
    default_value: Option<Value>,
    /// Column position in the schema (0-based).
    index: usize,
}

impl Column {
    /// Creates a plain column.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self::with_kind(name, ColumnKind::Plain(data_type))
    }

    /// Creates a column of any kind. Reference columns are always nullable.
    pub fn with_kind(name: impl Into<String>, kind: ColumnKind) -> Self {
        let nullable = match &kind {
            ColumnKind::Plain(dt) => dt.is_nullable_by_default(),
            ColumnKind::Ref(_) | ColumnKind::Refs(_) => true,
        };
        Self {
            name: name.into(),
            kind,
            nullable,
            default_value: None,
            index: 0,
        }
    }

    /// Sets whether this column is nullable.
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Sets the default value for this column.
    pub fn default_value(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub(crate) fn with_index(mut self, index: usize) -> Self {
        self.index = index;
        self
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Returns the data type of a plain column.
    pub fn data_type(&self) -> Option<DataType> {
        match self.kind {
            ColumnKind::Plain(dt) => Some(dt),
            _ => None,
        }
    }

    /// Returns the target table name of a `ref`/`refs` column.
    pub fn target_table(&self) -> Option<&str> {
        match &self.kind {
            ColumnKind::Ref(t) | ColumnKind::Refs(t) => Some(t),
            ColumnKind::Plain(_) => None,
        }
    }

    /// Returns true for `ref` and `refs` columns.
    #[inline]
    pub fn is_reference(&self) -> bool {
        !self.is_plain()
    }

    #[inline]
    pub fn is_plain(&self) -> bool {
        matches!(self.kind, ColumnKind::Plain(_))
    }

    #[inline]
    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Returns the value a plain column takes when an insert omits it.
    pub fn get_default_value(&self) -> Value {
        match (&self.default_value, self.kind.clone()) {
            (Some(v), _) => v.clone(),
            (None, ColumnKind::Plain(dt)) if !self.nullable => Value::default_for_type(dt),
            _ => Value::Null,
        }
    }

    pub(crate) fn default_value_ref(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    /// Returns the column position.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }
}

impl PartialEq for Column {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.kind == other.kind
    }
}
