//! Error types for the RDB reactive store.

use crate::types::DataType;
use crate::value::Value;
use alloc::string::String;

/// Result type alias for RDB operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types for registry, storage and view operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// A table with this name is already registered.
    #[error("Table already exists: {name}")]
    TableExists { name: String },
    /// Lookup of an unregistered table name.
    #[error("Table does not exist: {name}")]
    TableNotExists { name: String },
    /// Drop of an unregistered table name.
    #[error("Cannot drop table that does not exist: {name}")]
    TableDropNotExists { name: String },
    /// Rename with an unknown source name.
    #[error("Cannot rename table that does not exist: {old} -> {new}")]
    TableRenameNotExists { old: String, new: String },
    /// Rename target name is already registered.
    #[error("Cannot rename table {old}: name {new} is already taken")]
    TableNameConflict { old: String, new: String },
    /// A projection names a column the row does not have.
    #[error("Not a valid column: {column}")]
    NotAValidColumn { column: String },
    /// A reverse join names a column that is neither a ref nor a refs column.
    #[error("Column is not a reference: {column}")]
    ColumnIsNotAReference { column: String },
    /// A reference column holds a value of neither reference shape.
    #[error("Unresolved reference type for column: {column}")]
    UnresolvedReferenceType { column: String },
    /// Plain value of the wrong type.
    #[error("Type mismatch on column {column}: expected {expected:?}, got {got:?}")]
    TypeMismatch {
        column: String,
        expected: DataType,
        got: DataType,
    },
    /// Null written to a non-nullable column.
    #[error("Null constraint violation on column: {column}")]
    NullConstraint { column: String },
    /// Unique constraint violation.
    #[error("Unique constraint violation on column {column}: {value:?}")]
    UniqueConstraint { column: String, value: Value },
    /// Row not found.
    #[error("Not found in table: {key:?}")]
    NotFound { key: Value },
    /// Column not found in the table schema.
    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },
    /// Invalid schema definition.
    #[error("Invalid schema: {message}")]
    InvalidSchema { message: String },
    /// A reference value points at a row of a different table.
    #[error("Reference on column {column} points at a row of another table")]
    ReferenceMismatch { column: String },
    /// A reference was written while its target table does not exist yet.
    #[error("Reference on column {column} targets table {table} which does not exist yet")]
    UnresolvedReference { column: String, table: String },
    /// Invalid operation.
    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },
}

impl Error {
    /// Creates a table exists error.
    pub fn table_exists(name: impl Into<String>) -> Self {
        Error::TableExists { name: name.into() }
    }

    /// Creates a table not exists error.
    pub fn table_not_exists(name: impl Into<String>) -> Self {
        Error::TableNotExists { name: name.into() }
    }

    /// Creates a drop-of-unknown-table error.
    pub fn table_drop_not_exists(name: impl Into<String>) -> Self {
        Error::TableDropNotExists { name: name.into() }
    }

    /// Creates a rename-of-unknown-table error.
    pub fn table_rename_not_exists(old: impl Into<String>, new: impl Into<String>) -> Self {
        Error::TableRenameNotExists {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Creates a rename name conflict error.
    pub fn table_name_conflict(old: impl Into<String>, new: impl Into<String>) -> Self {
        Error::TableNameConflict {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Creates a not-a-valid-column error.
    pub fn not_a_valid_column(column: impl Into<String>) -> Self {
        Error::NotAValidColumn {
            column: column.into(),
        }
    }

    /// Creates a column-is-not-a-reference error.
    pub fn column_is_not_a_reference(column: impl Into<String>) -> Self {
        Error::ColumnIsNotAReference {
            column: column.into(),
        }
    }

    /// Creates an unresolved reference type error.
    pub fn unresolved_reference_type(column: impl Into<String>) -> Self {
        Error::UnresolvedReferenceType {
            column: column.into(),
        }
    }

    /// Creates a type mismatch error.
    pub fn type_mismatch(column: impl Into<String>, expected: DataType, got: DataType) -> Self {
        Error::TypeMismatch {
            column: column.into(),
            expected,
            got,
        }
    }

    /// Creates a null constraint error.
    pub fn null_constraint(column: impl Into<String>) -> Self {
        Error::NullConstraint {
            column: column.into(),
        }
    }

    /// Creates a unique constraint error.
    pub fn unique_constraint(column: impl Into<String>, value: Value) -> Self {
        Error::UniqueConstraint {
            column: column.into(),
            value,
        }
    }

    /// Creates a not found error.
    pub fn not_found(key: Value) -> Self {
        Error::NotFound { key }
    }

    /// Creates a column not found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            column: column.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a reference mismatch error.
    pub fn reference_mismatch(column: impl Into<String>) -> Self {
        Error::ReferenceMismatch {
            column: column.into(),
        }
    }

    /// Creates an unresolved reference error.
    pub fn unresolved_reference(column: impl Into<String>, table: impl Into<String>) -> Self {
        Error::UnresolvedReference {
            column: column.into(),
            table: table.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Error::InvalidOperation {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn test_error_display() {
        let err = Error::type_mismatch("age", DataType::Int32, DataType::String);
        assert!(err.to_string().contains("Type mismatch"));
        assert!(err.to_string().contains("age"));

        let err = Error::table_exists("users");
        assert!(err.to_string().contains("users"));

        let err = Error::table_name_conflict("users", "people");
        let msg = err.to_string();
        assert!(msg.contains("users") && msg.contains("people"));
    }

    #[test]
    fn test_error_constructors() {
        let err = Error::unique_constraint("id", Value::String("u1".into()));
        match err {
            Error::UniqueConstraint { column, .. } => assert_eq!(column, "id"),
            _ => panic!("Wrong error type"),
        }

        let err = Error::unresolved_reference("author", "Users");
        assert_eq!(
            err,
            Error::UnresolvedReference {
                column: "author".into(),
                table: "Users".into()
            }
        );
    }
}
