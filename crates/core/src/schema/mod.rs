//! Structure declarations for RDB tables.
//!
//! A `Schema` is the ordered list of columns a table's rows carry. Columns are
//! either plain (a stored `Value` of a declared `DataType`) or references to
//! rows of another table, named by table so the target may be declared later.

mod column;
mod table;

pub use column::{Column, ColumnKind};
pub use table::{Schema, SchemaBuilder};
