//! RDB Core - Core types and schema declarations for the RDB reactive store.
//!
//! This crate provides the foundational types shared by every RDB crate:
//!
//! - `DataType`: Plain column types (Boolean, Int32, Int64, Float64, String, DateTime, Bytes)
//! - `Value`: Runtime values stored in plain columns
//! - `schema`: Structure declarations (`Column`, `ColumnKind`, `Schema`, `SchemaBuilder`)
//! - `Error`: Error types for registry, storage and view operations
//! - `RowHandle` / `TableId`: Process-unique identities used as side-table keys
//!
//! # Example
//!
//! ```rust
//! use rdb_core::{DataType, Value};
//! use rdb_core::schema::Schema;
//!
//! let schema = Schema::builder()
//!     .add_column("title", DataType::String)
//!     .unwrap()
//!     .add_ref("author", "Users")
//!     .unwrap()
//!     .add_refs("tags", "Tags")
//!     .unwrap()
//!     .build();
//!
//! assert_eq!(schema.len(), 3);
//! assert!(schema.get_column("author").unwrap().is_reference());
//! assert_eq!(Value::from("hello").as_str(), Some("hello"));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod handle;
pub mod schema;
mod types;
mod value;

pub use error::{Error, Result};
pub use handle::{next_row_handle, next_table_id, RowHandle, TableId};
pub use types::DataType;
pub use value::Value;
