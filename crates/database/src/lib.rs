//! RDB Database - Table registry and live views for the RDB reactive store.
//!
//! This crate ties the lower layers together:
//!
//! - `Database`: named tables, forward table references, lifecycle listeners
//! - `View`: a live projection of a table, kept current as rows change
//! - `Query`: projection terms, including forward and reverse joins
//!
//! # Example
//!
//! ```rust
//! use rdb_core::schema::Schema;
//! use rdb_core::{DataType, Value};
//! use rdb_database::{Database, Query};
//! use rdb_storage::ColumnInput;
//!
//! let db = Database::new();
//! // Posts may be declared before Users exists.
//! let posts = db
//!     .create_table(
//!         "Posts",
//!         Schema::builder()
//!             .add_column("title", DataType::String)
//!             .unwrap()
//!             .add_ref("author", "Users")
//!             .unwrap()
//!             .build(),
//!     )
//!     .unwrap();
//! let users = db
//!     .create_table(
//!         "Users",
//!         Schema::builder()
//!             .add_column("name", DataType::String)
//!             .unwrap()
//!             .build(),
//!     )
//!     .unwrap();
//!
//! let view = db
//!     .view("Users")
//!     .unwrap()
//!     .select("name")
//!     .select(Query::reverse("author", "Posts", ["title"]))
//!     .build()
//!     .unwrap();
//!
//! let ann = users.insert("u1", [("name", "Ann")]).unwrap();
//! posts
//!     .insert("p1", [("title", ColumnInput::from("Hello")), ("author", ColumnInput::from(&ann))])
//!     .unwrap();
//!
//! let written = view.get(0).unwrap().list("author#Posts").unwrap();
//! assert_eq!(written.get(0).unwrap().value("title"), Some(Value::from("Hello")));
//! ```

extern crate alloc;

pub mod database;
pub mod view;

pub use database::{Database, RenameListener, TableListener, WeakDatabase};
pub use view::{Query, RowFilter, SortOrder, View, ViewBuilder, ViewField, ViewRow};
