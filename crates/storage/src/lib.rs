//! RDB Storage - Rows and tables for the RDB reactive store.
//!
//! This module provides:
//! - `Row`: a record with one reactive cell per column
//! - `Table`: an id-keyed row store with insert and delete notification
//! - `TableReference`: the slot a reference column validates its targets against
//! - `ConstraintChecker`: type, nullability and reference checks for writes

#![no_std]

extern crate alloc;

pub mod constraint;
pub mod reference;
pub mod row;
pub mod table;

pub use constraint::ConstraintChecker;
pub use reference::{TableReference, TableSlot};
pub use row::{ColumnInput, FieldValue, Row, UpdateListener, WeakRow};
pub use table::{RowListener, RowPattern, Table};
