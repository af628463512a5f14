//! Process-unique identities for rows and tables.
//!
//! User-facing row ids are strings chosen by the caller and only unique within
//! one table. Identity side tables (view membership, join scopes) need a key
//! that is unique across every table and never reused, so each row and table
//! also receives a handle from a global counter.

use core::sync::atomic::{AtomicU64, Ordering};

/// Process-unique identifier of a stored row.
pub type RowHandle = u64;

/// Process-unique identifier of a table.
pub type TableId = u64;

static NEXT_ROW_HANDLE: AtomicU64 = AtomicU64::new(1);
static NEXT_TABLE_ID: AtomicU64 = AtomicU64::new(1);

/// Allocates the next row handle.
pub fn next_row_handle() -> RowHandle {
    NEXT_ROW_HANDLE.fetch_add(1, Ordering::Relaxed)
}

/// Allocates the next table id.
pub fn next_table_id() -> TableId {
    NEXT_TABLE_ID.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = next_row_handle();
        let b = next_row_handle();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn test_table_ids_are_unique() {
        assert_ne!(next_table_id(), next_table_id());
    }
}
