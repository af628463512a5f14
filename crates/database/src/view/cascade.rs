//! Cascading removal of projected rows.

use super::scope::Scope;
use super::view_row::ViewRow;
use rdb_core::{Result, RowHandle};
use rdb_reactive::ObservableList;
use tracing::trace;

/// Removes the projection of `source` from `list` and `scope`, then disposes
/// it together with everything nested under it.
///
/// Returns false if `scope` held no projection of `source`.
pub(crate) fn remove_deeper(list: &ObservableList<ViewRow>, source: RowHandle, scope: &Scope) -> Result<bool> {
    let Some(row) = scope.take(source) else {
        return Ok(false);
    };
    trace!(row = %row.id(), source, "cascading removal");
    let removed = list.remove_where(|entry| entry.ptr_eq(&row));
    let disposed = row.dispose();
    removed?;
    disposed?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::view_row::Parts;

    #[test]
    fn test_remove_deeper() {
        let scope = Scope::new();
        let row = ViewRow::new("a".into(), 7, Parts::default());
        scope.insert(7, row.clone());
        let list = ObservableList::from_vec(vec![row.clone(), row.clone()]);

        assert!(remove_deeper(&list, 7, &scope).unwrap());
        assert!(list.is_empty());
        assert!(row.is_disposed());
        assert!(!scope.contains(7));
        assert!(!remove_deeper(&list, 7, &scope).unwrap());
    }
}
