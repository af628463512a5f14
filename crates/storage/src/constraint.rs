//! Constraint checking for column writes.
//!
//! Plain columns check type and nullability. Reference columns check that the
//! target row belongs to the table the column's reference currently resolves
//! to, and refuse writes while that table does not exist yet.

use crate::reference::TableSlot;
use crate::row::Row;
use crate::table::Layout;
use rdb_core::schema::Column;
use rdb_core::{Error, Result, Value};

/// Constraint checker for row writes.
pub struct ConstraintChecker;

impl ConstraintChecker {
    /// Checks a value against a plain column's type and nullability.
    pub fn check_value(column: &Column, value: &Value) -> Result<()> {
        if value.is_null() {
            if column.is_nullable() {
                return Ok(());
            }
            return Err(Error::null_constraint(column.name()));
        }
        match (column.data_type(), value.data_type()) {
            (Some(expected), Some(got)) if !expected.accepts(value) => {
                Err(Error::type_mismatch(column.name(), expected, got))
            }
            (Some(_), _) => Ok(()),
            (None, _) => Err(Error::invalid_operation(alloc::format!(
                "Column {} is a reference column",
                column.name()
            ))),
        }
    }

    /// Checks that `target` may be stored in the reference column `column`.
    pub(crate) fn check_reference(layout: &Layout, column: &Column, target: &Row) -> Result<()> {
        let reference = layout
            .reference(column.index())
            .ok_or_else(|| Error::unresolved_reference_type(column.name()))?;
        reference.with(|slot| match slot {
            TableSlot::Ready(table) if table.id() == target.table_id() => Ok(()),
            TableSlot::Ready(_) => Err(Error::reference_mismatch(column.name())),
            TableSlot::Pending(name) => Err(Error::unresolved_reference(column.name(), name.as_str())),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdb_core::DataType;

    #[test]
    fn test_check_value() {
        let age = Column::new("age", DataType::Int32);
        assert!(ConstraintChecker::check_value(&age, &Value::Int32(3)).is_ok());
        assert!(matches!(
            ConstraintChecker::check_value(&age, &Value::from("x")),
            Err(Error::TypeMismatch { .. })
        ));
        assert!(matches!(
            ConstraintChecker::check_value(&age, &Value::Null),
            Err(Error::NullConstraint { .. })
        ));

        let nick = Column::new("nick", DataType::String).nullable(true);
        assert!(ConstraintChecker::check_value(&nick, &Value::Null).is_ok());
    }
}
