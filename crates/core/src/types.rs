//! Plain column data types.

use crate::value::Value;

/// Data types a plain column may declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DataType {
    /// Boolean type (true/false)
    Boolean,
    /// 32-bit signed integer
    Int32,
    /// 64-bit signed integer
    Int64,
    /// 64-bit floating point number
    Float64,
    /// UTF-8 string
    String,
    /// Date and time stored as Unix timestamp (milliseconds)
    DateTime,
    /// Binary data
    Bytes,
}

impl DataType {
    /// Returns whether this type is nullable by default.
    pub fn is_nullable_by_default(&self) -> bool {
        matches!(self, DataType::Bytes)
    }

    /// Returns whether a non-null value can be stored in a column of this type.
    ///
    /// Integers widen into `Int64` and `Float64`; nothing else converts.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (DataType::Int64, Value::Int32(_)) => true,
            (DataType::Float64, Value::Int32(_) | Value::Int64(_)) => true,
            (dt, v) => v.data_type() == Some(*dt),
        }
    }
}
