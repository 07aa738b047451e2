use bytes::Bytes;
use ordered_float::OrderedFloat;

use crate::schema::PhysicalType;

/// A single column value in its physical representation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Value {
    Boolean(bool),
    Int32(i32),
    Int64(i64),
    /// Legacy 96-bit timestamp as three little-endian words
    Int96([u32; 3]),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    ByteArray(Bytes),
    FixedLenByteArray(Bytes),

    // Empty slot; also what decoders leave behind for null levels
    #[default]
    Null,
}

impl Value {
    /// Check if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of the value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Boolean(_) => "Boolean",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::Int96(_) => "Int96",
            Value::Float(_) => "Float",
            Value::Double(_) => "Double",
            Value::ByteArray(_) => "ByteArray",
            Value::FixedLenByteArray(_) => "FixedLenByteArray",
            Value::Null => "Null",
        }
    }

    /// Whether this value can be stored in a column of `physical_type`.
    pub fn matches(&self, physical_type: PhysicalType) -> bool {
        match (self, physical_type) {
            (Value::Boolean(_), PhysicalType::Boolean)
            | (Value::Int32(_), PhysicalType::Int32)
            | (Value::Int64(_), PhysicalType::Int64)
            | (Value::Int96(_), PhysicalType::Int96)
            | (Value::Float(_), PhysicalType::Float)
            | (Value::Double(_), PhysicalType::Double)
            | (Value::ByteArray(_), PhysicalType::ByteArray) => true,
            (Value::FixedLenByteArray(b), PhysicalType::FixedLenByteArray(len)) => b.len() == len,
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(OrderedFloat(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(OrderedFloat(v))
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::ByteArray(Bytes::copy_from_slice(v.as_bytes()))
    }
}

/// Re-expands the dense non-null values returned by a page reader into one
/// slot per level, filling null slots with [`Value::Null`].
///
/// Levels below `max_definition_level` are nulls at some ancestor; they
/// consume no value.
pub fn spread_nulls(values: &[Value], def_levels: &[i16], max_definition_level: i16) -> Vec<Value> {
    let mut dense = values.iter();
    def_levels
        .iter()
        .map(|&level| {
            if level == max_definition_level {
                dense.next().cloned().unwrap_or(Value::Null)
            } else {
                Value::Null
            }
        })
        .collect()
}
