//! Scalar field types.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

use crate::proto::Value;

/// Scalar data types a grid column can display.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// Boolean value.
    Bool,
    /// 32-bit signed integer.
    Int32,
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point.
    Float64,
    /// UTF-8 string.
    String,
    /// Timestamp (microseconds since Unix epoch).
    Timestamp,
    /// UUID (128-bit identifier).
    Uuid,
}

impl ScalarType {

    /// Check whether a runtime value fits this type. Null always fits.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (_, Value::Null) => true,
            (ScalarType::Bool, Value::Bool(_)) => true,
            (ScalarType::Int32, Value::Int32(_)) => true,
            (ScalarType::Int64, Value::Int32(_) | Value::Int64(_)) => true,
            (ScalarType::Float64, Value::Int32(_) | Value::Int64(_) | Value::Float64(_)) => true,
            (ScalarType::String, Value::String(_)) => true,
            (ScalarType::Timestamp, Value::Timestamp(_) | Value::Int64(_)) => true,
            (ScalarType::Uuid, Value::Uuid(_)) => true,
            _ => false,
        }
    }
}
