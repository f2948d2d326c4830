//! Field definitions for entities.

use super::types::ScalarType;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// A scalar field of an entity.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    #[serde(rename = "type")]
    pub field_type: ScalarType,
    /// Whether the field may hold null.
    #[serde(default)]
    pub nullable: bool,
}

impl FieldDef {
    /// Create a new non-nullable field.
    pub fn new(name: impl Into<String>, field_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: false,
        }
    }

    /// Create a nullable field.
    pub fn optional(name: impl Into<String>, field_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            field_type,
            nullable: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_def_builders() {
        let id = FieldDef::new("id", ScalarType::Int64);
        assert_eq!(id.name, "id");
        assert!(!id.nullable);

        let note = FieldDef::optional("note", ScalarType::String);
        assert!(note.nullable);
    }

    #[test]
    fn test_field_def_from_json() {
        let field: FieldDef = serde_json::from_str(r#"{"name": "email", "type": "string"}"#).unwrap();
        assert_eq!(field.field_type, ScalarType::String);
        assert!(!field.nullable);
    }
}
