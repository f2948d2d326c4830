//! Entity rows held in memory.

use std::collections::HashMap;

use gridquery_proto::Value;

use crate::catalog::{EntityDef, ScalarType, SchemaBundle};
use crate::error::Error;

/// One stored entity: field name and value pairs.
pub type EntityRow = Vec<(String, Value)>;

/// Rows of every entity type, keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataset {
    tables: HashMap<String, Vec<EntityRow>>,
}

impl MemoryDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row to an entity's table.
    pub fn insert(&mut self, entity: impl Into<String>, row: EntityRow) {
        self.tables.entry(entity.into()).or_default().push(row);
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_row<K, V>(mut self, entity: &str, fields: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<Value>,
    {
        let row = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.insert(entity, row);
        self
    }

    /// Rows of an entity, empty if none were stored.
    pub fn rows(&self, entity: &str) -> &[EntityRow] {
        self.tables.get(entity).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of rows stored for an entity.
    pub fn len(&self, entity: &str) -> usize {
        self.rows(entity).len()
    }

    /// Load a JSON dataset of the shape `{"Entity": [{"field": value, ...}]}`.
    ///
    /// Values are coerced to the schema's field types. Missing fields are
    /// stored as null when the field is nullable.
    pub fn from_json(schema: &SchemaBundle, json: &str) -> Result<Self, Error> {
        let document: HashMap<String, Vec<serde_json::Map<String, serde_json::Value>>> =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;

        let mut dataset = Self::new();
        for (entity_name, objects) in document {
            let entity = schema
                .get_entity(&entity_name)
                .ok_or_else(|| Error::UnknownEntity(entity_name.clone()))?;
            for object in objects {
                let row = coerce_row(entity, &object)?;
                dataset.insert(entity_name.clone(), row);
            }
        }
        Ok(dataset)
    }
}

fn coerce_row(
    entity: &EntityDef,
    object: &serde_json::Map<String, serde_json::Value>,
) -> Result<EntityRow, Error> {
    if let Some(unknown) = object.keys().find(|k| entity.get_field(k).is_none()) {
        return Err(Error::InvalidData(format!(
            "entity '{}' has no field '{}'",
            entity.name, unknown
        )));
    }

    let mut row = Vec::with_capacity(entity.fields.len());
    for field in &entity.fields {
        let value = match object.get(&field.name) {
            Some(json) => coerce(field.field_type, json).map_err(|e| {
                Error::InvalidData(format!("{}.{}: {}", entity.name, field.name, e))
            })?,
            None => Value::Null,
        };
        if value.is_null() && !field.nullable {
            return Err(Error::InvalidData(format!(
                "{}.{} is not nullable",
                entity.name, field.name
            )));
        }
        row.push((field.name.clone(), value));
    }
    Ok(row)
}

fn coerce(field_type: ScalarType, json: &serde_json::Value) -> Result<Value, String> {
    let value = Value::from_json(json).map_err(|e| e.to_string())?;
    let coerced = match (field_type, value) {
        (_, Value::Null) => Value::Null,
        (ScalarType::Int32, Value::Int64(i)) => {
            Value::Int32(i32::try_from(i).map_err(|_| format!("{} out of range for int32", i))?)
        }
        (ScalarType::Float64, Value::Int64(i)) => Value::Float64(i as f64),
        (ScalarType::Timestamp, Value::Int64(t)) => Value::Timestamp(t),
        (ScalarType::Uuid, Value::String(s)) => Value::Uuid(parse_uuid(&s)?),
        (field_type, value) if field_type.accepts(&value) => value,
        (field_type, value) => {
            return Err(format!("{:?} is not a valid {:?}", value, field_type));
        }
    };
    Ok(coerced)
}

/// Parse a UUID written as hex, with or without dashes.
fn parse_uuid(text: &str) -> Result<[u8; 16], String> {
    let digits: String = text.chars().filter(|c| *c != '-').collect();
    let bytes = hex::decode(&digits).map_err(|e| format!("invalid uuid '{}': {}", text, e))?;
    <[u8; 16]>::try_from(bytes.as_slice()).map_err(|_| format!("invalid uuid length '{}'", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldDef;

    fn schema() -> SchemaBundle {
        SchemaBundle::new(1).with_entity(
            EntityDef::new("Customer", "id")
                .with_field(FieldDef::new("id", ScalarType::Uuid))
                .with_field(FieldDef::new("age", ScalarType::Int32))
                .with_field(FieldDef::new("score", ScalarType::Float64))
                .with_field(FieldDef::optional("email", ScalarType::String)),
        )
    }

    #[test]
    fn test_from_json_coerces_types() {
        let json = r#"{"Customer": [
            {"id": "00112233-4455-6677-8899-aabbccddeeff", "age": 31, "score": 7}
        ]}"#;
        let dataset = MemoryDataset::from_json(&schema(), json).unwrap();

        let row = &dataset.rows("Customer")[0];
        assert_eq!(
            row[0].1,
            Value::Uuid([
                0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xaa, 0xbb, 0xcc,
                0xdd, 0xee, 0xff
            ])
        );
        assert_eq!(row[1].1, Value::Int32(31));
        assert_eq!(row[2].1, Value::Float64(7.0));
        assert_eq!(row[3].1, Value::Null);
        assert!(dataset.rows("Order").is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_rows() {
        let schema = schema();
        let uuid = "00112233445566778899aabbccddeeff";

        let missing = format!(r#"{{"Customer": [{{"id": "{}", "score": 1}}]}}"#, uuid);
        assert!(MemoryDataset::from_json(&schema, &missing).is_err());

        let unknown = format!(
            r#"{{"Customer": [{{"id": "{}", "age": 1, "score": 1, "phone": "x"}}]}}"#,
            uuid
        );
        assert!(MemoryDataset::from_json(&schema, &unknown).is_err());

        let overflow = format!(
            r#"{{"Customer": [{{"id": "{}", "age": 99999999999, "score": 1}}]}}"#,
            uuid
        );
        assert!(MemoryDataset::from_json(&schema, &overflow).is_err());

        assert!(matches!(
            MemoryDataset::from_json(&schema, r#"{"Vendor": []}"#),
            Err(Error::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_builder_rows() {
        let dataset = MemoryDataset::new()
            .with_row("Customer", [("id", Value::Int64(1)), ("email", Value::Null)])
            .with_row("Customer", [("id", Value::Int64(2)), ("email", "b@example.com".into())]);
        assert_eq!(dataset.len("Customer"), 2);
    }
}
