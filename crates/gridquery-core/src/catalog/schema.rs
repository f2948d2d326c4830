//! Schema bundle - versioned snapshot of the entire schema.

use super::{EntityDef, RelationDef};
use crate::error::Error;
use rkyv::{Archive, Deserialize, Serialize};
use serde::Deserialize as SerdeDeserialize;
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

/// A versioned snapshot of the entire schema.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version (monotonically increasing).
    pub version: u64,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Relation definitions, unique by (source entity, name).
    pub relations: Vec<RelationDef>,
}

/// On-disk JSON layout of a schema file.
#[derive(Debug, SerdeDeserialize)]
struct SchemaDocument {
    #[serde(default)]
    entities: Vec<EntityDef>,
    #[serde(default)]
    relations: Vec<RelationDef>,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            created_at: current_timestamp(),
            entities: HashMap::new(),
            relations: Vec::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema, replacing one with the same source and name.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations
            .retain(|r| !(r.from_entity == relation.from_entity && r.name == relation.name));
        self.relations.push(relation);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get the relation `name` declared on `entity`.
    pub fn relation(&self, entity: &str, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.from_entity == entity && r.name == name)
    }

    /// Get all relations for an entity (as source).
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.from_entity == entity)
            .collect()
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Check that identifiers, relation endpoints and key fields exist.
    pub fn validate(&self) -> Result<(), Error> {
        for entity in self.entities.values() {
            if entity.identity_fields.is_empty() {
                return Err(Error::InvalidData(format!(
                    "entity '{}' declares no identifier field",
                    entity.name
                )));
            }
            for id in &entity.identity_fields {
                if entity.get_field(id).is_none() {
                    return Err(Error::InvalidData(format!(
                        "identifier '{}' is not a field of entity '{}'",
                        id, entity.name
                    )));
                }
            }
        }

        for relation in &self.relations {
            let from = self.get_entity(&relation.from_entity).ok_or_else(|| {
                Error::InvalidData(format!(
                    "relation '{}' starts at unknown entity '{}'",
                    relation.name, relation.from_entity
                ))
            })?;
            let to = self.get_entity(&relation.to_entity).ok_or_else(|| {
                Error::InvalidData(format!(
                    "relation '{}.{}' targets unknown entity '{}'",
                    relation.from_entity, relation.name, relation.to_entity
                ))
            })?;
            if from.get_field(&relation.name).is_some() {
                return Err(Error::InvalidData(format!(
                    "relation '{}.{}' shadows a field of the same name",
                    relation.from_entity, relation.name
                )));
            }
            if from.get_field(&relation.from_field).is_none() {
                return Err(Error::InvalidData(format!(
                    "relation '{}.{}' uses missing key field '{}'",
                    relation.from_entity, relation.name, relation.from_field
                )));
            }
            if to.get_field(&relation.to_field).is_none() {
                return Err(Error::InvalidData(format!(
                    "relation '{}.{}' uses missing key field '{}.{}'",
                    relation.from_entity, relation.name, relation.to_entity, relation.to_field
                )));
            }
        }

        Ok(())
    }

    /// Parse and validate a JSON schema document.
    ///
    /// The document has the shape `{"entities": [...], "relations": [...]}`.
    pub fn from_json(version: u64, json: &str) -> Result<Self, Error> {
        let document: SchemaDocument =
            serde_json::from_str(json).map_err(|e| Error::Deserialization(e.to_string()))?;
        let bundle = document
            .relations
            .into_iter()
            .fold(
                document
                    .entities
                    .into_iter()
                    .fold(Self::new(version), Self::with_entity),
                Self::with_relation,
            );
        bundle.validate()?;
        Ok(bundle)
    }

    /// Serialize the schema bundle to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        rkyv::to_bytes::<rkyv::rancor::Error>(self)
            .map(|v| v.to_vec())
            .map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize a schema bundle from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        rkyv::from_bytes::<Self, rkyv::rancor::Error>(bytes)
            .map_err(|e| Error::Deserialization(e.to_string()))
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, ScalarType};

    fn sample_schema() -> SchemaBundle {
        let customer = EntityDef::new("Customer", "id")
            .with_field(FieldDef::new("id", ScalarType::Int64))
            .with_field(FieldDef::new("email", ScalarType::String));

        let order = EntityDef::new("Order", "id")
            .with_table("orders")
            .with_field(FieldDef::new("id", ScalarType::Int64))
            .with_field(FieldDef::new("customer_id", ScalarType::Int64));

        let relation = RelationDef::many_to_one("customer", "Order", "customer_id", "Customer", "id");

        SchemaBundle::new(1)
            .with_entity(customer)
            .with_entity(order)
            .with_relation(relation.clone())
            .with_relation(relation.inverse("orders"))
    }

    #[test]
    fn test_schema_bundle_builder() {
        let schema = sample_schema();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.entities.len(), 2);
        assert_eq!(schema.relations.len(), 2);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_relation_lookup_is_per_entity() {
        let schema = sample_schema();

        assert!(schema.relation("Order", "customer").is_some());
        assert!(schema.relation("Customer", "customer").is_none());
        assert_eq!(schema.relations_from("Customer").len(), 1);
    }

    #[test]
    fn test_with_relation_replaces_same_name() {
        let schema = sample_schema().with_relation(RelationDef::one_to_one(
            "customer",
            "Order",
            "customer_id",
            "Customer",
            "id",
        ));
        assert_eq!(schema.relations_from("Order").len(), 1);
    }

    #[test]
    fn test_validate_rejects_missing_key_field() {
        let schema = sample_schema().with_relation(RelationDef::many_to_one(
            "buyer",
            "Order",
            "buyer_id",
            "Customer",
            "id",
        ));
        assert!(schema.validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let json = r#"{
            "entities": [
                {"name": "Customer", "identity_fields": ["id"],
                 "fields": [{"name": "id", "type": "int64"}, {"name": "email", "type": "string"}]},
                {"name": "Order", "table": "orders", "identity_fields": ["id"],
                 "fields": [{"name": "id", "type": "int64"}, {"name": "customer_id", "type": "int64"}]}
            ],
            "relations": [
                {"name": "customer", "from_entity": "Order", "to_entity": "Customer",
                 "cardinality": "many_to_one", "from_field": "customer_id", "to_field": "id"}
            ]
        }"#;

        let schema = SchemaBundle::from_json(1, json).unwrap();
        assert_eq!(schema.get_entity("Order").unwrap().table_name(), "orders");
        assert!(schema.relation("Order", "customer").is_some());
    }

    #[test]
    fn test_bytes_roundtrip() {
        let schema = sample_schema();
        let decoded = SchemaBundle::from_bytes(&schema.to_bytes().unwrap()).unwrap();
        assert_eq!(schema, decoded);
    }
}
