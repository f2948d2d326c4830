//! Schema introspection used by query planning.

use crate::catalog::{Catalog, SchemaBundle};

/// Answers schema questions about entity types.
///
/// Entity types are identified by name. "Field" always means a scalar field;
/// associations are never fields.
pub trait MetadataProvider {
    /// Whether `entity` is a known entity type.
    fn has_entity(&self, entity: &str) -> bool;

    /// Whether `entity` has a scalar field called `name`.
    fn has_field(&self, entity: &str, name: &str) -> bool;

    /// Whether `entity` has an association called `name`.
    fn has_association(&self, entity: &str, name: &str) -> bool;

    /// Whether the association `name` on `entity` is collection-valued.
    fn is_collection_association(&self, entity: &str, name: &str) -> bool;

    /// Target entity type of the association `name` on `entity`.
    fn association_target_type(&self, entity: &str, name: &str) -> Option<String>;

    /// Identifier field names of `entity`.
    fn identifier_fields(&self, entity: &str) -> Vec<String>;

    /// Table name of `entity`.
    fn table_name(&self, entity: &str) -> Option<String>;
}

impl<T: MetadataProvider + ?Sized> MetadataProvider for &T {
    fn has_entity(&self, entity: &str) -> bool {
        (**self).has_entity(entity)
    }

    fn has_field(&self, entity: &str, name: &str) -> bool {
        (**self).has_field(entity, name)
    }

    fn has_association(&self, entity: &str, name: &str) -> bool {
        (**self).has_association(entity, name)
    }

    fn is_collection_association(&self, entity: &str, name: &str) -> bool {
        (**self).is_collection_association(entity, name)
    }

    fn association_target_type(&self, entity: &str, name: &str) -> Option<String> {
        (**self).association_target_type(entity, name)
    }

    fn identifier_fields(&self, entity: &str) -> Vec<String> {
        (**self).identifier_fields(entity)
    }

    fn table_name(&self, entity: &str) -> Option<String> {
        (**self).table_name(entity)
    }
}

impl MetadataProvider for SchemaBundle {
    fn has_entity(&self, entity: &str) -> bool {
        self.get_entity(entity).is_some()
    }

    fn has_field(&self, entity: &str, name: &str) -> bool {
        self.get_entity(entity)
            .is_some_and(|e| e.get_field(name).is_some())
    }

    fn has_association(&self, entity: &str, name: &str) -> bool {
        self.relation(entity, name).is_some()
    }

    fn is_collection_association(&self, entity: &str, name: &str) -> bool {
        self.relation(entity, name).is_some_and(|r| r.is_collection())
    }

    fn association_target_type(&self, entity: &str, name: &str) -> Option<String> {
        self.relation(entity, name).map(|r| r.to_entity.clone())
    }

    fn identifier_fields(&self, entity: &str) -> Vec<String> {
        self.get_entity(entity)
            .map(|e| e.identity_fields.clone())
            .unwrap_or_default()
    }

    fn table_name(&self, entity: &str) -> Option<String> {
        self.get_entity(entity).map(|e| e.table_name())
    }
}

/// Delegates to the catalog's current schema; an empty catalog knows nothing.
impl MetadataProvider for Catalog {
    fn has_entity(&self, entity: &str) -> bool {
        self.current_schema
            .read()
            .as_ref()
            .is_some_and(|s| s.has_entity(entity))
    }

    fn has_field(&self, entity: &str, name: &str) -> bool {
        self.current_schema
            .read()
            .as_ref()
            .is_some_and(|s| s.has_field(entity, name))
    }

    fn has_association(&self, entity: &str, name: &str) -> bool {
        self.current_schema
            .read()
            .as_ref()
            .is_some_and(|s| s.has_association(entity, name))
    }

    fn is_collection_association(&self, entity: &str, name: &str) -> bool {
        self.current_schema
            .read()
            .as_ref()
            .is_some_and(|s| s.is_collection_association(entity, name))
    }

    fn association_target_type(&self, entity: &str, name: &str) -> Option<String> {
        self.current_schema
            .read()
            .as_ref()
            .and_then(|s| s.association_target_type(entity, name))
    }

    fn identifier_fields(&self, entity: &str) -> Vec<String> {
        self.current_schema
            .read()
            .as_ref()
            .map(|s| s.identifier_fields(entity))
            .unwrap_or_default()
    }

    fn table_name(&self, entity: &str) -> Option<String> {
        self.current_schema
            .read()
            .as_ref()
            .and_then(|s| s.table_name(entity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, FieldDef, RelationDef, ScalarType};

    fn schema() -> SchemaBundle {
        SchemaBundle::new(1)
            .with_entity(
                EntityDef::new("Customer", "id")
                    .with_field(FieldDef::new("id", ScalarType::Int64))
                    .with_field(FieldDef::new("email", ScalarType::String)),
            )
            .with_entity(
                EntityDef::new("Order", "id")
                    .with_table("orders")
                    .with_field(FieldDef::new("id", ScalarType::Int64))
                    .with_field(FieldDef::new("customer_id", ScalarType::Int64)),
            )
            .with_relation(RelationDef::many_to_one(
                "customer",
                "Order",
                "customer_id",
                "Customer",
                "id",
            ))
            .with_relation(RelationDef::one_to_many(
                "orders",
                "Customer",
                "id",
                "Order",
                "customer_id",
            ))
    }

    #[test]
    fn test_schema_bundle_metadata() {
        let schema = schema();

        assert!(schema.has_entity("Order"));
        assert!(schema.has_field("Customer", "email"));
        assert!(!schema.has_field("Order", "customer"));
        assert!(schema.has_association("Order", "customer"));
        assert!(!schema.is_collection_association("Order", "customer"));
        assert!(schema.is_collection_association("Customer", "orders"));
        assert_eq!(
            schema.association_target_type("Order", "customer").as_deref(),
            Some("Customer")
        );
        assert_eq!(schema.identifier_fields("Order"), vec!["id"]);
        assert_eq!(schema.table_name("Order").as_deref(), Some("orders"));
        assert_eq!(schema.table_name("Missing"), None);
    }

    #[test]
    fn test_catalog_metadata() {
        let db = sled::Config::new().temporary(true).open().unwrap();
        let catalog = Catalog::open(&db).unwrap();
        assert!(!catalog.has_entity("Order"));

        catalog.apply_schema(schema()).unwrap();
        assert!(catalog.has_entity("Order"));
        assert!(catalog.is_collection_association("Customer", "orders"));
        assert_eq!(catalog.table_name("Customer").as_deref(), Some("customer"));
    }
}
