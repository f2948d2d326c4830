//! Schema catalog for gridquery.
//!
//! The catalog stores metadata about entities, their scalar fields and the
//! relations between them. Query planning only ever sees it through the
//! [`MetadataProvider`](crate::metadata::MetadataProvider) trait.

mod catalog;
mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use catalog::Catalog;
pub use entity::EntityDef;
pub use field::FieldDef;
pub use relation::{Cardinality, RelationDef};
pub use schema::SchemaBundle;
pub use types::ScalarType;
