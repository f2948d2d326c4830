//! Relation definitions between entities.

use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// Cardinality of a relation, seen from its source entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    /// One-to-one relation (unique foreign key).
    OneToOne,
    /// Many-to-one relation (foreign key on the source side).
    ManyToOne,
    /// One-to-many relation (foreign key on the target side).
    OneToMany,
}

/// A named association from one entity to another.
///
/// Names are unique per source entity, so `Order.customer` and
/// `Invoice.customer` can coexist. A row of `from_entity` relates to every
/// row of `to_entity` whose `to_field` equals its `from_field`.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct RelationDef {
    /// Association name on the source entity.
    pub name: String,
    /// Source entity name.
    pub from_entity: String,
    /// Target entity name.
    pub to_entity: String,
    /// Relation cardinality.
    pub cardinality: Cardinality,
    /// Key field on the source entity.
    pub from_field: String,
    /// Key field on the target entity.
    pub to_field: String,
}

impl RelationDef {
    /// Create a one-to-one relation.
    pub fn one_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::with_cardinality(name, from_entity, from_field, to_entity, to_field, Cardinality::OneToOne)
    }

    /// Create a many-to-one relation (`from_field` is the foreign key).
    pub fn many_to_one(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::with_cardinality(name, from_entity, from_field, to_entity, to_field, Cardinality::ManyToOne)
    }

    /// Create a one-to-many relation (`to_field` is the foreign key).
    pub fn one_to_many(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
    ) -> Self {
        Self::with_cardinality(name, from_entity, from_field, to_entity, to_field, Cardinality::OneToMany)
    }

    fn with_cardinality(
        name: impl Into<String>,
        from_entity: impl Into<String>,
        from_field: impl Into<String>,
        to_entity: impl Into<String>,
        to_field: impl Into<String>,
        cardinality: Cardinality,
    ) -> Self {
        Self {
            name: name.into(),
            from_entity: from_entity.into(),
            to_entity: to_entity.into(),
            cardinality,
            from_field: from_field.into(),
            to_field: to_field.into(),
        }
    }

    /// Check if following this relation yields a collection.
    pub fn is_collection(&self) -> bool {
        self.cardinality == Cardinality::OneToMany
    }

    /// Get the inverse relation (swapping from/to).
    pub fn inverse(&self, name: impl Into<String>) -> Self {
        let cardinality = match self.cardinality {
            Cardinality::OneToOne => Cardinality::OneToOne,
            Cardinality::ManyToOne => Cardinality::OneToMany,
            Cardinality::OneToMany => Cardinality::ManyToOne,
        };
        Self {
            name: name.into(),
            from_entity: self.to_entity.clone(),
            to_entity: self.from_entity.clone(),
            cardinality,
            from_field: self.to_field.clone(),
            to_field: self.from_field.clone(),
        }
    }
}
