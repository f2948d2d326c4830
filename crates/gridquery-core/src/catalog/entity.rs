//! Entity definitions.

use super::field::FieldDef;
use rkyv::{Archive, Deserialize, Serialize};
use serde::{Deserialize as SerdeDeserialize, Serialize as SerdeSerialize};

/// An entity definition (table schema).
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize, SerdeSerialize, SerdeDeserialize)]
pub struct EntityDef {
    /// Entity name (unique within schema).
    pub name: String,
    /// Backing table name. Derived from the entity name when absent.
    #[serde(default)]
    pub table: Option<String>,
    /// Identifier field names (more than one for composite keys).
    pub identity_fields: Vec<String>,
    /// Scalar field definitions.
    #[serde(default)]
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity definition with a single identifier field.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: None,
            identity_fields: vec![identity_field.into()],
            fields: Vec::new(),
        }
    }

    /// Set an explicit table name.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Replace the identifier fields (composite keys).
    pub fn with_identity_fields(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.identity_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The table name, falling back to the snake-cased entity name.
    pub fn table_name(&self) -> String {
        match &self.table {
            Some(table) => table.clone(),
            None => snake_case(&self.name),
        }
    }
}

fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
