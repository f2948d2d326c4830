//! Column bindings.

/// A display column resolved to one scalar field of one join alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnBinding {
    /// Position of the column in the client's column list.
    pub index: usize,
    /// Dotted path as requested by the client.
    pub path: String,
    /// Entity type owning the field.
    pub entity_type: String,
    /// Alias of the join (or root) owning the field.
    pub entity_alias: String,
    /// Field name on that entity.
    pub field_name: String,
    /// `alias.field`.
    pub fully_qualified_name: String,
    /// Whether any association on the path is collection-valued.
    pub collection_reachable: bool,
    pub searchable: bool,
    pub orderable: bool,
}

impl ColumnBinding {
    /// Path segments of the original column path.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.path.split('.')
    }
}
