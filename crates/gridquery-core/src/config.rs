//! Grid request configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Kind of join emitted for an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Keep only root rows with a related row.
    Inner,
    /// Keep root rows without a related row.
    #[default]
    Left,
}

/// Immutable configuration shared by every request of one grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Join kind used when no override applies.
    pub default_join: JoinKind,
    /// Join kind per triggering column path.
    pub join_overrides: HashMap<String, JoinKind>,
    /// Stamp every row with its root identifier under `DT_RowId`.
    pub add_row_id: bool,
    /// Constant label stamped on every row under `DT_RowClass`.
    pub row_class: Option<String>,
    /// Ask the engine to hydrate each root entity once.
    pub distinct_roots: bool,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            default_join: JoinKind::Left,
            join_overrides: HashMap::new(),
            add_row_id: false,
            row_class: None,
            distinct_roots: true,
        }
    }
}

impl GridConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default join kind.
    pub fn with_default_join(mut self, kind: JoinKind) -> Self {
        self.default_join = kind;
        self
    }

    /// Override the join kind for joins triggered by `column_path`.
    ///
    /// A join shared by several columns is triggered by the first column in
    /// request order that reaches it; overrides keyed on the later columns
    /// do not apply to it.
    pub fn with_join_override(mut self, column_path: impl Into<String>, kind: JoinKind) -> Self {
        self.join_overrides.insert(column_path.into(), kind);
        self
    }

    /// Stamp rows with `DT_RowId`.
    pub fn with_row_id(mut self) -> Self {
        self.add_row_id = true;
        self
    }

    /// Stamp rows with a constant `DT_RowClass`.
    pub fn with_row_class(mut self, class: impl Into<String>) -> Self {
        self.row_class = Some(class.into());
        self
    }

    /// Set whether root rows are hydrated once each.
    pub fn with_distinct_roots(mut self, distinct: bool) -> Self {
        self.distinct_roots = distinct;
        self
    }

    /// Join kind for a join first registered by `column_path`.
    pub fn join_kind_for(&self, column_path: &str) -> JoinKind {
        self.join_overrides
            .get(column_path)
            .copied()
            .unwrap_or(self.default_join)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::InvalidData(format!("cannot read {}: {}", path.as_ref().display(), e))
        })?;
        serde_json::from_str(&text).map_err(|e| Error::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.default_join, JoinKind::Left);
        assert!(config.distinct_roots);
        assert!(!config.add_row_id);
        assert!(config.row_class.is_none());
    }

    #[test]
    fn test_join_override_lookup() {
        let config = GridConfig::new()
            .with_default_join(JoinKind::Inner)
            .with_join_override("customer.email", JoinKind::Left);

        assert_eq!(config.join_kind_for("customer.email"), JoinKind::Left);
        assert_eq!(config.join_kind_for("customer.name"), JoinKind::Inner);
    }

    #[test]
    fn test_partial_json() {
        let config: GridConfig =
            serde_json::from_str(r#"{"default_join": "inner", "row_class": "grid-row"}"#).unwrap();
        assert_eq!(config.default_join, JoinKind::Inner);
        assert_eq!(config.row_class.as_deref(), Some("grid-row"));
        assert!(config.distinct_roots);
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        std::fs::write(&path, r#"{"add_row_id": true}"#).unwrap();

        let config = GridConfig::from_json_file(&path).unwrap();
        assert!(config.add_row_id);
        assert!(GridConfig::from_json_file(dir.path().join("missing.json")).is_err());
    }
}
