//! Join deduplication and alias naming for one request.

use std::collections::HashMap;

/// A join registered while resolving column paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinEntry {
    /// Unique alias of the joined entity.
    pub alias: String,
    /// Alias the join starts from.
    pub parent_alias: String,
    /// Association traversed from the parent.
    pub relation: String,
    /// Entity type reached by the join.
    pub target_type: String,
    /// Column path that first required this join.
    pub source_path: String,
    /// Identifier fields of the target type.
    pub identifier_fields: Vec<String>,
    /// Whether the association is collection-valued.
    pub collection: bool,
}

/// What a join reaches, as reported by the metadata provider.
#[derive(Debug, Clone)]
pub struct JoinTarget {
    pub target_type: String,
    pub identifier_fields: Vec<String>,
    pub collection: bool,
}

/// Registry of the joins of one request.
///
/// Keyed by `(parent alias, association)`, so two columns sharing a relation
/// prefix share its joins. Entries keep registration order, which is always
/// parent before child.
#[derive(Debug, Clone)]
pub struct JoinRegistry {
    root_alias: String,
    entries: Vec<JoinEntry>,
    by_prefix: HashMap<(String, String), usize>,
}

impl JoinRegistry {
    /// Create an empty registry for a root alias.
    pub fn new(root_alias: impl Into<String>) -> Self {
        Self {
            root_alias: root_alias.into(),
            entries: Vec::new(),
            by_prefix: HashMap::new(),
        }
    }

    /// Alias of the root entity.
    pub fn root_alias(&self) -> &str {
        &self.root_alias
    }

    /// Register the join `parent_alias.relation`, or return the alias of the
    /// existing one.
    ///
    /// `candidate` is used as the alias when free; otherwise the association
    /// name and then a counter are appended until it is unique.
    pub fn register(
        &mut self,
        parent_alias: &str,
        relation: &str,
        candidate: &str,
        target: JoinTarget,
        source_path: &str,
    ) -> &str {
        let key = (parent_alias.to_string(), relation.to_string());
        if let Some(&index) = self.by_prefix.get(&key) {
            return &self.entries[index].alias;
        }

        let alias = self.unique_alias(candidate, relation);
        tracing::debug!(
            alias = %alias,
            join = %format!("{}.{}", parent_alias, relation),
            source_path,
            "join registered"
        );

        self.entries.push(JoinEntry {
            alias,
            parent_alias: parent_alias.to_string(),
            relation: relation.to_string(),
            target_type: target.target_type,
            source_path: source_path.to_string(),
            identifier_fields: target.identifier_fields,
            collection: target.collection,
        });
        let index = self.entries.len() - 1;
        self.by_prefix.insert(key, index);
        &self.entries[index].alias
    }

    fn is_taken(&self, alias: &str) -> bool {
        alias == self.root_alias || self.entries.iter().any(|e| e.alias == alias)
    }

    fn unique_alias(&self, candidate: &str, relation: &str) -> String {
        if !self.is_taken(candidate) {
            return candidate.to_string();
        }
        let suffixed = format!("{}_{}", candidate, relation);
        if !self.is_taken(&suffixed) {
            return suffixed;
        }
        let mut n = 2;
        loop {
            let numbered = format!("{}_{}", suffixed, n);
            if !self.is_taken(&numbered) {
                return numbered;
            }
            n += 1;
        }
    }

    /// Look up a join by alias.
    pub fn get(&self, alias: &str) -> Option<&JoinEntry> {
        self.entries.iter().find(|e| e.alias == alias)
    }

    /// All joins in registration order.
    pub fn entries(&self) -> &[JoinEntry] {
        &self.entries
    }

    /// Number of registered joins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no join has been registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the registry, yielding its joins.
    pub fn into_entries(self) -> Vec<JoinEntry> {
        self.entries
    }
}
