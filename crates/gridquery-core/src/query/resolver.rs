//! Dotted column path resolution.

use gridquery_proto::ColumnRequest;

use super::binding::ColumnBinding;
use super::registry::{JoinRegistry, JoinTarget};
use crate::error::Error;
use crate::metadata::MetadataProvider;

/// Resolves the column paths of one request against a root entity type.
///
/// Joins needed by the resolved paths accumulate in the resolver's
/// [`JoinRegistry`], shared by every column of the request.
pub struct PathResolver<'a, M: MetadataProvider + ?Sized> {
    metadata: &'a M,
    root_type: String,
    registry: JoinRegistry,
}

impl<'a, M: MetadataProvider + ?Sized> PathResolver<'a, M> {
    /// Create a resolver rooted at `root_type`.
    pub fn new(metadata: &'a M, root_type: &str) -> Result<Self, Error> {
        if !metadata.has_entity(root_type) {
            return Err(Error::UnknownEntity(root_type.to_string()));
        }
        let root_alias = table_or_type(metadata, root_type);
        Ok(Self {
            metadata,
            root_type: root_type.to_string(),
            registry: JoinRegistry::new(root_alias),
        })
    }

    /// Root entity type.
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    /// Alias of the root entity.
    pub fn root_alias(&self) -> &str {
        self.registry.root_alias()
    }

    /// Joins registered so far.
    pub fn registry(&self) -> &JoinRegistry {
        &self.registry
    }

    /// Consume the resolver, yielding its join registry.
    pub fn into_registry(self) -> JoinRegistry {
        self.registry
    }

    /// Resolve one requested column, or `None` when its path cannot bind to a
    /// model field (empty, blank or numeric).
    pub fn resolve_column(&mut self, column: &ColumnRequest) -> Result<Option<ColumnBinding>, Error> {
        let Some(path) = column.bindable_path() else {
            return Ok(None);
        };
        let mut binding = self.resolve(path)?;
        binding.index = column.index;
        binding.searchable = column.searchable;
        binding.orderable = column.orderable;
        Ok(Some(binding))
    }

    /// Resolve a dotted path into a binding, registering the joins it needs.
    pub fn resolve(&mut self, path: &str) -> Result<ColumnBinding, Error> {
        let segments: Vec<&str> = path.split('.').collect();
        let Some((field, relations)) = segments.split_last() else {
            return Err(Error::InvalidData("empty column path".to_string()));
        };

        let mut current_type = self.root_type.clone();
        let mut alias = self.registry.root_alias().to_string();
        let mut collection_reachable = false;

        for segment in relations {
            if !self.metadata.has_association(&current_type, segment) {
                return Err(Error::UnknownAssociation {
                    entity: current_type,
                    path: path.to_string(),
                    segment: segment.to_string(),
                });
            }

            let collection = self.metadata.is_collection_association(&current_type, segment);
            collection_reachable |= collection;

            let target_type = self
                .metadata
                .association_target_type(&current_type, segment)
                .ok_or_else(|| Error::UnknownAssociation {
                    entity: current_type.clone(),
                    path: path.to_string(),
                    segment: segment.to_string(),
                })?;

            let mut candidate = table_or_type(self.metadata, &target_type);
            if target_type == self.root_type {
                candidate = format!("{}_{}", candidate, segment);
            }

            let target = JoinTarget {
                target_type: target_type.clone(),
                identifier_fields: self.metadata.identifier_fields(&target_type),
                collection,
            };
            alias = self
                .registry
                .register(&alias, segment, &candidate, target, path)
                .to_string();
            current_type = target_type;
        }

        if !self.metadata.has_field(&current_type, field) {
            return Err(Error::UnknownField {
                entity: current_type,
                path: path.to_string(),
                field: field.to_string(),
            });
        }

        let binding = ColumnBinding {
            index: 0,
            path: path.to_string(),
            entity_type: current_type,
            fully_qualified_name: format!("{}.{}", alias, field),
            entity_alias: alias,
            field_name: field.to_string(),
            collection_reachable,
            searchable: true,
            orderable: true,
        };
        tracing::debug!(
            path,
            field = %binding.fully_qualified_name,
            collection = binding.collection_reachable,
            "column bound"
        );
        Ok(binding)
    }
}

fn table_or_type<M: MetadataProvider + ?Sized>(metadata: &M, entity: &str) -> String {
    metadata
        .table_name(entity)
        .unwrap_or_else(|| entity.to_lowercase())
}
