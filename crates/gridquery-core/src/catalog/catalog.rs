//! Catalog manager for storing and retrieving schema metadata.

use super::{EntityDef, RelationDef, SchemaBundle};
use crate::error::Error;
use parking_lot::RwLock;
use sled::{Db, Tree};
use std::sync::atomic::{AtomicU64, Ordering};

/// Tree name for schema bundles.
const SCHEMA_TREE: &str = "catalog:schemas";

/// Tree name for catalog metadata.
const META_TREE: &str = "catalog:meta";

/// Key for current schema version in meta tree.
const CURRENT_VERSION_KEY: &[u8] = b"current_version";

/// Versioned store of schema bundles.
///
/// Grid requests read the cached current schema through
/// [`MetadataProvider`](crate::metadata::MetadataProvider); applying a new
/// bundle swaps the cache atomically for subsequent requests.
pub struct Catalog {
    /// Schema bundles tree.
    schema_tree: Tree,
    /// Metadata tree.
    meta_tree: Tree,
    /// Current schema version (cached).
    current_version: AtomicU64,
    /// Current schema (cached).
    pub(crate) current_schema: RwLock<Option<SchemaBundle>>,
}

impl Catalog {
    /// Open or create a catalog using the given sled database.
    pub fn open(db: &Db) -> Result<Self, Error> {
        let schema_tree = db.open_tree(SCHEMA_TREE)?;
        let meta_tree = db.open_tree(META_TREE)?;

        let current_version = match meta_tree.get(CURRENT_VERSION_KEY)? {
            Some(bytes) => decode_version(&bytes)?,
            None => 0,
        };

        let catalog = Self {
            schema_tree,
            meta_tree,
            current_version: AtomicU64::new(current_version),
            current_schema: RwLock::new(None),
        };

        if current_version > 0 {
            if let Some(schema) = catalog.schema_at_version(current_version)? {
                *catalog.current_schema.write() = Some(schema);
            }
        }

        Ok(catalog)
    }

    /// Get the current schema version.
    pub fn current_version(&self) -> u64 {
        self.current_version.load(Ordering::SeqCst)
    }

    /// Get the current schema bundle.
    pub fn current_schema(&self) -> Option<SchemaBundle> {
        self.current_schema.read().clone()
    }

    /// Get a schema bundle at a specific version.
    pub fn schema_at_version(&self, version: u64) -> Result<Option<SchemaBundle>, Error> {
        let key = version.to_be_bytes();
        match self.schema_tree.get(key)? {
            Some(bytes) => Ok(Some(SchemaBundle::from_bytes(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Validate and apply a new schema bundle.
    ///
    /// The bundle is stored under the next version number, which is returned.
    pub fn apply_schema(&self, mut bundle: SchemaBundle) -> Result<u64, Error> {
        bundle.validate()?;

        let new_version = self.current_version() + 1;
        bundle.version = new_version;

        let key = new_version.to_be_bytes();
        self.schema_tree.insert(key, bundle.to_bytes()?)?;
        self.meta_tree
            .insert(CURRENT_VERSION_KEY, &new_version.to_be_bytes())?;

        self.current_version.store(new_version, Ordering::SeqCst);
        *self.current_schema.write() = Some(bundle);

        tracing::debug!(version = new_version, "schema applied");
        Ok(new_version)
    }

    /// Get an entity definition by name from the current schema.
    pub fn get_entity(&self, name: &str) -> Option<EntityDef> {
        self.current_schema
            .read()
            .as_ref()
            .and_then(|s| s.get_entity(name).cloned())
    }

    /// Get all relations where the given entity is the source.
    pub fn relations_from(&self, entity: &str) -> Vec<RelationDef> {
        self.current_schema
            .read()
            .as_ref()
            .map(|s| s.relations_from(entity).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), Error> {
        self.schema_tree.flush()?;
        self.meta_tree.flush()?;
        Ok(())
    }
}

fn decode_version(bytes: &[u8]) -> Result<u64, Error> {
    let buf: [u8; 8] = bytes
        .try_into()
        .map_err(|_| Error::InvalidData(format!("bad version key of {} bytes", bytes.len())))?;
    Ok(u64::from_be_bytes(buf))
}
