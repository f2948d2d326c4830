//! gridquery core - query planning and result reshaping for data grids.
//!
//! A grid client asks for one page of rows of a root entity, with columns
//! given as dotted paths through the entity's relations. This crate resolves
//! those paths against schema metadata, builds a filtered, sorted and paged
//! [`QueryPlan`], hands it to a [`QueryEngine`], flattens the hydrated rows
//! for tabular display and counts the total and filtered records.

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod query;
pub mod service;

pub use catalog::{Cardinality, Catalog, EntityDef, FieldDef, RelationDef, ScalarType, SchemaBundle};
pub use config::{GridConfig, JoinKind};
pub use engine::{EngineError, MemoryDataset, MemoryEngine, QueryEngine};
pub use error::{CountKind, Error};
pub use metadata::MetadataProvider;
pub use query::{
    deep_merge, ColumnBinding, CountQuery, CountingService, ExtraPredicate, JoinRegistry,
    PathResolver, PlannedGrid, Predicate, PredicateContext, QueryPlan, QueryPlanBuilder,
    ResultReshaper,
};
pub use service::GridService;

/// Re-export protocol types.
pub use gridquery_proto as proto;
