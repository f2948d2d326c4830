//! Query execution boundary.
//!
//! The core never executes queries itself. A [`QueryEngine`] turns a finished
//! plan into hydrated rows and answers count queries; [`MemoryEngine`] is a
//! reference implementation over in-memory rows.

mod dataset;
pub mod eval;
mod memory;

pub use crate::error::EngineError;
pub use dataset::{EntityRow, MemoryDataset};
pub use memory::{MemoryEngine, MemoryError};

use gridquery_proto::RawRow;

use crate::query::{CountQuery, QueryPlan};

/// Executes query plans.
///
/// `fetch` returns one nested row per root entity on the page when the plan
/// asks for distinct roots. Collection-valued joins are hydrated as
/// sequences of mappings, to-one joins as a mapping or null, each under the
/// association name.
pub trait QueryEngine {
    /// Run the page query.
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<RawRow>, EngineError>;

    /// Run a count query.
    fn count(&self, query: &CountQuery) -> Result<u64, EngineError>;
}

impl<E: QueryEngine + ?Sized> QueryEngine for &E {
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<RawRow>, EngineError> {
        (**self).fetch(plan)
    }

    fn count(&self, query: &CountQuery) -> Result<u64, EngineError> {
        (**self).count(query)
    }
}
