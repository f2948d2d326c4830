//! Total and filtered record counts.

use super::plan::QueryPlan;
use crate::engine::QueryEngine;
use crate::error::{CountKind, Error};

/// Runs the two auxiliary count queries of a grid page.
pub struct CountingService<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: QueryEngine + ?Sized> CountingService<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Root entities before any filtering, except caller predicates counted
    /// in the total.
    pub fn total(&self, plan: &QueryPlan) -> Result<u64, Error> {
        let query = plan.total_count();
        tracing::debug!(query = %query.explain(), "counting total records");
        self.engine
            .count(&query)
            .map_err(|source| Error::CountQueryFailed {
                kind: CountKind::Total,
                source,
            })
    }

    /// Distinct root entities matching the full plan.
    pub fn filtered(&self, plan: &QueryPlan) -> Result<u64, Error> {
        let query = plan.filtered_count();
        tracing::debug!(query = %query.explain(), "counting filtered records");
        self.engine
            .count(&query)
            .map_err(|source| Error::CountQueryFailed {
                kind: CountKind::Filtered,
                source,
            })
    }
}
