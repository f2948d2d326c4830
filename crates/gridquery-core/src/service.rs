//! Grid request handling.

use tracing::{info, instrument};

use gridquery_proto::{DisplayRow, GridResponse, RequestModel, ROW_CLASS_FIELD, ROW_ID_FIELD};

use crate::config::GridConfig;
use crate::engine::QueryEngine;
use crate::error::Error;
use crate::metadata::MetadataProvider;
use crate::query::{CountingService, ExtraPredicate, PlannedGrid, QueryPlan, QueryPlanBuilder, ResultReshaper};

/// Serves grid pages for any root entity of one schema.
///
/// Stateless across requests: every call plans, executes and counts on its
/// own. Page, total and filtered queries run sequentially in that order.
pub struct GridService<M, E> {
    metadata: M,
    engine: E,
    config: GridConfig,
}

impl<M: MetadataProvider, E: QueryEngine> GridService<M, E> {
    pub fn new(metadata: M, engine: E, config: GridConfig) -> Self {
        Self {
            metadata,
            engine,
            config,
        }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    pub fn metadata(&self) -> &M {
        &self.metadata
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Plan a request without executing it.
    pub fn plan(
        &self,
        root_type: &str,
        request: &RequestModel,
        extra: &[ExtraPredicate],
    ) -> Result<PlannedGrid, Error> {
        QueryPlanBuilder::new(&self.metadata, &self.config).build(root_type, request, extra)
    }

    /// Answer one grid request.
    #[instrument(skip_all, fields(root = %root_type, draw = request.draw))]
    pub fn handle(
        &self,
        root_type: &str,
        request: &RequestModel,
        extra: &[ExtraPredicate],
    ) -> Result<GridResponse, Error> {
        let planned = self.plan(root_type, request, extra)?;

        let raw = self
            .engine
            .fetch(&planned.plan)
            .map_err(Error::ExecutionFailed)?;
        let reshaper = ResultReshaper::new(&planned.bindings);
        let mut data = if reshaper.is_noop() {
            raw
        } else {
            reshaper.reshape_all(raw)
        };
        for row in &mut data {
            self.decorate(&planned.plan, row);
        }

        let counting = CountingService::new(&self.engine);
        let total_records = counting.total(&planned.plan)?;
        let display_records = counting.filtered(&planned.plan)?;

        info!(
            rows = data.len(),
            total_records, display_records, "grid request served"
        );

        Ok(GridResponse {
            draw: request.draw,
            total_records,
            display_records,
            data,
        })
    }

    fn decorate(&self, plan: &QueryPlan, row: &mut DisplayRow) {
        if self.config.add_row_id {
            let id = row_id(plan, row);
            row.insert(ROW_ID_FIELD.to_string(), serde_json::Value::String(id));
        }
        if let Some(class) = &self.config.row_class {
            row.insert(ROW_CLASS_FIELD.to_string(), serde_json::Value::String(class.clone()));
        }
    }
}

/// Root identifier as text; composite identifiers are joined with `_`.
fn row_id(plan: &QueryPlan, row: &DisplayRow) -> String {
    plan.root_identifiers
        .iter()
        .map(|field| match row.get(field) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join("_")
}
