//! Plan construction for one grid request.

use gridquery_proto::{ColumnRequest, RequestModel, ALL_RECORDS};

use super::binding::ColumnBinding;
use super::plan::{FilterClause, FilterOrigin, JoinClause, OrderClause, Projection, QueryPlan};
use super::predicate::{ExtraPredicate, Predicate, PredicateContext};
use super::registry::JoinEntry;
use super::resolver::PathResolver;
use crate::config::GridConfig;
use crate::error::Error;
use crate::metadata::MetadataProvider;

/// A plan together with the column resolution it was built from.
#[derive(Debug, Clone)]
pub struct PlannedGrid {
    pub plan: QueryPlan,
    /// Every requested column, in client order.
    pub columns: Vec<ColumnRequest>,
    /// Bindings of the bindable columns, in column order.
    pub bindings: Vec<ColumnBinding>,
}

/// Builds query plans from grid requests.
///
/// Steps run in a fixed order: column resolution, select, joins, where,
/// order, then offset and limit.
pub struct QueryPlanBuilder<'a, M: MetadataProvider + ?Sized> {
    metadata: &'a M,
    config: &'a GridConfig,
}

impl<'a, M: MetadataProvider + ?Sized> QueryPlanBuilder<'a, M> {
    pub fn new(metadata: &'a M, config: &'a GridConfig) -> Self {
        Self { metadata, config }
    }

    /// Build the plan for `request` against `root_type`.
    pub fn build(
        &self,
        root_type: &str,
        request: &RequestModel,
        extra: &[ExtraPredicate],
    ) -> Result<PlannedGrid, Error> {
        let mut resolver = PathResolver::new(self.metadata, root_type)?;
        let columns = request.column_requests();
        let mut bindings = Vec::new();
        for column in &columns {
            if let Some(binding) = resolver.resolve_column(column)? {
                bindings.push(binding);
            }
        }
        if bindings.is_empty() {
            return Err(Error::EmptyProjection {
                entity: root_type.to_string(),
            });
        }

        let registry = resolver.into_registry();
        let root_alias = registry.root_alias().to_string();
        let root_identifiers = self.metadata.identifier_fields(root_type);
        let entries = registry.into_entries();

        let select = build_select(&root_alias, &root_identifiers, &entries, &bindings);
        let joins = self.build_joins(&entries);

        let mut where_clause = build_search(request, &bindings);
        let mut total_where = Vec::new();
        let context = PredicateContext {
            root_alias: &root_alias,
            bindings: &bindings,
            joins: &entries,
        };
        for (position, predicate) in extra.iter().enumerate() {
            let Some(built) = predicate.build(&context) else {
                continue;
            };
            check_aliases(&built, &root_alias, &entries)?;
            let clause = FilterClause {
                origin: FilterOrigin::Caller(position),
                predicate: built,
            };
            if predicate.is_included_in_total() {
                if clause.predicate.aliases().iter().any(|a| *a != root_alias) {
                    return Err(Error::InvalidData(format!(
                        "predicate {} is counted in the unfiltered total but references a joined alias",
                        position
                    )));
                }
                total_where.push(clause.clone());
            }
            where_clause.push(clause);
        }

        let order_by = build_order(request, &columns, &bindings);

        let (offset, limit) = if request.is_all_records() {
            (None, None)
        } else if request.length < 0 {
            return Err(Error::InvalidData(format!(
                "page length {} is neither {} nor non-negative",
                request.length, ALL_RECORDS
            )));
        } else {
            (Some(request.start), Some(request.length as u64))
        };

        let plan = QueryPlan {
            root_type: root_type.to_string(),
            root_alias,
            root_identifiers,
            select,
            joins,
            where_clause,
            total_where,
            order_by,
            offset,
            limit,
            distinct_roots: self.config.distinct_roots,
        };
        tracing::debug!(plan = %plan.explain(), "query plan built");

        Ok(PlannedGrid {
            plan,
            columns,
            bindings,
        })
    }

    fn build_joins(&self, entries: &[JoinEntry]) -> Vec<JoinClause> {
        entries
            .iter()
            .map(|entry| JoinClause {
                alias: entry.alias.clone(),
                parent_alias: entry.parent_alias.clone(),
                relation: entry.relation.clone(),
                target_type: entry.target_type.clone(),
                identifier_fields: entry.identifier_fields.clone(),
                kind: self.config.join_kind_for(&entry.source_path),
                collection: entry.collection,
                source_path: entry.source_path.clone(),
            })
            .collect()
    }
}

fn projection(alias: &str, identifiers: &[String], bindings: &[ColumnBinding]) -> Projection {
    let mut fields: Vec<String> = identifiers.to_vec();
    for binding in bindings.iter().filter(|b| b.entity_alias == alias) {
        if !fields.contains(&binding.field_name) {
            fields.push(binding.field_name.clone());
        }
    }
    Projection {
        alias: alias.to_string(),
        fields,
    }
}

fn build_select(
    root_alias: &str,
    root_identifiers: &[String],
    entries: &[JoinEntry],
    bindings: &[ColumnBinding],
) -> Vec<Projection> {
    let mut select = vec![projection(root_alias, root_identifiers, bindings)];
    for entry in entries {
        if bindings.iter().any(|b| b.entity_alias == entry.alias) {
            select.push(projection(&entry.alias, &entry.identifier_fields, bindings));
        }
    }
    select
}

fn build_search(request: &RequestModel, bindings: &[ColumnBinding]) -> Vec<FilterClause> {
    let mut clauses = Vec::new();
    let searchable: Vec<&ColumnBinding> = bindings.iter().filter(|b| b.searchable).collect();

    let global = request.search.value.trim();
    if !global.is_empty() && !searchable.is_empty() {
        for (term_index, term) in global.split_whitespace().enumerate() {
            let alternatives = searchable
                .iter()
                .map(|b| Predicate::contains(b.fully_qualified_name.clone(), term))
                .collect();
            clauses.push(FilterClause {
                origin: FilterOrigin::Search(term_index),
                predicate: Predicate::Or(alternatives),
            });
        }
    }

    for (binding, value) in searchable.iter().filter_map(|b| {
        request
            .columns
            .get(b.index)
            .map(|c| (b, c.search.value.trim()))
    }) {
        if value.is_empty() {
            continue;
        }
        clauses.push(FilterClause {
            origin: FilterOrigin::Column(binding.index),
            predicate: Predicate::contains(binding.fully_qualified_name.clone(), value),
        });
    }

    clauses
}

fn build_order(
    request: &RequestModel,
    columns: &[ColumnRequest],
    bindings: &[ColumnBinding],
) -> Vec<OrderClause> {
    let mut order_by = Vec::new();
    for entry in &request.order {
        let Some(column) = columns.get(entry.column) else {
            tracing::warn!(column = entry.column, "order entry references an unknown column");
            continue;
        };
        if !column.orderable {
            continue;
        }

        let binding = match bindings.iter().find(|b| b.index == column.index) {
            Some(binding) => binding,
            None => match bindings.iter().find(|b| b.index > column.index) {
                Some(binding) => {
                    tracing::debug!(
                        requested = column.index,
                        applied = binding.index,
                        field = %binding.fully_qualified_name,
                        "order falls forward to the next bound column"
                    );
                    binding
                }
                None => continue,
            },
        };

        order_by.push(OrderClause {
            field: binding.fully_qualified_name.clone(),
            direction: entry.dir,
            column: binding.index,
        });
    }
    order_by
}

fn check_aliases(predicate: &Predicate, root_alias: &str, entries: &[JoinEntry]) -> Result<(), Error> {
    for field in predicate.fields() {
        let known = field
            .split_once('.')
            .is_some_and(|(alias, _)| alias == root_alias || entries.iter().any(|e| e.alias == alias));
        if !known {
            return Err(Error::InvalidData(format!(
                "predicate field '{}' does not reference an alias of the plan",
                field
            )));
        }
    }
    Ok(())
}
