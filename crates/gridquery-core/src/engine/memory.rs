//! Reference query engine over in-memory entity rows.
//!
//! Joins are expanded into tuples of row positions, one slot per alias, with
//! a hash join per join clause. Filtering, ordering and paging run over the
//! tuples; the surviving tuples are then grouped per root entity and
//! hydrated into nested JSON rows.

use std::collections::{HashMap, HashSet};

use gridquery_proto::{RawRow, Value};
use serde_json::Map;
use thiserror::Error;

use super::dataset::{EntityRow, MemoryDataset};
use super::eval::{evaluate, sort_cmp};
use super::{EngineError, QueryEngine};
use crate::catalog::SchemaBundle;
use crate::config::JoinKind;
use crate::query::{CountQuery, JoinClause, Predicate, QueryPlan};
use gridquery_proto::SortDirection;

/// Errors raised by [`MemoryEngine`].
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("entity '{0}' is not part of the schema")]
    UnknownEntity(String),

    #[error("entity '{entity}' has no relation '{relation}'")]
    UnknownRelation { entity: String, relation: String },

    #[error("alias '{0}' is not defined by the plan")]
    UnknownAlias(String),
}

/// Row positions per alias slot. Slot 0 is the root.
type Tuple = Vec<Option<usize>>;

/// Hashable form of a join key value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum JoinKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Str(String),
    Uuid([u8; 16]),
}

impl JoinKey {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(b) => Some(JoinKey::Bool(*b)),
            Value::Int32(i) => Some(JoinKey::Int(*i as i64)),
            Value::Int64(i) | Value::Timestamp(i) => Some(JoinKey::Int(*i)),
            Value::Float64(f) if f.fract() == 0.0 => Some(JoinKey::Int(*f as i64)),
            Value::Float64(f) => Some(JoinKey::Float(f.to_bits())),
            Value::String(s) => Some(JoinKey::Str(s.clone())),
            Value::Uuid(u) => Some(JoinKey::Uuid(*u)),
        }
    }
}

fn field_value<'r>(row: &'r EntityRow, field: &str) -> Option<&'r Value> {
    row.iter().find(|(name, _)| name == field).map(|(_, v)| v)
}

/// Alias slots of one query.
struct Layout<'p> {
    aliases: Vec<(&'p str, &'p str)>,
}

impl<'p> Layout<'p> {
    fn new(root_alias: &'p str, root_type: &'p str, joins: &'p [JoinClause]) -> Self {
        let mut aliases = vec![(root_alias, root_type)];
        aliases.extend(joins.iter().map(|j| (j.alias.as_str(), j.target_type.as_str())));
        Self { aliases }
    }

    fn slot(&self, alias: &str) -> Result<usize, MemoryError> {
        self.aliases
            .iter()
            .position(|(a, _)| *a == alias)
            .ok_or_else(|| MemoryError::UnknownAlias(alias.to_string()))
    }

    fn entity(&self, slot: usize) -> &'p str {
        self.aliases[slot].1
    }
}

/// Executes query plans against a [`MemoryDataset`].
#[derive(Debug, Clone)]
pub struct MemoryEngine {
    schema: SchemaBundle,
    dataset: MemoryDataset,
}

impl MemoryEngine {
    pub fn new(schema: SchemaBundle, dataset: MemoryDataset) -> Self {
        Self { schema, dataset }
    }

    pub fn schema(&self) -> &SchemaBundle {
        &self.schema
    }

    pub fn dataset(&self) -> &MemoryDataset {
        &self.dataset
    }

    fn rows(&self, entity: &str) -> Result<&[EntityRow], MemoryError> {
        if self.schema.get_entity(entity).is_none() {
            return Err(MemoryError::UnknownEntity(entity.to_string()));
        }
        Ok(self.dataset.rows(entity))
    }

    fn row(&self, layout: &Layout<'_>, tuple: &Tuple, slot: usize) -> Option<&EntityRow> {
        let index = tuple.get(slot).copied().flatten()?;
        self.dataset.rows(layout.entity(slot)).get(index)
    }

    /// Expand the root rows across every join.
    fn expand(&self, layout: &Layout<'_>, root_type: &str, joins: &[JoinClause]) -> Result<Vec<Tuple>, MemoryError> {
        let mut tuples: Vec<Tuple> = (0..self.rows(root_type)?.len()).map(|i| vec![Some(i)]).collect();

        for join in joins {
            let parent_slot = layout.slot(&join.parent_alias)?;
            let parent_type = layout.entity(parent_slot);
            let relation = self.schema.relation(parent_type, &join.relation).ok_or_else(|| {
                MemoryError::UnknownRelation {
                    entity: parent_type.to_string(),
                    relation: join.relation.clone(),
                }
            })?;

            // build phase over the target table
            let mut index: HashMap<JoinKey, Vec<usize>> = HashMap::new();
            for (position, row) in self.rows(&relation.to_entity)?.iter().enumerate() {
                if let Some(key) = field_value(row, &relation.to_field).and_then(JoinKey::from_value) {
                    index.entry(key).or_default().push(position);
                }
            }

            let mut expanded = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                let matches = self
                    .row(layout, &tuple, parent_slot)
                    .and_then(|row| field_value(row, &relation.from_field))
                    .and_then(JoinKey::from_value)
                    .and_then(|key| index.get(&key));
                match matches {
                    Some(positions) => {
                        for position in positions {
                            let mut next = tuple.clone();
                            next.push(Some(*position));
                            expanded.push(next);
                        }
                    }
                    None if join.kind == JoinKind::Left => {
                        let mut next = tuple;
                        next.push(None);
                        expanded.push(next);
                    }
                    None => {}
                }
            }
            tuples = expanded;
        }
        Ok(tuples)
    }

    fn lookup<'a>(&'a self, layout: &Layout<'_>, tuple: &Tuple, field: &str) -> Option<&'a Value> {
        let (alias, name) = field.split_once('.')?;
        let slot = layout.slot(alias).ok()?;
        let index = tuple.get(slot).copied().flatten()?;
        let row = self.dataset.rows(layout.entity(slot)).get(index)?;
        field_value(row, name)
    }

    fn filter(
        &self,
        layout: &Layout<'_>,
        tuples: Vec<Tuple>,
        predicate: Option<&Predicate>,
    ) -> Result<Vec<Tuple>, MemoryError> {
        let Some(predicate) = predicate else {
            return Ok(tuples);
        };
        for field in predicate.fields() {
            let alias = field.split_once('.').map_or(field, |(alias, _)| alias);
            layout.slot(alias)?;
        }
        Ok(tuples
            .into_iter()
            .filter(|t| evaluate(predicate, &|field: &str| self.lookup(layout, t, field)))
            .collect())
    }

    fn hydrate(
        &self,
        plan: &QueryPlan,
        layout: &Layout<'_>,
        slot: usize,
        row_index: usize,
        group: &[&Tuple],
    ) -> Result<RawRow, MemoryError> {
        let alias = layout.aliases[slot].0;
        let mut object = Map::new();

        if let Some(row) = self.dataset.rows(layout.entity(slot)).get(row_index) {
            if let Some(projection) = plan.projection(alias) {
                for field in &projection.fields {
                    let value = field_value(row, field).map_or(serde_json::Value::Null, Value::to_json);
                    object.insert(field.clone(), value);
                }
            }
        }

        for child in plan.children_of(alias) {
            let child_slot = layout.slot(&child.alias)?;
            let mut seen = HashSet::new();
            let mut children = Vec::new();
            for tuple in group.iter().filter(|t| t[slot] == Some(row_index)) {
                if let Some(child_index) = tuple[child_slot] {
                    if seen.insert(child_index) {
                        children.push(child_index);
                    }
                }
            }

            let mut hydrated = Vec::with_capacity(children.len());
            for child_index in children {
                let subgroup: Vec<&Tuple> = group
                    .iter()
                    .copied()
                    .filter(|t| t[slot] == Some(row_index) && t[child_slot] == Some(child_index))
                    .collect();
                hydrated.push(serde_json::Value::Object(self.hydrate(
                    plan,
                    layout,
                    child_slot,
                    child_index,
                    &subgroup,
                )?));
            }

            let value = if child.collection {
                serde_json::Value::Array(hydrated)
            } else {
                hydrated.into_iter().next().unwrap_or(serde_json::Value::Null)
            };
            object.insert(child.relation.clone(), value);
        }
        Ok(object)
    }
}

impl QueryEngine for MemoryEngine {
    fn fetch(&self, plan: &QueryPlan) -> Result<Vec<RawRow>, EngineError> {
        let layout = Layout::new(&plan.root_alias, &plan.root_type, &plan.joins);
        let tuples = self.expand(&layout, &plan.root_type, &plan.joins)?;
        let filter = plan.filter();
        let mut tuples = self.filter(&layout, tuples, filter.as_ref())?;

        if !plan.order_by.is_empty() {
            let mut keyed: Vec<(Vec<Option<Value>>, Tuple)> = tuples
                .into_iter()
                .map(|t| {
                    let keys = plan
                        .order_by
                        .iter()
                        .map(|o| self.lookup(&layout, &t, &o.field).cloned())
                        .collect();
                    (keys, t)
                })
                .collect();
            keyed.sort_by(|(a, _), (b, _)| {
                for (clause, (av, bv)) in plan.order_by.iter().zip(a.iter().zip(b.iter())) {
                    let ordering = sort_cmp(av.as_ref(), bv.as_ref());
                    let ordering = match clause.direction {
                        SortDirection::Asc => ordering,
                        SortDirection::Desc => ordering.reverse(),
                    };
                    if ordering.is_ne() {
                        return ordering;
                    }
                }
                std::cmp::Ordering::Equal
            });
            tuples = keyed.into_iter().map(|(_, t)| t).collect();
        }

        // one group per root entity, in order of first appearance
        let mut groups: Vec<(usize, Vec<&Tuple>)> = Vec::new();
        if plan.distinct_roots {
            let mut group_of: HashMap<usize, usize> = HashMap::new();
            for tuple in &tuples {
                let Some(root) = tuple[0] else { continue };
                match group_of.get(&root) {
                    Some(&g) => groups[g].1.push(tuple),
                    None => {
                        group_of.insert(root, groups.len());
                        groups.push((root, vec![tuple]));
                    }
                }
            }
        } else {
            groups.extend(tuples.iter().filter_map(|t| t[0].map(|root| (root, vec![t]))));
        }

        let offset = plan.offset.unwrap_or(0) as usize;
        let limit = plan.limit.map_or(usize::MAX, |l| l as usize);

        let mut rows = Vec::new();
        for (root, group) in groups.into_iter().skip(offset).take(limit) {
            rows.push(self.hydrate(plan, &layout, 0, root, &group)?);
        }
        tracing::debug!(rows = rows.len(), "memory engine fetched page");
        Ok(rows)
    }

    fn count(&self, query: &CountQuery) -> Result<u64, EngineError> {
        let layout = Layout::new(&query.root_alias, &query.root_type, &query.joins);
        let tuples = self.expand(&layout, &query.root_type, &query.joins)?;
        let filter = query.filter();
        let tuples = self.filter(&layout, tuples, filter.as_ref())?;

        let count = if query.distinct {
            tuples.iter().filter_map(|t| t[0]).collect::<HashSet<_>>().len()
        } else {
            tuples.len()
        };
        Ok(count as u64)
    }
}
