//! Executable query plans.

use std::fmt::Write as _;

use gridquery_proto::{SortDirection, Value};

use super::predicate::Predicate;
use crate::config::JoinKind;

/// Fields selected from one alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub alias: String,
    /// Identifier fields first, then bound fields, without duplicates.
    pub fields: Vec<String>,
}

/// One join of the plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinClause {
    pub alias: String,
    pub parent_alias: String,
    pub relation: String,
    pub target_type: String,
    pub identifier_fields: Vec<String>,
    pub kind: JoinKind,
    pub collection: bool,
    /// Column path that first required the join.
    pub source_path: String,
}

/// Where a filter clause came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOrigin {
    /// One term of the global search, by term position.
    Search(usize),
    /// A per-column search, by column index.
    Column(usize),
    /// A caller-supplied predicate, by position.
    Caller(usize),
}

impl FilterOrigin {
    /// Base name of the clause's bound parameters.
    pub fn parameter_name(&self) -> String {
        match self {
            FilterOrigin::Search(i) => format!("search_{}", i),
            FilterOrigin::Column(i) => format!("column_{}", i),
            FilterOrigin::Caller(i) => format!("param_{}", i),
        }
    }
}

/// A where clause entry. Entries are combined with AND.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub origin: FilterOrigin,
    pub predicate: Predicate,
}

/// One sort key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderClause {
    /// Qualified field name.
    pub field: String,
    pub direction: SortDirection,
    /// Column index the key was derived from.
    pub column: usize,
}

/// A finished plan for one grid page.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub root_type: String,
    pub root_alias: String,
    pub root_identifiers: Vec<String>,
    pub select: Vec<Projection>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Vec<FilterClause>,
    /// Caller clauses that also apply to the unfiltered total.
    pub total_where: Vec<FilterClause>,
    pub order_by: Vec<OrderClause>,
    pub offset: Option<u64>,
    pub limit: Option<u64>,
    /// Hydrate each root entity once.
    pub distinct_roots: bool,
}

impl QueryPlan {
    /// Projection of an alias.
    pub fn projection(&self, alias: &str) -> Option<&Projection> {
        self.select.iter().find(|p| p.alias == alias)
    }

    /// Join clause of an alias.
    pub fn join(&self, alias: &str) -> Option<&JoinClause> {
        self.joins.iter().find(|j| j.alias == alias)
    }

    /// Joins whose parent is `alias`, in plan order.
    pub fn children_of<'a>(&'a self, alias: &'a str) -> impl Iterator<Item = &'a JoinClause> + 'a {
        self.joins.iter().filter(move |j| j.parent_alias == alias)
    }

    /// The where clause as one predicate.
    pub fn filter(&self) -> Option<Predicate> {
        combine(&self.where_clause)
    }

    /// Query counting root entities before filtering.
    pub fn total_count(&self) -> CountQuery {
        CountQuery {
            root_type: self.root_type.clone(),
            root_alias: self.root_alias.clone(),
            root_identifiers: self.root_identifiers.clone(),
            joins: Vec::new(),
            where_clause: self.total_where.clone(),
            distinct: false,
        }
    }

    /// Query counting distinct root entities after the full join set and
    /// where clause.
    pub fn filtered_count(&self) -> CountQuery {
        CountQuery {
            root_type: self.root_type.clone(),
            root_alias: self.root_alias.clone(),
            root_identifiers: self.root_identifiers.clone(),
            joins: self.joins.clone(),
            where_clause: self.where_clause.clone(),
            distinct: true,
        }
    }

    /// Render the plan as dialect-neutral text with named parameters.
    pub fn explain(&self) -> String {
        let mut out = String::new();

        let columns: Vec<String> = self
            .select
            .iter()
            .flat_map(|p| p.fields.iter().map(move |f| format!("{}.{}", p.alias, f)))
            .collect();
        let _ = writeln!(out, "SELECT {}", columns.join(", "));
        let _ = writeln!(out, "FROM {} {}", self.root_type, self.root_alias);
        render_joins(&mut out, &self.joins);
        let params = render_where(&mut out, &self.where_clause);

        if !self.order_by.is_empty() {
            let keys: Vec<String> = self
                .order_by
                .iter()
                .map(|o| format!("{} {}", o.field, direction_keyword(o.direction)))
                .collect();
            let _ = writeln!(out, "ORDER BY {}", keys.join(", "));
        }
        if let Some(offset) = self.offset {
            let _ = writeln!(out, "OFFSET {}", offset);
        }
        if let Some(limit) = self.limit {
            let _ = writeln!(out, "LIMIT {}", limit);
        }
        render_params(&mut out, &params);
        out.trim_end().to_string()
    }
}

/// An auxiliary count query.
#[derive(Debug, Clone, PartialEq)]
pub struct CountQuery {
    pub root_type: String,
    pub root_alias: String,
    pub root_identifiers: Vec<String>,
    pub joins: Vec<JoinClause>,
    pub where_clause: Vec<FilterClause>,
    /// Count distinct root identifiers instead of joined tuples.
    pub distinct: bool,
}

impl CountQuery {
    /// The where clause as one predicate.
    pub fn filter(&self) -> Option<Predicate> {
        combine(&self.where_clause)
    }

    /// Render the count query like [`QueryPlan::explain`].
    pub fn explain(&self) -> String {
        let mut out = String::new();
        let ids: Vec<String> = self
            .root_identifiers
            .iter()
            .map(|f| format!("{}.{}", self.root_alias, f))
            .collect();
        if self.distinct {
            let _ = writeln!(out, "SELECT COUNT(DISTINCT {})", ids.join(", "));
        } else {
            let _ = writeln!(out, "SELECT COUNT({})", ids.join(", "));
        }
        let _ = writeln!(out, "FROM {} {}", self.root_type, self.root_alias);
        render_joins(&mut out, &self.joins);
        let params = render_where(&mut out, &self.where_clause);
        render_params(&mut out, &params);
        out.trim_end().to_string()
    }
}

fn combine(clauses: &[FilterClause]) -> Option<Predicate> {
    match clauses {
        [] => None,
        [single] => Some(single.predicate.clone()),
        many => Some(Predicate::And(many.iter().map(|c| c.predicate.clone()).collect())),
    }
}

fn direction_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

fn render_joins(out: &mut String, joins: &[JoinClause]) {
    for join in joins {
        let keyword = match join.kind {
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Left => "LEFT JOIN",
        };
        let _ = writeln!(
            out,
            "{} {}.{} {}",
            keyword, join.parent_alias, join.relation, join.alias
        );
    }
}

fn render_where(out: &mut String, clauses: &[FilterClause]) -> Vec<(String, Value)> {
    let mut params = Vec::new();
    for (i, clause) in clauses.iter().enumerate() {
        let mut names = ParamNames::new(clause.origin.parameter_name());
        let text = render_predicate(&clause.predicate, &mut names);
        let keyword = if i == 0 { "WHERE" } else { "  AND" };
        let _ = writeln!(out, "{} {}", keyword, text);
        params.extend(names.bound);
    }
    params
}

fn render_params(out: &mut String, params: &[(String, Value)]) {
    for (name, value) in params {
        let _ = writeln!(out, "-- :{} = {}", name, value.to_json());
    }
}

/// Parameter names of one clause. Equal literals share a name.
struct ParamNames {
    base: String,
    bound: Vec<(String, Value)>,
}

impl ParamNames {
    fn new(base: String) -> Self {
        Self { base, bound: Vec::new() }
    }

    fn bind(&mut self, value: Value) -> String {
        if let Some((name, _)) = self.bound.iter().find(|(_, v)| *v == value) {
            return format!(":{}", name);
        }
        let name = match self.bound.len() {
            0 => self.base.clone(),
            n => format!("{}_{}", self.base, n),
        };
        self.bound.push((name.clone(), value));
        format!(":{}", name)
    }
}

fn render_predicate(predicate: &Predicate, names: &mut ParamNames) -> String {
    match predicate {
        Predicate::Contains { field, value } => {
            let param = names.bind(Value::String(format!("%{}%", value.to_lowercase())));
            format!("LOWER({}) LIKE {}", field, param)
        }
        Predicate::Eq { field, value } => format!("{} = {}", field, names.bind(value.clone())),
        Predicate::Ne { field, value } => format!("{} <> {}", field, names.bind(value.clone())),
        Predicate::Lt { field, value } => format!("{} < {}", field, names.bind(value.clone())),
        Predicate::Le { field, value } => format!("{} <= {}", field, names.bind(value.clone())),
        Predicate::Gt { field, value } => format!("{} > {}", field, names.bind(value.clone())),
        Predicate::Ge { field, value } => format!("{} >= {}", field, names.bind(value.clone())),
        Predicate::In { field, values } => {
            let params: Vec<String> = values.iter().map(|v| names.bind(v.clone())).collect();
            format!("{} IN ({})", field, params.join(", "))
        }
        Predicate::IsNull { field } => format!("{} IS NULL", field),
        Predicate::IsNotNull { field } => format!("{} IS NOT NULL", field),
        Predicate::And(children) => render_group(children, " AND ", "TRUE", names),
        Predicate::Or(children) => render_group(children, " OR ", "FALSE", names),
    }
}

fn render_group(children: &[Predicate], separator: &str, empty: &str, names: &mut ParamNames) -> String {
    if children.is_empty() {
        return empty.to_string();
    }
    let parts: Vec<String> = children.iter().map(|c| render_predicate(c, names)).collect();
    format!("({})", parts.join(separator))
}
