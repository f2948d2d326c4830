//! Query planning and result reshaping for grid requests.
//!
//! A request's column paths are resolved into bindings and joins
//! ([`PathResolver`], [`JoinRegistry`]), assembled into a [`QueryPlan`] by
//! [`QueryPlanBuilder`], executed by a [`QueryEngine`](crate::engine::QueryEngine),
//! and the hydrated rows are flattened for display by [`ResultReshaper`].

mod binding;
mod builder;
mod count;
mod plan;
mod predicate;
mod registry;
mod reshape;
mod resolver;

pub use binding::ColumnBinding;
pub use builder::{PlannedGrid, QueryPlanBuilder};
pub use count::CountingService;
pub use plan::{
    CountQuery, FilterClause, FilterOrigin, JoinClause, OrderClause, Projection, QueryPlan,
};
pub use predicate::{ExtraPredicate, Predicate, PredicateContext};
pub use registry::{JoinEntry, JoinRegistry, JoinTarget};
pub use reshape::{deep_merge, ResultReshaper};
pub use resolver::PathResolver;
