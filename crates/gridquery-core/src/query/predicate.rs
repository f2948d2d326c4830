//! Filter predicates over qualified fields.
//!
//! Fields are always written `alias.field`, where the alias is the root alias
//! or one registered by the request's join registry.

use std::collections::BTreeSet;
use std::fmt;

use gridquery_proto::Value;

use super::binding::ColumnBinding;
use super::registry::JoinEntry;

/// A boolean filter over the fields of one joined tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Case-insensitive substring match on the field's text.
    Contains { field: String, value: String },
    /// Equal to value.
    Eq { field: String, value: Value },
    /// Not equal to value.
    Ne { field: String, value: Value },
    /// Less than value.
    Lt { field: String, value: Value },
    /// Less than or equal to value.
    Le { field: String, value: Value },
    /// Greater than value.
    Gt { field: String, value: Value },
    /// Greater than or equal to value.
    Ge { field: String, value: Value },
    /// Equal to any of the values.
    In { field: String, values: Vec<Value> },
    /// Field is null or missing.
    IsNull { field: String },
    /// Field is present and not null.
    IsNotNull { field: String },
    /// All must hold. Empty is true.
    And(Vec<Predicate>),
    /// Any must hold. Empty is false.
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn contains(field: impl Into<String>, value: impl Into<String>) -> Self {
        Predicate::Contains { field: field.into(), value: value.into() }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq { field: field.into(), value: value.into() }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ne { field: field.into(), value: value.into() }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Lt { field: field.into(), value: value.into() }
    }

    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Le { field: field.into(), value: value.into() }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Gt { field: field.into(), value: value.into() }
    }

    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Ge { field: field.into(), value: value.into() }
    }

    pub fn is_in(field: impl Into<String>, values: impl IntoIterator<Item = impl Into<Value>>) -> Self {
        Predicate::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_null(field: impl Into<String>) -> Self {
        Predicate::IsNull { field: field.into() }
    }

    pub fn is_not_null(field: impl Into<String>) -> Self {
        Predicate::IsNotNull { field: field.into() }
    }

    pub fn and(predicates: Vec<Predicate>) -> Self {
        Predicate::And(predicates)
    }

    pub fn or(predicates: Vec<Predicate>) -> Self {
        Predicate::Or(predicates)
    }

    /// All qualified field names referenced by the predicate.
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut BTreeSet<&'a str>) {
        match self {
            Predicate::Contains { field, .. }
            | Predicate::Eq { field, .. }
            | Predicate::Ne { field, .. }
            | Predicate::Lt { field, .. }
            | Predicate::Le { field, .. }
            | Predicate::Gt { field, .. }
            | Predicate::Ge { field, .. }
            | Predicate::In { field, .. }
            | Predicate::IsNull { field }
            | Predicate::IsNotNull { field } => {
                fields.insert(field);
            }
            Predicate::And(children) | Predicate::Or(children) => {
                for child in children {
                    child.collect_fields(fields);
                }
            }
        }
    }

    /// Aliases referenced by the predicate's fields.
    pub fn aliases(&self) -> BTreeSet<&str> {
        self.fields()
            .into_iter()
            .map(|f| f.split_once('.').map_or(f, |(alias, _)| alias))
            .collect()
    }
}

/// Plan context handed to caller-supplied predicate callbacks.
#[derive(Debug, Clone, Copy)]
pub struct PredicateContext<'a> {
    pub root_alias: &'a str,
    pub bindings: &'a [ColumnBinding],
    pub joins: &'a [JoinEntry],
}

impl<'a> PredicateContext<'a> {
    /// Qualified field a requested column path is bound to.
    pub fn field(&self, column_path: &str) -> Option<&'a str> {
        self.bindings
            .iter()
            .find(|b| b.path == column_path)
            .map(|b| b.fully_qualified_name.as_str())
    }

    /// Qualify a field of the root entity.
    pub fn root_field(&self, name: &str) -> String {
        format!("{}.{}", self.root_alias, name)
    }
}

type PredicateFn = dyn Fn(&PredicateContext<'_>) -> Option<Predicate> + Send + Sync;

/// A caller-supplied predicate appended after the generated filters.
///
/// The callback sees the request's bindings and joins, and may return `None`
/// to add nothing.
pub struct ExtraPredicate {
    build: Box<PredicateFn>,
    include_in_total: bool,
}

impl ExtraPredicate {
    /// Wrap a predicate callback.
    pub fn new<F>(build: F) -> Self
    where
        F: Fn(&PredicateContext<'_>) -> Option<Predicate> + Send + Sync + 'static,
    {
        Self {
            build: Box::new(build),
            include_in_total: false,
        }
    }

    /// A predicate that does not depend on the plan.
    pub fn fixed(predicate: Predicate) -> Self {
        Self::new(move |_| Some(predicate.clone()))
    }

    /// Also apply this predicate to the unfiltered total count.
    pub fn include_in_total(mut self) -> Self {
        self.include_in_total = true;
        self
    }

    pub fn is_included_in_total(&self) -> bool {
        self.include_in_total
    }

    /// Evaluate the callback.
    pub fn build(&self, context: &PredicateContext<'_>) -> Option<Predicate> {
        (self.build)(context)
    }
}

impl fmt::Debug for ExtraPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtraPredicate")
            .field("include_in_total", &self.include_in_total)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields_and_aliases() {
        let predicate = Predicate::and(vec![
            Predicate::or(vec![
                Predicate::contains("orders.name", "jo"),
                Predicate::contains("customer.email", "jo"),
            ]),
            Predicate::gt("orders.total", 10i64),
            Predicate::is_null("orders.deleted_at"),
        ]);

        let fields: Vec<_> = predicate.fields().into_iter().collect();
        assert_eq!(
            fields,
            vec!["customer.email", "orders.deleted_at", "orders.name", "orders.total"]
        );
        let aliases: Vec<_> = predicate.aliases().into_iter().collect();
        assert_eq!(aliases, vec!["customer", "orders"]);
    }

    #[test]
    fn test_extra_predicate_callback() {
        let bindings = vec![ColumnBinding {
            index: 0,
            path: "customer.email".into(),
            entity_type: "Customer".into(),
            entity_alias: "customer".into(),
            field_name: "email".into(),
            fully_qualified_name: "customer.email".into(),
            collection_reachable: false,
            searchable: true,
            orderable: true,
        }];
        let context = PredicateContext {
            root_alias: "orders",
            bindings: &bindings,
            joins: &[],
        };

        let extra = ExtraPredicate::new(|ctx| {
            ctx.field("customer.email").map(|f| Predicate::is_not_null(f))
        });
        assert!(!extra.is_included_in_total());
        assert_eq!(extra.build(&context), Some(Predicate::is_not_null("customer.email")));

        let missing = ExtraPredicate::new(|ctx| ctx.field("customer.phone").map(Predicate::is_null));
        assert_eq!(missing.build(&context), None);

        let fixed = ExtraPredicate::fixed(Predicate::eq(context.root_field("active"), true))
            .include_in_total();
        assert!(fixed.is_included_in_total());
        assert_eq!(fixed.build(&context), Some(Predicate::eq("orders.active", true)));
    }
}
