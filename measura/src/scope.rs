//! Default-scope composition.
//!
//! Every schema carries an ordered list of default scopes (inherited ones
//! first). [`Schema::default_scoped`] folds them left to right into a single
//! [`Relation`]: each scope is evaluated with the accumulator as the current
//! scope, and its result is merged back into the accumulator. No I/O happens
//! here.

use std::sync::Arc;

use crate::query::Relation;
use crate::schema::Schema;

impl Schema {
    /// A relation with every default scope applied, in declaration order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use measura::schema::SchemaBuilder;
    ///
    /// let schema = SchemaBuilder::new("OrderMetrics")
    ///     .default_scope(|rel| rel.where_eq("a", 1))
    ///     .default_scope(|rel| rel.where_eq("b", 2))
    ///     .build();
    ///
    /// assert_eq!(schema.default_scoped().where_values(), ["a = 1", "b = 2"]);
    /// assert!(schema.unscoped().is_unfiltered());
    /// ```
    pub fn default_scoped(self: &Arc<Self>) -> Relation {
        self.default_scopes()
            .iter()
            .enumerate()
            .fold(Relation::new(Arc::clone(self)), |mut acc, (index, scope)| {
                tracing::trace!(class = %self.class_name(), index, "applying default scope");
                let scoped = acc.scoping(|current| scope(current));
                acc.merge(&scoped);
                acc
            })
    }

    /// A fresh relation that ignores the default scopes.
    pub fn unscoped(self: &Arc<Self>) -> Relation {
        Relation::new(Arc::clone(self))
    }

    /// The starting point for queries: the default-scoped relation.
    pub fn all(self: &Arc<Self>) -> Relation {
        self.default_scoped()
    }
}

#[cfg(test)]
mod tests {
    use crate::schema::{FieldOptions, SchemaBuilder};

    #[test]
    fn test_no_default_scopes() {
        let schema = SchemaBuilder::new("PlainMetrics").build();
        assert_eq!(schema.default_scoped(), schema.unscoped());
    }

    #[test]
    fn test_fold_order_and_equivalence() {
        let schema = SchemaBuilder::new("OrderMetrics")
            .default_scope(|rel| rel.where_eq("a", 1))
            .default_scope(|rel| rel.where_eq("b", 2))
            .build();

        let expected = schema.unscoped().where_eq("a", 1).where_eq("b", 2);
        assert_eq!(schema.default_scoped(), expected);
        assert_eq!(schema.all(), expected);
        assert!(schema.unscoped().is_unfiltered());
    }

    #[test]
    fn test_scope_sees_accumulated_state() {
        let schema = SchemaBuilder::new("OrderMetrics")
            .default_scope(|rel| rel.where_eq("a", 1))
            .default_scope(|rel| {
                if rel.where_values().is_empty() {
                    rel.where_raw("unexpected")
                } else {
                    rel.limit(rel.where_values().len())
                }
            })
            .build();

        let rel = schema.default_scoped();
        assert_eq!(rel.where_values(), ["a = 1"]);
        assert_eq!(rel.limit_value(), Some(1));
    }

    #[test]
    fn test_inherited_scopes_run_first() {
        let parent = SchemaBuilder::new("BaseMetrics")
            .default_scope(|rel| rel.where_eq("env", "prod"))
            .build();
        let child = parent
            .derive("ChildMetrics")
            .tag("host", FieldOptions::new())
            .default_scope(|rel| rel.where_eq("host", "web1"))
            .build();

        assert_eq!(
            child.default_scoped().where_values(),
            ["env = 'prod'", "host = 'web1'"]
        );
        assert_eq!(parent.default_scoped().where_values(), ["env = 'prod'"]);
    }

    #[test]
    fn test_named_scope() {
        let schema = SchemaBuilder::new("OrderMetrics")
            .default_scope(|rel| rel.where_eq("a", 1))
            .scope("recent", |rel| rel.where_raw("time > now() - 1h"))
            .build();

        let rel = schema.all().scope("recent").unwrap();
        assert_eq!(rel.where_values(), ["a = 1", "time > now() - 1h"]);
        assert!(schema.all().scope("missing").is_none());
    }
}
