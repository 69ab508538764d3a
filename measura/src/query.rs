//! Minimal query object over a metric schema.
//!
//! [`Relation`] holds filter state only: `select` columns, `where`
//! conditions and an optional `limit`. It never talks to the store; rendering
//! with [`Relation::to_sql`] and executing the result belong to whatever
//! client the caller uses. Scopes ([`crate::schema::Scope`]) are functions
//! from one relation to the next, and the scope composer folds them together
//! with [`Relation::merge`].
//!
//! # Example
//!
//! ```rust
//! use measura::schema::{FieldOptions, SchemaBuilder};
//!
//! let schema = SchemaBuilder::new("CpuMetrics")
//!     .tag("host", FieldOptions::new())
//!     .build();
//!
//! let rel = schema.unscoped().where_eq("host", "web1").limit(10);
//! assert_eq!(rel.to_sql(), r#"select * from "cpu" where (host = 'web1') limit 10"#);
//! ```

use std::fmt;
use std::sync::Arc;

use crate::schema::Schema;
use crate::value::Value;

/// Filter state bound to a schema.
///
/// Query methods take `&self` and return a new relation, so a relation can be
/// shared and refined without affecting other holders.
#[derive(Clone)]
pub struct Relation {
    schema: Arc<Schema>,
    select_values: Vec<String>,
    where_values: Vec<String>,
    limit: Option<usize>,
}

impl Relation {
    /// A relation with no filter state.
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            select_values: Vec::new(),
            where_values: Vec::new(),
            limit: None,
        }
    }

    /// The schema this relation is bound to.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Adds an equality condition.
    ///
    /// Strings are single-quoted with embedded quotes escaped.
    #[must_use]
    pub fn where_eq(&self, key: &str, value: impl Into<Value>) -> Relation {
        self.where_raw(format!("{key} = {}", render_literal(&value.into())))
    }

    /// Adds a condition verbatim.
    #[must_use]
    pub fn where_raw(&self, condition: impl Into<String>) -> Relation {
        let mut rel = self.clone();
        rel.where_values.push(condition.into());
        rel
    }

    /// Adds selected columns or expressions.
    #[must_use]
    pub fn select<I, S>(&self, columns: I) -> Relation
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut rel = self.clone();
        rel.select_values.extend(columns.into_iter().map(Into::into));
        rel
    }

    /// Sets the row limit.
    #[must_use]
    pub fn limit(&self, limit: usize) -> Relation {
        let mut rel = self.clone();
        rel.limit = Some(limit);
        rel
    }

    /// Applies the schema's named scope `name`, if declared.
    pub fn scope(&self, name: &str) -> Option<Relation> {
        let scope = self.schema.named_scope(name)?;
        Some(self.scoping(|current| scope(current)))
    }

    /// Folds `other`'s filter state into this relation.
    ///
    /// Conditions and columns are appended in order, skipping exact
    /// duplicates; a limit set on `other` replaces this one.
    pub fn merge(&mut self, other: &Relation) -> &mut Self {
        for condition in &other.where_values {
            if !self.where_values.contains(condition) {
                self.where_values.push(condition.clone());
            }
        }
        for column in &other.select_values {
            if !self.select_values.contains(column) {
                self.select_values.push(column.clone());
            }
        }
        if other.limit.is_some() {
            self.limit = other.limit;
        }
        self
    }

    /// Evaluates `f` with this relation as the current scope.
    ///
    /// Query calls made inside `f` on the relation it receives compose with
    /// this relation's filter state instead of starting from nothing.
    pub fn scoping<R>(&self, f: impl FnOnce(&Relation) -> R) -> R {
        f(self)
    }

    /// `where` conditions, in order.
    pub fn where_values(&self) -> &[String] {
        &self.where_values
    }

    /// Selected columns, in order.
    pub fn select_values(&self) -> &[String] {
        &self.select_values
    }

    /// The row limit, if set.
    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    /// Returns `true` when no filter state has been added.
    pub fn is_unfiltered(&self) -> bool {
        self.where_values.is_empty() && self.select_values.is_empty() && self.limit.is_none()
    }

    /// Renders the relation as a query string.
    pub fn to_sql(&self) -> String {
        let columns = if self.select_values.is_empty() {
            "*".to_string()
        } else {
            self.select_values.join(", ")
        };
        let mut sql = format!("select {columns} from {}", self.schema.quoted_series(None));

        if !self.where_values.is_empty() {
            let conditions: Vec<String> =
                self.where_values.iter().map(|c| format!("({c})")).collect();
            sql.push_str(" where ");
            sql.push_str(&conditions.join(" and "));
        }
        if let Some(limit) = self.limit {
            sql.push_str(&format!(" limit {limit}"));
        }
        sql
    }
}

fn render_literal(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
        Value::Null => "null".to_string(),
        other => other.to_text(),
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.schema, &other.schema)
            && self.select_values == other.select_values
            && self.where_values == other.where_values
            && self.limit == other.limit
    }
}

impl fmt::Debug for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Relation")
            .field("class", &self.schema.class_name())
            .field("select_values", &self.select_values)
            .field("where_values", &self.where_values)
            .field("limit", &self.limit)
            .finish()
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SchemaBuilder;

    fn schema() -> Arc<Schema> {
        SchemaBuilder::new("DummyMetrics").build()
    }

    #[test]
    fn test_query_methods_do_not_mutate() {
        let base = Relation::new(schema());
        let filtered = base.where_eq("id", 1);

        assert!(base.is_unfiltered());
        assert_eq!(filtered.where_values(), ["id = 1"]);
    }

    #[test]
    fn test_literals() {
        let rel = Relation::new(schema())
            .where_eq("name", "o'brien")
            .where_eq("ratio", 0.5)
            .where_eq("up", true);
        assert_eq!(
            rel.where_values(),
            ["name = 'o\\'brien'", "ratio = 0.5", "up = true"]
        );
    }

    #[test]
    fn test_backslash_literals() {
        let rel = Relation::new(schema())
            .where_eq("path", r"a\")
            .where_eq("quote", r"it\'s");
        assert_eq!(
            rel.where_values(),
            [r"path = 'a\\'", r"quote = 'it\\\'s'"]
        );
    }

    #[test]
    fn test_merge() {
        let schema = schema();
        let mut left = Relation::new(Arc::clone(&schema)).where_eq("a", 1).limit(5);
        let right = left.where_eq("b", 2).select(["mean(v)"]).limit(10);

        left.merge(&right);

        assert_eq!(left.where_values(), ["a = 1", "b = 2"]);
        assert_eq!(left.select_values(), ["mean(v)"]);
        assert_eq!(left.limit_value(), Some(10));

        let unlimited = Relation::new(schema);
        left.merge(&unlimited);
        assert_eq!(left.limit_value(), Some(10));
    }

    #[test]
    fn test_scoping_passes_current_relation() {
        let rel = Relation::new(schema()).where_eq("a", 1);
        let inner = rel.scoping(|current| current.where_eq("b", 2));
        assert_eq!(inner.where_values(), ["a = 1", "b = 2"]);
    }

    #[test]
    fn test_to_sql() {
        let rel = Relation::new(schema())
            .select(["max(price)", "min(price)"])
            .where_eq("symbol", "USD")
            .where_raw("time > now() - 1h");
        assert_eq!(
            rel.to_sql(),
            r#"select max(price), min(price) from "dummy" where (symbol = 'USD') and (time > now() - 1h)"#
        );
    }

    #[test]
    fn test_equality_requires_same_schema() {
        let a = Relation::new(schema());
        let b = Relation::new(schema());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
