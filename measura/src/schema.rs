//! Metric schemas and their declaration builder.
//!
//! A [`Schema`] describes one class of metrics: which attributes are tags,
//! which are fields, their types and defaults, the series the points go to,
//! the retention policy, the time precision, default and named scopes,
//! validation rules and write hooks. Schemas are declared once through a
//! [`SchemaBuilder`] and shared as `Arc<Schema>`; they are immutable after
//! [`SchemaBuilder::build`].
//!
//! Deriving a schema from another ([`Schema::derive`]) copies the parent's
//! whole declaration state. Later declarations on the derived builder never
//! reach the parent or sibling schemas.
//!
//! # Example
//!
//! ```rust
//! use measura::schema::{FieldOptions, SchemaBuilder};
//! use measura::timestamp::Precision;
//! use measura::value::FieldType;
//!
//! let schema = SchemaBuilder::new("MarketMetrics")
//!     .retention("monthly")
//!     .precision(Precision::Nanoseconds)
//!     .tag("symbol", FieldOptions::new().with_default("USDRUR"))
//!     .tags(["market_id", "site_id"], FieldOptions::typed(FieldType::Integer))
//!     .fields(["price", "price_high"], FieldOptions::typed(FieldType::Float))
//!     .attributes(["volume", "ask", "bid"])
//!     .build();
//!
//! assert!(schema.is_tag("symbol"));
//! assert!(!schema.is_tag("price"));
//! assert_eq!(schema.quoted_series(None), r#""monthly"."market""#);
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::metric::Metric;
use crate::query::Relation;
use crate::series::{self, SeriesSpec};
use crate::timestamp::Precision;
use crate::validation::{Presence, Validator};
use crate::value::{FieldType, Value};

/// A scope: takes the current relation and returns the filtered one.
pub type Scope = Arc<dyn Fn(&Relation) -> Relation + Send + Sync>;

/// Hook run before a point is built; may adjust the instance.
pub type BeforeWriteHook = Arc<dyn Fn(&mut Metric) + Send + Sync>;

/// Hook run after the write client accepted a point.
pub type AfterWriteHook = Arc<dyn Fn(&Metric) + Send + Sync>;

/// How a declared attribute is stored and written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeKind {
    /// Dimensional tag, written into the point's tag set.
    Tag,
    /// Measured value, written into the point's field set.
    Field,
    /// Plain attribute: never cast, written as a field.
    Plain,
}

/// One row of the schema's attribute table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDecl {
    /// Tag, field or plain.
    pub kind: AttributeKind,
    /// Declared type, if any. Only tags and fields carry one.
    pub ty: Option<FieldType>,
}

/// Options accepted by tag and field declarations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldOptions {
    /// Type values are cast to on assignment and before writes.
    pub ty: Option<FieldType>,
    /// Value seeded into new instances.
    pub default: Option<Value>,
}

impl FieldOptions {
    /// No type, no default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Options with a declared type.
    pub fn typed(ty: FieldType) -> Self {
        Self {
            ty: Some(ty),
            default: None,
        }
    }

    /// Sets the declared type.
    #[must_use]
    pub fn with_type(mut self, ty: FieldType) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }
}

/// Declaration of one metric class.
#[derive(Clone)]
pub struct Schema {
    class_name: String,
    tag_names: Vec<String>,
    field_types: BTreeMap<String, FieldType>,
    defaults: BTreeMap<String, Value>,
    attributes: BTreeMap<String, AttributeDecl>,
    series: SeriesSpec,
    retention_policy: Option<String>,
    time_precision: Option<Precision>,
    default_scopes: Vec<Scope>,
    named_scopes: BTreeMap<String, Scope>,
    validators: Vec<Arc<dyn Validator>>,
    before_write: Vec<BeforeWriteHook>,
    after_write: Vec<AfterWriteHook>,
}

impl Schema {
    /// Starts a builder for a schema derived from this one.
    ///
    /// See [`SchemaBuilder::inherit`].
    pub fn derive(&self, class_name: impl Into<String>) -> SchemaBuilder {
        SchemaBuilder::inherit(self, class_name)
    }

    /// The metric class name.
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Declared tag names, in declaration order.
    pub fn tag_names(&self) -> &[String] {
        &self.tag_names
    }

    /// Returns `true` if `name` is a declared tag.
    pub fn is_tag(&self, name: &str) -> bool {
        self.tag_names.iter().any(|tag| tag == name)
    }

    /// Declared types of tags and fields.
    pub fn field_types(&self) -> &BTreeMap<String, FieldType> {
        &self.field_types
    }

    /// The declared type of `name`, if it has one.
    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        self.field_types.get(name).copied()
    }

    /// Values seeded into every new instance.
    pub fn defaults(&self) -> &BTreeMap<String, Value> {
        &self.defaults
    }

    /// The declaration of `name`, if it is declared.
    pub fn attribute(&self, name: &str) -> Option<&AttributeDecl> {
        self.attributes.get(name)
    }

    /// Every declared attribute name, sorted.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    /// The series specification.
    pub fn series(&self) -> &SeriesSpec {
        &self.series
    }

    /// The retention policy, if declared.
    pub fn retention_policy(&self) -> Option<&str> {
        self.retention_policy.as_deref()
    }

    /// The time precision, if declared.
    pub fn time_precision(&self) -> Option<Precision> {
        self.time_precision
    }

    /// Default scopes, in declaration order (inherited ones first).
    pub fn default_scopes(&self) -> &[Scope] {
        &self.default_scopes
    }

    /// A named scope.
    pub fn named_scope(&self, name: &str) -> Option<&Scope> {
        self.named_scopes.get(name)
    }

    /// The series expression used in queries: quoted and qualified with the
    /// retention policy.
    pub fn quoted_series(&self, instance: Option<&Metric>) -> String {
        series::resolve(&self.series, self.retention_policy(), instance)
    }

    /// The series expression handed to the write client.
    ///
    /// The retention policy travels to the client as its own argument, so it
    /// is not folded into the name here.
    pub fn write_series(&self, instance: Option<&Metric>) -> String {
        series::resolve(&self.series, None, instance)
    }

    pub(crate) fn validators(&self) -> &[Arc<dyn Validator>] {
        &self.validators
    }

    pub(crate) fn before_write_hooks(&self) -> &[BeforeWriteHook] {
        &self.before_write
    }

    pub(crate) fn after_write_hooks(&self) -> &[AfterWriteHook] {
        &self.after_write
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("class_name", &self.class_name)
            .field("tag_names", &self.tag_names)
            .field("field_types", &self.field_types)
            .field("defaults", &self.defaults)
            .field("series", &self.series)
            .field("retention_policy", &self.retention_policy)
            .field("time_precision", &self.time_precision)
            .field("default_scopes", &self.default_scopes.len())
            .field("named_scopes", &self.named_scopes.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Declares a [`Schema`].
///
/// Method names follow the declaration vocabulary of metric classes: `tag`,
/// `field`, `attributes`, `measurement`, `retention`, `precision`,
/// `default_scope`, and so on.
#[derive(Debug, Clone)]
#[must_use]
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    /// Starts a new schema with nothing declared.
    ///
    /// The series defaults to the name inferred from `class_name`
    /// ([`series::infer_series_name`]).
    pub fn new(class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let series = series::infer_series_name(&class_name, None);
        Self {
            schema: Schema {
                class_name,
                tag_names: Vec::new(),
                field_types: BTreeMap::new(),
                defaults: BTreeMap::new(),
                attributes: BTreeMap::new(),
                series,
                retention_policy: None,
                time_precision: None,
                default_scopes: Vec::new(),
                named_scopes: BTreeMap::new(),
                validators: Vec::new(),
                before_write: Vec::new(),
                after_write: Vec::new(),
            },
        }
    }

    /// Starts a schema derived from `parent`.
    ///
    /// Every declaration of the parent is copied, so tags, scopes and hooks
    /// added here stay local to the new schema. The series is inferred again
    /// for `class_name`, falling back to the parent's series.
    pub fn inherit(parent: &Schema, class_name: impl Into<String>) -> Self {
        let class_name = class_name.into();
        let mut schema = parent.clone();
        schema.series = series::infer_series_name(&class_name, Some(&parent.series));
        schema.class_name = class_name;
        Self { schema }
    }

    /// Declares a tag. A tag is also a field: it accepts a type and a default.
    pub fn tag(mut self, name: impl Into<String>, options: FieldOptions) -> Self {
        let name = name.into();
        if !self.schema.tag_names.contains(&name) {
            self.schema.tag_names.push(name.clone());
        }
        self.declare(name, AttributeKind::Tag, options);
        self
    }

    /// Declares several tags sharing the same options.
    pub fn tags<I, S>(self, names: I, options: FieldOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(self, |builder, name| builder.tag(name, options.clone()))
    }

    /// Declares a field.
    pub fn field(mut self, name: impl Into<String>, options: FieldOptions) -> Self {
        let name = name.into();
        let kind = if self.schema.is_tag(&name) {
            AttributeKind::Tag
        } else {
            AttributeKind::Field
        };
        self.declare(name, kind, options);
        self
    }

    /// Declares several fields sharing the same options.
    pub fn fields<I, S>(self, names: I, options: FieldOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .fold(self, |builder, name| builder.field(name, options.clone()))
    }

    /// Declares plain attributes: untyped and never cast.
    ///
    /// Names that are already declared keep their existing declaration.
    pub fn attributes<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for name in names {
            self.schema
                .attributes
                .entry(name.into())
                .or_insert(AttributeDecl {
                    kind: AttributeKind::Plain,
                    ty: None,
                });
        }
        self
    }

    fn declare(&mut self, name: String, kind: AttributeKind, options: FieldOptions) {
        if let Some(ty) = options.ty {
            self.schema.field_types.insert(name.clone(), ty);
        }
        if let Some(default) = options.default.filter(|v| !v.is_null()) {
            self.schema.defaults.insert(name.clone(), default);
        }
        let ty = self.schema.field_types.get(&name).copied();
        self.schema.attributes.insert(name, AttributeDecl { kind, ty });
    }

    /// Sets the series explicitly: a name, a list of names, a pattern or a
    /// computed spec.
    pub fn measurement(mut self, spec: impl Into<SeriesSpec>) -> Self {
        self.schema.series = spec.into();
        self
    }

    /// Sets a series computed from each instance.
    pub fn measurement_fn<F>(self, f: F) -> Self
    where
        F: Fn(Option<&Metric>) -> SeriesSpec + Send + Sync + 'static,
    {
        self.measurement(SeriesSpec::computed(f))
    }

    /// Sets several alternative series, merged into one query expression.
    pub fn measurements<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<SeriesSpec>,
    {
        self.measurement(SeriesSpec::List(names.into_iter().map(Into::into).collect()))
    }

    /// Sets the retention policy.
    pub fn retention(mut self, policy: impl Into<String>) -> Self {
        self.schema.retention_policy = Some(policy.into());
        self
    }

    /// Sets the time precision, overriding the process-wide default.
    pub fn precision(mut self, precision: Precision) -> Self {
        self.schema.time_precision = Some(precision);
        self
    }

    /// Appends a default scope.
    pub fn default_scope<F>(mut self, scope: F) -> Self
    where
        F: Fn(&Relation) -> Relation + Send + Sync + 'static,
    {
        self.schema.default_scopes.push(Arc::new(scope));
        self
    }

    /// Declares a named scope, replacing any scope of the same name.
    pub fn scope<F>(mut self, name: impl Into<String>, scope: F) -> Self
    where
        F: Fn(&Relation) -> Relation + Send + Sync + 'static,
    {
        self.schema.named_scopes.insert(name.into(), Arc::new(scope));
        self
    }

    /// Adds a validation rule.
    pub fn validates<V: Validator + 'static>(mut self, validator: V) -> Self {
        self.schema.validators.push(Arc::new(validator));
        self
    }

    /// Requires the listed attributes to be present.
    pub fn validates_presence_of<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validates(Presence::of(names))
    }

    /// Adds a hook that runs before each write.
    pub fn before_write<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Metric) + Send + Sync + 'static,
    {
        self.schema.before_write.push(Arc::new(hook));
        self
    }

    /// Adds a hook that runs after each successful write.
    pub fn after_write<F>(mut self, hook: F) -> Self
    where
        F: Fn(&Metric) + Send + Sync + 'static,
    {
        self.schema.after_write.push(Arc::new(hook));
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> Arc<Schema> {
        tracing::trace!(
            class = %self.schema.class_name,
            tags = self.schema.tag_names.len(),
            attributes = self.schema.attributes.len(),
            "declared metric schema"
        );
        Arc::new(self.schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn market() -> Arc<Schema> {
        SchemaBuilder::new("MarketMetrics")
            .measurement("market")
            .retention("monthly")
            .precision(Precision::Nanoseconds)
            .tag("symbol", FieldOptions::new().with_default("USDRUR"))
            .tag(
                "exchange_id",
                FieldOptions::typed(FieldType::Integer).with_default(1234),
            )
            .tags(["market_id", "site_id"], FieldOptions::typed(FieldType::Integer))
            .fields(
                ["price", "price_high", "price_low"],
                FieldOptions::typed(FieldType::Float),
            )
            .field(
                "price_delta",
                FieldOptions::typed(FieldType::Float).with_default(0),
            )
            .attributes(["volume", "ask", "bid"])
            .build()
    }

    #[test]
    fn test_declarations() {
        let schema = market();

        assert_eq!(
            schema.tag_names(),
            ["symbol", "exchange_id", "market_id", "site_id"]
        );
        assert_eq!(schema.field_type("price"), Some(FieldType::Float));
        assert_eq!(schema.field_type("site_id"), Some(FieldType::Integer));
        assert_eq!(schema.field_type("symbol"), None);
        assert_eq!(schema.field_type("volume"), None);
        assert_eq!(schema.defaults().get("symbol"), Some(&Value::from("USDRUR")));
        assert_eq!(schema.defaults().get("exchange_id"), Some(&Value::from(1234)));
        assert_eq!(schema.defaults().get("price_delta"), Some(&Value::from(0)));
        assert_eq!(schema.retention_policy(), Some("monthly"));
        assert_eq!(schema.time_precision(), Some(Precision::Nanoseconds));

        assert_eq!(schema.attribute("symbol").unwrap().kind, AttributeKind::Tag);
        assert_eq!(schema.attribute("price").unwrap().kind, AttributeKind::Field);
        assert_eq!(schema.attribute("volume").unwrap().kind, AttributeKind::Plain);
        assert!(schema.attribute("unknown").is_none());
        assert_eq!(schema.attribute_names().count(), 11);
    }

    #[test]
    fn test_tag_and_field_never_overlap() {
        let schema = SchemaBuilder::new("X")
            .field("host", FieldOptions::typed(FieldType::String))
            .tag("host", FieldOptions::new())
            .field("host", FieldOptions::new())
            .attributes(["host"])
            .build();

        let decl = schema.attribute("host").unwrap();
        assert_eq!(decl.kind, AttributeKind::Tag);
        assert_eq!(decl.ty, Some(FieldType::String));
        assert_eq!(schema.tag_names(), ["host"]);
    }

    #[test]
    fn test_null_default_is_not_recorded() {
        let schema = SchemaBuilder::new("X")
            .field("a", FieldOptions::new().with_default(Value::Null))
            .build();
        assert!(schema.defaults().is_empty());
    }

    #[test]
    fn test_default_series_inference() {
        assert_eq!(
            SchemaBuilder::new("MarketMetrics").build().quoted_series(None),
            r#""market""#
        );
        assert_eq!(
            SchemaBuilder::new("CpuLoad").build().quoted_series(None),
            r#""cpu_load""#
        );
    }

    #[test]
    fn test_subclass_isolation() {
        let parent = market();
        let child = parent
            .derive("Ticker")
            .tag("venue", FieldOptions::new())
            .default_scope(|rel| rel.where_eq("venue", "lse"))
            .build();

        assert!(child.is_tag("venue"));
        assert!(child.is_tag("symbol"));
        assert!(!parent.is_tag("venue"));
        assert_eq!(parent.tag_names().len(), 4);
        assert_eq!(child.default_scopes().len(), 1);
        assert!(parent.default_scopes().is_empty());

        // no `…Metrics` suffix: inherits the parent's series
        assert_eq!(child.quoted_series(None), r#""monthly"."market""#);
    }

    #[test]
    fn test_sibling_isolation() {
        let base = SchemaBuilder::new("BaseMetrics")
            .tag("host", FieldOptions::new())
            .build();
        let a = base.derive("AMetrics").tag("a", FieldOptions::new()).build();
        let b = base.derive("BMetrics").build();

        assert!(a.is_tag("a"));
        assert!(!b.is_tag("a"));
        assert_eq!(a.quoted_series(None), r#""a""#);
        assert_eq!(b.quoted_series(None), r#""b""#);
        assert_eq!(base.quoted_series(None), r#""base""#);
    }

    #[test]
    fn test_measurements() {
        let schema = SchemaBuilder::new("PairMetrics")
            .measurements(vec!["cpu".to_string(), "mem".to_string()])
            .build();
        assert_eq!(schema.quoted_series(None), r#"merge("cpu","mem")"#);
    }

    #[test]
    fn test_write_series_drops_retention() {
        let schema = market();
        assert_eq!(schema.write_series(None), r#""market""#);
    }
}
