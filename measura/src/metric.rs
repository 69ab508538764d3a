//! Metric instances and the write pipeline.
//!
//! A [`Metric`] is one record of a schema: an attribute store seeded from the
//! schema's defaults, an optional timestamp, and a persisted flag. Attributes
//! are read and written through two generic accessors, [`Metric::get`] and
//! [`Metric::set`], driven by the schema's attribute table.
//!
//! # Write Flow
//!
//! 1. Every typed tag and field is cast in place
//! 2. An instance that was already written fails with
//!    [`MetricsError::AlreadyPersisted`]
//! 3. Validation runs; [`Metric::write`] returns `Ok(None)` for an invalid
//!    instance, [`Metric::write_strict`] fails with [`MetricsInvalid`]
//! 4. `before_write` hooks run, the point is built and handed to the client,
//!    then `after_write` hooks run
//! 5. The instance is marked persisted and returned
//!
//! # Example
//!
//! ```rust
//! use measura::client::MemoryClient;
//! use measura::metric::Metric;
//! use measura::schema::{FieldOptions, SchemaBuilder};
//! use measura::value::FieldType;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = SchemaBuilder::new("CpuMetrics")
//!     .tag("host", FieldOptions::new())
//!     .field("load", FieldOptions::typed(FieldType::Float))
//!     .build();
//!
//! let client = MemoryClient::new();
//! let mut metric = Metric::with_attributes(&schema, [("host", "web1"), ("load", "0.75")])?;
//! metric.set_timestamp(1_700_000_000);
//!
//! assert!(metric.write(&client)?.is_some());
//! assert_eq!(client.lines(), ["cpu,host=web1 load=0.75 1700000000000000000"]);
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::client::{Point, WriteClient};
use crate::config::Config;
use crate::error::{MetricsError, MetricsInvalid, Result};
use crate::schema::Schema;
use crate::series::unquote;
use crate::timestamp::{Precision, Timestamp};
use crate::validation::ValidationErrors;
use crate::value::Value;

/// The attribute key that [`Metric::from_json`] reads as the timestamp.
const TIMESTAMP_KEY: &str = "timestamp";

/// One metric record.
#[derive(Clone)]
pub struct Metric {
    schema: Arc<Schema>,
    attributes: BTreeMap<String, Value>,
    timestamp: Option<Timestamp>,
    persisted: bool,
}

impl Metric {
    /// A new, unpersisted instance holding the schema's defaults.
    pub fn new(schema: &Arc<Schema>) -> Self {
        Self {
            schema: Arc::clone(schema),
            attributes: schema.defaults().clone(),
            timestamp: None,
            persisted: false,
        }
    }

    /// A new instance with `attributes` assigned through [`Metric::set`].
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UnknownAttribute`] for an undeclared name.
    pub fn with_attributes<I, K, V>(schema: &Arc<Schema>, attributes: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let mut metric = Self::new(schema);
        for (name, value) in attributes {
            metric.set(name.as_ref(), value)?;
        }
        Ok(metric)
    }

    /// A new instance from a JSON object.
    ///
    /// The `timestamp` key, if present, sets the timestamp: numbers become
    /// epoch values, strings are kept as text.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UnknownAttribute`] for an undeclared name.
    pub fn from_json(
        schema: &Arc<Schema>,
        object: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self> {
        let mut metric = Self::new(schema);
        for (name, value) in object {
            if name == TIMESTAMP_KEY && schema.attribute(name).is_none() {
                metric.timestamp = json_timestamp(value);
                continue;
            }
            metric.set(name, value.clone())?;
        }
        Ok(metric)
    }

    /// A fresh, unpersisted copy holding the same attributes.
    ///
    /// The timestamp is not carried over.
    pub fn duplicate(&self) -> Self {
        Self {
            schema: Arc::clone(&self.schema),
            attributes: self.attributes.clone(),
            timestamp: None,
            persisted: false,
        }
    }

    /// The schema this instance belongs to.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// The metric class name.
    pub fn class_name(&self) -> &str {
        self.schema.class_name()
    }

    /// The stored value of `name`, exactly as stored.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Assigns `name`.
    ///
    /// Typed tags and fields are cast before storing; plain attributes are
    /// stored as given.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::UnknownAttribute`] if `name` is not declared.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let Some(decl) = self.schema.attribute(name) else {
            return Err(MetricsError::UnknownAttribute {
                class: self.class_name().to_string(),
                name: name.to_string(),
            }
            .into());
        };

        let value = value.into();
        let value = match decl.ty {
            Some(ty) => value.cast(ty),
            None => value,
        };
        self.attributes.insert(name.to_string(), value);
        Ok(self)
    }

    /// Every stored attribute.
    pub fn attributes(&self) -> &BTreeMap<String, Value> {
        &self.attributes
    }

    /// Attributes that are declared tags.
    pub fn tags(&self) -> BTreeMap<String, Value> {
        self.partition(true)
    }

    /// Attributes that are not tags.
    pub fn values(&self) -> BTreeMap<String, Value> {
        self.partition(false)
    }

    fn partition(&self, tags: bool) -> BTreeMap<String, Value> {
        self.attributes
            .iter()
            .filter(|(name, _)| self.schema.is_tag(name) == tags)
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// The stored timestamp.
    pub fn timestamp(&self) -> Option<&Timestamp> {
        self.timestamp.as_ref()
    }

    /// Sets the timestamp.
    pub fn set_timestamp(&mut self, timestamp: impl Into<Timestamp>) -> &mut Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    /// Returns `true` once the instance has been written.
    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    /// The quoted, retention-qualified series for this instance.
    pub fn series(&self) -> String {
        self.schema.quoted_series(Some(self))
    }

    /// The schema's precision, or the process-wide default.
    pub fn time_precision(&self) -> Precision {
        self.schema
            .time_precision()
            .unwrap_or(Config::global().time_precision)
    }

    /// The schema's retention policy.
    pub fn retention_policy(&self) -> Option<&str> {
        self.schema.retention_policy()
    }

    /// Casts every typed tag and field in place.
    ///
    /// A typed name with no stored value is cast from `Null` and stored, so an
    /// unset integer becomes `0`.
    pub fn cast_types(&mut self) {
        for (name, ty) in self.schema.field_types() {
            let cast = self
                .attributes
                .get(name)
                .unwrap_or(&Value::Null)
                .cast(*ty);
            if !cast.is_null() {
                self.attributes.insert(name.clone(), cast);
            }
        }
    }

    /// Runs every validator and returns the collected messages.
    pub fn validation_errors(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for validator in self.schema.validators() {
            validator.validate(self, &mut errors);
        }
        errors
    }

    /// Returns `true` when no validator reports a problem.
    pub fn is_valid(&self) -> bool {
        self.validation_errors().is_empty()
    }

    /// Returns `true` when any validator reports a problem.
    pub fn is_invalid(&self) -> bool {
        !self.is_valid()
    }

    /// The timestamp as handed to a client configured for `client_precision`.
    ///
    /// Nanosecond clients get integer nanoseconds; any other client gets the
    /// stored timestamp unchanged. The stored timestamp is never modified.
    ///
    /// # Errors
    ///
    /// Returns a [`TimestampError`](crate::error::TimestampError) when the
    /// conversion fails.
    pub fn parsed_timestamp(&self, client_precision: Precision) -> Result<Option<Timestamp>> {
        match &self.timestamp {
            Some(ts) if client_precision == Precision::Nanoseconds => {
                Ok(Some(Timestamp::Epoch(ts.to_nanoseconds()?)))
            }
            other => Ok(other.clone()),
        }
    }

    /// The point this instance would be written as.
    ///
    /// # Errors
    ///
    /// Returns a [`TimestampError`](crate::error::TimestampError) when the
    /// timestamp cannot be converted.
    pub fn point(&self, client_precision: Precision) -> Result<Point> {
        Ok(Point {
            tags: self.tags(),
            values: self.values(),
            timestamp: self.parsed_timestamp(client_precision)?,
        })
    }

    /// Writes this instance through `client`.
    ///
    /// Returns `Ok(Some(self))` on success and `Ok(None)` when validation
    /// fails, in which case nothing is written and the instance stays
    /// unpersisted.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::AlreadyPersisted`] for a second write, and
    /// propagates timestamp and client errors.
    pub fn write<C: WriteClient + ?Sized>(&mut self, client: &C) -> Result<Option<&mut Self>> {
        let errors = self.prepare()?;
        if !errors.is_empty() {
            tracing::warn!(class = %self.class_name(), %errors, "skipping write of invalid metric");
            return Ok(None);
        }

        self.write_point(client)?;
        Ok(Some(self))
    }

    /// Writes this instance through `client`, failing when it is invalid.
    ///
    /// # Errors
    ///
    /// Returns [`MetricsError::Invalid`] when validation fails, plus every
    /// error [`Metric::write`] can return.
    pub fn write_strict<C: WriteClient + ?Sized>(&mut self, client: &C) -> Result<&mut Self> {
        let errors = self.prepare()?;
        if !errors.is_empty() {
            return Err(MetricsError::from(MetricsInvalid {
                class: self.class_name().to_string(),
                errors,
            })
            .into());
        }

        self.write_point(client)?;
        Ok(self)
    }

    fn prepare(&mut self) -> Result<ValidationErrors> {
        self.cast_types();
        if self.persisted {
            return Err(MetricsError::AlreadyPersisted {
                class: self.class_name().to_string(),
            }
            .into());
        }
        Ok(self.validation_errors())
    }

    fn write_point<C: WriteClient + ?Sized>(&mut self, client: &C) -> Result<()> {
        let schema = Arc::clone(&self.schema);

        for hook in schema.before_write_hooks() {
            hook(&mut *self);
        }

        let series = schema.write_series(Some(&*self));
        let series = unquote(&series);
        let point = self.point(client.time_precision())?;
        let precision = self.time_precision();

        tracing::debug!(
            class = %schema.class_name(),
            series,
            tags = point.tags.len(),
            values = point.values.len(),
            %precision,
            "writing point"
        );
        client.write_point(series, &point, precision, schema.retention_policy())?;
        self.persisted = true;

        for hook in schema.after_write_hooks() {
            hook(&*self);
        }
        Ok(())
    }
}

fn json_timestamp(value: &serde_json::Value) -> Option<Timestamp> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .map(Timestamp::Epoch)
            .or_else(|| n.as_f64().map(Timestamp::from)),
        serde_json::Value::String(s) => Some(Timestamp::Text(s.clone())),
        _ => None,
    }
}

impl fmt::Debug for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metric")
            .field("class", &self.class_name())
            .field("attributes", &self.attributes)
            .field("timestamp", &self.timestamp)
            .field("persisted", &self.persisted)
            .finish()
    }
}
