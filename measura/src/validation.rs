//! Validation collaborator for metric instances.
//!
//! Validation runs after attributes have been cast, right before a write.
//! Rules are supplied by the schema as [`Validator`] implementations; this
//! module only ships the presence rule, which covers the common case of
//! required tags and fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::metric::Metric;
use crate::value::Value;

/// A single validation rule attached to a schema.
///
/// Any `Fn(&Metric, &mut ValidationErrors)` closure is a validator, so ad-hoc
/// rules can be declared inline.
pub trait Validator: Send + Sync {
    /// Checks `metric` and records every problem found in `errors`.
    fn validate(&self, metric: &Metric, errors: &mut ValidationErrors);
}

impl<F> Validator for F
where
    F: Fn(&Metric, &mut ValidationErrors) + Send + Sync,
{
    fn validate(&self, metric: &Metric, errors: &mut ValidationErrors) {
        self(metric, errors);
    }
}

/// Collected validation messages, keyed by attribute name.
///
/// Messages keep the order in which they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    entries: Vec<(String, String)>,
}

impl ValidationErrors {
    /// Records `message` against `attribute`.
    pub fn add(&mut self, attribute: impl Into<String>, message: impl Into<String>) {
        self.entries.push((attribute.into(), message.into()));
    }

    /// Returns `true` when no message has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of recorded messages.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Messages recorded against `attribute`.
    pub fn on<'a>(&'a self, attribute: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(name, _)| name == attribute)
            .map(|(_, message)| message.as_str())
    }

    /// All `(attribute, message)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(name, message)| (name.as_str(), message.as_str()))
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, message)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name} {message}")?;
        }
        Ok(())
    }
}

/// Requires each listed attribute to hold a non-blank value.
///
/// Missing attributes, `Null`, `false` and whitespace-only strings are blank.
#[derive(Debug, Clone)]
pub struct Presence {
    names: Vec<String>,
}

impl Presence {
    /// Creates a presence rule over `names`.
    pub fn of<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Validator for Presence {
    fn validate(&self, metric: &Metric, errors: &mut ValidationErrors) {
        for name in &self.names {
            if metric.get(name).is_none_or(Value::is_blank) {
                errors.add(name.clone(), "can't be blank");
            }
        }
    }
}
