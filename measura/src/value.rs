//! Attribute values and type casting.
//!
//! Every attribute of a metric instance holds a [`Value`]. Typed tags and
//! fields are coerced through [`Value::cast`] whenever they are assigned and
//! again right before a write. Casting is total: malformed input degrades to
//! a best-effort value instead of failing, and upstream validation is
//! expected to catch semantic problems.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static FLOAT_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[+-]?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?").expect("invalid regex")
});
static INTEGER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*[+-]?\d+").expect("invalid regex"));

/// A single attribute value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// A boolean.
    Bool(bool),
    /// A whole number.
    Integer(i64),
    /// A number with a fractional part.
    Float(f64),
    /// Text.
    String(String),
}

/// Declared type of a tag or field.
///
/// Parsing is lenient: any unrecognised token becomes [`FieldType::Untyped`],
/// which casts as a passthrough.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Cast to [`Value::Float`].
    Float,
    /// Alias of `Float`.
    Decimal,
    /// Cast to [`Value::Integer`].
    Integer,
    /// Alias of `Integer`.
    Number,
    /// Cast to [`Value::String`].
    String,
    /// No casting.
    #[serde(other)]
    Untyped,
}

impl Value {
    /// Casts this value to `ty`.
    ///
    /// - `Float`/`Decimal` produce [`Value::Float`], with `NaN` read as `0.0`
    /// - `Integer`/`Number` produce [`Value::Integer`], truncating fractions
    /// - `String` produces [`Value::String`]
    /// - `Untyped` returns the value unchanged
    ///
    /// Strings are read by their longest leading numeric prefix, so `"12.5kg"`
    /// becomes `12.5` and `"abc"` becomes `0`. Casting an already cast value
    /// to the same type returns it unchanged.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use measura::value::{FieldType, Value};
    ///
    /// assert_eq!(Value::from("42abc").cast(FieldType::Integer), Value::Integer(42));
    /// assert_eq!(Value::from(7).cast(FieldType::Float), Value::Float(7.0));
    /// assert_eq!(Value::Null.cast(FieldType::String), Value::from(""));
    /// ```
    pub fn cast(&self, ty: FieldType) -> Value {
        match ty {
            FieldType::Float | FieldType::Decimal => {
                let f = self.to_f64();
                Value::Float(if f.is_nan() { 0.0 } else { f })
            }
            FieldType::Integer | FieldType::Number => Value::Integer(self.to_i64()),
            FieldType::String => Value::String(self.to_text()),
            FieldType::Untyped => self.clone(),
        }
    }

    /// Best-effort numeric interpretation with a fractional part.
    #[allow(clippy::cast_precision_loss)] // i64 -> f64 is the documented coercion
    pub fn to_f64(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Integer(i) => *i as f64,
            Value::Float(f) => *f,
            Value::String(s) => FLOAT_PREFIX
                .find(s)
                .and_then(|m| m.as_str().trim_start().parse().ok())
                .unwrap_or(0.0),
        }
    }

    /// Best-effort whole-number interpretation.
    ///
    /// Fractions are truncated toward zero, out-of-range values saturate and
    /// non-finite floats become zero.
    #[allow(clippy::cast_possible_truncation)] // saturating float -> int is intended
    pub fn to_i64(&self) -> i64 {
        match self {
            Value::Null => 0,
            Value::Bool(b) => i64::from(*b),
            Value::Integer(i) => *i,
            Value::Float(f) if f.is_finite() => f.trunc() as i64,
            Value::Float(_) => 0,
            Value::String(s) => INTEGER_PREFIX
                .find(s)
                .map(|m| parse_saturating(m.as_str().trim_start()))
                .unwrap_or(0),
        }
    }

    /// Textual representation. `Null` renders as the empty string.
    pub fn to_text(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) if f.is_finite() && f.fract() == 0.0 => format!("{f:.1}"),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
        }
    }

    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns `true` for `Null`, `false` and whitespace-only strings.
    pub fn is_blank(&self) -> bool {
        match self {
            Value::Null | Value::Bool(false) => true,
            Value::String(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// The integer payload, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// The numeric payload as `f64`, if this is a number.
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// The string payload, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

fn parse_saturating(digits: &str) -> i64 {
    digits.parse().unwrap_or_else(|_| {
        if digits.starts_with('-') {
            i64::MIN
        } else {
            i64::MAX
        }
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_text())
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(f64::from(v))
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(0.0)),
            },
            serde_json::Value::String(s) => Value::String(s),
            other => Value::String(other.to_string()),
        }
    }
}

impl FieldType {
    /// The lowercase token for this type.
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::Float => "float",
            FieldType::Decimal => "decimal",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::String => "string",
            FieldType::Untyped => "untyped",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "float" => FieldType::Float,
            "decimal" => FieldType::Decimal,
            "integer" => FieldType::Integer,
            "number" => FieldType::Number,
            "string" => FieldType::String,
            _ => FieldType::Untyped,
        })
    }
}
