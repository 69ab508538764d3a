//! Series-name specification and resolution.
//!
//! A schema names the series ("measurement") its points are written into with
//! a [`SeriesSpec`], which can be a literal name, a list of alternatives
//! that are merged into one query expression, a function computed from the
//! metric instance, or a regular expression. [`resolve`] turns any of these
//! into the quoted expression used in queries.
//!
//! # Example
//!
//! ```rust
//! use measura::series::{resolve, SeriesSpec};
//!
//! let spec = SeriesSpec::from(["cpu", "memory"]);
//! assert_eq!(resolve(&spec, None, None), r#"merge("cpu","memory")"#);
//! assert_eq!(
//!     resolve(&SeriesSpec::from("cpu"), Some("monthly"), None),
//!     r#""monthly"."cpu""#
//! );
//! ```

use std::fmt;
use std::sync::{Arc, LazyLock};

use regex::Regex;

use crate::metric::Metric;

static METRICS_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*)Metrics$").expect("invalid regex"));
static ACRONYM_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([A-Z\d]+)([A-Z][a-z])").expect("invalid regex"));
static WORD_BOUNDARY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z\d])([A-Z])").expect("invalid regex"));

/// A function computing a series spec from a metric instance.
///
/// Receives `None` when the series is resolved for a query rather than for a
/// write.
pub type SeriesFn = Arc<dyn Fn(Option<&Metric>) -> SeriesSpec + Send + Sync>;

/// How a schema names its series.
#[derive(Clone)]
pub enum SeriesSpec {
    /// A single series name.
    Literal(String),
    /// Alternatives merged into one expression (a single element is unwrapped).
    List(Vec<SeriesSpec>),
    /// Computed per instance; the result is resolved again.
    Computed(SeriesFn),
    /// A regular expression over series names, rendered as `/pattern/`.
    Pattern(String),
}

impl SeriesSpec {
    /// Wraps a function as a computed spec.
    pub fn computed<F>(f: F) -> Self
    where
        F: Fn(Option<&Metric>) -> SeriesSpec + Send + Sync + 'static,
    {
        SeriesSpec::Computed(Arc::new(f))
    }

    /// Creates a regular-expression spec.
    pub fn pattern(pattern: impl Into<String>) -> Self {
        SeriesSpec::Pattern(pattern.into())
    }
}

impl fmt::Debug for SeriesSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesSpec::Literal(name) => f.debug_tuple("Literal").field(name).finish(),
            SeriesSpec::List(items) => f.debug_tuple("List").field(items).finish(),
            SeriesSpec::Computed(_) => f.write_str("Computed(<fn>)"),
            SeriesSpec::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
        }
    }
}

impl From<&str> for SeriesSpec {
    fn from(name: &str) -> Self {
        SeriesSpec::Literal(name.to_string())
    }
}

impl From<String> for SeriesSpec {
    fn from(name: String) -> Self {
        SeriesSpec::Literal(name)
    }
}

impl<T: Into<SeriesSpec>> From<Vec<T>> for SeriesSpec {
    fn from(items: Vec<T>) -> Self {
        SeriesSpec::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<SeriesSpec>, const N: usize> From<[T; N]> for SeriesSpec {
    fn from(items: [T; N]) -> Self {
        SeriesSpec::List(items.into_iter().map(Into::into).collect())
    }
}

/// Resolves `spec` into a quoted series expression.
///
/// - `Literal` is quoted and, when `retention_policy` is set and non-empty,
///   qualified as `"rp"."name"`.
/// - `Computed` is called with `instance` and its result resolved again.
/// - `List` with more than one element becomes `merge(a,b,...)`, each element
///   resolved (and qualified) on its own. One element resolves to itself; an
///   empty list resolves like an empty name.
/// - `Pattern` renders as `/pattern/` and is never qualified.
///
/// A panicking computed spec propagates to the caller.
pub fn resolve(
    spec: &SeriesSpec,
    retention_policy: Option<&str>,
    instance: Option<&Metric>,
) -> String {
    match spec {
        SeriesSpec::Literal(name) => qualify(name, retention_policy),
        SeriesSpec::Pattern(pattern) => format!("/{pattern}/"),
        SeriesSpec::Computed(f) => resolve(&f(instance), retention_policy, instance),
        SeriesSpec::List(items) if items.len() > 1 => {
            let parts: Vec<String> = items
                .iter()
                .map(|item| resolve(item, retention_policy, instance))
                .collect();
            format!("merge({})", parts.join(","))
        }
        SeriesSpec::List(items) => match items.first() {
            Some(item) => resolve(item, retention_policy, instance),
            None => qualify("", retention_policy),
        },
    }
}

fn qualify(name: &str, retention_policy: Option<&str>) -> String {
    match retention_policy.filter(|rp| !rp.is_empty()) {
        Some(rp) => format!("{}.{}", quote(rp), quote(name)),
        None => quote(name),
    }
}

/// Wraps `name` in double quotes, escaping embedded double quotes.
///
/// ```rust
/// use measura::series::quote;
///
/// assert_eq!(quote(r#"he said "hi""#), r#""he said \"hi\"""#);
/// ```
pub fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\\\""))
}

/// Strips one leading and one trailing quote character (`'` or `"`).
///
/// Quotes anywhere else in the string are left alone.
pub fn unquote(name: &str) -> &str {
    let is_quote = |c: char| c == '"' || c == '\'';
    let name = name.strip_prefix(is_quote).unwrap_or(name);
    name.strip_suffix(is_quote).unwrap_or(name)
}

/// Infers the default series for a metric class.
///
/// A `…Metrics` class name yields the prefix with `::` turned into `_` and
/// underscored (`Market::TradeMetrics` → `market_trade`). Otherwise the
/// ancestor's series is inherited, and without an ancestor the whole class
/// name is underscored.
pub fn infer_series_name(class_name: &str, ancestor: Option<&SeriesSpec>) -> SeriesSpec {
    if let Some(captures) = METRICS_SUFFIX.captures(class_name) {
        let prefix = captures[1].split("::").collect::<Vec<_>>().join("_");
        return SeriesSpec::Literal(underscore(&prefix));
    }

    match ancestor {
        Some(spec) => spec.clone(),
        None => SeriesSpec::Literal(underscore(&class_name.replace("::", "_"))),
    }
}

/// Converts a CamelCase name to snake_case (`HTTPServer` → `http_server`).
pub fn underscore(name: &str) -> String {
    let name = ACRONYM_BOUNDARY.replace_all(name, "${1}_${2}");
    let name = WORD_BOUNDARY.replace_all(&name, "${1}_${2}");
    name.replace('-', "_").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal() {
        assert_eq!(resolve(&"cpu".into(), None, None), r#""cpu""#);
        assert_eq!(resolve(&"cpu".into(), Some("rp"), None), r#""rp"."cpu""#);
        assert_eq!(resolve(&"cpu".into(), Some(""), None), r#""cpu""#);
    }

    #[test]
    fn test_embedded_quotes() {
        let spec = SeriesSpec::from(r#"he said "hi""#);
        assert_eq!(resolve(&spec, None, None), r#""he said \"hi\"""#);
    }

    #[test]
    fn test_list() {
        assert_eq!(resolve(&["a", "b"].into(), None, None), r#"merge("a","b")"#);
        assert_eq!(resolve(&["a"].into(), None, None), r#""a""#);
        assert_eq!(
            resolve(&["a", "b"].into(), Some("rp"), None),
            r#"merge("rp"."a","rp"."b")"#
        );
        assert_eq!(resolve(&SeriesSpec::List(vec![]), None, None), r#""""#);
    }

    #[test]
    fn test_computed_is_resolved_recursively() {
        let spec = SeriesSpec::computed(|_| SeriesSpec::from(vec!["x", "y"]));
        assert_eq!(resolve(&spec, None, None), r#"merge("x","y")"#);

        let nested = SeriesSpec::computed(|_| SeriesSpec::computed(|_| "deep".into()));
        assert_eq!(resolve(&nested, Some("rp"), None), r#""rp"."deep""#);
    }

    #[test]
    fn test_list_with_computed_and_pattern() {
        let spec = SeriesSpec::List(vec![
            SeriesSpec::computed(|_| "a".into()),
            SeriesSpec::pattern("^cpu_.*"),
        ]);
        assert_eq!(resolve(&spec, Some("rp"), None), r#"merge("rp"."a",/^cpu_.*/)"#);
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""cpu""#), "cpu");
        assert_eq!(unquote("'cpu'"), "cpu");
        assert_eq!(unquote(r#""rp"."cpu""#), r#"rp"."cpu"#);
        assert_eq!(unquote("cpu"), "cpu");
        assert_eq!(unquote(r#"""#), "");
    }

    #[test]
    fn test_infer_series_name() {
        let name = |spec: SeriesSpec| match spec {
            SeriesSpec::Literal(name) => name,
            other => panic!("expected literal, got {other:?}"),
        };

        assert_eq!(name(infer_series_name("MarketMetrics", None)), "market");
        assert_eq!(
            name(infer_series_name("Exchange::OrderBookMetrics", None)),
            "exchange_order_book"
        );
        assert_eq!(name(infer_series_name("CpuLoad", None)), "cpu_load");
        assert_eq!(name(infer_series_name("Infra::HTTPServer", None)), "infra_http_server");

        let parent = SeriesSpec::from("market");
        assert_eq!(name(infer_series_name("Ticker", Some(&parent))), "market");
        assert_eq!(name(infer_series_name("TickerMetrics", Some(&parent))), "ticker");
    }

    #[test]
    fn test_underscore() {
        assert_eq!(underscore("HTTPServer"), "http_server");
        assert_eq!(underscore("Cpu2Load"), "cpu2_load");
        assert_eq!(underscore("dash-case"), "dash_case");
        assert_eq!(underscore("already_snake"), "already_snake");
    }
}
