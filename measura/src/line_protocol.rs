//! Line-protocol rendering of write points.
//!
//! Produces one line per point:
//!
//! ```text
//! measurement[,tag=value...] field=value[,field=value...] [timestamp]
//! ```
//!
//! Measurements escape commas and spaces; tag keys, tag values and field keys
//! also escape `=`. String fields are double-quoted, integers carry an `i`
//! suffix. `Null` values, non-finite floats and empty tag values are
//! skipped, since the store cannot represent them. A point left without any
//! field has no line at all. Only integer (epoch) timestamps are rendered;
//! other shapes are left for the server to assign.

use crate::client::Point;
use crate::timestamp::Timestamp;
use crate::value::Value;

/// Renders `point` as a line destined for `series`.
///
/// Returns `None` when the point has no representable field.
///
/// # Examples
///
/// ```rust
/// use std::collections::BTreeMap;
///
/// use measura::client::Point;
/// use measura::line_protocol::render;
/// use measura::value::Value;
///
/// let point = Point {
///     tags: BTreeMap::from([("host".to_string(), Value::from("web 1"))]),
///     values: BTreeMap::from([("count".to_string(), Value::from(3))]),
///     timestamp: None,
/// };
/// assert_eq!(render("cpu", &point).as_deref(), Some(r"cpu,host=web\ 1 count=3i"));
/// ```
pub fn render(series: &str, point: &Point) -> Option<String> {
    let fields: Vec<String> = point
        .values
        .iter()
        .filter(|(_, value)| is_representable(value))
        .map(|(key, value)| format!("{}={}", escape_key(key), render_field(value)))
        .collect();
    if fields.is_empty() {
        return None;
    }

    let mut line = escape_measurement(series);

    for (key, value) in &point.tags {
        let text = value.to_text();
        if value.is_null() || text.is_empty() {
            continue;
        }
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(&text));
    }

    line.push(' ');
    line.push_str(&fields.join(","));

    if let Some(Timestamp::Epoch(ts)) = &point.timestamp {
        line.push(' ');
        line.push_str(&ts.to_string());
    }

    Some(line)
}

fn is_representable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Float(f) => f.is_finite(),
        _ => true,
    }
}

fn render_field(value: &Value) -> String {
    match value {
        Value::Integer(i) => format!("{i}i"),
        Value::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        other => other.to_text(),
    }
}

fn escape_measurement(name: &str) -> String {
    name.replace(',', "\\,").replace(' ', "\\ ")
}

fn escape_key(key: &str) -> String {
    key.replace(',', "\\,").replace('=', "\\=").replace(' ', "\\ ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(tags: &[(&str, Value)], values: &[(&str, Value)]) -> Point {
        Point {
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            values: values
                .iter()
                .map(|(k, v)| ((*k).to_string(), v.clone()))
                .collect(),
            timestamp: None,
        }
    }

    #[test]
    fn test_field_types() {
        let p = point(
            &[],
            &[
                ("b", Value::from(true)),
                ("f", Value::from(1.5)),
                ("i", Value::from(-2)),
                ("s", Value::from(r#"say "hi" \o/"#)),
            ],
        );
        assert_eq!(
            render("m", &p).unwrap(),
            r#"m b=true,f=1.5,i=-2i,s="say \"hi\" \\o/""#
        );
    }

    #[test]
    fn test_escaping() {
        let p = point(
            &[("data center", Value::from("us=east,1"))],
            &[("v", Value::from(1.0))],
        );
        assert_eq!(
            render("cpu load,x", &p).unwrap(),
            r"cpu\ load\,x,data\ center=us\=east\,1 v=1.0"
        );
    }

    #[test]
    fn test_skips_nulls_and_empty_tags() {
        let p = point(
            &[("a", Value::Null), ("b", Value::from("")), ("c", Value::from(7))],
            &[("x", Value::Null), ("y", Value::from(2))],
        );
        assert_eq!(render("m", &p).unwrap(), "m,c=7 y=2i");
    }

    #[test]
    fn test_skips_non_finite_floats() {
        let p = point(
            &[],
            &[
                ("a", Value::from(f64::INFINITY)),
                ("b", Value::from(f64::NAN)),
                ("c", Value::from(0.5)),
            ],
        );
        assert_eq!(render("x", &p).unwrap(), "x c=0.5");

        let p = point(&[], &[("v", Value::from(f64::INFINITY))]);
        assert_eq!(render("x", &p), None);
    }

    #[test]
    fn test_tags_only_point_has_no_line() {
        let p = point(&[("host", Value::from("a"))], &[]);
        assert_eq!(render("host", &p), None);

        let p = point(&[("host", Value::from("a"))], &[("v", Value::Null)]);
        assert_eq!(render("host", &p), None);
    }

    #[test]
    fn test_timestamp() {
        let mut p = point(&[], &[("v", Value::from(1))]);
        p.timestamp = Some(Timestamp::Epoch(42));
        assert_eq!(render("m", &p).unwrap(), "m v=1i 42");

        p.timestamp = Some(Timestamp::from("2020-01-01"));
        assert_eq!(render("m", &p).unwrap(), "m v=1i");
    }
}
