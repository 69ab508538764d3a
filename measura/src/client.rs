//! The write-client boundary.
//!
//! A metric hands its point to a [`WriteClient`] as
//! `(series, point, precision, retention_policy)`. How the point travels
//! (line protocol, JSON, batching, retries) is entirely the client's
//! business. [`MemoryClient`] is an in-process implementation that records
//! every write, used for tests, benchmarks and dry runs.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::error::ClientError;
use crate::line_protocol;
use crate::timestamp::{Precision, Timestamp};
use crate::value::Value;

/// The payload of one write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// Tag attributes.
    pub tags: BTreeMap<String, Value>,
    /// Field and plain attributes.
    pub values: BTreeMap<String, Value>,
    /// Timestamp, already converted to nanoseconds when the client asks for
    /// nanosecond precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

/// Destination for metric points.
pub trait WriteClient {
    /// Precision the client is configured for.
    ///
    /// When this is [`Precision::Nanoseconds`], timestamps are converted to
    /// integer nanoseconds before the point is handed over.
    fn time_precision(&self) -> Precision;

    /// Writes one point to `series`.
    ///
    /// # Errors
    ///
    /// Returns a [`ClientError`] when the point is rejected or cannot be
    /// delivered.
    fn write_point(
        &self,
        series: &str,
        point: &Point,
        precision: Precision,
        retention_policy: Option<&str>,
    ) -> Result<(), ClientError>;
}

impl<T: WriteClient + ?Sized> WriteClient for &T {
    fn time_precision(&self) -> Precision {
        (**self).time_precision()
    }

    fn write_point(
        &self,
        series: &str,
        point: &Point,
        precision: Precision,
        retention_policy: Option<&str>,
    ) -> Result<(), ClientError> {
        (**self).write_point(series, point, precision, retention_policy)
    }
}

impl<T: WriteClient + ?Sized> WriteClient for Arc<T> {
    fn time_precision(&self) -> Precision {
        (**self).time_precision()
    }

    fn write_point(
        &self,
        series: &str,
        point: &Point,
        precision: Precision,
        retention_policy: Option<&str>,
    ) -> Result<(), ClientError> {
        (**self).write_point(series, point, precision, retention_policy)
    }
}

/// A write recorded by [`MemoryClient`].
#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPoint {
    /// The unquoted series name.
    pub series: String,
    /// The point as handed over.
    pub point: Point,
    /// Precision the metric declared.
    pub precision: Precision,
    /// Retention policy the metric declared.
    pub retention_policy: Option<String>,
    /// The point rendered as a line-protocol line, or `None` when the point
    /// has no representable field.
    pub line: Option<String>,
}

/// In-process client that records writes instead of sending them.
///
/// # Example
///
/// ```rust
/// use measura::client::{MemoryClient, Point, WriteClient};
/// use measura::timestamp::Precision;
///
/// let client = MemoryClient::new();
/// client
///     .write_point("cpu", &Point::default(), Precision::Seconds, None)
///     .unwrap();
/// assert_eq!(client.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MemoryClient {
    precision: Precision,
    reject_with: Option<String>,
    writes: Mutex<Vec<WrittenPoint>>,
}

impl MemoryClient {
    /// A client configured for nanosecond precision.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the client's configured precision.
    #[must_use]
    pub fn with_time_precision(mut self, precision: Precision) -> Self {
        self.precision = precision;
        self
    }

    /// Makes every write fail with [`ClientError::Rejected`].
    #[must_use]
    pub fn rejecting(mut self, reason: impl Into<String>) -> Self {
        self.reject_with = Some(reason.into());
        self
    }

    /// Every recorded write, oldest first.
    pub fn writes(&self) -> Vec<WrittenPoint> {
        self.lock().clone()
    }

    /// The line-protocol rendering of every recorded write that has one.
    pub fn lines(&self) -> Vec<String> {
        self.lock().iter().filter_map(|w| w.line.clone()).collect()
    }

    /// Number of recorded writes.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Forgets every recorded write.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, Vec<WrittenPoint>> {
        self.writes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl WriteClient for MemoryClient {
    fn time_precision(&self) -> Precision {
        self.precision
    }

    fn write_point(
        &self,
        series: &str,
        point: &Point,
        precision: Precision,
        retention_policy: Option<&str>,
    ) -> Result<(), ClientError> {
        if let Some(reason) = &self.reject_with {
            return Err(ClientError::Rejected {
                series: series.to_string(),
                reason: reason.clone(),
            });
        }

        self.lock().push(WrittenPoint {
            series: series.to_string(),
            point: point.clone(),
            precision,
            retention_policy: retention_policy.map(str::to_string),
            line: line_protocol::render(series, point),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point() -> Point {
        Point {
            tags: BTreeMap::from([("host".to_string(), Value::from("web1"))]),
            values: BTreeMap::from([("load".to_string(), Value::from(0.5))]),
            timestamp: Some(Timestamp::Epoch(1_700_000_000_000_000_000)),
        }
    }

    #[test]
    fn test_records_writes() {
        let client = MemoryClient::new().with_time_precision(Precision::Seconds);
        assert_eq!(client.time_precision(), Precision::Seconds);
        assert!(client.is_empty());

        client
            .write_point("cpu", &point(), Precision::Milliseconds, Some("weekly"))
            .unwrap();

        let writes = client.writes();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].series, "cpu");
        assert_eq!(writes[0].precision, Precision::Milliseconds);
        assert_eq!(writes[0].retention_policy.as_deref(), Some("weekly"));
        assert_eq!(client.lines(), ["cpu,host=web1 load=0.5 1700000000000000000"]);

        client.clear();
        assert!(client.is_empty());
    }

    #[test]
    fn test_fieldless_point_records_no_line() {
        let client = MemoryClient::new();
        let point = Point {
            tags: BTreeMap::from([("host".to_string(), Value::from("a"))]),
            ..Point::default()
        };
        client
            .write_point("host", &point, Precision::Seconds, None)
            .unwrap();

        assert_eq!(client.len(), 1);
        assert_eq!(client.writes()[0].line, None);
        assert!(client.lines().is_empty());
    }

    #[test]
    fn test_rejecting_client() {
        let client = MemoryClient::new().rejecting("database not found");
        let err = client
            .write_point("cpu", &point(), Precision::Seconds, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "write to 'cpu' rejected: database not found");
        assert!(client.is_empty());
    }

    #[test]
    fn test_blanket_impls() {
        let client = Arc::new(MemoryClient::new());
        let by_ref: &dyn WriteClient = &*client;
        by_ref
            .write_point("cpu", &point(), Precision::Seconds, None)
            .unwrap();
        (&client)
            .write_point("cpu", &point(), Precision::Seconds, None)
            .unwrap();
        assert_eq!(client.len(), 2);
    }

    #[test]
    fn test_point_json_shape() {
        let json = serde_json::to_value(point()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "tags": {"host": "web1"},
                "values": {"load": 0.5},
                "timestamp": 1_700_000_000_000_000_000i64
            })
        );
    }
}
