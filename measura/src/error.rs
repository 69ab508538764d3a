//! Error types for measura.

use thiserror::Error;

use crate::validation::ValidationErrors;

/// The main error type for all measura operations.
///
/// Casting and series resolution never fail, so every variant here comes from
/// either misuse of a metric instance, an unparseable timestamp, the
/// process-wide configuration, or the external write client.
#[derive(Error, Debug)]
pub enum Error {
    /// Misuse of a metric instance, or a failed strict write.
    #[error("metrics error: {0}")]
    Metrics(#[from] MetricsError),

    /// A timestamp could not be converted for the write client.
    #[error("timestamp error: {0}")]
    Timestamp(#[from] TimestampError),

    /// The write client rejected or failed to deliver a point.
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The process-wide configuration could not be installed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by metric instances.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// The instance has already been written once.
    #[error("{class} instance has already been persisted")]
    AlreadyPersisted {
        /// Class name of the offending metric.
        class: String,
    },

    /// The attribute is not declared on the schema.
    #[error("unknown attribute '{name}' for {class}")]
    UnknownAttribute {
        /// Class name of the metric.
        class: String,
        /// The undeclared attribute name.
        name: String,
    },

    /// Validation failed during a strict write.
    #[error(transparent)]
    Invalid(#[from] MetricsInvalid),
}

/// Validation failure reported by [`Metric::write_strict`](crate::Metric::write_strict).
#[derive(Error, Debug, Clone)]
#[error("{class} is invalid: {errors}")]
pub struct MetricsInvalid {
    /// Class name of the invalid metric.
    pub class: String,
    /// The collected validation messages.
    pub errors: ValidationErrors,
}

/// Errors that can occur while converting a timestamp to nanoseconds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimestampError {
    /// The textual timestamp is not a recognised date or date-time.
    #[error("cannot parse timestamp '{input}'")]
    Unparseable {
        /// The rejected input.
        input: String,
    },

    /// The converted value does not fit in a signed 64-bit nanosecond count.
    #[error("timestamp '{input}' is out of range for nanosecond precision")]
    OutOfRange {
        /// The rejected input, rendered as text.
        input: String,
    },
}

/// Errors reported by a [`WriteClient`](crate::client::WriteClient).
#[derive(Error, Debug)]
pub enum ClientError {
    /// The client refused the point.
    #[error("write to '{series}' rejected: {reason}")]
    Rejected {
        /// The unquoted series the point was destined for.
        series: String,
        /// Why the point was rejected.
        reason: String,
    },

    /// The client's own transport failed.
    #[error("transport failure: {source}")]
    Transport {
        /// The underlying error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Errors raised by the process-wide configuration.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration has already been installed for this process.
    #[error("configuration has already been installed")]
    AlreadyInstalled,

    /// The precision token is not recognised.
    #[error("invalid time precision '{token}'")]
    InvalidPrecision {
        /// The rejected token.
        token: String,
    },
}

/// Type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
