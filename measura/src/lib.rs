//! # measura
//!
//! Declarative metric classes for InfluxDB-style time-series stores.
//!
//! measura lets an application declare a metric class once (its tags, fields,
//! types, defaults, series, retention policy and precision) and then build,
//! validate and write instances of it through a pluggable write client. It
//! also composes the class's default scopes into a query relation.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Tags and fields declared on a [`SchemaBuilder`], shared as `Arc<Schema>`
//! - Values cast to their declared type on assignment and again before writes
//! - Series names inferred from the class name, or given as lists, patterns
//!   or functions of the instance
//! - Derived schemas copy their parent's declarations; nothing leaks back
//! - No I/O of its own: points are handed to a [`WriteClient`]
//!
//! ## Quick Start
//!
//! ```rust
//! use measura::{FieldOptions, FieldType, MemoryClient, Metric, Precision, SchemaBuilder};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Declare a metric class
//! let schema = SchemaBuilder::new("MarketMetrics")
//!     .retention("monthly")
//!     .precision(Precision::Seconds)
//!     .tag("symbol", FieldOptions::new().with_default("USDRUR"))
//!     .tag("market_id", FieldOptions::typed(FieldType::Integer))
//!     .field("price", FieldOptions::typed(FieldType::Float))
//!     .attributes(["volume"])
//!     .validates_presence_of(["volume"])
//!     .build();
//!
//! // Build an instance; typed values are cast on assignment
//! let mut metric = Metric::new(&schema);
//! metric.set("market_id", "12")?.set("price", 99)?.set("volume", 10)?;
//! metric.set_timestamp(1_484_152_800);
//!
//! // Write it
//! let client = MemoryClient::new();
//! metric.write(&client)?;
//!
//! assert!(metric.is_persisted());
//! assert_eq!(
//!     client.lines(),
//!     ["market,market_id=12,symbol=USDRUR price=99.0,volume=10i 1484152800000000000"]
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Schema`] / [`SchemaBuilder`]: Declaration of one metric class
//! - [`Metric`]: One instance and its write pipeline
//! - [`SeriesSpec`]: Literal, list, pattern or computed series
//! - [`Relation`]: Filter state produced by scopes
//! - [`WriteClient`]: Destination for points; [`MemoryClient`] records them
//!
//! ## Modules
//!
//! - [`schema`]: Schema declaration and inheritance
//! - [`metric`]: Instances, casting, validation and writes
//! - [`series`]: Series resolution and name inference
//! - [`query`]: Relations
//! - [`scope`]: Default-scope composition
//! - [`value`]: Attribute values and casting rules
//! - [`timestamp`]: Timestamps and precisions
//! - [`validation`]: Validation rules and messages
//! - [`client`]: The write-client boundary
//! - [`line_protocol`]: Line-protocol rendering
//! - [`config`]: Process-wide configuration
//! - [`error`]: Error types

pub mod client;
pub mod config;
pub mod error;
pub mod line_protocol;
pub mod metric;
pub mod query;
pub mod schema;
pub mod scope;
pub mod series;
pub mod timestamp;
pub mod validation;
pub mod value;

// Re-export primary API types at crate root for convenience.
pub use client::{MemoryClient, Point, WriteClient};
pub use config::Config;
pub use error::{Error, MetricsError, MetricsInvalid, Result};
pub use metric::Metric;
pub use query::Relation;
pub use schema::{FieldOptions, Schema, SchemaBuilder};
pub use series::SeriesSpec;
pub use timestamp::{Precision, Timestamp};
pub use value::{FieldType, Value};
