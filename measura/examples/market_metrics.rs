//! Walkthrough of declaring, validating, writing and scoping metrics.
//!
//! Run with `RUST_LOG=measura=debug cargo run -p measura --example market_metrics`
//! to see the library's tracing events.

use std::sync::Arc;

use measura::schema::Schema;
use measura::{
    Config, FieldOptions, FieldType, MemoryClient, Metric, Precision, SchemaBuilder, Value,
};
use tracing_subscriber::EnvFilter;

fn market_schema() -> Arc<Schema> {
    SchemaBuilder::new("MarketMetrics")
        .retention("monthly")
        .tag("symbol", FieldOptions::new().with_default("USDRUR"))
        .tags(["market_id", "site_id"], FieldOptions::typed(FieldType::Integer))
        .fields(["price", "price_high", "price_low"], FieldOptions::typed(FieldType::Float))
        .attributes(["volume"])
        .validates_presence_of(["volume"])
        .default_scope(|rel| rel.where_raw("time > now() - 1d"))
        .scope("usd", |rel| rel.where_eq("symbol", "USDRUR"))
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Everything not declaring its own precision writes in milliseconds
    Config::default()
        .with_time_precision(Precision::Milliseconds)
        .install()?;

    let market = market_schema();
    let client = MemoryClient::new();

    // A valid instance: string inputs are cast to the declared types
    let mut tick = Metric::with_attributes(
        &market,
        [
            ("market_id", Value::from("3")),
            ("price", Value::from("71.5")),
            ("volume", Value::from(1_200)),
        ],
    )?;
    tick.set_timestamp("2017-01-11 16:40:00");
    tick.write(&client)?;
    println!("wrote {} as {:?}", tick.series(), tick.time_precision());

    // An invalid instance is skipped
    let mut empty = Metric::new(&market);
    if empty.write(&client)?.is_none() {
        println!("skipped invalid metric: {}", empty.validation_errors());
    }

    // A derived class with a per-instance series
    let per_site = market
        .derive("SiteMarket")
        .measurement_fn(|metric| {
            let site = metric
                .and_then(|m| m.get("site_id"))
                .map_or_else(|| "all".to_string(), Value::to_text);
            format!("market_site_{site}").into()
        })
        .build();
    let mut site_tick = Metric::with_attributes(&per_site, [("site_id", 7), ("volume", 10)])?;
    site_tick.write(&client)?;

    println!();
    println!("Points handed to the client:");
    for write in client.writes() {
        println!(
            "  [{} / {}] {}",
            write.retention_policy.as_deref().unwrap_or("-"),
            write.precision,
            write.line.as_deref().unwrap_or("(no fields)")
        );
    }

    println!();
    println!("Queries:");
    println!("  {}", market.all());
    if let Some(usd) = market.all().scope("usd") {
        println!("  {usd}");
    }
    println!("  {}", market.unscoped().select(["max(price)"]).limit(10));

    Ok(())
}
