//! Demonstrates the logging formats.
//!
//! Run with: `cargo run --example logging_demo -p core-runtime`

use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};

fn main() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Pretty)
        .with_level(LogLevel::Debug);

    init_logging(config).expect("Failed to initialize logging");

    tracing::info!(tracks = 3, fields = 2, "query submitted");
    tracing::debug!(query_id = "00000000-0000-0000-0000-000000000000", "rendering SQL");
    tracing::warn!(error = "no such table: track_meta", "metadata query failed");
}
