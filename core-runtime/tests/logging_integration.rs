//! Integration tests for the logging system

use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};

#[test]
fn logging_initializes_once_per_process() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_spans(false);

    init_logging(config.clone()).expect("first initialization should succeed");

    // The global subscriber is already set; a second init must fail
    // instead of silently replacing it.
    assert!(init_logging(config).is_err());

    tracing::info!(component = "test", "logging initialized");
}

#[test]
fn config_survives_builder_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_filter("core_library=trace")
        .with_target(false);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert_eq!(config.filter.as_deref(), Some("core_library=trace"));
    assert!(!config.display_target);
}
