//! Integration tests for env-driven pipeline configuration.

use std::collections::HashMap;
use std::time::Duration;

use rebus_app::{
    ANALYSIS_TIMEOUT_ENV, AppError, CACHE_MAX_ENTRIES_ENV, CACHE_TTL_ENV, CONFIDENCE_FLOOR_ENV,
    FALLBACK_SCORE_ENV, JSON_LOGS_ENV, LOG_LEVEL_ENV, PipelineConfig,
};

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let values: HashMap<String, String> = pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();
    move |name| values.get(name).cloned()
}

#[test]
fn config_env_tests_applies_every_override() {
    let config = PipelineConfig::from_lookup(lookup(&[
        (ANALYSIS_TIMEOUT_ENV, "1500"),
        (CACHE_TTL_ENV, "60"),
        (CACHE_MAX_ENTRIES_ENV, "0"),
        (FALLBACK_SCORE_ENV, "65"),
        (CONFIDENCE_FLOOR_ENV, "25.5"),
        (LOG_LEVEL_ENV, "debug"),
        (JSON_LOGS_ENV, "true"),
    ]))
    .expect("overrides should parse");

    assert_eq!(config.analysis_timeout, Duration::from_millis(1_500));
    assert_eq!(config.cache_ttl, Duration::from_secs(60));
    assert_eq!(config.cache_max_entries, 0);
    assert_eq!(config.weights.fallback_score, 65.0);
    assert_eq!(config.weights.confidence_floor, 25.5);
    assert_eq!(config.log_level, "debug");
    assert!(config.json_logs);
    assert!(config.validate().is_ok());
}

#[test]
fn config_env_tests_blank_values_keep_defaults() {
    let config = PipelineConfig::from_lookup(lookup(&[(ANALYSIS_TIMEOUT_ENV, "  ")]))
        .expect("blank value should be ignored");
    assert_eq!(config, PipelineConfig::default());
}

#[test]
fn config_env_tests_unparseable_value_is_config_error() {
    let outcome = PipelineConfig::from_lookup(lookup(&[(CACHE_TTL_ENV, "an hour")]));
    match outcome {
        Err(AppError::Config(message)) => assert!(message.contains(CACHE_TTL_ENV)),
        other => panic!("expected config error, got {other:?}"),
    }
}

#[test]
fn config_env_tests_zero_timeout_fails_validation() {
    let config = PipelineConfig::from_lookup(lookup(&[(ANALYSIS_TIMEOUT_ENV, "0")]))
        .expect("zero should parse");
    assert!(matches!(config.validate(), Err(AppError::Config(_))));
}

#[test]
fn config_env_tests_out_of_range_fallback_fails_validation() {
    let config = PipelineConfig::from_lookup(lookup(&[(FALLBACK_SCORE_ENV, "10")]))
        .expect("value should parse");
    assert!(matches!(config.validate(), Err(AppError::Risk(_))));
}

#[test]
fn config_env_tests_reads_process_env() {
    // Safety:
    // - Integration tests mutate process env in a single-threaded test body.
    // - No other test in this binary touches this variable.
    // - We reset the variable before returning.
    unsafe { std::env::set_var(CACHE_MAX_ENTRIES_ENV, "42") };
    let config = PipelineConfig::from_env().expect("env override should parse");
    assert_eq!(config.cache_max_entries, 42);

    // Safety: see rationale above.
    unsafe { std::env::remove_var(CACHE_MAX_ENTRIES_ENV) };
    let config = PipelineConfig::from_env().expect("defaults should load");
    assert_eq!(config.cache_max_entries, 10_000);
}
