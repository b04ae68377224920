#![warn(missing_docs)]
//! # rebus-app
//!
//! ## Purpose
//! Wires normalization, analysis, aggregation and classification into one
//! risk assessment pipeline for REBUS.
//!
//! ## Responsibilities
//! - Load and validate [`PipelineConfig`] from defaults and `REBUS_*` env vars.
//! - Install the `tracing` subscriber used by the binary.
//! - Construct the cache, invoker, aggregator and classifier explicitly.
//! - Run single and batched assessments with per-communication spans.
//!
//! ## Data flow
//! [`CommunicationDraft`] -> normalize -> [`AnalysisInvoker::invoke`] ->
//! [`RiskAggregator::aggregate`] -> [`RiskClassifier::assess`] ->
//! [`RiskAssessment`].
//!
//! ## Ownership and lifetimes
//! [`RiskPipeline`] is cheap to clone: the engine and cache sit behind `Arc`,
//! so batch runs hand each spawned task its own pipeline handle.
//!
//! ## Error model
//! Only validation and configuration failures surface, wrapped in
//! [`AppError`]. Engine failures are absorbed by the invoker and show up as a
//! degraded assessment.
//!
//! ## Security and privacy notes
//! Spans carry communication ids only. Text never reaches the log output.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use rebus_analysis::{
    AnalysisCache, AnalysisEngine, AnalysisInvoker, DEFAULT_ANALYSIS_TIMEOUT, DEFAULT_CACHE_TTL,
};
use rebus_core::{CommunicationDraft, CoreError, RiskAssessment, normalize};
use rebus_risk::{RiskAggregator, RiskClassifier, RiskError, RiskWeights};
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{Instrument, debug, info_span, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Build-time application version loaded from root `VERSION` file.
pub const APP_VERSION: &str = env!("REBUS_VERSION");

/// Env var overriding the engine timeout, in milliseconds.
pub const ANALYSIS_TIMEOUT_ENV: &str = "REBUS_ANALYSIS_TIMEOUT_MS";
/// Env var overriding the cache entry lifetime, in seconds.
pub const CACHE_TTL_ENV: &str = "REBUS_CACHE_TTL_SECS";
/// Env var overriding the cache bound. `0` disables the bound.
pub const CACHE_MAX_ENTRIES_ENV: &str = "REBUS_CACHE_MAX_ENTRIES";
/// Env var overriding the score used when analysis is unavailable.
pub const FALLBACK_SCORE_ENV: &str = "REBUS_FALLBACK_SCORE";
/// Env var overriding the score low-confidence results regress toward.
pub const CONFIDENCE_FLOOR_ENV: &str = "REBUS_CONFIDENCE_FLOOR";
/// Env var overriding the default log filter.
pub const LOG_LEVEL_ENV: &str = "REBUS_LOG_LEVEL";
/// Env var switching log output to JSON.
pub const JSON_LOGS_ENV: &str = "REBUS_JSON_LOGS";

/// Default cache bound.
pub const DEFAULT_CACHE_MAX_ENTRIES: usize = 10_000;

/// Returns the app version sourced from root `VERSION`.
pub fn app_version() -> &'static str {
    APP_VERSION
}

/// Runtime settings for one [`RiskPipeline`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Bound on one engine call.
    pub analysis_timeout: Duration,
    /// Lifetime of a cached analysis.
    pub cache_ttl: Duration,
    /// Maximum cached fingerprints; `0` means unbounded.
    pub cache_max_entries: usize,
    /// Aggregation policy.
    pub weights: RiskWeights,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Emit JSON log lines instead of pretty output.
    pub json_logs: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis_timeout: DEFAULT_ANALYSIS_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_max_entries: DEFAULT_CACHE_MAX_ENTRIES,
            weights: RiskWeights::default(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

impl PipelineConfig {
    /// Applies `REBUS_*` process env overrides on top of the defaults.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when a set variable cannot be parsed.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Applies overrides from an arbitrary lookup on top of the defaults.
    ///
    /// Unset and blank values keep the default.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] when a set variable cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(raw) = read(ANALYSIS_TIMEOUT_ENV) {
            config.analysis_timeout = Duration::from_millis(parse_value(ANALYSIS_TIMEOUT_ENV, &raw)?);
        }
        if let Some(raw) = read(CACHE_TTL_ENV) {
            config.cache_ttl = Duration::from_secs(parse_value(CACHE_TTL_ENV, &raw)?);
        }
        if let Some(raw) = read(CACHE_MAX_ENTRIES_ENV) {
            config.cache_max_entries = parse_value(CACHE_MAX_ENTRIES_ENV, &raw)?;
        }
        if let Some(raw) = read(FALLBACK_SCORE_ENV) {
            config.weights.fallback_score = parse_value(FALLBACK_SCORE_ENV, &raw)?;
        }
        if let Some(raw) = read(CONFIDENCE_FLOOR_ENV) {
            config.weights.confidence_floor = parse_value(CONFIDENCE_FLOOR_ENV, &raw)?;
        }
        if let Some(raw) = read(LOG_LEVEL_ENV) {
            config.log_level = raw;
        }
        if let Some(raw) = read(JSON_LOGS_ENV) {
            config.json_logs = parse_flag(JSON_LOGS_ENV, &raw)?;
        }
        Ok(config)
    }

    /// Checks timing and weighting invariants.
    ///
    /// # Errors
    /// Returns [`AppError::Config`] for a zero timeout or TTL and
    /// [`AppError::Risk`] for an invalid weighting policy.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.analysis_timeout.is_zero() {
            return Err(AppError::Config(
                "analysis timeout must be greater than zero".to_string(),
            ));
        }
        if self.cache_ttl.is_zero() {
            return Err(AppError::Config(
                "cache ttl must be greater than zero".to_string(),
            ));
        }
        self.weights.validate()?;
        Ok(())
    }

    /// Flat `name=value` view used by the binary's startup output.
    pub fn describe(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            (
                "analysis_timeout_ms",
                self.analysis_timeout.as_millis().to_string(),
            ),
            ("cache_ttl_secs", self.cache_ttl.as_secs().to_string()),
            ("cache_max_entries", self.cache_max_entries.to_string()),
            ("fallback_score", self.weights.fallback_score.to_string()),
            (
                "confidence_floor",
                self.weights.confidence_floor.to_string(),
            ),
            ("log_level", self.log_level.clone()),
            ("json_logs", self.json_logs.to_string()),
        ])
    }
}

fn parse_value<T>(name: &str, raw: &str) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|error| AppError::Config(format!("{name}={raw:?}: {error}")))
}

fn parse_flag(name: &str, raw: &str) -> Result<bool, AppError> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        _ => Err(AppError::Config(format!(
            "{name}={raw:?}: expected a boolean flag"
        ))),
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` wins over `level`. Returns `false` when a subscriber was
/// already installed, which leaves the existing one in place.
pub fn init_tracing(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = if json {
        subscriber
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        subscriber
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init()
    };
    installed.is_ok()
}

/// End-to-end risk assessment over an injected analysis engine.
#[derive(Clone)]
pub struct RiskPipeline {
    invoker: AnalysisInvoker,
    aggregator: RiskAggregator,
    classifier: RiskClassifier,
}

impl RiskPipeline {
    /// Validates `config` and builds the pipeline stages around `engine`.
    ///
    /// # Errors
    /// Returns the [`PipelineConfig::validate`] failure.
    pub fn new(config: &PipelineConfig, engine: Arc<dyn AnalysisEngine>) -> Result<Self, AppError> {
        config.validate()?;

        let mut cache = AnalysisCache::new(config.cache_ttl);
        if config.cache_max_entries > 0 {
            cache = cache.with_max_entries(config.cache_max_entries);
        }
        let invoker = AnalysisInvoker::new(engine, Arc::new(cache), config.analysis_timeout);

        Ok(Self {
            invoker,
            aggregator: RiskAggregator::new(config.weights)?,
            classifier: RiskClassifier::new(),
        })
    }

    /// Invoker handle, exposing the shared cache.
    pub fn invoker(&self) -> &AnalysisInvoker {
        &self.invoker
    }

    /// Assesses one communication.
    ///
    /// # Errors
    /// Returns [`AppError::Core`] when the draft fails validation. Engine
    /// failures produce a degraded assessment instead of an error.
    pub async fn assess(&self, draft: CommunicationDraft) -> Result<RiskAssessment, AppError> {
        let communication = normalize(draft)?;
        let span = info_span!("assess", communication_id = %communication.id());

        async move {
            let invocation = self.invoker.invoke(&communication).await;
            let aggregation = self.aggregator.aggregate(&invocation.result);
            let assessment =
                self.classifier
                    .assess(communication.id(), invocation.fingerprint, aggregation);
            debug!(
                fingerprint = %assessment.fingerprint.short(),
                score = assessment.score,
                risk_level = %assessment.risk_level,
                "assessment completed"
            );
            Ok(assessment)
        }
        .instrument(span)
        .await
    }

    /// Assesses several communications concurrently.
    ///
    /// Output order matches input order; each entry succeeds or fails on its
    /// own.
    pub async fn assess_all(
        &self,
        drafts: Vec<CommunicationDraft>,
    ) -> Vec<Result<RiskAssessment, AppError>> {
        let total = drafts.len();
        let mut tasks = JoinSet::new();
        for (index, draft) in drafts.into_iter().enumerate() {
            let pipeline = self.clone();
            tasks.spawn(async move { (index, pipeline.assess(draft).await) });
        }

        let mut outcomes: Vec<Option<Result<RiskAssessment, AppError>>> =
            (0..total).map(|_| None).collect();
        let mut task_failure = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(error) => {
                    warn!(%error, "assessment task failed");
                    task_failure = Some(error.to_string());
                }
            }
        }

        outcomes
            .into_iter()
            .map(|outcome| {
                outcome.unwrap_or_else(|| {
                    Err(AppError::Task(
                        task_failure
                            .clone()
                            .unwrap_or_else(|| "assessment task did not complete".to_string()),
                    ))
                })
            })
            .collect()
    }
}

/// App integration error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Communication validation or codec error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    /// Weighting policy error.
    #[error("risk policy error: {0}")]
    Risk(#[from] RiskError),
    /// Invalid runtime configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Background assessment task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),
}
