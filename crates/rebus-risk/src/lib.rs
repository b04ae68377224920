#![warn(missing_docs)]
//! # rebus-risk
//!
//! ## Purpose
//! Turns analysis signals into a bounded composite score and a classified
//! [`RiskAssessment`].
//!
//! ## Responsibilities
//! - Hold the configurable weighting policy ([`RiskWeights`]).
//! - Combine signals into a 0..100 score with a per-factor breakdown.
//! - Substitute a conservative fallback when analysis was unavailable.
//! - Map scores to [`RiskLevel`] and compose guidance metadata.
//!
//! ## Data flow
//! [`AnalysisResult`] -> [`RiskAggregator::aggregate`] -> [`Aggregation`] ->
//! [`RiskClassifier::assess`] -> [`RiskAssessment`].
//!
//! ## Ownership and lifetimes
//! Both stages are pure: they borrow their input and return owned values.
//!
//! ## Error model
//! Only policy construction can fail ([`RiskError::InvalidWeights`]).
//! Aggregation never fails; unavailable analyses degrade to the fallback score.

use std::collections::BTreeMap;

use rebus_core::{AnalysisResult, AnalysisSignals, Fingerprint, RiskAssessment, RiskLevel};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Component name for sentiment polarity.
pub const SENTIMENT_FACTOR: &str = "sentiment";
/// Component name for misinformation likelihood.
pub const MISINFORMATION_FACTOR: &str = "misinformation";
/// Component name for escalatory-language markers.
pub const ESCALATION_FACTOR: &str = "escalation";
/// Component name for cultural-nuance markers.
pub const NUANCE_FACTOR: &str = "nuance";
/// Primary factor reported when the analysis could not be obtained.
pub const ANALYSIS_UNAVAILABLE_FACTOR: &str = "analysis_unavailable";

/// Component names in declaration order, which also breaks ties.
pub const FACTOR_ORDER: [&str; 4] = [
    SENTIMENT_FACTOR,
    MISINFORMATION_FACTOR,
    ESCALATION_FACTOR,
    NUANCE_FACTOR,
];

/// Weighting policy for the composite score.
///
/// Factor weights are relative: they are divided by their sum, so the raw
/// score always spans `[0, 100]` whatever the absolute values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RiskWeights {
    /// Weight of `|sentimentScore|`.
    pub sentiment: f64,
    /// Weight of `misinformationProbability`.
    pub misinformation: f64,
    /// Weight of the escalatory-marker ratio.
    pub escalation: f64,
    /// Weight of the cultural-nuance-marker ratio.
    pub nuance: f64,
    /// Marker count at which a marker factor saturates.
    pub marker_cap: u32,
    /// Baseline score that low-confidence analyses regress toward.
    pub confidence_floor: f64,
    /// Score reported when analysis is unavailable.
    pub fallback_score: f64,
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            sentiment: 0.25,
            misinformation: 0.35,
            escalation: 0.25,
            nuance: 0.15,
            marker_cap: 5,
            confidence_floor: 30.0,
            fallback_score: 50.0,
        }
    }
}

impl RiskWeights {
    /// Checks the policy invariants.
    ///
    /// # Errors
    /// Returns [`RiskError::InvalidWeights`] when a weight is negative or not
    /// finite, the weights sum to zero, `marker_cap` is zero,
    /// `confidence_floor` is outside `[0, 100]`, or `fallback_score` would not
    /// classify as `MEDIUM` or above.
    pub fn validate(&self) -> Result<(), RiskError> {
        for (name, weight) in [
            (SENTIMENT_FACTOR, self.sentiment),
            (MISINFORMATION_FACTOR, self.misinformation),
            (ESCALATION_FACTOR, self.escalation),
            (NUANCE_FACTOR, self.nuance),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(RiskError::InvalidWeights(format!(
                    "{name} weight must be finite and non-negative, got {weight}"
                )));
            }
        }

        if self.total() <= 0.0 {
            return Err(RiskError::InvalidWeights(
                "factor weights must not all be zero".to_string(),
            ));
        }

        if self.marker_cap == 0 {
            return Err(RiskError::InvalidWeights(
                "marker cap must be at least 1".to_string(),
            ));
        }

        if !(0.0..=100.0).contains(&self.confidence_floor) {
            return Err(RiskError::InvalidWeights(format!(
                "confidence floor must be within [0, 100], got {}",
                self.confidence_floor
            )));
        }

        let medium = f64::from(RiskLevel::Medium.min_score());
        if !(medium..=100.0).contains(&self.fallback_score) {
            return Err(RiskError::InvalidWeights(format!(
                "fallback score must be within [{medium}, 100], got {}",
                self.fallback_score
            )));
        }

        Ok(())
    }

    fn total(&self) -> f64 {
        self.sentiment + self.misinformation + self.escalation + self.nuance
    }
}

/// Composite score before classification.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    /// Confidence-blended score in `[0, 100]`.
    pub score: f64,
    /// Analysis confidence in `[0, 1]`; `0` when degraded.
    pub confidence: f64,
    /// Raw contribution of every factor in [`FACTOR_ORDER`].
    pub component_scores: BTreeMap<String, f64>,
    /// `true` when the fallback replaced the formula.
    pub degraded: bool,
}

/// Combines analysis signals into a composite score.
#[derive(Debug, Clone)]
pub struct RiskAggregator {
    weights: RiskWeights,
}

impl RiskAggregator {
    /// Creates an aggregator over a validated policy.
    ///
    /// # Errors
    /// Returns [`RiskError::InvalidWeights`] when `weights` fails
    /// [`RiskWeights::validate`].
    pub fn new(weights: RiskWeights) -> Result<Self, RiskError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Active policy.
    pub fn weights(&self) -> &RiskWeights {
        &self.weights
    }

    /// Scores one analysis result.
    ///
    /// # Semantics
    /// - Each factor contributes `signal * weight / sum(weights) * 100`, where
    ///   marker signals are `min(1, count / marker_cap)`.
    /// - `score = raw * confidence + confidence_floor * (1 - confidence)`.
    /// - An unavailable analysis yields `fallback_score` with all factors at 0.
    pub fn aggregate(&self, result: &AnalysisResult) -> Aggregation {
        match result.signals() {
            Some(signals) => self.score_signals(signals),
            None => {
                debug!(
                    fallback_score = self.weights.fallback_score,
                    "analysis unavailable, applying fallback score"
                );
                self.fallback()
            }
        }
    }

    fn score_signals(&self, signals: &AnalysisSignals) -> Aggregation {
        let weights = &self.weights;
        let scale = 100.0 / weights.total();
        let cap = f64::from(weights.marker_cap);
        let saturation = |count: usize| (count as f64 / cap).min(1.0);

        let contributions = [
            signals.sentiment_score().abs() * weights.sentiment,
            signals.misinformation_probability() * weights.misinformation,
            saturation(signals.escalatory_language().len()) * weights.escalation,
            saturation(signals.cultural_nuances().len()) * weights.nuance,
        ]
        .map(|weighted| weighted * scale);

        let raw: f64 = contributions.iter().sum();
        let confidence = signals.confidence().clamp(0.0, 1.0);
        let score = raw * confidence + weights.confidence_floor * (1.0 - confidence);

        Aggregation {
            score: score.clamp(0.0, 100.0),
            confidence,
            component_scores: component_map(contributions),
            degraded: false,
        }
    }

    fn fallback(&self) -> Aggregation {
        Aggregation {
            score: self.weights.fallback_score,
            confidence: 0.0,
            component_scores: component_map([0.0; 4]),
            degraded: true,
        }
    }
}

fn component_map(values: [f64; 4]) -> BTreeMap<String, f64> {
    FACTOR_ORDER
        .iter()
        .zip(values)
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

/// Level, primary factor and summary for one aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    /// Level derived from the score.
    pub risk_level: RiskLevel,
    /// Largest contributing factor, or [`ANALYSIS_UNAVAILABLE_FACTOR`].
    pub primary_risk_factor: String,
    /// One-line human summary.
    pub risk_summary: String,
}

/// Maps aggregations to risk levels and guidance. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct RiskClassifier;

impl RiskClassifier {
    /// Creates a classifier.
    pub fn new() -> Self {
        Self
    }

    /// Classifies one aggregation.
    pub fn classify(&self, aggregation: &Aggregation) -> Classification {
        let risk_level = RiskLevel::from_score(aggregation.score);

        if aggregation.degraded {
            return Classification {
                risk_level,
                primary_risk_factor: ANALYSIS_UNAVAILABLE_FACTOR.to_string(),
                risk_summary: format!(
                    "{risk_level} risk (score {:.1}); analysis unavailable, conservative fallback applied. {}",
                    aggregation.score,
                    risk_level.action_guidance()
                ),
            };
        }

        let factor = primary_factor(&aggregation.component_scores);
        Classification {
            risk_level,
            primary_risk_factor: factor.to_string(),
            risk_summary: format!(
                "{risk_level} risk (score {:.1}); primary factor: {factor}. {}",
                aggregation.score,
                risk_level.action_guidance()
            ),
        }
    }

    /// Classifies and packages the final assessment record.
    pub fn assess(
        &self,
        communication_id: impl Into<String>,
        fingerprint: Fingerprint,
        aggregation: Aggregation,
    ) -> RiskAssessment {
        let classification = self.classify(&aggregation);
        RiskAssessment {
            communication_id: communication_id.into(),
            fingerprint,
            score: aggregation.score,
            risk_level: classification.risk_level,
            color_code: classification.risk_level.color_code().to_string(),
            action_guidance: classification.risk_level.action_guidance().to_string(),
            confidence: aggregation.confidence,
            component_scores: aggregation.component_scores,
            primary_risk_factor: Some(classification.primary_risk_factor),
            risk_summary: Some(classification.risk_summary),
        }
    }
}

/// Returns the factor with the largest contribution.
///
/// Ties, and missing entries, resolve in [`FACTOR_ORDER`].
pub fn primary_factor(component_scores: &BTreeMap<String, f64>) -> &'static str {
    let mut best = FACTOR_ORDER[0];
    let mut best_value = f64::NEG_INFINITY;
    for name in FACTOR_ORDER {
        let value = component_scores.get(name).copied().unwrap_or(0.0);
        if value > best_value {
            best = name;
            best_value = value;
        }
    }
    best
}

/// Risk policy errors.
#[derive(Debug, Error)]
pub enum RiskError {
    /// Weighting policy violates its invariants.
    #[error("invalid risk weights: {0}")]
    InvalidWeights(String),
}
