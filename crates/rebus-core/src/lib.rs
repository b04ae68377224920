#![warn(missing_docs)]
//! # rebus-core
//!
//! ## Purpose
//! Defines the pure data model shared across the `rebus` workspace.
//!
//! ## Responsibilities
//! - Represent incoming communications and their optional diplomatic context.
//! - Normalize raw communication drafts (length validation, defaults).
//! - Derive deterministic content fingerprints used for analysis caching.
//! - Model analysis outcomes as an explicit success-or-failure type.
//! - Hold the closed [`RiskLevel`] table and the [`RiskAssessment`] output record.
//!
//! ## Data flow
//! Callers submit a [`CommunicationDraft`] -> [`normalize`] produces an immutable
//! [`Communication`] -> [`fingerprint`] keys the analysis cache -> downstream
//! crates turn an [`AnalysisResult`] into a [`RiskAssessment`].
//!
//! ## Ownership and lifetimes
//! All records own their strings and collections so they can move freely
//! between async pipeline stages and be shared behind `Arc` by the cache.
//!
//! ## Error model
//! Only malformed input is an error here: [`CoreError::Validation`] for
//! out-of-bounds text and [`CoreError::Codec`] for JSON decode failures.
//!
//! ## Security and privacy notes
//! Communication text can be sensitive. Nothing in this crate logs it, and
//! [`Fingerprint`] is a one-way SHA-256 digest.
//!
//! ## Example
//! ```rust
//! use rebus_core::{CommunicationDraft, RiskLevel, fingerprint, normalize};
//!
//! let communication = normalize(CommunicationDraft::new("The delegation rejects the proposal."))
//!     .expect("text length is valid");
//! assert_eq!(communication.language(), "en");
//! assert_eq!(fingerprint(&communication).as_str().len(), 64);
//! assert_eq!(RiskLevel::from_score(75.0), RiskLevel::Critical);
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

/// Minimum accepted text length, in characters.
pub const MIN_TEXT_CHARS: usize = 10;

/// Maximum accepted text length, in characters.
pub const MAX_TEXT_CHARS: usize = 50_000;

/// Language assigned when a draft does not carry one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Schema tag mixed into every fingerprint so encoding changes never collide.
pub const FINGERPRINT_SCHEMA_V1: &str = "rebus-fingerprint-v1";

/// Kind of communication being assessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CommunicationType {
    /// Diplomatic exchange between governments.
    #[default]
    Diplomatic,
    /// Military statement or signalling.
    Military,
    /// Press or broadcast media.
    Media,
    /// Social media post.
    Social,
    /// Formal statement issued by an official body.
    OfficialStatement,
    /// Treaty text or treaty-related communication.
    Treaty,
    /// Statement delivered at a press conference.
    PressConference,
}

impl CommunicationType {
    /// Returns the wire name of the communication type.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Diplomatic => "DIPLOMATIC",
            Self::Military => "MILITARY",
            Self::Media => "MEDIA",
            Self::Social => "SOCIAL",
            Self::OfficialStatement => "OFFICIAL_STATEMENT",
            Self::Treaty => "TREATY",
            Self::PressConference => "PRESS_CONFERENCE",
        }
    }
}

/// Optional diplomatic context attached to a communication.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationContext {
    /// Country the communication originates from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_country: Option<String>,
    /// Country the communication is addressed to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_country: Option<String>,
    /// Communication kind, `DIPLOMATIC` when omitted.
    #[serde(default)]
    pub communication_type: CommunicationType,
    /// Geographic region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Subject matter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    /// Role of the speaker (minister, spokesperson, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker_role: Option<String>,
    /// Free-form key/value context. Ordered so fingerprints are stable.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_context: BTreeMap<String, String>,
}

impl CommunicationContext {
    /// Creates an otherwise empty context of the given type.
    pub fn new(communication_type: CommunicationType) -> Self {
        Self {
            communication_type,
            ..Self::default()
        }
    }
}

/// Communication as submitted by a caller, before normalization.
///
/// Every defaultable field is optional; [`normalize`] fills the gaps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunicationDraft {
    /// Caller-assigned identifier. A UUID is generated when absent or blank.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Text content to assess.
    #[serde(default)]
    pub text: String,
    /// ISO language code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Time the communication was issued.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Optional diplomatic context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CommunicationContext>,
    /// Caller metadata carried through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl CommunicationDraft {
    /// Creates a draft holding only text; everything else is defaulted later.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Sets the caller-assigned identifier.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the language code.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Sets the issue timestamp.
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Attaches diplomatic context.
    pub fn with_context(mut self, context: CommunicationContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Deserializes a draft from JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }
}

/// Normalized, validated communication.
///
/// Only [`normalize`] constructs this type, so holders can rely on the text
/// bounds and defaults having been applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Communication {
    id: String,
    text: String,
    language: String,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    context: Option<CommunicationContext>,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<Map<String, Value>>,
}

impl Communication {
    /// Communication identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Text content, preserved exactly as submitted.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Lower-cased language code.
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Issue timestamp.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Optional diplomatic context.
    pub fn context(&self) -> Option<&CommunicationContext> {
        self.context.as_ref()
    }

    /// Caller metadata.
    pub fn metadata(&self) -> Option<&Map<String, Value>> {
        self.metadata.as_ref()
    }
}

/// Normalizes a draft using the current time as the default timestamp.
///
/// # Errors
/// Returns [`CoreError::Validation`] when the text is blank or its length is
/// outside `[MIN_TEXT_CHARS, MAX_TEXT_CHARS]`.
pub fn normalize(draft: CommunicationDraft) -> Result<Communication, CoreError> {
    normalize_at(draft, Utc::now())
}

/// Normalizes a draft, using `now` when the draft carries no timestamp.
///
/// # Semantics
/// - Text is kept byte-for-byte; only its length is checked.
/// - Language is trimmed and lower-cased; blank becomes [`DEFAULT_LANGUAGE`].
/// - A blank or missing id is replaced by a fresh UUID v4.
///
/// # Errors
/// Returns [`CoreError::Validation`] for out-of-bounds or blank text.
pub fn normalize_at(
    draft: CommunicationDraft,
    now: DateTime<Utc>,
) -> Result<Communication, CoreError> {
    validate_text(&draft.text)?;

    let id = match draft.id {
        Some(id) if !id.trim().is_empty() => id,
        _ => Uuid::new_v4().to_string(),
    };

    let language = draft
        .language
        .map(|language| language.trim().to_ascii_lowercase())
        .filter(|language| !language.is_empty())
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    Ok(Communication {
        id,
        text: draft.text,
        language,
        timestamp: draft.timestamp.unwrap_or(now),
        context: draft.context,
        metadata: draft.metadata,
    })
}

/// Checks communication text against the accepted length window.
///
/// # Errors
/// Returns [`CoreError::Validation`] when the text is blank or its character
/// count is outside `[MIN_TEXT_CHARS, MAX_TEXT_CHARS]`.
pub fn validate_text(text: &str) -> Result<(), CoreError> {
    if text.trim().is_empty() {
        return Err(CoreError::Validation(
            "text content is required".to_string(),
        ));
    }

    let length = text.chars().count();
    if !(MIN_TEXT_CHARS..=MAX_TEXT_CHARS).contains(&length) {
        return Err(CoreError::Validation(format!(
            "text must be between {MIN_TEXT_CHARS} and {MAX_TEXT_CHARS} characters, got {length}"
        )));
    }

    Ok(())
}

/// Deterministic content key for one normalized communication.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Full lowercase hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex characters, enough to correlate log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(12);
        &self.0[..end]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derives the analysis cache key for a normalized communication.
///
/// # Semantics
/// SHA-256 over a length-prefixed encoding of text, language and every context
/// field (additional context in key order). Identifier, timestamp and metadata
/// do not participate: two submissions of the same words in the same context
/// share one analysis.
pub fn fingerprint(communication: &Communication) -> Fingerprint {
    let mut hasher = Sha256::new();
    write_field(&mut hasher, FINGERPRINT_SCHEMA_V1);
    write_field(&mut hasher, &communication.text);
    write_field(&mut hasher, &communication.language);

    match &communication.context {
        None => hasher.update([0u8]),
        Some(context) => {
            hasher.update([1u8]);
            write_field(&mut hasher, context.communication_type.as_str());
            for value in [
                &context.source_country,
                &context.target_country,
                &context.region,
                &context.topic,
                &context.speaker_role,
            ] {
                write_optional(&mut hasher, value.as_deref());
            }
            hasher.update((context.additional_context.len() as u64).to_be_bytes());
            for (key, value) in &context.additional_context {
                write_field(&mut hasher, key);
                write_field(&mut hasher, value);
            }
        }
    }

    Fingerprint(hex::encode(hasher.finalize()))
}

fn write_field(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_be_bytes());
    hasher.update(value.as_bytes());
}

fn write_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(value) => {
            hasher.update([1u8]);
            write_field(hasher, value);
        }
        None => hasher.update([0u8]),
    }
}

/// Signals reported by a successful analysis.
///
/// Numeric fields are clamped on construction: sentiment to `[-1, 1]`,
/// probability and confidence to `[0, 1]`. Non-finite input becomes `0`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisSignals {
    sentiment_score: f64,
    misinformation_probability: f64,
    escalatory_language: Vec<String>,
    cultural_nuances: Vec<String>,
    confidence: f64,
    reasoning: Option<String>,
    processing_time_ms: Option<u64>,
}

impl AnalysisSignals {
    /// Creates signals with clamped numeric values and no markers.
    pub fn new(sentiment_score: f64, misinformation_probability: f64, confidence: f64) -> Self {
        Self {
            sentiment_score: clamp_or_zero(sentiment_score, -1.0, 1.0),
            misinformation_probability: clamp_or_zero(misinformation_probability, 0.0, 1.0),
            confidence: clamp_or_zero(confidence, 0.0, 1.0),
            ..Self::default()
        }
    }

    /// Sets escalatory-language markers.
    pub fn with_escalatory_language(mut self, markers: Vec<String>) -> Self {
        self.escalatory_language = markers;
        self
    }

    /// Sets cultural-nuance markers.
    pub fn with_cultural_nuances(mut self, markers: Vec<String>) -> Self {
        self.cultural_nuances = markers;
        self
    }

    /// Sets the engine's free-text reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    /// Stamps the elapsed engine time.
    pub fn with_processing_time_ms(mut self, elapsed_ms: u64) -> Self {
        self.processing_time_ms = Some(elapsed_ms);
        self
    }

    /// Sentiment polarity in `[-1, 1]`.
    pub fn sentiment_score(&self) -> f64 {
        self.sentiment_score
    }

    /// Misinformation likelihood in `[0, 1]`.
    pub fn misinformation_probability(&self) -> f64 {
        self.misinformation_probability
    }

    /// Escalatory-language markers.
    pub fn escalatory_language(&self) -> &[String] {
        &self.escalatory_language
    }

    /// Cultural-nuance markers.
    pub fn cultural_nuances(&self) -> &[String] {
        &self.cultural_nuances
    }

    /// Engine confidence in `[0, 1]`.
    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Engine reasoning, if any.
    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    /// Elapsed engine time, if stamped.
    pub fn processing_time_ms(&self) -> Option<u64> {
        self.processing_time_ms
    }
}

fn clamp_or_zero(value: f64, min: f64, max: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        0.0
    }
}

/// Message used when a failure sentinel is built from a blank message.
pub const UNAVAILABLE_MESSAGE: &str = "analysis unavailable";

/// Outcome of one analysis invocation.
///
/// On the wire this is the flat record
/// `{sentimentScore, misinformationProbability, escalatoryLanguage,
/// culturalNuances, confidence, reasoning?, errorMessage?, processingTimeMs?}`
/// where a non-empty `errorMessage` marks a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "AnalysisRecord", from = "AnalysisRecord")]
pub enum AnalysisResult {
    /// Engine produced signals.
    Completed(AnalysisSignals),
    /// Engine was unreachable, failed or timed out.
    Unavailable {
        /// Non-empty failure description.
        error_message: String,
    },
}

impl AnalysisResult {
    /// Builds a failure sentinel. Blank messages become [`UNAVAILABLE_MESSAGE`].
    pub fn error(message: impl Into<String>) -> Self {
        let message = message.into();
        let error_message = if message.trim().is_empty() {
            UNAVAILABLE_MESSAGE.to_string()
        } else {
            message
        };
        Self::Unavailable { error_message }
    }

    /// Returns `true` when the analysis completed.
    pub fn is_successful(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Signals of a completed analysis.
    pub fn signals(&self) -> Option<&AnalysisSignals> {
        match self {
            Self::Completed(signals) => Some(signals),
            Self::Unavailable { .. } => None,
        }
    }

    /// Failure description of a sentinel.
    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Completed(_) => None,
            Self::Unavailable { error_message } => Some(error_message),
        }
    }

    /// Sentiment polarity; `0` on failure.
    pub fn sentiment_score(&self) -> f64 {
        self.signals().map_or(0.0, AnalysisSignals::sentiment_score)
    }

    /// Misinformation likelihood; `0` on failure.
    pub fn misinformation_probability(&self) -> f64 {
        self.signals()
            .map_or(0.0, AnalysisSignals::misinformation_probability)
    }

    /// Escalatory markers; empty on failure.
    pub fn escalatory_language(&self) -> &[String] {
        match self {
            Self::Completed(signals) => signals.escalatory_language(),
            Self::Unavailable { .. } => &[],
        }
    }

    /// Cultural-nuance markers; empty on failure.
    pub fn cultural_nuances(&self) -> &[String] {
        match self {
            Self::Completed(signals) => signals.cultural_nuances(),
            Self::Unavailable { .. } => &[],
        }
    }

    /// Engine confidence; `0` on failure.
    pub fn confidence(&self) -> f64 {
        self.signals().map_or(0.0, AnalysisSignals::confidence)
    }

    /// Engine reasoning, if any.
    pub fn reasoning(&self) -> Option<&str> {
        self.signals().and_then(AnalysisSignals::reasoning)
    }

    /// Elapsed engine time of a completed analysis.
    pub fn processing_time_ms(&self) -> Option<u64> {
        self.signals().and_then(AnalysisSignals::processing_time_ms)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRecord {
    #[serde(default)]
    sentiment_score: f64,
    #[serde(default)]
    misinformation_probability: f64,
    #[serde(default)]
    escalatory_language: Vec<String>,
    #[serde(default)]
    cultural_nuances: Vec<String>,
    #[serde(default)]
    confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reasoning: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processing_time_ms: Option<u64>,
}

impl From<AnalysisResult> for AnalysisRecord {
    fn from(result: AnalysisResult) -> Self {
        match result {
            AnalysisResult::Completed(signals) => Self {
                sentiment_score: signals.sentiment_score,
                misinformation_probability: signals.misinformation_probability,
                escalatory_language: signals.escalatory_language,
                cultural_nuances: signals.cultural_nuances,
                confidence: signals.confidence,
                reasoning: signals.reasoning,
                error_message: None,
                processing_time_ms: signals.processing_time_ms,
            },
            AnalysisResult::Unavailable { error_message } => Self {
                error_message: Some(error_message),
                ..Self::default()
            },
        }
    }
}

impl From<AnalysisRecord> for AnalysisResult {
    fn from(record: AnalysisRecord) -> Self {
        if let Some(message) = record.error_message
            && !message.trim().is_empty()
        {
            return Self::error(message);
        }

        let mut signals = AnalysisSignals::new(
            record.sentiment_score,
            record.misinformation_probability,
            record.confidence,
        )
        .with_escalatory_language(record.escalatory_language)
        .with_cultural_nuances(record.cultural_nuances);
        signals.reasoning = record.reasoning;
        signals.processing_time_ms = record.processing_time_ms;
        Self::Completed(signals)
    }
}

/// Closed, ordered risk classification.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Score in `[0, 20)`.
    Minimal,
    /// Score in `[20, 40)`.
    Low,
    /// Score in `[40, 60)`.
    Medium,
    /// Score in `[60, 75)`.
    High,
    /// Score in `[75, 100]`.
    Critical,
}

#[derive(Debug, Clone, Copy)]
struct LevelBand {
    min_score: u8,
    max_score: u8,
    color_code: &'static str,
    action_guidance: &'static str,
}

// Indexed by `RiskLevel as usize`.
const LEVEL_TABLE: [LevelBand; 5] = [
    LevelBand {
        min_score: 0,
        max_score: 20,
        color_code: "green",
        action_guidance: "Routine monitoring",
    },
    LevelBand {
        min_score: 20,
        max_score: 40,
        color_code: "blue",
        action_guidance: "Standard protocols",
    },
    LevelBand {
        min_score: 40,
        max_score: 60,
        color_code: "yellow",
        action_guidance: "Elevated attention required",
    },
    LevelBand {
        min_score: 60,
        max_score: 75,
        color_code: "orange",
        action_guidance: "Immediate review required",
    },
    LevelBand {
        min_score: 75,
        max_score: 100,
        color_code: "red",
        action_guidance: "Crisis protocols activated",
    },
];

impl RiskLevel {
    /// Every level in ascending order.
    pub const ALL: [RiskLevel; 5] = [
        RiskLevel::Minimal,
        RiskLevel::Low,
        RiskLevel::Medium,
        RiskLevel::High,
        RiskLevel::Critical,
    ];

    const fn band(self) -> LevelBand {
        LEVEL_TABLE[self as usize]
    }

    /// Inclusive lower score bound.
    pub const fn min_score(self) -> u8 {
        self.band().min_score
    }

    /// Upper score bound (exclusive except for `Critical`).
    pub const fn max_score(self) -> u8 {
        self.band().max_score
    }

    /// Display color.
    pub const fn color_code(self) -> &'static str {
        self.band().color_code
    }

    /// Recommended operator action.
    pub const fn action_guidance(self) -> &'static str {
        self.band().action_guidance
    }

    /// Wire name of the level.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "MINIMAL",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }

    /// Maps a score to the highest level whose lower bound it reaches.
    ///
    /// NaN maps to `Critical`; anything below `0` maps to `Minimal`.
    pub fn from_score(score: f64) -> Self {
        if score.is_nan() {
            return Self::Critical;
        }

        Self::ALL
            .iter()
            .rev()
            .copied()
            .find(|level| score >= f64::from(level.min_score()))
            .unwrap_or(Self::Minimal)
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final assessment of one communication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Identifier of the assessed communication.
    pub communication_id: String,
    /// Cache key the analysis was computed under.
    pub fingerprint: Fingerprint,
    /// Composite score in `[0, 100]`.
    pub score: f64,
    /// Level derived from `score`.
    pub risk_level: RiskLevel,
    /// Color of `risk_level`.
    pub color_code: String,
    /// Guidance of `risk_level`.
    pub action_guidance: String,
    /// Analysis confidence in `[0, 1]`.
    pub confidence: f64,
    /// Contribution of each named factor, on the 0..100 scale.
    pub component_scores: BTreeMap<String, f64>,
    /// Factor with the largest contribution, or `analysis_unavailable`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_risk_factor: Option<String>,
    /// One-line human summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_summary: Option<String>,
}

impl RiskAssessment {
    /// Serializes the assessment to compact JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON serialization fails.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, CoreError> {
        serde_json::to_vec(self).map_err(CoreError::Codec)
    }

    /// Deserializes an assessment from JSON bytes.
    ///
    /// # Errors
    /// Returns [`CoreError::Codec`] when JSON decoding fails.
    pub fn from_json_bytes(raw: &[u8]) -> Result<Self, CoreError> {
        serde_json::from_slice(raw).map_err(CoreError::Codec)
    }
}

/// Error type for core validation and codec failures.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Communication violates input constraints.
    #[error("validation error: {0}")]
    Validation(String),
    /// JSON encoding/decoding error.
    #[error("codec failure: {0}")]
    Codec(#[from] serde_json::Error),
}
