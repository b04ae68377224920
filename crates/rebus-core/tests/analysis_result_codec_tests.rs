//! Integration tests for the flat analysis result wire shape.

use rebus_core::{AnalysisResult, AnalysisSignals};
use serde_json::{Value, json};

#[test]
fn analysis_result_codec_tests_sentinel_serializes_empty_lists() {
    let sentinel = AnalysisResult::error("engine unreachable");
    let encoded = serde_json::to_value(&sentinel).expect("sentinel should encode");

    assert_eq!(encoded["errorMessage"], json!("engine unreachable"));
    assert_eq!(encoded["escalatoryLanguage"], json!([]));
    assert_eq!(encoded["culturalNuances"], json!([]));
    assert_eq!(encoded["confidence"], json!(0.0));
    assert_eq!(encoded["sentimentScore"], json!(0.0));
}

#[test]
fn analysis_result_codec_tests_success_omits_error_message() {
    let result = AnalysisResult::Completed(
        AnalysisSignals::new(-0.4, 0.2, 0.9)
            .with_escalatory_language(vec!["ultimatum".to_string()])
            .with_processing_time_ms(12),
    );
    let encoded = serde_json::to_value(&result).expect("result should encode");

    assert!(result.is_successful());
    assert_eq!(encoded.get("errorMessage"), None::<&Value>);
    assert_eq!(encoded["processingTimeMs"], json!(12));
}

#[test]
fn analysis_result_codec_tests_error_message_selects_failure_branch() {
    let decoded: AnalysisResult = serde_json::from_value(json!({
        "sentimentScore": 0.7,
        "errorMessage": "rate limited"
    }))
    .expect("record should decode");

    assert!(!decoded.is_successful());
    assert_eq!(decoded.error_message(), Some("rate limited"));
    assert_eq!(decoded.sentiment_score(), 0.0);

    let blank: AnalysisResult = serde_json::from_value(json!({
        "confidence": 0.5,
        "errorMessage": ""
    }))
    .expect("record should decode");
    assert!(blank.is_successful());
}

#[test]
fn analysis_result_codec_tests_decoding_clamps_out_of_range_values() {
    let decoded: AnalysisResult = serde_json::from_value(json!({
        "sentimentScore": -3.0,
        "misinformationProbability": 1.4,
        "confidence": -0.1
    }))
    .expect("record should decode");

    assert_eq!(decoded.sentiment_score(), -1.0);
    assert_eq!(decoded.misinformation_probability(), 1.0);
    assert_eq!(decoded.confidence(), 0.0);
    assert!(decoded.escalatory_language().is_empty());
}

#[test]
fn analysis_result_codec_tests_reasoning_round_trips_and_sentinel_has_none() {
    let decoded: AnalysisResult = serde_json::from_value(json!({
        "sentimentScore": 0.2,
        "confidence": 0.7,
        "reasoning": "Conciliatory phrasing throughout."
    }))
    .expect("record should decode");

    assert_eq!(decoded.reasoning(), Some("Conciliatory phrasing throughout."));
    let encoded = serde_json::to_value(&decoded).expect("result should encode");
    assert_eq!(encoded["reasoning"], json!("Conciliatory phrasing throughout."));

    assert_eq!(AnalysisResult::error("offline").reasoning(), None);
}
