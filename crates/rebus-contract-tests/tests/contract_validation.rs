//! Validates contract fixtures against frozen JSON schemas and checks the Rust
//! codecs agree with them.

use jsonschema::JSONSchema;
use rebus_core::{
    AnalysisResult, CommunicationDraft, CommunicationType, RiskAssessment, RiskLevel, normalize,
};
use rebus_risk::{RiskAggregator, RiskClassifier, RiskWeights};
use serde_json::Value;

const EPSILON: f64 = 1e-9;

fn load_json(path: &str) -> Value {
    let raw = std::fs::read_to_string(path).expect("json file should be readable");
    serde_json::from_str(&raw).expect("json file should be valid")
}

fn compile_validator(schema_path: &str) -> JSONSchema {
    let schema = load_json(schema_path);
    JSONSchema::compile(&schema).expect("schema should compile")
}

fn communication_fixture() -> Value {
    load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/communication.valid.json"
    ))
}

fn analysis_fixture() -> Value {
    load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/analysis-result.valid.json"
    ))
}

fn assessment_fixture() -> Value {
    load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/risk-assessment.valid.json"
    ))
}

#[test]
fn communication_fixture_matches_schema() {
    let validator = compile_validator(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/communication.schema.json"
    ));
    assert!(
        validator.is_valid(&communication_fixture()),
        "communication fixture should validate against schema"
    );
}

#[test]
fn communication_schema_rejects_short_text() {
    let validator = compile_validator(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/communication.schema.json"
    ));
    let mut fixture = communication_fixture();
    fixture["text"] = Value::from("too short");
    assert!(!validator.is_valid(&fixture));
}

#[test]
fn communication_fixture_decodes_and_normalizes() {
    let raw = serde_json::to_vec(&communication_fixture()).expect("fixture should encode");
    let draft = CommunicationDraft::from_json_bytes(&raw).expect("fixture should decode");
    let communication = normalize(draft).expect("fixture should normalize");

    assert_eq!(communication.id(), "comm-2024-0117");
    assert_eq!(communication.language(), "en");
    assert_eq!(
        communication
            .context()
            .map(|context| context.communication_type),
        Some(CommunicationType::OfficialStatement)
    );
}

#[test]
fn analysis_fixtures_match_schema() {
    let validator = compile_validator(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/analysis-result.schema.json"
    ));
    let unavailable = load_json(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/fixtures/analysis-result.unavailable.json"
    ));

    assert!(
        validator.is_valid(&analysis_fixture()),
        "analysis fixture should validate against schema"
    );
    assert!(
        validator.is_valid(&unavailable),
        "unavailable fixture should validate against schema"
    );

    let decoded: AnalysisResult =
        serde_json::from_value(unavailable).expect("unavailable fixture should decode");
    assert!(!decoded.is_successful());
}

#[test]
fn encoded_sentinel_matches_schema() {
    let validator = compile_validator(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/analysis-result.schema.json"
    ));
    let encoded = serde_json::to_value(AnalysisResult::error("engine offline"))
        .expect("sentinel should encode");
    assert!(validator.is_valid(&encoded));
}

#[test]
fn assessment_fixture_matches_schema() {
    let validator = compile_validator(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/risk-assessment.schema.json"
    ));
    assert!(
        validator.is_valid(&assessment_fixture()),
        "assessment fixture should validate against schema"
    );
}

#[test]
fn assessment_fixture_agrees_with_scoring() {
    let analysis: AnalysisResult =
        serde_json::from_value(analysis_fixture()).expect("analysis fixture should decode");
    let raw = serde_json::to_vec(&assessment_fixture()).expect("fixture should encode");
    let expected = RiskAssessment::from_json_bytes(&raw).expect("assessment should decode");

    let aggregation = RiskAggregator::new(RiskWeights::default())
        .expect("default weights should validate")
        .aggregate(&analysis);
    let actual = RiskClassifier::new().assess(
        expected.communication_id.clone(),
        expected.fingerprint.clone(),
        aggregation,
    );

    assert!((actual.score - expected.score).abs() < EPSILON);
    assert_eq!(actual.risk_level, RiskLevel::Low);
    assert_eq!(actual.risk_level, expected.risk_level);
    assert_eq!(actual.color_code, expected.color_code);
    assert_eq!(actual.action_guidance, expected.action_guidance);
    assert_eq!(actual.primary_risk_factor, expected.primary_risk_factor);
    assert_eq!(actual.risk_summary, expected.risk_summary);
    for (name, value) in &expected.component_scores {
        assert!((actual.component_scores[name] - value).abs() < EPSILON, "{name}");
    }
}

#[test]
fn encoded_assessment_matches_schema() {
    let validator = compile_validator(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../contracts/risk-assessment.schema.json"
    ));
    let raw = serde_json::to_vec(&assessment_fixture()).expect("fixture should encode");
    let decoded = RiskAssessment::from_json_bytes(&raw).expect("assessment should decode");
    let reencoded: Value = serde_json::from_slice(
        &decoded
            .to_json_bytes()
            .expect("assessment should encode"),
    )
    .expect("encoded assessment should parse");
    assert!(validator.is_valid(&reencoded));
}
