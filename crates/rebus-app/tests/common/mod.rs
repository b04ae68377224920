//! Shared fixtures for app integration tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rebus_analysis::{AnalysisEngine, AnalysisError, AnalysisRequest};
use rebus_app::{PipelineConfig, RiskPipeline};
use rebus_core::AnalysisSignals;

/// Engine answering after a delay proportional to text length.
///
/// Longer texts finish later; misinformation tracks the length so results
/// differ per input.
#[allow(dead_code)]
#[derive(Default)]
pub struct EchoEngine {
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl EchoEngine {
    /// Number of engine invocations so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisEngine for EchoEngine {
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisSignals, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let length = request.text.chars().count() as u64;
        tokio::time::sleep(Duration::from_millis(length * 10)).await;
        Ok(AnalysisSignals::new(-0.4, (length as f64 / 100.0).min(1.0), 0.9)
            .with_escalatory_language(vec!["ultimatum".to_string()]))
    }
}

/// Engine that never answers within any realistic timeout.
#[allow(dead_code)]
pub struct StallingEngine;

#[async_trait]
impl AnalysisEngine for StallingEngine {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisSignals, AnalysisError> {
        tokio::time::sleep(Duration::from_secs(3_600)).await;
        Err(AnalysisError::Engine("unreachable".to_string()))
    }
}

/// Builds a pipeline over `engine` with a 2 second analysis timeout.
#[allow(dead_code)]
pub fn fixture_pipeline(engine: Arc<dyn AnalysisEngine>) -> RiskPipeline {
    let config = PipelineConfig {
        analysis_timeout: Duration::from_secs(2),
        ..PipelineConfig::default()
    };
    RiskPipeline::new(&config, engine).expect("fixture config should validate")
}
