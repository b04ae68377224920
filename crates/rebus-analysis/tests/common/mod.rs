//! Shared engines and fixtures for analysis integration tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use rebus_analysis::{AnalysisEngine, AnalysisError, AnalysisRequest};
use rebus_core::{AnalysisSignals, Communication, CommunicationDraft, normalize};

/// Builds a normalized communication fixture.
#[allow(dead_code)]
pub fn fixture_communication(text: &str) -> Communication {
    normalize(CommunicationDraft::new(text).with_id("fixture")).expect("fixture should normalize")
}

/// Fixed signals returned by [`CountingEngine`].
#[allow(dead_code)]
pub fn fixture_signals() -> AnalysisSignals {
    AnalysisSignals::new(-0.6, 0.3, 0.8)
        .with_escalatory_language(vec!["red line".to_string(), "consequences".to_string()])
        .with_cultural_nuances(vec!["honorific omitted".to_string()])
}

/// Engine that counts calls and answers after a fixed delay.
#[derive(Debug)]
pub struct CountingEngine {
    calls: AtomicUsize,
    delay: Duration,
}

#[allow(dead_code)]
impl CountingEngine {
    pub fn new(delay: Duration) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisEngine for CountingEngine {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisSignals, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(fixture_signals())
    }
}

/// Engine that fails immediately.
#[derive(Debug, Default)]
pub struct FailingEngine {
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl FailingEngine {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisEngine for FailingEngine {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisSignals, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(AnalysisError::Engine("upstream unreachable".to_string()))
    }
}

/// Engine that never answers within any reasonable timeout.
#[derive(Debug, Default)]
pub struct StallingEngine {
    calls: AtomicUsize,
}

#[allow(dead_code)]
impl StallingEngine {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisEngine for StallingEngine {
    async fn analyze(&self, _request: &AnalysisRequest) -> Result<AnalysisSignals, AnalysisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(60 * 60)).await;
        Ok(AnalysisSignals::default())
    }
}
