#![warn(missing_docs)]
//! # rebus-analysis
//!
//! ## Purpose
//! Obtains analysis signals for normalized communications from an external
//! analysis engine, at most once per distinct input.
//!
//! ## Responsibilities
//! - Define the injectable [`AnalysisEngine`] collaborator contract.
//! - Parse JSON engine responses into clamped [`AnalysisSignals`].
//! - Cache successful results per [`Fingerprint`] with a time-to-live.
//! - Coalesce concurrent requests for one fingerprint into a single engine call.
//! - Bound every engine call with a timeout and contain its failures.
//!
//! ## Data flow
//! [`Communication`] -> [`AnalysisInvoker::invoke`] derives the fingerprint ->
//! [`AnalysisCache::get_or_compute`] returns a cached result or runs one engine
//! call shared by all concurrent callers -> [`Invocation`].
//!
//! ## Ownership and lifetimes
//! The engine call runs on its own tokio task and owns an [`AnalysisRequest`]
//! copy of the communication fields, so it outlives any single caller.
//!
//! ## Error model
//! Engine failures and timeouts never reach the caller. They are converted to
//! [`AnalysisResult::Unavailable`] sentinels, delivered to every coalesced
//! waiter, and not cached so the next request retries the engine.
//!
//! ## Security and privacy notes
//! Logs carry fingerprint prefixes and timings only, never communication text.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use rebus_core::{
    AnalysisResult, AnalysisSignals, Communication, CommunicationContext, Fingerprint,
    fingerprint,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Default bound for one engine call.
pub const DEFAULT_ANALYSIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Default lifetime of a cached analysis.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Fields of a communication forwarded to the analysis engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    /// Text content.
    pub text: String,
    /// Normalized language code.
    pub language: String,
    /// Optional diplomatic context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CommunicationContext>,
}

impl AnalysisRequest {
    /// Copies the engine-relevant fields out of a normalized communication.
    pub fn from_communication(communication: &Communication) -> Self {
        Self {
            text: communication.text().to_string(),
            language: communication.language().to_string(),
            context: communication.context().cloned(),
        }
    }
}

/// External analysis engine.
///
/// Implementations may take arbitrarily long; [`AnalysisInvoker`] imposes the
/// timeout. Returned signals are trusted to be clamped (see
/// [`AnalysisSignals::new`]).
#[async_trait]
pub trait AnalysisEngine: Send + Sync {
    /// Analyzes one communication.
    ///
    /// # Errors
    /// Returns [`AnalysisError`] when the engine is unreachable or rejects the
    /// request.
    async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisSignals, AnalysisError>;
}

/// Parses a JSON engine response body into analysis signals.
///
/// All fields are optional; missing numerics default to `0` and missing marker
/// lists to empty. Out-of-range numerics are clamped and blank markers dropped.
///
/// # Errors
/// Returns [`AnalysisError::Decode`] for invalid JSON.
/// Returns [`AnalysisError::InvalidContract`] when the body is not an object.
/// Returns [`AnalysisError::Engine`] when the body carries a non-empty
/// `errorMessage`.
pub fn parse_engine_response(raw: &str) -> Result<AnalysisSignals, AnalysisError> {
    let value: Value = serde_json::from_str(raw).map_err(AnalysisError::Decode)?;
    if !value.is_object() {
        return Err(AnalysisError::InvalidContract(
            "engine response must be a JSON object".to_string(),
        ));
    }

    let parsed: AnalysisResult = serde_json::from_value(value).map_err(AnalysisError::Decode)?;
    match parsed {
        AnalysisResult::Completed(signals) => {
            let escalatory = non_blank(signals.escalatory_language());
            let nuances = non_blank(signals.cultural_nuances());
            Ok(signals
                .with_escalatory_language(escalatory)
                .with_cultural_nuances(nuances))
        }
        AnalysisResult::Unavailable { error_message } => Err(AnalysisError::Engine(error_message)),
    }
}

fn non_blank(markers: &[String]) -> Vec<String> {
    markers
        .iter()
        .map(|marker| marker.trim())
        .filter(|marker| !marker.is_empty())
        .map(str::to_string)
        .collect()
}

enum Slot {
    Ready {
        result: AnalysisResult,
        expires_at: Instant,
    },
    InFlight(watch::Receiver<Option<AnalysisResult>>),
}

/// Fingerprint-keyed analysis cache with request coalescing.
///
/// # Semantics
/// - A fresh successful entry is returned without calling the engine.
/// - Among concurrent misses for one fingerprint, exactly one compute future
///   runs; every caller receives its result.
/// - The compute future runs on a spawned task, so abandoning the first caller
///   does not cancel it for the others.
/// - Failure sentinels are shared with waiters but never stored.
/// - Inserting a new fingerprint first drops every expired entry, bounded or
///   not.
pub struct AnalysisCache {
    ttl: Duration,
    max_entries: Option<usize>,
    slots: Mutex<HashMap<Fingerprint, Slot>>,
}

impl AnalysisCache {
    /// Creates an unbounded cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            max_entries: None,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// Caps the number of slots. Expired entries are purged first, then the
    /// entry closest to expiry is evicted. In-flight calls are never evicted.
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    /// Configured entry lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached result for `fingerprint` if present and unexpired.
    pub fn get(&self, fingerprint: &Fingerprint) -> Option<AnalysisResult> {
        let slots = self.lock_slots();
        match slots.get(fingerprint) {
            Some(Slot::Ready { result, expires_at }) if *expires_at > Instant::now() => {
                Some(result.clone())
            }
            _ => None,
        }
    }

    /// Stores `result` under `fingerprint` for `ttl`.
    pub fn put(&self, fingerprint: Fingerprint, result: AnalysisResult, ttl: Duration) {
        let now = Instant::now();
        let mut slots = self.lock_slots();
        if !slots.contains_key(&fingerprint) {
            self.make_room(&mut slots, now);
        }
        slots.insert(
            fingerprint,
            Slot::Ready {
                result,
                expires_at: expiry(now, ttl),
            },
        );
    }

    /// Returns the cached result or runs `compute` once for all concurrent
    /// callers of `fingerprint`.
    ///
    /// `compute` is only invoked by the caller that finds neither a fresh entry
    /// nor an in-flight call. Must be called from within a tokio runtime.
    pub async fn get_or_compute<F, Fut>(
        self: &Arc<Self>,
        fingerprint: Fingerprint,
        compute: F,
    ) -> AnalysisResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = AnalysisResult> + Send + 'static,
    {
        let mut receiver = {
            let now = Instant::now();
            let mut slots = self.lock_slots();
            match slots.get(&fingerprint) {
                Some(Slot::Ready { result, expires_at }) if *expires_at > now => {
                    debug!(fingerprint = fingerprint.short(), "analysis cache hit");
                    return result.clone();
                }
                // A closed channel means the compute task died without publishing.
                Some(Slot::InFlight(receiver)) if receiver.has_changed().is_ok() => {
                    debug!(fingerprint = fingerprint.short(), "joining in-flight analysis");
                    receiver.clone()
                }
                _ => {
                    debug!(fingerprint = fingerprint.short(), "analysis cache miss");
                    let (sender, receiver) = watch::channel(None);
                    slots.remove(&fingerprint);
                    self.make_room(&mut slots, now);
                    slots.insert(fingerprint.clone(), Slot::InFlight(receiver.clone()));

                    let cache = Arc::clone(self);
                    let key = fingerprint.clone();
                    let pending = compute();
                    tokio::spawn(async move {
                        let result = pending.await;
                        cache.complete(key, &result);
                        sender.send_replace(Some(result));
                    });
                    receiver
                }
            }
        };

        let published = receiver
            .wait_for(Option::is_some)
            .await
            .ok()
            .and_then(|value| (*value).clone());

        match published {
            Some(result) => result,
            None => {
                self.discard_dead(&fingerprint);
                warn!(
                    fingerprint = fingerprint.short(),
                    "analysis task ended without publishing a result"
                );
                AnalysisResult::error("analysis task ended without a result")
            }
        }
    }

    /// Drops every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut slots = self.lock_slots();
        let before = slots.len();
        slots.retain(|_, slot| !is_expired(slot, now));
        before - slots.len()
    }

    /// Number of slots, including in-flight and expired ones.
    pub fn len(&self) -> usize {
        self.lock_slots().len()
    }

    /// Returns `true` when no slot exists.
    pub fn is_empty(&self) -> bool {
        self.lock_slots().is_empty()
    }

    /// Number of engine calls currently in flight.
    pub fn in_flight(&self) -> usize {
        self.lock_slots()
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight(_)))
            .count()
    }

    fn complete(&self, fingerprint: Fingerprint, result: &AnalysisResult) {
        let mut slots = self.lock_slots();
        if result.is_successful() {
            slots.insert(
                fingerprint,
                Slot::Ready {
                    result: result.clone(),
                    expires_at: expiry(Instant::now(), self.ttl),
                },
            );
        } else if matches!(slots.get(&fingerprint), Some(Slot::InFlight(_))) {
            slots.remove(&fingerprint);
        }
    }

    fn discard_dead(&self, fingerprint: &Fingerprint) {
        let mut slots = self.lock_slots();
        if let Some(Slot::InFlight(receiver)) = slots.get(fingerprint)
            && receiver.has_changed().is_err()
        {
            slots.remove(fingerprint);
        }
    }

    /// Drops expired entries, then enforces `max_entries` if set.
    fn make_room(&self, slots: &mut HashMap<Fingerprint, Slot>, now: Instant) {
        slots.retain(|_, slot| !is_expired(slot, now));

        let Some(max_entries) = self.max_entries else {
            return;
        };
        while slots.len() >= max_entries {
            let oldest = slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready { expires_at, .. } => Some((key, *expires_at)),
                    Slot::InFlight(_) => None,
                })
                .min_by_key(|(_, expires_at)| *expires_at)
                .map(|(key, _)| key.clone());

            match oldest {
                Some(key) => {
                    slots.remove(&key);
                }
                None => break,
            }
        }
    }

    fn lock_slots(&self) -> MutexGuard<'_, HashMap<Fingerprint, Slot>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_TTL)
    }
}

/// Cap for entry lifetimes that would overflow the clock.
const MAX_ENTRY_LIFETIME: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

fn expiry(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(MAX_ENTRY_LIFETIME))
        .unwrap_or(now)
}

fn is_expired(slot: &Slot, now: Instant) -> bool {
    matches!(slot, Slot::Ready { expires_at, .. } if *expires_at <= now)
}

/// Result of one invocation together with its cache key.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Fingerprint of the analyzed communication.
    pub fingerprint: Fingerprint,
    /// Analysis outcome, possibly a failure sentinel.
    pub result: AnalysisResult,
}

/// Calls the analysis engine through the cache with a bounded timeout.
#[derive(Clone)]
pub struct AnalysisInvoker {
    engine: Arc<dyn AnalysisEngine>,
    cache: Arc<AnalysisCache>,
    timeout: Duration,
}

impl AnalysisInvoker {
    /// Creates an invoker over an explicitly constructed engine and cache.
    pub fn new(
        engine: Arc<dyn AnalysisEngine>,
        cache: Arc<AnalysisCache>,
        timeout: Duration,
    ) -> Self {
        Self {
            engine,
            cache,
            timeout,
        }
    }

    /// Shared cache handle.
    pub fn cache(&self) -> &Arc<AnalysisCache> {
        &self.cache
    }

    /// Configured engine timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Obtains the analysis for one communication.
    ///
    /// Never fails: timeouts and engine errors yield an
    /// [`AnalysisResult::Unavailable`] sentinel. Successful results carry the
    /// measured `processing_time_ms`.
    pub async fn invoke(&self, communication: &Communication) -> Invocation {
        let fingerprint = fingerprint(communication);
        let request = AnalysisRequest::from_communication(communication);
        let engine = Arc::clone(&self.engine);
        let timeout = self.timeout;
        let label = fingerprint.short().to_string();

        let result = self
            .cache
            .get_or_compute(fingerprint.clone(), move || {
                call_engine(engine, request, timeout, label)
            })
            .await;

        Invocation {
            fingerprint,
            result,
        }
    }
}

async fn call_engine(
    engine: Arc<dyn AnalysisEngine>,
    request: AnalysisRequest,
    timeout: Duration,
    label: String,
) -> AnalysisResult {
    let started = Instant::now();
    let outcome = tokio::time::timeout(timeout, engine.analyze(&request)).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let error = match outcome {
        Ok(Ok(signals)) => {
            info!(fingerprint = %label, elapsed_ms, "analysis completed");
            return AnalysisResult::Completed(signals.with_processing_time_ms(elapsed_ms));
        }
        Ok(Err(error)) => error,
        Err(_) => AnalysisError::Timeout {
            elapsed_ms: timeout.as_millis() as u64,
        },
    };

    warn!(fingerprint = %label, elapsed_ms, %error, "analysis unavailable");
    AnalysisResult::error(error.to_string())
}

/// Analysis engine and contract errors.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Engine did not answer within the configured timeout.
    #[error("analysis timed out after {elapsed_ms} ms")]
    Timeout {
        /// Timeout that elapsed, in milliseconds.
        elapsed_ms: u64,
    },
    /// Engine was unreachable or reported a failure.
    #[error("analysis engine failure: {0}")]
    Engine(String),
    /// JSON decode failure.
    #[error("analysis decode failure: {0}")]
    Decode(#[from] serde_json::Error),
    /// Response violates the engine contract.
    #[error("analysis contract violation: {0}")]
    InvalidContract(String),
}
