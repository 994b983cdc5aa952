//! Background comparison with last-request-wins supersession
//!
//! Each document identity has a generation counter. Submitting a new
//! comparison bumps it; any older computation for the same document is then
//! stale. Stale workers stop at their next stage boundary, and a stale result
//! is never delivered, even one that finished before the newer request came in.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::CompatConfig;
use crate::engine::CompatibilityEngine;
use crate::error::{Result, SchemaError};
use crate::report::CompatibilityReport;

/// What a pending comparison resolved to
#[derive(Debug, Clone)]
pub enum CompareOutcome {
    /// The comparison was still current when it completed
    Report(Arc<CompatibilityReport>),
    /// A newer request for the same document replaced this one
    Superseded,
}

impl CompareOutcome {
    pub fn report(&self) -> Option<&Arc<CompatibilityReport>> {
        match self {
            CompareOutcome::Report(report) => Some(report),
            CompareOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, CompareOutcome::Superseded)
    }
}

#[derive(Clone, Default)]
struct Generations(Arc<Mutex<HashMap<String, u64>>>);

impl Generations {
    fn lock(&self) -> MutexGuard<'_, HashMap<String, u64>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn bump(&self, document: &str) -> u64 {
        let mut table = self.lock();
        let generation = table.entry(document.to_string()).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, document: &str, generation: u64) -> bool {
        self.lock().get(document).copied() == Some(generation)
    }
}

/// Runs comparisons off the caller's thread, one live request per document
pub struct ComparisonScheduler {
    engine: Arc<CompatibilityEngine>,
    debounce: Duration,
    generations: Generations,
}

impl ComparisonScheduler {
    pub fn new(engine: Arc<CompatibilityEngine>, debounce: Duration) -> Self {
        Self {
            engine,
            debounce,
            generations: Generations::default(),
        }
    }

    pub fn from_config(config: &CompatConfig) -> Self {
        Self::new(
            Arc::new(CompatibilityEngine::from_config(config)),
            config.scheduler.debounce(),
        )
    }

    pub fn engine(&self) -> &Arc<CompatibilityEngine> {
        &self.engine
    }

    /// Start a comparison for `document`, superseding any in-flight one
    pub fn submit(
        &self,
        document: impl Into<String>,
        old_text: impl Into<String>,
        new_text: impl Into<String>,
    ) -> PendingComparison {
        let document = document.into();
        let generation = self.generations.bump(&document);
        debug!(document = %document, generation, "submitted comparison");

        let engine = Arc::clone(&self.engine);
        let generations = self.generations.clone();
        let debounce = self.debounce;
        let worker_document = document.clone();
        let (old_text, new_text) = (old_text.into(), new_text.into());

        let handle = thread::spawn(move || {
            if !debounce.is_zero() {
                thread::sleep(debounce);
            }
            let is_current = || generations.is_current(&worker_document, generation);
            if !is_current() {
                return Err(SchemaError::Superseded {
                    document: worker_document.clone(),
                });
            }
            engine.compare_checked(&old_text, &new_text, &is_current, &worker_document)
        });

        PendingComparison {
            document,
            generation,
            generations: self.generations.clone(),
            handle,
        }
    }

    /// Supersede whatever is in flight for `document` without starting anything
    pub fn cancel(&self, document: &str) {
        let generation = self.generations.bump(document);
        debug!(document, generation, "cancelled comparison");
    }
}

/// Handle to a comparison running on a worker thread
pub struct PendingComparison {
    document: String,
    generation: u64,
    generations: Generations,
    handle: JoinHandle<Result<Arc<CompatibilityReport>>>,
}

impl PendingComparison {
    pub fn document(&self) -> &str {
        &self.document
    }

    /// Whether a newer request has replaced this one
    pub fn is_superseded(&self) -> bool {
        !self.generations.is_current(&self.document, self.generation)
    }

    /// Block until the worker finishes.
    ///
    /// Errors from a superseded request are discarded along with its report.
    pub fn wait(self) -> Result<CompareOutcome> {
        let result = self.handle.join().map_err(|_| SchemaError::InternalInvariant {
            path: "$".to_string(),
            message: format!("comparison worker for '{}' panicked", self.document),
        })?;

        if !self.generations.is_current(&self.document, self.generation) {
            warn!(document = %self.document, generation = self.generation, "discarding superseded comparison");
            return Ok(CompareOutcome::Superseded);
        }

        match result {
            Ok(report) => Ok(CompareOutcome::Report(report)),
            Err(SchemaError::Superseded { .. }) => Ok(CompareOutcome::Superseded),
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::version::VersionBump;

    const V1: &str = r#"{"type": "object", "properties": {"id": {"type": "string"}}}"#;
    const V2: &str = r#"{"type": "object", "properties": {"id": {"type": "string"}, "note": {"type": "string"}}}"#;
    const V3: &str = r#"{"type": "object", "properties": {}}"#;

    fn scheduler(debounce_ms: u64) -> ComparisonScheduler {
        let engine = Arc::new(CompatibilityEngine::new(&EngineConfig::default(), 16));
        ComparisonScheduler::new(engine, Duration::from_millis(debounce_ms))
    }

    #[test]
    fn test_single_submission_delivers() {
        let scheduler = scheduler(0);
        let pending = scheduler.submit("orders", V1, V2);
        assert_eq!(pending.document(), "orders");
        let outcome = pending.wait().unwrap();
        assert_eq!(outcome.report().unwrap().suggested_bump(), VersionBump::Minor);
    }

    #[test]
    fn test_last_request_wins() {
        let scheduler = scheduler(0);
        let first = scheduler.submit("orders", V1, V2);
        let second = scheduler.submit("orders", V1, V3);

        assert!(first.is_superseded());
        assert!(first.wait().unwrap().is_superseded());

        let outcome = second.wait().unwrap();
        assert_eq!(outcome.report().unwrap().suggested_bump(), VersionBump::Major);
    }

    #[test]
    fn test_debounced_worker_never_runs_when_superseded() {
        let scheduler = scheduler(50);
        let first = scheduler.submit("orders", V1, V2);
        let second = scheduler.submit("orders", V1, V3);

        assert!(first.wait().unwrap().is_superseded());
        assert!(second.wait().unwrap().report().is_some());
        // Only the surviving request reached the engine
        assert_eq!(scheduler.engine().cache_stats().misses, 1);
    }

    #[test]
    fn test_documents_are_independent() {
        let scheduler = scheduler(0);
        let orders = scheduler.submit("orders", V1, V2);
        let users = scheduler.submit("users", V1, V3);
        assert!(orders.wait().unwrap().report().is_some());
        assert!(users.wait().unwrap().report().is_some());
    }

    #[test]
    fn test_cancel() {
        let scheduler = scheduler(0);
        let pending = scheduler.submit("orders", V1, V2);
        scheduler.cancel("orders");
        assert!(pending.wait().unwrap().is_superseded());
    }

    #[test]
    fn test_errors_surface_for_current_request() {
        let scheduler = scheduler(0);
        let pending = scheduler.submit("orders", V1, "{ not json");
        assert!(matches!(pending.wait(), Err(SchemaError::Syntax { .. })));
    }

    #[test]
    fn test_errors_discarded_for_superseded_request() {
        let scheduler = scheduler(0);
        let broken = scheduler.submit("orders", V1, "{ not json");
        let fixed = scheduler.submit("orders", V1, V2);
        assert!(broken.wait().unwrap().is_superseded());
        assert!(fixed.wait().unwrap().report().is_some());
    }
}
