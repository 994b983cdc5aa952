//! Compatibility engine
//!
//! Runs parse, diff, classify, recommend and score for a pair of schema
//! texts and memoizes the resulting reports by content hash.

use std::sync::Arc;

use tracing::debug;

use crate::cache::{CacheStats, ReportCache};
use crate::config::{CompatConfig, EngineConfig};
use crate::diff::Differ;
use crate::error::{Result, SchemaError};
use crate::parser::Parser;
use crate::report::CompatibilityReport;
use crate::schema::SchemaDocument;

/// Compares schema versions and caches the reports
pub struct CompatibilityEngine {
    parser: Parser,
    differ: Differ,
    cache: ReportCache,
}

impl Default for CompatibilityEngine {
    fn default() -> Self {
        Self::from_config(&CompatConfig::default())
    }
}

impl CompatibilityEngine {
    pub fn new(engine: &EngineConfig, cache_capacity: usize) -> Self {
        Self {
            parser: Parser::new().with_max_depth(engine.max_nesting_depth),
            differ: Differ::new().with_strict_mode(engine.strict_mode),
            cache: ReportCache::new(cache_capacity),
        }
    }

    pub fn from_config(config: &CompatConfig) -> Self {
        Self::new(&config.engine, config.cache.capacity)
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn is_strict(&self) -> bool {
        self.differ.is_strict()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Parse a single schema with this engine's depth limit
    pub fn parse(&self, text: &str) -> Result<SchemaDocument> {
        self.parser.parse(text)
    }

    /// Compare two schema texts.
    ///
    /// Either input failing to parse fails the whole call; no report is
    /// produced. A repeated pair of normalized schemas is served from cache.
    pub fn compare(&self, old_text: &str, new_text: &str) -> Result<Arc<CompatibilityReport>> {
        self.compare_checked(old_text, new_text, &|| true, "")
    }

    /// Compare two already-parsed documents
    pub fn compare_documents(
        &self,
        old: &SchemaDocument,
        new: &SchemaDocument,
    ) -> Result<Arc<CompatibilityReport>> {
        self.evaluate(old, new, &|| true, "")
    }

    /// Compare with a staleness probe checked between stages.
    ///
    /// Once `is_current` returns false the computation stops with
    /// `SchemaError::Superseded` and nothing is cached.
    pub(crate) fn compare_checked(
        &self,
        old_text: &str,
        new_text: &str,
        is_current: &dyn Fn() -> bool,
        document: &str,
    ) -> Result<Arc<CompatibilityReport>> {
        let old = self.parser.parse(old_text)?;
        let new = self.parser.parse(new_text)?;
        ensure_current(is_current, document)?;
        self.evaluate(&old, &new, is_current, document)
    }

    fn evaluate(
        &self,
        old: &SchemaDocument,
        new: &SchemaDocument,
        is_current: &dyn Fn() -> bool,
        document: &str,
    ) -> Result<Arc<CompatibilityReport>> {
        let key = (old.hash().clone(), new.hash().clone());
        if let Some(report) = self.cache.get(&key) {
            debug!(old = old.hash().short(), new = new.hash().short(), "report cache hit");
            return Ok(report);
        }
        debug!(old = old.hash().short(), new = new.hash().short(), "report cache miss");

        let records = self.differ.diff(old, new)?;
        ensure_current(is_current, document)?;

        let report = Arc::new(CompatibilityReport::assemble(old, new, records));
        ensure_current(is_current, document)?;
        Ok(self.cache.insert(key, report))
    }
}

fn ensure_current(is_current: &dyn Fn() -> bool, document: &str) -> Result<()> {
    if is_current() {
        Ok(())
    } else {
        Err(SchemaError::Superseded {
            document: document.to_string(),
        })
    }
}
