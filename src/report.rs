//! Compatibility reports
//!
//! A `CompatibilityReport` is built once per (old, new) content-hash pair and
//! never mutated afterwards. Newer inputs produce a new report.

use serde::Serialize;
use tracing::info;

use crate::checksum::Checksum;
use crate::classify::{classify, Verdict};
use crate::confidence;
use crate::diff::ChangeRecord;
use crate::schema::SchemaDocument;
use crate::version::{recommend, VersionBump};

/// Result of comparing two schema versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompatibilityReport {
    old_hash: Checksum,
    new_hash: Checksum,
    breaking: Vec<ChangeRecord>,
    additive: Vec<ChangeRecord>,
    neutral: Vec<ChangeRecord>,
    suggested_bump: VersionBump,
    confidence: f64,
    migration_required: bool,
}

impl CompatibilityReport {
    /// Classify, aggregate and partition a diff into a report.
    ///
    /// Records keep their diff order within each partition.
    pub fn assemble(old: &SchemaDocument, new: &SchemaDocument, records: Vec<ChangeRecord>) -> Self {
        let verdicts: Vec<Verdict> = records.iter().map(classify).collect();
        let suggested_bump = recommend(&verdicts);
        let confidence = confidence::score(&records);

        let mut breaking = Vec::new();
        let mut additive = Vec::new();
        let mut neutral = Vec::new();
        for (record, verdict) in records.into_iter().zip(verdicts) {
            match verdict {
                Verdict::Breaking => breaking.push(record),
                Verdict::Additive => additive.push(record),
                Verdict::Neutral => neutral.push(record),
            }
        }

        let report = Self {
            old_hash: old.hash().clone(),
            new_hash: new.hash().clone(),
            migration_required: !breaking.is_empty(),
            breaking,
            additive,
            neutral,
            suggested_bump,
            confidence,
        };

        info!(
            old = report.old_hash.short(),
            new = report.new_hash.short(),
            breaking = report.breaking.len(),
            additive = report.additive.len(),
            neutral = report.neutral.len(),
            bump = %report.suggested_bump,
            confidence = report.confidence,
            "assembled compatibility report"
        );

        report
    }

    pub fn old_hash(&self) -> &Checksum {
        &self.old_hash
    }

    pub fn new_hash(&self) -> &Checksum {
        &self.new_hash
    }

    pub fn breaking(&self) -> &[ChangeRecord] {
        &self.breaking
    }

    pub fn additive(&self) -> &[ChangeRecord] {
        &self.additive
    }

    pub fn neutral(&self) -> &[ChangeRecord] {
        &self.neutral
    }

    pub fn suggested_bump(&self) -> VersionBump {
        self.suggested_bump
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn migration_required(&self) -> bool {
        self.migration_required
    }

    /// No breaking changes
    pub fn is_compatible(&self) -> bool {
        self.breaking.is_empty()
    }

    /// No changes at all
    pub fn is_unchanged(&self) -> bool {
        self.breaking.is_empty() && self.additive.is_empty() && self.neutral.is_empty()
    }

    pub fn total_changes(&self) -> usize {
        self.breaking.len() + self.additive.len() + self.neutral.len()
    }

    /// Every record, breaking first, in the order handed to an impact estimator
    pub fn changes(&self) -> impl Iterator<Item = (Verdict, &ChangeRecord)> {
        self.breaking
            .iter()
            .map(|r| (Verdict::Breaking, r))
            .chain(self.additive.iter().map(|r| (Verdict::Additive, r)))
            .chain(self.neutral.iter().map(|r| (Verdict::Neutral, r)))
    }

    /// One-line summary of the report
    pub fn summary(&self) -> String {
        if self.is_unchanged() {
            return "No changes detected".to_string();
        }
        format!(
            "{} breaking, {} additive, {} neutral changes; suggested bump: {}",
            self.breaking.len(),
            self.additive.len(),
            self.neutral.len(),
            self.suggested_bump
        )
    }

    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
