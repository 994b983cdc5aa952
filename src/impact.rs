//! Migration impact estimation seam
//!
//! Counting how many persisted instances a change touches needs access to
//! live data, so it belongs to an external collaborator. The engine only
//! shapes its output for one: estimators receive change records and answer
//! with a count per record. Nothing in the engine calls an estimator.

use serde::Serialize;

use crate::diff::{ChangeKind, ChangeRecord};
use crate::path::ChangePath;
use crate::report::CompatibilityReport;

/// Estimated number of existing instances affected by one change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImpactEstimate {
    pub path: ChangePath,
    pub change_kind: ChangeKind,
    pub affected_instances: u64,
}

/// External collaborator that knows about persisted data
pub trait ImpactEstimator {
    /// One estimate per input record, in input order
    fn estimate(&self, changes: &[ChangeRecord]) -> Vec<ImpactEstimate>;
}

/// Any per-record counting function is an estimator
impl<F> ImpactEstimator for F
where
    F: Fn(&ChangeRecord) -> u64,
{
    fn estimate(&self, changes: &[ChangeRecord]) -> Vec<ImpactEstimate> {
        changes
            .iter()
            .map(|record| ImpactEstimate {
                path: record.path.clone(),
                change_kind: record.change_kind,
                affected_instances: self(record),
            })
            .collect()
    }
}

/// The records of a report in estimator order: breaking first, then additive, then neutral
pub fn estimator_input(report: &CompatibilityReport) -> Vec<ChangeRecord> {
    report.changes().map(|(_, record)| record.clone()).collect()
}

/// Total affected instances across a set of estimates
pub fn total_affected(estimates: &[ImpactEstimate]) -> u64 {
    estimates.iter().map(|e| e.affected_instances).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CompatibilityEngine;

    #[test]
    fn test_closure_estimator() {
        let engine = CompatibilityEngine::default();
        let report = engine
            .compare(
                r#"{"type": "object", "properties": {"a": {"type": "string"}, "b": {"type": "string"}}}"#,
                r#"{"type": "object", "properties": {"b": {"type": "integer"}, "c": {"type": "string"}}}"#,
            )
            .unwrap();

        let records = estimator_input(&report);
        let estimator = |record: &ChangeRecord| -> u64 {
            match record.change_kind {
                ChangeKind::FieldRemoved => 120,
                ChangeKind::TypeChanged => 40,
                _ => 0,
            }
        };
        let estimates = estimator.estimate(&records);

        assert_eq!(estimates.len(), 3);
        assert_eq!(estimates[0].path.to_string(), "$.properties.a");
        assert_eq!(estimates[0].affected_instances, 120);
        assert_eq!(estimates[1].change_kind, ChangeKind::TypeChanged);
        assert_eq!(estimates[2].change_kind, ChangeKind::FieldAdded);
        assert_eq!(total_affected(&estimates), 160);
    }
}
