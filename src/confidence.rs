//! Confidence scoring
//!
//! `TypeChanged` and `ConstraintTightened` are the two kinds whose real
//! impact depends on data a structural comparison cannot see. Each one
//! lowers confidence by a fixed penalty, down to a floor.

use crate::diff::{ChangeKind, ChangeRecord};

/// Penalty per ambiguous change
pub const AMBIGUITY_PENALTY: f64 = 0.05;

/// Confidence never drops below this
pub const CONFIDENCE_FLOOR: f64 = 0.5;

pub fn is_ambiguous(kind: ChangeKind) -> bool {
    matches!(kind, ChangeKind::TypeChanged | ChangeKind::ConstraintTightened)
}

/// Confidence in `[0.5, 1.0]` for a change set
pub fn score(records: &[ChangeRecord]) -> f64 {
    let ambiguous = records
        .iter()
        .filter(|r| is_ambiguous(r.change_kind))
        .count();
    (1.0 - AMBIGUITY_PENALTY * ambiguous as f64).max(CONFIDENCE_FLOOR)
}
