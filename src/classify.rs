//! Change Classification
//!
//! The decision table mapping every `ChangeKind` to a `Verdict`. This is the
//! only place verdicts are decided.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::diff::{ChangeKind, ChangeRecord};

/// Compatibility verdict for a single change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    /// Previously valid data or consumers may fail
    Breaking,
    /// Strictly widens what is accepted
    Additive,
    /// No structural effect
    Neutral,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Verdict::Breaking => "breaking",
            Verdict::Additive => "additive",
            Verdict::Neutral => "neutral",
        };
        f.write_str(label)
    }
}

/// Verdict and rationale for a change kind
pub fn rule(kind: ChangeKind) -> (Verdict, &'static str) {
    match kind {
        ChangeKind::FieldRemoved => (
            Verdict::Breaking,
            "consumers reading the field will silently lose data",
        ),
        ChangeKind::TypeChanged => (Verdict::Breaking, "incompatible representation"),
        ChangeKind::EnumValueRemoved => (Verdict::Breaking, "previously valid values now rejected"),
        ChangeKind::ConstraintTightened => (
            Verdict::Breaking,
            "previously valid instances may now fail validation",
        ),
        ChangeKind::RequiredAdded => (Verdict::Breaking, "previously optional field now mandatory"),
        ChangeKind::FieldAdded => (
            Verdict::Additive,
            "optional by construction; does not invalidate old instances",
        ),
        ChangeKind::EnumValueAdded => (Verdict::Additive, "widens acceptable value set"),
        ChangeKind::ConstraintRelaxed => (Verdict::Additive, "widens acceptable value set"),
        ChangeKind::RequiredRemoved => (Verdict::Additive, "relaxes a prior obligation"),
        ChangeKind::DescriptionChanged => (Verdict::Neutral, "no structural effect"),
    }
}

/// Classify a single change record
pub fn classify(record: &ChangeRecord) -> Verdict {
    rule(record.change_kind).0
}

/// Why a change received its verdict
pub fn rationale(kind: ChangeKind) -> &'static str {
    rule(kind).1
}
