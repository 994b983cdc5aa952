//! Schema Compatibility Engine
//!
//! Compares two versions of a structural schema (JSON Schema) and reports
//! which changes are breaking, additive or neutral, the semantic-version
//! bump they call for, a confidence score and whether data migration is
//! required.
//!
//! ## Features
//!
//! - **Normalization**: Cosmetically different schemas produce identical trees and hashes
//! - **Deterministic Diffing**: Stable, path-ordered change records
//! - **Single Decision Table**: Every change kind maps to exactly one verdict
//! - **Semantic Versioning**: Suggested bump applied with `semver`
//! - **Caching**: LRU report cache keyed by content hash
//! - **Supersession**: Background comparisons where the last request wins
//!
//! ## Pipeline
//!
//! ```text
//! text ──parse──▶ SchemaDocument ─┐
//!                                 ├─diff──▶ ChangeRecord[] ──classify──▶ Verdict[]
//! text ──parse──▶ SchemaDocument ─┘                                         │
//!                                        CompatibilityReport ◀──recommend + score
//! ```

pub mod cache;
pub mod checksum;
pub mod classify;
pub mod confidence;
pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod impact;
pub mod parser;
pub mod path;
pub mod report;
pub mod scheduler;
pub mod schema;
pub mod version;

pub use cache::{CacheStats, ReportCache};
pub use checksum::Checksum;
pub use classify::{classify, Verdict};
pub use config::CompatConfig;
pub use diff::{diff, ChangeKind, ChangeRecord, Differ};
pub use engine::CompatibilityEngine;
pub use error::{Result, SchemaError};
pub use impact::{ImpactEstimate, ImpactEstimator};
pub use parser::{parse, Parser};
pub use path::{ChangePath, PathSegment};
pub use report::CompatibilityReport;
pub use scheduler::{CompareOutcome, ComparisonScheduler, PendingComparison};
pub use schema::{SchemaDocument, SchemaKind, SchemaNode, TypeName};
pub use version::{recommend, VersionBump};
