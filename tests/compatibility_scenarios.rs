//! End-to-end compatibility scenarios
//!
//! Runs whole schema pairs through the engine and checks the reports.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use schema_compat::config::EngineConfig;
use schema_compat::{
    parse, ChangeKind, ChangeRecord, CompatibilityEngine, ComparisonScheduler, Differ,
    SchemaError, Verdict, VersionBump,
};

const ORDER_V1: &str = include_str!("fixtures/order_v1.json");
const ORDER_V1_REFORMATTED: &str = include_str!("fixtures/order_v1_reformatted.json");
const ORDER_V2: &str = include_str!("fixtures/order_v2_additive.json");
const ORDER_V3: &str = include_str!("fixtures/order_v3_breaking.json");
const MALFORMED: &str = include_str!("fixtures/malformed.json");

fn engine() -> CompatibilityEngine {
    CompatibilityEngine::new(&EngineConfig::default(), 0)
}

fn paths(records: &[ChangeRecord]) -> Vec<String> {
    records.iter().map(|r| r.path.to_string()).collect()
}

fn kinds(records: &[ChangeRecord]) -> Vec<ChangeKind> {
    records.iter().map(|r| r.change_kind).collect()
}

// =============================================================================
// Properties
// =============================================================================

#[test]
fn test_identical_schemas_are_unchanged() {
    let report = engine().compare(ORDER_V1, ORDER_V1).unwrap();
    assert!(report.is_unchanged());
    assert_eq!(report.suggested_bump(), VersionBump::None);
    assert_eq!(report.confidence(), 1.0);
    assert!(!report.migration_required());
}

#[test]
fn test_cosmetic_reformatting_is_unchanged() {
    let old = parse(ORDER_V1).unwrap();
    let new = parse(ORDER_V1_REFORMATTED).unwrap();
    assert_eq!(old.hash(), new.hash());

    let report = engine().compare(ORDER_V1, ORDER_V1_REFORMATTED).unwrap();
    assert!(report.is_unchanged());
}

#[test]
fn test_reports_are_byte_identical_across_runs() {
    let first = engine().compare(ORDER_V1, ORDER_V3).unwrap();
    let second = engine().compare(ORDER_V1, ORDER_V3).unwrap();
    assert_eq!(first.to_json(false).unwrap(), second.to_json(false).unwrap());
    assert_eq!(first.to_json(true).unwrap(), second.to_json(true).unwrap());
}

/// Schema versions whose pairwise diffs must mirror each other
const NULLABLE_DETAILS: &str = r#"{"type": "object", "properties": {"details": {"type": ["object", "null"], "properties": {"x": {"type": "string"}}}, "tags": {"type": ["array", "null"], "items": {"type": "string"}}}}"#;
const PLAIN_DETAILS: &str = r#"{"type": "object", "properties": {"details": {"type": "object"}, "tags": {"type": ["array", "null"]}, "extra": {"type": "integer"}}}"#;

fn field_paths(records: &[ChangeRecord], kind: ChangeKind) -> BTreeSet<String> {
    records
        .iter()
        .filter(|r| r.change_kind == kind)
        .map(|r| r.path.to_string())
        .collect()
}

#[test]
fn test_removal_and_addition_are_symmetric() {
    let versions = [ORDER_V1, ORDER_V1_REFORMATTED, ORDER_V2, ORDER_V3, NULLABLE_DETAILS, PLAIN_DETAILS];
    let documents: Vec<_> = versions.iter().map(|text| parse(text).unwrap()).collect();

    for differ in [Differ::new(), Differ::new().lenient()] {
        for a in &documents {
            for b in &documents {
                let forward = differ.diff(a, b).unwrap();
                let backward = differ.diff(b, a).unwrap();
                assert_eq!(
                    field_paths(&forward, ChangeKind::FieldRemoved),
                    field_paths(&backward, ChangeKind::FieldAdded),
                    "strict={} {} -> {}",
                    differ.is_strict(),
                    a.hash().short(),
                    b.hash().short()
                );
                assert_eq!(
                    field_paths(&forward, ChangeKind::FieldAdded),
                    field_paths(&backward, ChangeKind::FieldRemoved)
                );
            }
        }
    }
}

#[test]
fn test_lenient_narrowing_still_reports_removed_fields() {
    let config = EngineConfig {
        strict_mode: false,
        ..EngineConfig::default()
    };
    let report = CompatibilityEngine::new(&config, 0)
        .compare(NULLABLE_DETAILS, PLAIN_DETAILS)
        .unwrap();

    assert!(report
        .breaking()
        .iter()
        .any(|r| r.change_kind == ChangeKind::FieldRemoved
            && r.path.to_string() == "$.properties.details.properties.x"));
    assert_eq!(report.suggested_bump(), VersionBump::Major);
}

#[test]
fn test_item_schema_on_nullable_array_matches_plain_array() {
    let cases = [
        (r#"{"type": "array"}"#, r#"{"type": "array", "items": {"type": "string"}}"#),
        (
            r#"{"type": ["array", "null"]}"#,
            r#"{"type": ["array", "null"], "items": {"type": "string"}}"#,
        ),
    ];
    for (untyped, typed) in cases {
        let narrowed = engine().compare(untyped, typed).unwrap();
        assert_eq!(narrowed.suggested_bump(), VersionBump::Major);
        assert_eq!(kinds(narrowed.breaking()), vec![ChangeKind::TypeChanged]);
        assert_eq!(paths(narrowed.breaking()), vec!["$[]"]);

        let widened = engine().compare(typed, untyped).unwrap();
        assert!(widened.additive().iter().all(|r| r.change_kind != ChangeKind::FieldAdded));
        assert!(widened.breaking().iter().all(|r| r.change_kind != ChangeKind::FieldRemoved));
    }
}

#[test]
fn test_integral_float_enum_values_are_unchanged() {
    let old = r#"{"type": "object", "properties": {"level": {"type": "number", "enum": [1, 2]}}}"#;
    let new = r#"{"type": "object", "properties": {"level": {"type": "number", "enum": [2.0, 1.0]}}}"#;
    let report = engine().compare(old, new).unwrap();
    assert!(report.is_unchanged());
    assert_eq!(report.old_hash(), report.new_hash());
}

#[test]
fn test_one_breaking_change_dominates_the_bump() {
    let old = r#"{"type": "object", "properties": {"a": {"type": "string"}, "b": {"type": "string", "description": "old"}}}"#;
    let new = r#"{"type": "object", "properties": {"b": {"type": "string", "description": "new"}, "c": {"type": "string"}, "d": {"type": "string"}}}"#;

    let report = engine().compare(old, new).unwrap();
    assert_eq!(report.breaking().len(), 1);
    assert_eq!(report.additive().len(), 2);
    assert_eq!(report.neutral().len(), 1);
    assert_eq!(report.suggested_bump(), VersionBump::Major);
    assert!(report.migration_required());
}

// =============================================================================
// Scenarios
// =============================================================================

#[test]
fn test_removed_field_still_listed_as_required() {
    let old = r#"{"type": "object", "properties": {"amount": {"type": "number"}}, "required": ["amount"]}"#;
    let new = r#"{"type": "object", "properties": {}, "required": ["amount"]}"#;

    let report = engine().compare(old, new).unwrap();
    assert_eq!(report.total_changes(), 1);
    assert_eq!(kinds(report.breaking()), vec![ChangeKind::FieldRemoved]);
    assert_eq!(paths(report.breaking()), vec!["$.properties.amount"]);
    assert_eq!(report.suggested_bump(), VersionBump::Major);
}

#[test]
fn test_enum_value_added() {
    let old = r#"{"type": "object", "properties": {"currency": {"type": "string", "enum": ["USD", "EUR"]}}}"#;
    let new = r#"{"type": "object", "properties": {"currency": {"type": "string", "enum": ["USD", "EUR", "GBP"]}}}"#;

    let report = engine().compare(old, new).unwrap();
    assert_eq!(report.total_changes(), 1);
    assert_eq!(kinds(report.additive()), vec![ChangeKind::EnumValueAdded]);
    assert_eq!(report.additive()[0].new_value, Some(serde_json::json!("GBP")));
    assert_eq!(report.suggested_bump(), VersionBump::Minor);
    assert_eq!(report.confidence(), 1.0);
}

#[test]
fn test_minimum_added() {
    let old = r#"{"type": "object", "properties": {"amount": {"type": "number"}}}"#;
    let new = r#"{"type": "object", "properties": {"amount": {"type": "number", "minimum": 0}}}"#;

    let report = engine().compare(old, new).unwrap();
    assert_eq!(report.total_changes(), 1);
    assert_eq!(kinds(report.breaking()), vec![ChangeKind::ConstraintTightened]);
    assert_eq!(paths(report.breaking()), vec!["$.properties.amount.minimum"]);
    assert!((report.confidence() - 0.95).abs() < 1e-9);
}

#[test]
fn test_description_only_change() {
    let old = r#"{"type": "object", "properties": {"amount": {"type": "number", "description": "Total"}}}"#;
    let new = r#"{"type": "object", "properties": {"amount": {"type": "number", "description": "Order total"}}}"#;

    let report = engine().compare(old, new).unwrap();
    assert_eq!(report.total_changes(), 1);
    assert_eq!(kinds(report.neutral()), vec![ChangeKind::DescriptionChanged]);
    assert_eq!(report.suggested_bump(), VersionBump::Patch);
    assert!(report.is_compatible());
}

#[test]
fn test_malformed_new_text() {
    let engine = CompatibilityEngine::default();
    match engine.compare(ORDER_V1, MALFORMED) {
        Err(SchemaError::Syntax { line, column, message }) => {
            assert_eq!(line, 4);
            assert!(column > 0);
            assert!(!message.is_empty());
        }
        other => panic!("Expected Syntax error, got {:?}", other),
    }
    assert_eq!(engine.cache_stats().size, 0);
}

// =============================================================================
// Realistic version histories
// =============================================================================

#[test]
fn test_order_additive_release() {
    let report = engine().compare(ORDER_V1, ORDER_V2).unwrap();

    assert!(report.breaking().is_empty());
    assert_eq!(
        kinds(report.additive()),
        vec![
            ChangeKind::FieldAdded,
            ChangeKind::EnumValueAdded,
            ChangeKind::ConstraintRelaxed,
        ]
    );
    assert_eq!(
        paths(report.additive()),
        vec![
            "$.properties.coupon",
            "$.properties.currency.enum",
            "$.properties.note.maxLength",
        ]
    );
    assert_eq!(paths(report.neutral()), vec!["$.description"]);
    assert_eq!(report.suggested_bump(), VersionBump::Minor);
    assert_eq!(report.confidence(), 1.0);
}

#[test]
fn test_order_breaking_release() {
    let report = engine().compare(ORDER_V1, ORDER_V3).unwrap();

    assert_eq!(
        paths(report.breaking()),
        vec![
            "$.properties.amount.minimum",
            "$.properties.customer",
            "$.properties.items[].properties.quantity",
            "$.properties.note",
        ]
    );
    assert_eq!(
        kinds(report.breaking()),
        vec![
            ChangeKind::ConstraintTightened,
            ChangeKind::RequiredAdded,
            ChangeKind::TypeChanged,
            ChangeKind::FieldRemoved,
        ]
    );
    assert_eq!(paths(report.additive()), vec!["$.properties.customer"]);
    assert!(report.neutral().is_empty());

    assert_eq!(report.suggested_bump(), VersionBump::Major);
    assert!((report.confidence() - 0.90).abs() < 1e-9);
    assert!(report.migration_required());

    let order: Vec<Verdict> = report.changes().map(|(verdict, _)| verdict).collect();
    assert_eq!(order.first(), Some(&Verdict::Breaking));
    assert_eq!(order.last(), Some(&Verdict::Additive));
}

#[test]
fn test_report_json_shape() {
    let report = engine().compare(ORDER_V1, ORDER_V2).unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json(false).unwrap()).unwrap();

    assert_eq!(json["suggested_bump"], "minor");
    assert_eq!(json["migration_required"], false);
    assert_eq!(json["additive"][0]["change_kind"], "field_added");
    assert_eq!(json["additive"][0]["path"], "$.properties.coupon");
    assert_eq!(json["old_hash"].as_str().map(str::len), Some(64));
}

// =============================================================================
// Modes
// =============================================================================

#[test]
fn test_widening_is_breaking_in_strict_mode() {
    let old = r#"{"type": "object", "properties": {"note": {"type": "string"}}}"#;
    let new = r#"{"type": "object", "properties": {"note": {"type": ["string", "null"]}}}"#;

    let report = engine().compare(old, new).unwrap();
    assert_eq!(kinds(report.breaking()), vec![ChangeKind::TypeChanged]);
    assert_eq!(report.suggested_bump(), VersionBump::Major);
}

#[test]
fn test_widening_is_additive_in_lenient_mode() {
    let old = r#"{"type": "object", "properties": {"note": {"type": "string", "maxLength": 10}}}"#;
    let new = r#"{"type": ["object"], "properties": {"note": {"type": ["string", "null"], "maxLength": 5}}}"#;

    let config = EngineConfig {
        strict_mode: false,
        ..EngineConfig::default()
    };
    let report = CompatibilityEngine::new(&config, 0).compare(old, new).unwrap();

    assert_eq!(paths(report.additive()), vec!["$.properties.note.type"]);
    // The walk continues below a widened node
    assert_eq!(paths(report.breaking()), vec!["$.properties.note.maxLength"]);
}

// =============================================================================
// Cache and supersession
// =============================================================================

#[test]
fn test_engine_cache_is_keyed_by_content() {
    let engine = CompatibilityEngine::default();
    let first = engine.compare(ORDER_V1, ORDER_V2).unwrap();
    let second = engine.compare(ORDER_V1_REFORMATTED, ORDER_V2).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(engine.cache_stats().hits, 1);
}

#[test]
fn test_rapid_edits_deliver_only_the_latest() {
    let engine = Arc::new(CompatibilityEngine::default());
    let scheduler = ComparisonScheduler::new(engine, Duration::from_millis(20));

    let stale = scheduler.submit("order.schema.json", ORDER_V1, ORDER_V2);
    let latest = scheduler.submit("order.schema.json", ORDER_V1, ORDER_V3);

    assert!(stale.wait().unwrap().is_superseded());
    let outcome = latest.wait().unwrap();
    assert_eq!(outcome.report().unwrap().suggested_bump(), VersionBump::Major);
}
