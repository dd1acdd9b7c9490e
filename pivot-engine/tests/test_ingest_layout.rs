//! FILENAME: tests/test_ingest_layout.rs
//! Integration tests for JSON ingestion and grouped axis layout.

mod common;

use common::{assert_cell, TestHarness};
use pivot_engine::{records_from_json, AxisEntry, GroupingOptions, PivotConfig, PivotError, Value};
use serde_json::json;

// ============================================================================
// INGESTION
// ============================================================================

#[test]
fn test_json_objects_feed_the_engine() {
    let rows = vec![
        json!({"Gender": "M", "Meal": "Lunch", "Tip": 3}),
        json!({"Gender": "F", "Meal": "Dinner", "Tip": 5}),
        json!({"Gender": "M", "Meal": "Dinner", "Tip": 4}),
    ];
    let ingested = records_from_json(&rows);
    assert!(ingested.skipped.is_empty());

    let mut harness = TestHarness::with_records(&ingested.records);
    let pivot = harness.pivot(PivotConfig::new().rows(["Gender"]).vals(["Tip"]).aggregator("Sum"));
    assert_cell(pivot, &["M"], &[], 7.0);
    assert_cell(pivot, &[], &[], 12.0);
}

#[test]
fn test_malformed_rows_are_skipped_not_fatal() {
    let rows = vec![
        json!({"Gender": "M", "Tip": 3}),
        json!({"Gender": "F", "Tip": {"amount": 5}}),
        json!("not a record"),
        json!({"Gender": "M", "Tip": 4, "Regular": true}),
    ];
    let ingested = records_from_json(&rows);

    assert_eq!(ingested.records.len(), 2);
    assert_eq!(ingested.skipped.len(), 2);
    assert!(ingested
        .skipped
        .iter()
        .all(|e| matches!(e, PivotError::DataShape { .. }) && !e.is_configuration()));
    assert_eq!(ingested.records[1].get("Regular"), &Value::text("true"));

    let harness = TestHarness::with_records(&ingested.records);
    let index = harness.engine.index();
    // "Regular" first appears on the second surviving record
    assert_eq!(index.count("Regular", &Value::Null), 1);
    assert_eq!(index.total("Regular"), 2);
}

#[test]
fn test_header_and_arrays() {
    let rows = vec![
        json!(["Gender", "Meal", "Tip"]),
        json!(["M", "Lunch", 3]),
        json!(["F", "Dinner", [5]]),
        json!(["M", "Dinner", 4]),
    ];
    let ingested = records_from_json(&rows);
    assert_eq!(ingested.records.len(), 2);
    assert!(matches!(ingested.skipped[0], PivotError::DataShape { index: 2, .. }));

    let mut harness = TestHarness::with_records(&ingested.records);
    let pivot = harness.pivot(PivotConfig::new().cols(["Meal"]));
    assert_cell(pivot, &[], &["Lunch"], 1.0);
    assert_cell(pivot, &[], &[], 2.0);
}

#[test]
fn test_all_rows_malformed_gives_empty_tree() {
    let rows = vec![json!([1, 2]), json!(["a", "b"])];
    let ingested = records_from_json(&rows);
    assert!(ingested.records.is_empty());
    assert_eq!(ingested.skipped.len(), 2);

    let mut harness = TestHarness::with_records(&ingested.records);
    let pivot = harness.pivot(PivotConfig::new());
    assert_eq!(pivot.get_aggregator(&[], &[]).value(), Value::Null);
}

// ============================================================================
// GROUPED LAYOUT
// ============================================================================

fn describe(entries: &[AxisEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|e| {
            let path = e.key.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("/");
            if e.is_subtotal {
                format!("{} Total", path)
            } else {
                path
            }
        })
        .collect()
}

#[test]
fn test_grouped_rows_with_subtotals_after() {
    let mut harness = TestHarness::with_restaurant();
    let pivot = harness.pivot(
        PivotConfig::new()
            .rows(["Gender", "Meal"])
            .cols(["Day"])
            .grouping(GroupingOptions {
                enabled: true,
                ..GroupingOptions::default()
            }),
    );

    assert_eq!(
        describe(&pivot.row_axis()),
        vec!["F/Dinner", "F/Lunch", "F Total", "M/Dinner", "M/Lunch", "M Total"]
    );
    // A single column attribute has no groups to subtotal
    assert_eq!(describe(&pivot.col_axis()), vec!["Fri", "Sat", "Sun", "Thur"]);

    let subtotal = &pivot.row_axis()[2];
    assert_cell(pivot, &["F"], &[], 5.0);
    assert_eq!(
        pivot.get_aggregator(&subtotal.key, &[]).value(),
        Value::number(5.0)
    );
}

#[test]
fn test_grouped_columns_with_subtotals_before() {
    let mut harness = TestHarness::with_restaurant();
    let pivot = harness.pivot(
        PivotConfig::new()
            .cols(["Meal", "Gender"])
            .grouping(GroupingOptions {
                enabled: true,
                col_group_before: true,
                ..GroupingOptions::default()
            }),
    );

    assert_eq!(
        describe(&pivot.col_axis()),
        vec!["Dinner Total", "Dinner/F", "Dinner/M", "Lunch Total", "Lunch/F", "Lunch/M"]
    );
    assert_eq!(pivot.row_axis().len(), 1);
}

#[test]
fn test_ungrouped_axis_lists_full_keys() {
    let mut harness = TestHarness::with_restaurant();
    let pivot = harness.pivot(PivotConfig::new().rows(["Gender", "Meal"]));
    let axis = pivot.row_axis();
    assert_eq!(axis.len(), 4);
    assert!(axis.iter().all(|e| !e.is_subtotal && e.key.len() == 2));
}
