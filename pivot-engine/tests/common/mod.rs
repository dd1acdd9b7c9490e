//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for pivot-engine integration tests.

#![allow(dead_code)]

use pivot_engine::{
    key, AggregatorRegistry, Derivation, Key, PivotConfig, PivotData, PivotEngine, Record, Value,
};

/// Test harness wrapping an engine over a fixture.
pub struct TestHarness {
    pub engine: PivotEngine,
}

impl TestHarness {
    /// Harness over the three-record tips sample.
    pub fn with_tips() -> Self {
        TestHarness {
            engine: PivotEngine::new(&TipsFixture::records(), Derivation::new()),
        }
    }

    /// Harness over the larger restaurant sample.
    pub fn with_restaurant() -> Self {
        TestHarness {
            engine: PivotEngine::new(&RestaurantFixture::records(), Derivation::new()),
        }
    }

    pub fn with_records(records: &[Record]) -> Self {
        TestHarness {
            engine: PivotEngine::new(records, Derivation::new()),
        }
    }

    /// Configure and return the built pivot, panicking on configuration errors.
    pub fn pivot(&mut self, config: PivotConfig) -> &PivotData {
        self.engine.configure(config).expect("configuration should build")
    }

    pub fn registry(&self) -> &AggregatorRegistry {
        self.engine.registry()
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

fn record(gender: &str, meal: &str, tip: f64) -> Record {
    [
        ("Gender", Value::from(gender)),
        ("Meal", Value::from(meal)),
        ("Tip", Value::from(tip)),
    ]
    .into_iter()
    .collect()
}

/// The three-record tips sample.
pub struct TipsFixture;

impl TipsFixture {
    pub fn records() -> Vec<Record> {
        vec![
            record("M", "Lunch", 3.0),
            record("F", "Dinner", 5.0),
            record("M", "Dinner", 4.0),
        ]
    }
}

/// A wider sample with a party-size and a day attribute.
pub struct RestaurantFixture;

impl RestaurantFixture {
    pub fn data() -> Vec<(&'static str, &'static str, &'static str, f64, f64, f64)> {
        // (gender, meal, day, party size, total bill, tip)
        vec![
            ("F", "Dinner", "Sun", 2.0, 16.99, 1.01),
            ("M", "Dinner", "Sun", 3.0, 10.34, 1.66),
            ("M", "Dinner", "Sun", 3.0, 21.01, 3.50),
            ("M", "Dinner", "Sat", 2.0, 23.68, 3.31),
            ("F", "Dinner", "Sat", 4.0, 24.59, 3.61),
            ("M", "Lunch", "Thur", 4.0, 25.29, 4.71),
            ("F", "Lunch", "Thur", 2.0, 8.77, 2.00),
            ("M", "Lunch", "Fri", 2.0, 26.88, 3.12),
            ("F", "Dinner", "Fri", 2.0, 15.04, 1.96),
            ("M", "Lunch", "Thur", 1.0, 14.78, 3.23),
            ("F", "Lunch", "Fri", 3.0, 10.27, 1.71),
            ("M", "Dinner", "Sat", 2.0, 35.26, 5.00),
        ]
    }

    pub fn records() -> Vec<Record> {
        Self::data()
            .into_iter()
            .map(|(gender, meal, day, size, bill, tip)| {
                [
                    ("Gender", Value::from(gender)),
                    ("Meal", Value::from(meal)),
                    ("Day", Value::from(day)),
                    ("Party Size", Value::from(size)),
                    ("Total Bill", Value::from(bill)),
                    ("Tip", Value::from(tip)),
                ]
                .into_iter()
                .collect()
            })
            .collect()
    }
}

// ============================================================================
// ASSERTION HELPERS
// ============================================================================

/// Numeric value at a (row, column) pair.
pub fn cell(pivot: &PivotData, row: &[&str], col: &[&str]) -> Option<f64> {
    pivot
        .get_aggregator(&k(row), &k(col))
        .value()
        .as_number()
}

/// Assert that a pair holds an expected number (within float tolerance).
pub fn assert_cell(pivot: &PivotData, row: &[&str], col: &[&str], expected: f64) {
    match cell(pivot, row, col) {
        Some(actual) => assert!(
            (actual - expected).abs() < 1e-9,
            "cell {:?} x {:?}: expected {}, got {}",
            row,
            col,
            expected,
            actual
        ),
        None => panic!("cell {:?} x {:?}: expected {}, got null", row, col, expected),
    }
}

pub fn k(parts: &[&str]) -> Key {
    key(parts.iter().copied())
}

/// Keys rendered as "a/b" strings for compact assertions.
pub fn rendered(keys: &[Key]) -> Vec<String> {
    keys.iter()
        .map(|k| k.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("/"))
        .collect()
}
