//! FILENAME: pivot-engine/src/number_format.rs
//! PURPOSE: Display formatting for aggregate values.
//! CONTEXT: Each aggregator recipe carries a NumberFormat that renderers use
//! to turn a raw aggregate into a display string.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Number display options (digits, scaling, separators, affixes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumberFormat {
    pub digits_after_decimal: u8,
    /// Multiplier applied before rounding (100 for percentages).
    pub scaler: f64,
    pub thousands_sep: String,
    pub decimal_sep: String,
    pub prefix: String,
    pub suffix: String,
}

impl Default for NumberFormat {
    fn default() -> Self {
        NumberFormat {
            digits_after_decimal: 2,
            scaler: 1.0,
            thousands_sep: ",".to_string(),
            decimal_sep: ".".to_string(),
            prefix: String::new(),
            suffix: String::new(),
        }
    }
}

impl NumberFormat {
    /// Two decimals with thousands separators.
    pub fn us() -> Self {
        NumberFormat::default()
    }

    /// Whole numbers with thousands separators.
    pub fn us_int() -> Self {
        NumberFormat {
            digits_after_decimal: 0,
            ..NumberFormat::default()
        }
    }

    /// One decimal, scaled by 100, with a `%` suffix.
    pub fn us_pct() -> Self {
        NumberFormat {
            digits_after_decimal: 1,
            scaler: 100.0,
            suffix: "%".to_string(),
            ..NumberFormat::default()
        }
    }

    /// Format a number. Non-finite input formats as an empty string.
    pub fn format_number(&self, value: f64) -> String {
        let scaled = value * self.scaler;
        if !scaled.is_finite() {
            return String::new();
        }

        let rounded = format!("{:.prec$}", scaled, prec = self.digits_after_decimal as usize);
        let with_separators = add_separators(&rounded, &self.thousands_sep, &self.decimal_sep);
        format!("{}{}{}", self.prefix, with_separators, self.suffix)
    }

    /// Format an aggregate result. Text passes through; null formats as "".
    pub fn format_value(&self, value: &Value) -> String {
        match value {
            Value::Null => String::new(),
            Value::Text(s) => s.clone(),
            Value::Number(n) => self.format_number(n.as_f64()),
        }
    }
}

/// Add thousands separators to a numeric string and swap the decimal separator.
fn add_separators(s: &str, thousands_sep: &str, decimal_sep: &str) -> String {
    let mut parts = s.splitn(2, '.');
    let integer_part = parts.next().unwrap_or("");
    let decimal_part = parts.next();

    let negative = integer_part.starts_with('-');
    let digits: String = integer_part.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = String::new();
    let len = digits.len();

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            result.push_str(thousands_sep);
        }
        result.push(c);
    }

    // "-0" after rounding a tiny negative reads oddly
    let non_zero = |part: &str| part.chars().any(|c| c.is_ascii_digit() && c != '0');
    if negative && (non_zero(&digits) || decimal_part.is_some_and(non_zero)) {
        result.insert(0, '-');
    }

    if let Some(decimal) = decimal_part {
        result.push_str(decimal_sep);
        result.push_str(decimal);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_us_format() {
        let fmt = NumberFormat::us();
        assert_eq!(fmt.format_number(1234567.891), "1,234,567.89");
        assert_eq!(fmt.format_number(-1234.5), "-1,234.50");
        assert_eq!(fmt.format_number(0.0), "0.00");
    }

    #[test]
    fn test_int_and_pct_formats() {
        assert_eq!(NumberFormat::us_int().format_number(12345.6), "12,346");
        assert_eq!(NumberFormat::us_pct().format_number(0.4567), "45.7%");
    }

    #[test]
    fn test_custom_separators_and_affixes() {
        let fmt = NumberFormat {
            thousands_sep: ".".to_string(),
            decimal_sep: ",".to_string(),
            prefix: "€".to_string(),
            ..NumberFormat::default()
        };
        assert_eq!(fmt.format_number(1234.5), "€1.234,50");
    }

    #[test]
    fn test_non_finite_and_null_format_empty() {
        let fmt = NumberFormat::us();
        assert_eq!(fmt.format_number(f64::NAN), "");
        assert_eq!(fmt.format_number(f64::INFINITY), "");
        assert_eq!(fmt.format_value(&Value::Null), "");
        assert_eq!(fmt.format_value(&Value::text("a, b")), "a, b");
    }

    #[test]
    fn test_negative_zero_after_rounding() {
        assert_eq!(NumberFormat::us_int().format_number(-0.2), "0");
        assert_eq!(NumberFormat::us().format_number(-0.004), "0.00");
    }
}
